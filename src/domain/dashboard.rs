// Dashboard aggregate - widgets, grid layout and save bookkeeping
use super::error::DomainError;
use super::projection::pie_ring_thickness;
use super::widget::{GridWidget, SensorsMonitoring, WidgetCategory, WidgetType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactType {
    #[default]
    Vertical,
    Horizontal,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSize {
    pub num_cols: u32,
    pub num_rows: u32,
    pub row_height: u32,
    pub compact_type: CompactType,
}

impl Default for DashboardSize {
    fn default() -> Self {
        Self {
            num_cols: 12,
            num_rows: 8,
            row_height: 60,
            compact_type: CompactType::Vertical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutItem {
    pub i: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(rename = "static", default)]
    pub is_static: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: u32,
    pub y: u32,
}

/// Values applied to widgets created on this dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetDefaults {
    pub multi_value_max_sensors: usize,
    pub min_ring_thickness: f64,
}

impl Default for WidgetDefaults {
    fn default() -> Self {
        Self {
            multi_value_max_sensors: 10,
            min_ring_thickness: 8.0,
        }
    }
}

/// Persisted widget: configuration only, no loaded data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetRecord {
    pub id: String,
    pub name: String,
    pub category: WidgetCategory,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub max_sensors: usize,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(default)]
    pub sensors_monitoring: SensorsMonitoring,
}

/// Persisted dashboard as exchanged with the persistence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRecord {
    pub name: String,
    #[serde(rename = "machineryUID")]
    pub machinery_uid: String,
    pub timestamp: i64,
    #[serde(default)]
    pub is_default: bool,
    pub size: DashboardSize,
    #[serde(default)]
    pub widgets: Vec<WidgetRecord>,
    #[serde(default)]
    pub layout: Vec<LayoutItem>,
}

/// Structural changes a user can make to a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum WidgetModification {
    Add {
        widget_type: WidgetType,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        position: Option<GridPosition>,
    },
    Delete {
        id: String,
    },
    Rename {
        id: String,
        name: String,
    },
    ToggleStatic {
        id: String,
    },
    Configure {
        id: String,
        sensors_monitoring: SensorsMonitoring,
    },
    UpdateLayout {
        layout: Vec<LayoutItem>,
    },
    ResizeGrid {
        size: DashboardSize,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub name: String,
    #[serde(rename = "machineryUID")]
    pub machinery_uid: String,
    pub timestamp: i64,
    pub is_default: bool,
    pub size: DashboardSize,
    pub widgets: Vec<GridWidget>,
    pub layout: Vec<LayoutItem>,
    pub num_unsaved_changes: u32,
    pub last_save: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub defaults: WidgetDefaults,
    /// Bumped on every load; fetches started against an earlier load are stale.
    #[serde(skip)]
    pub epoch: u64,
}

impl Dashboard {
    pub fn new(name: String, machinery_uid: String, size: DashboardSize, defaults: WidgetDefaults) -> Self {
        Self {
            name,
            machinery_uid,
            timestamp: Utc::now().timestamp_millis(),
            is_default: false,
            size,
            widgets: Vec::new(),
            layout: Vec::new(),
            num_unsaved_changes: 0,
            last_save: None,
            defaults,
            epoch: 0,
        }
    }

    /// Rebuilds a dashboard from its persisted form. Every widget starts idle
    /// with an empty window.
    pub fn from_record(record: DashboardRecord, defaults: WidgetDefaults) -> Self {
        let widgets = record
            .widgets
            .into_iter()
            .map(|w| {
                let mut widget = GridWidget::new(w.id, w.name, w.widget_type, defaults.multi_value_max_sensors);
                widget.max_sensors = w.max_sensors;
                widget.is_static = w.is_static;
                widget.sensors_monitoring = w.sensors_monitoring;
                widget
            })
            .collect();

        Self {
            name: record.name,
            machinery_uid: record.machinery_uid,
            timestamp: record.timestamp,
            is_default: record.is_default,
            size: record.size,
            widgets,
            layout: record.layout,
            num_unsaved_changes: 0,
            last_save: None,
            defaults,
            epoch: 0,
        }
        .size_rings()
    }

    /// Persisted form. Loaded samples and derived chart state are left out.
    pub fn to_record(&self) -> DashboardRecord {
        DashboardRecord {
            name: self.name.clone(),
            machinery_uid: self.machinery_uid.clone(),
            timestamp: self.timestamp,
            is_default: self.is_default,
            size: self.size,
            widgets: self
                .widgets
                .iter()
                .map(|w| WidgetRecord {
                    id: w.id.clone(),
                    name: w.name.clone(),
                    category: w.category,
                    widget_type: w.widget_type,
                    max_sensors: w.max_sensors,
                    is_static: w.is_static,
                    sensors_monitoring: w.sensors_monitoring.clone(),
                })
                .collect(),
            layout: self.layout.clone(),
        }
    }

    pub fn widget(&self, id: &str) -> Option<&GridWidget> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn widget_index(&self, id: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }

    /// Replaces the widget at `index` with `f` applied to it.
    pub fn map_widget(mut self, index: usize, f: impl FnOnce(GridWidget) -> GridWidget) -> Self {
        if index < self.widgets.len() {
            let widget = self.widgets.remove(index);
            self.widgets.insert(index, f(widget));
            self = self.size_rings();
        }
        self
    }

    pub fn apply(mut self, modification: WidgetModification) -> Result<Self, DomainError> {
        match modification {
            WidgetModification::Add {
                widget_type,
                name,
                position,
            } => {
                let id = uuid::Uuid::new_v4().to_string();
                let name = name.unwrap_or_else(|| widget_type.display_name().to_string());
                let (w, h) = match widget_type.category() {
                    WidgetCategory::SingleValue => (3, 3),
                    WidgetCategory::MultiValue => (6, 4),
                };
                let GridPosition { x, y } = position.unwrap_or(GridPosition {
                    x: 0,
                    y: self
                        .layout
                        .iter()
                        .map(|item| item.y.saturating_add(item.h))
                        .max()
                        .unwrap_or(0),
                });
                self.layout.push(LayoutItem {
                    i: id.clone(),
                    x,
                    y,
                    w,
                    h,
                    is_static: false,
                });
                self.widgets.push(GridWidget::new(
                    id,
                    name,
                    widget_type,
                    self.defaults.multi_value_max_sensors,
                ));
            }
            WidgetModification::Delete { id } => {
                let index = self.require(&id)?;
                self.widgets.remove(index);
                self.layout.retain(|item| item.i != id);
            }
            WidgetModification::Rename { id, name } => {
                let index = self.require(&id)?;
                self.widgets[index].name = name;
            }
            WidgetModification::ToggleStatic { id } => {
                let index = self.require(&id)?;
                let is_static = !self.widgets[index].is_static;
                self.widgets[index].is_static = is_static;
                for item in self.layout.iter_mut().filter(|item| item.i == id) {
                    item.is_static = is_static;
                }
            }
            WidgetModification::Configure {
                id,
                sensors_monitoring,
            } => {
                let index = self.require(&id)?;
                let widget = self.widgets.remove(index);
                self.widgets.insert(index, widget.reconfigure(sensors_monitoring)?);
            }
            WidgetModification::UpdateLayout { layout } => {
                let known: Vec<LayoutItem> = layout
                    .into_iter()
                    .filter(|item| self.widget(&item.i).is_some())
                    .collect();
                for widget in &mut self.widgets {
                    if let Some(item) = known.iter().find(|item| item.i == widget.id) {
                        widget.is_static = item.is_static;
                    }
                }
                self.layout = known;
            }
            WidgetModification::ResizeGrid { size } => {
                self.size = size;
            }
        }

        self.num_unsaved_changes += 1;
        Ok(self.size_rings())
    }

    /// Records a save that persisted `saved_changes` modifications. Changes
    /// made while the save was in flight stay unsaved.
    pub fn mark_saved(mut self, at: DateTime<Utc>, saved_changes: u32) -> Self {
        self.timestamp = at.timestamp_millis();
        self.num_unsaved_changes = self.num_unsaved_changes.saturating_sub(saved_changes);
        self.last_save = Some(at);
        self
    }

    fn require(&self, id: &str) -> Result<usize, DomainError> {
        self.widget_index(id)
            .ok_or_else(|| DomainError::WidgetNotFound(id.to_string()))
    }

    /// Recomputes pie ring thickness from each pie widget's grid height.
    fn size_rings(mut self) -> Self {
        let row_height = self.size.row_height as f64;
        let min_thickness = self.defaults.min_ring_thickness;
        for widget in &mut self.widgets {
            widget.ring_thickness = if widget.widget_type == WidgetType::PieChart {
                let height = self
                    .layout
                    .iter()
                    .find(|item| item.i == widget.id)
                    .map_or(0.0, |item| item.h as f64 * row_height);
                let series = widget.sensors_monitoring.series().len();
                Some(pie_ring_thickness(height / 2.0, series, min_thickness))
            } else {
                None
            };
        }
        self
    }
}
