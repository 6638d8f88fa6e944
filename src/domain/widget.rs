// Grid widget domain model and its data-loading lifecycle
use super::error::DomainError;
use super::projection::{bucket_histograms, ChartProps, PolarChartSensorData};
use super::sample::SensorData;
use super::window::SlidingSensorData;
use super::window_ops::WindowAction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetCategory {
    SingleValue,
    MultiValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetType {
    LineChart,
    AreaChart,
    BarChart,
    PieChart,
    ScatterChart,
    CurrentValue,
    Thermostat,
    Tachometer,
}

impl WidgetType {
    pub fn category(self) -> WidgetCategory {
        match self {
            WidgetType::CurrentValue | WidgetType::Thermostat | WidgetType::Tachometer => {
                WidgetCategory::SingleValue
            }
            _ => WidgetCategory::MultiValue,
        }
    }

    /// Visualizations drawn from bucketed value counts rather than a time axis.
    pub fn uses_polar_data(self) -> bool {
        matches!(self, WidgetType::PieChart | WidgetType::ScatterChart)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            WidgetType::LineChart => "Line chart",
            WidgetType::AreaChart => "Area chart",
            WidgetType::BarChart => "Bar chart",
            WidgetType::PieChart => "Pie chart",
            WidgetType::ScatterChart => "Scatter chart",
            WidgetType::CurrentValue => "Current value",
            WidgetType::Thermostat => "Thermostat",
            WidgetType::Tachometer => "Tachometer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSelection {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadSensors {
    pub head_number: u32,
    pub sensor_names: Vec<SensorSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSelection {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRange {
    pub amount: u32,
    pub unit: TimeUnit,
}

impl Default for DataRange {
    fn default() -> Self {
        Self {
            amount: 1,
            unit: TimeUnit::Hour,
        }
    }
}

/// What a widget monitors: sensors grouped by category and head, or aggregations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorsMonitoring {
    #[serde(default)]
    pub sensors: BTreeMap<String, Vec<HeadSensors>>,
    #[serde(default)]
    pub aggregations: Vec<AggregationSelection>,
    #[serde(default)]
    pub data_range: DataRange,
}

impl SensorsMonitoring {
    pub fn is_empty(&self) -> bool {
        self.aggregations.is_empty() && self.sensor_count() == 0
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors
            .values()
            .flatten()
            .map(|head| head.sensor_names.len())
            .sum()
    }

    /// Monitored series in display order. Aggregations replace raw sensors
    /// when any are configured.
    pub fn series(&self) -> Vec<MonitoredSeries> {
        if !self.aggregations.is_empty() {
            return self
                .aggregations
                .iter()
                .map(|a| MonitoredSeries {
                    key: SeriesKey::Aggregation(a.name.clone()),
                    color: a.color.clone(),
                })
                .collect();
        }

        self.sensors
            .values()
            .flatten()
            .flat_map(|head| head.sensor_names.iter())
            .map(|s| MonitoredSeries {
                key: SeriesKey::Sensor(s.name.clone()),
                color: s.color.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum SeriesKey {
    Sensor(String),
    Aggregation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoredSeries {
    pub key: SeriesKey,
    pub color: String,
}

impl MonitoredSeries {
    pub fn name(&self) -> &str {
        match &self.key {
            SeriesKey::Sensor(name) | SeriesKey::Aggregation(name) => name,
        }
    }

    /// Value plotted on a time axis.
    pub fn value(&self, sample: &SensorData) -> Option<f64> {
        match &self.key {
            SeriesKey::Sensor(name) => sample.raw_value(name),
            SeriesKey::Aggregation(name) => sample.aggregation_value(name),
        }
    }

    /// Value counted into histogram buckets.
    pub fn bucket_value(&self, sample: &SensorData) -> Option<f64> {
        match &self.key {
            SeriesKey::Sensor(name) => sample.active_value(name),
            SeriesKey::Aggregation(name) => sample.aggregation_value(name),
        }
    }
}

/// Data-loading lifecycle of a widget.
///
/// `Idle -> Loading -> {Ready, Error}`; a refresh or reconfiguration re-enters
/// `Loading`. History backfill runs alongside `Ready` and is tracked by
/// `GridWidget::cache_loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridWidget {
    pub id: String,
    pub name: String,
    pub category: WidgetCategory,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub max_sensors: usize,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub sensors_monitoring: SensorsMonitoring,
    pub sensor_data: SlidingSensorData,
    pub chart_props: ChartProps,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub polar_chart_sensor_data: Vec<PolarChartSensorData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ring_thickness: Option<f64>,
    /// Reading shown by single-value widgets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    pub load_state: LoadState,
    pub cache_loading: bool,
    pub sensor_data_error: bool,
    /// Bumped whenever a first-time load starts; results from older
    /// generations are discarded.
    #[serde(skip)]
    pub generation: u64,
}

impl GridWidget {
    pub fn new(id: String, name: String, widget_type: WidgetType, multi_value_max_sensors: usize) -> Self {
        let category = widget_type.category();
        let max_sensors = match category {
            WidgetCategory::SingleValue => 1,
            WidgetCategory::MultiValue => multi_value_max_sensors.max(2),
        };
        Self {
            id,
            name,
            category,
            widget_type,
            max_sensors,
            is_static: false,
            sensors_monitoring: SensorsMonitoring::default(),
            sensor_data: SlidingSensorData::default(),
            chart_props: ChartProps::default(),
            polar_chart_sensor_data: Vec::new(),
            ring_thickness: None,
            current_value: None,
            load_state: LoadState::Idle,
            cache_loading: false,
            sensor_data_error: false,
            generation: 0,
        }
    }

    pub fn series(&self) -> Vec<MonitoredSeries> {
        self.sensors_monitoring.series()
    }

    /// Replaces the monitoring configuration and drops all loaded data.
    pub fn reconfigure(mut self, monitoring: SensorsMonitoring) -> Result<Self, DomainError> {
        let requested = monitoring.sensor_count();
        if requested > self.max_sensors {
            return Err(DomainError::SensorLimitExceeded {
                widget: self.id,
                max: self.max_sensors,
                requested,
            });
        }

        self.sensors_monitoring = monitoring;
        self.sensor_data = SlidingSensorData::default();
        self.chart_props = ChartProps::default();
        self.polar_chart_sensor_data.clear();
        self.current_value = None;
        self.load_state = LoadState::Idle;
        self.cache_loading = false;
        self.sensor_data_error = false;
        self.generation += 1;
        Ok(self)
    }

    pub fn begin_first_time(mut self) -> Self {
        self.generation += 1;
        self.load_state = LoadState::Loading;
        self.cache_loading = false;
        self.sensor_data_error = false;
        self
    }

    pub fn finish_first_time(mut self, window: SlidingSensorData) -> Self {
        self.sensor_data = window;
        self.chart_props = ChartProps::default();
        self.load_state = LoadState::Ready;
        self.refresh_projections()
    }

    /// A first-time load failed; the widget shows an error until refreshed.
    pub fn fail_first_time(mut self) -> Self {
        self.load_state = LoadState::Error;
        self.cache_loading = false;
        self.sensor_data_error = true;
        self
    }

    pub fn begin_cache_load(mut self) -> Self {
        self.cache_loading = true;
        self
    }

    pub fn finish_cache_load(mut self, older: Vec<SensorData>, end_of_data: bool) -> Self {
        self.sensor_data = self.sensor_data.extend_cache(older, end_of_data);
        self.cache_loading = false;
        self.refresh_projections()
    }

    /// A backfill or live-tail fetch failed. Loaded data stays visible.
    pub fn flag_fetch_error(mut self) -> Self {
        self.cache_loading = false;
        self.sensor_data_error = true;
        self
    }

    pub fn apply_window(mut self, action: &WindowAction) -> Self {
        self.sensor_data = self.sensor_data.apply(action);
        self.refresh_projections()
    }

    pub fn append_live(mut self, samples: Vec<SensorData>) -> Self {
        if samples.is_empty() {
            return self;
        }
        self.sensor_data = self.sensor_data.append_live(samples, self.category);
        self.refresh_projections()
    }

    fn refresh_projections(mut self) -> Self {
        let series = self.series();
        self.chart_props = self.chart_props.expand(&self.sensor_data, &series);
        self.polar_chart_sensor_data = if self.widget_type.uses_polar_data() {
            bucket_histograms(&self.sensor_data, &series)
        } else {
            Vec::new()
        };
        self.current_value = match self.category {
            WidgetCategory::SingleValue => self.current_reading(),
            WidgetCategory::MultiValue => None,
        };
        self
    }

    /// Latest reading of a single-value widget: the newest displayed sample,
    /// falling back to the newest historical one. Aggregates take precedence
    /// over raw values; `None` means no reading is available.
    pub fn current_reading(&self) -> Option<f64> {
        let window = &self.sensor_data;
        let sample = window
            .display_data
            .iter()
            .rev()
            .chain(window.left_data.iter().rev())
            .find(|s| !s.is_gap())?;

        let series = self.series();
        series
            .iter()
            .filter(|m| matches!(m.key, SeriesKey::Aggregation(_)))
            .chain(series.iter().filter(|m| matches!(m.key, SeriesKey::Sensor(_))))
            .find_map(|m| m.value(sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::window::tests::samples;

    fn monitoring(sensors: &[&str]) -> SensorsMonitoring {
        let mut monitoring = SensorsMonitoring::default();
        monitoring.sensors.insert(
            "temperature".to_string(),
            vec![HeadSensors {
                head_number: 1,
                sensor_names: sensors
                    .iter()
                    .map(|name| SensorSelection {
                        name: name.to_string(),
                        color: "#00ff00".to_string(),
                    })
                    .collect(),
            }],
        );
        monitoring
    }

    #[test]
    fn test_category_and_sensor_limits() {
        let gauge = GridWidget::new("w1".into(), "Gauge".into(), WidgetType::Thermostat, 8);
        assert_eq!(gauge.category, WidgetCategory::SingleValue);
        assert_eq!(gauge.max_sensors, 1);

        let err = gauge.reconfigure(monitoring(&["a", "b"])).unwrap_err();
        assert_eq!(
            err,
            DomainError::SensorLimitExceeded {
                widget: "w1".to_string(),
                max: 1,
                requested: 2,
            }
        );

        let chart = GridWidget::new("w2".into(), "Chart".into(), WidgetType::LineChart, 8);
        assert_eq!(chart.category, WidgetCategory::MultiValue);
        assert!(chart.reconfigure(monitoring(&["a", "b"])).is_ok());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let widget = GridWidget::new("w".into(), "Chart".into(), WidgetType::LineChart, 8)
            .reconfigure(monitoring(&["temp"]))
            .unwrap();
        assert_eq!(widget.load_state, LoadState::Idle);
        let generation = widget.generation;

        let widget = widget.begin_first_time();
        assert_eq!(widget.load_state, LoadState::Loading);
        assert_eq!(widget.generation, generation + 1);

        let failed = widget.clone().fail_first_time();
        assert_eq!(failed.load_state, LoadState::Error);
        assert!(failed.sensor_data_error);

        let window = SlidingSensorData::from_first_load(samples(10..=20), Vec::new(), false, None);
        let ready = failed.begin_first_time().finish_first_time(window);
        assert_eq!(ready.load_state, LoadState::Ready);
        assert!(!ready.sensor_data_error);

        let ready = ready.begin_cache_load();
        assert!(ready.cache_loading);
        let ready = ready.finish_cache_load(samples(1..=9), true);
        assert!(!ready.cache_loading);
        assert_eq!(ready.sensor_data.left_data.len(), 9);
        assert!(ready.sensor_data.end_of_data);
    }

    #[test]
    fn test_series_prefers_aggregations() {
        let mut config = monitoring(&["temp", "pressure"]);
        assert_eq!(config.series().len(), 2);
        config.aggregations.push(AggregationSelection {
            name: "average".to_string(),
            color: "#0000ff".to_string(),
        });
        let series = config.series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].key, SeriesKey::Aggregation("average".to_string()));
    }

    #[test]
    fn test_current_reading_falls_back_to_history() {
        let widget = GridWidget::new("w".into(), "Now".into(), WidgetType::CurrentValue, 8)
            .reconfigure(monitoring(&["temp"]))
            .unwrap()
            .begin_first_time();
        let window = SlidingSensorData::from_first_load(
            Vec::new(),
            vec![
                SensorData::new(1).with_value("temp", Some(20.0)),
                SensorData::new(2).with_value("temp", Some(21.0)),
                SensorData::gap(3, 4),
            ],
            false,
            None,
        );
        let widget = widget.finish_first_time(window);
        assert_eq!(widget.current_reading(), Some(21.0));
        assert_eq!(widget.current_value, Some(21.0));

        let widget = widget.append_live(vec![SensorData::new(5).with_value("temp", None)]);
        assert_eq!(widget.current_reading(), None);
        assert_eq!(widget.current_value, None);
    }

    #[test]
    fn test_current_value_follows_panning() {
        let widget = GridWidget::new("w".into(), "Now".into(), WidgetType::Tachometer, 8)
            .reconfigure(monitoring(&["rpm"]))
            .unwrap()
            .begin_first_time();
        let window = SlidingSensorData::from_first_load(
            vec![SensorData::new(3).with_value("rpm", Some(1200.0))],
            vec![
                SensorData::new(1).with_value("rpm", Some(900.0)),
                SensorData::new(2).with_value("rpm", Some(1000.0)),
            ],
            false,
            None,
        );
        let widget = widget.finish_first_time(window);
        assert_eq!(widget.current_value, Some(1200.0));

        let widget = widget.apply_window(&WindowAction::Pan { amount: 1 });
        assert_eq!(widget.current_value, Some(1000.0));

        let widget = widget.apply_window(&WindowAction::NavigateToNewData);
        assert_eq!(widget.current_value, Some(1200.0));
    }

    #[test]
    fn test_polar_data_for_pie_charts() {
        let widget = GridWidget::new("w".into(), "Pie".into(), WidgetType::PieChart, 8)
            .reconfigure(monitoring(&["temp"]))
            .unwrap()
            .begin_first_time();
        let window = SlidingSensorData::from_first_load(
            vec![
                SensorData::new(1).with_value("temp", Some(1.5)),
                SensorData::new(2).with_value("temp", Some(1.2)),
            ],
            Vec::new(),
            false,
            None,
        );
        let widget = widget.finish_first_time(window);
        assert_eq!(widget.polar_chart_sensor_data.len(), 1);
        assert_eq!(widget.polar_chart_sensor_data[0].buckets[0].count, 2);
    }
}
