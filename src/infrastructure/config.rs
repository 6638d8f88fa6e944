use crate::domain::dashboard::{CompactType, DashboardSize, WidgetDefaults};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub sensor_service: SensorServiceSettings,
    pub persistence: PersistenceSettings,
    pub dashboard: DashboardSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorServiceSettings {
    pub base_url: String,
    #[serde(default = "default_sensor_path")]
    pub data_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceSettings {
    pub base_url: String,
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,
    #[serde(default = "default_default_dashboard_path")]
    pub default_dashboard_path: String,
    #[serde(default = "default_collection_path")]
    pub collection_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    pub machinery_id: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_num_cols")]
    pub num_cols: u32,
    #[serde(default = "default_num_rows")]
    pub num_rows: u32,
    #[serde(default = "default_row_height")]
    pub row_height: u32,
    #[serde(default)]
    pub compact_type: CompactType,
    #[serde(default = "default_multi_value_max_sensors")]
    pub multi_value_max_sensors: usize,
    #[serde(default = "default_min_ring_thickness")]
    pub min_ring_thickness: f64,
}

impl DashboardSettings {
    pub fn grid_size(&self) -> DashboardSize {
        DashboardSize {
            num_cols: self.num_cols,
            num_rows: self.num_rows,
            row_height: self.row_height,
            compact_type: self.compact_type,
        }
    }

    pub fn widget_defaults(&self) -> WidgetDefaults {
        WidgetDefaults {
            multi_value_max_sensors: self.multi_value_max_sensors,
            min_ring_thickness: self.min_ring_thickness,
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_sensor_path() -> String {
    "/sensor-data".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_dashboard_path() -> String {
    "/dashboards/${machinery}/${name}".to_string()
}

fn default_default_dashboard_path() -> String {
    "/dashboards/${machinery}/default".to_string()
}

fn default_collection_path() -> String {
    "/dashboards/${machinery}".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_num_cols() -> u32 {
    12
}

fn default_num_rows() -> u32 {
    8
}

fn default_row_height() -> u32 {
    60
}

fn default_multi_value_max_sensors() -> usize {
    10
}

fn default_min_ring_thickness() -> f64 {
    8.0
}

/// Reads `config/dashboard.*`, then `DASHBOARD__SECTION__KEY` environment overrides.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard"))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace `${var}` placeholders in a path template with URL-encoded values
pub fn prepare_path(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, &urlencoding::encode(value));
    }
    result
}
