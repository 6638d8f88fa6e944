// Sensor data source trait - the remote fetch service a widget pulls samples from
use crate::domain::sample::SensorData;
use crate::domain::widget::{
    AggregationSelection, DataRange, HeadSensors, SensorsMonitoring, WidgetCategory,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fetch mode: full reset, older-history backfill, or live-tail poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    FirstTime,
    CacheOnly,
    NewOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDataRequest {
    pub sensors: BTreeMap<String, Vec<HeadSensors>>,
    pub aggregations: Vec<AggregationSelection>,
    pub data_range: DataRange,
    pub request_type: RequestType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_data_request_max_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_data_request_min_time: Option<i64>,
    pub widget_category: WidgetCategory,
}

impl SensorDataRequest {
    fn base(monitoring: &SensorsMonitoring, category: WidgetCategory, request_type: RequestType) -> Self {
        Self {
            sensors: monitoring.sensors.clone(),
            aggregations: monitoring.aggregations.clone(),
            data_range: monitoring.data_range,
            request_type,
            cache_data_request_max_time: None,
            new_data_request_min_time: None,
            widget_category: category,
        }
    }

    pub fn first_time(monitoring: &SensorsMonitoring, category: WidgetCategory) -> Self {
        Self::base(monitoring, category, RequestType::FirstTime)
    }

    /// Samples strictly older than `max_time`.
    pub fn cache_only(monitoring: &SensorsMonitoring, category: WidgetCategory, max_time: i64) -> Self {
        Self {
            cache_data_request_max_time: Some(max_time),
            ..Self::base(monitoring, category, RequestType::CacheOnly)
        }
    }

    /// Samples strictly newer than `min_time`.
    pub fn new_only(monitoring: &SensorsMonitoring, category: WidgetCategory, min_time: i64) -> Self {
        Self {
            new_data_request_min_time: Some(min_time),
            ..Self::base(monitoring, category, RequestType::NewOnly)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensorDataResponse {
    pub display_sensor_data: Vec<SensorData>,
    pub cached_sensor_data: Vec<SensorData>,
    pub new_sensor_data: Vec<SensorData>,
    pub num_sensor_data: usize,
    pub min_display_time: Option<i64>,
    pub end_of_data: bool,
    pub request_type: Option<RequestType>,
}

#[async_trait]
pub trait SensorDataSource: Send + Sync {
    /// Fetch one page of samples for a widget's monitoring configuration
    async fn fetch(&self, request: &SensorDataRequest) -> anyhow::Result<SensorDataResponse>;
}
