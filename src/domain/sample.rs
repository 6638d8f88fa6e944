// Sensor sample domain model
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of a server-side aggregation over a configured time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationValue {
    pub value: f64,
    #[serde(default)]
    pub note: String,
}

/// One timestamped sample flowing through a widget window.
///
/// Gap samples (`machinery_off == true`) stand in for a period where the
/// machinery produced no data. They keep the timeline continuous but are never
/// counted as displayed samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorData {
    pub time: i64,
    #[serde(default)]
    pub formatted_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time: Option<i64>,
    #[serde(default)]
    pub machinery_off: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machinery_off_from: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machinery_off_to: Option<i64>,
    #[serde(default)]
    pub active_data: HashMap<String, Option<f64>>,
    #[serde(default)]
    pub all_data: HashMap<String, Option<f64>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub aggregation_data: HashMap<String, AggregationValue>,
}

impl SensorData {
    pub fn new(time: i64) -> Self {
        Self {
            time,
            formatted_time: format_time(time),
            ..Default::default()
        }
    }

    /// A synthetic sample covering a machinery-off interval.
    pub fn gap(from: i64, to: i64) -> Self {
        Self {
            time: from,
            formatted_time: format_time(from),
            machinery_off: true,
            machinery_off_from: Some(from),
            machinery_off_to: Some(to),
            ..Default::default()
        }
    }

    /// Adds a raw sensor value, marking it active as well.
    pub fn with_value(mut self, sensor: &str, value: Option<f64>) -> Self {
        self.all_data.insert(sensor.to_string(), value);
        self.active_data.insert(sensor.to_string(), value);
        self
    }

    pub fn with_aggregation(mut self, name: &str, value: f64) -> Self {
        self.aggregation_data.insert(
            name.to_string(),
            AggregationValue {
                value,
                note: String::new(),
            },
        );
        self
    }

    pub fn is_gap(&self) -> bool {
        self.machinery_off
    }

    /// Raw value for a sensor from the full value set.
    pub fn raw_value(&self, sensor: &str) -> Option<f64> {
        self.all_data.get(sensor).copied().flatten()
    }

    pub fn active_value(&self, sensor: &str) -> Option<f64> {
        self.active_data.get(sensor).copied().flatten()
    }

    pub fn aggregation_value(&self, name: &str) -> Option<f64> {
        self.aggregation_data.get(name).map(|a| a.value)
    }
}

/// Counts the samples that are not machinery-off gaps.
pub fn count_non_gap(samples: &[SensorData]) -> usize {
    samples.iter().filter(|s| !s.is_gap()).count()
}

fn format_time(time_ms: i64) -> String {
    DateTime::from_timestamp_millis(time_ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_samples_are_not_counted() {
        let samples = vec![
            SensorData::new(1_000),
            SensorData::gap(2_000, 5_000),
            SensorData::new(6_000),
        ];
        assert_eq!(count_non_gap(&samples), 2);
    }

    #[test]
    fn test_formatted_time() {
        let sample = SensorData::new(0);
        assert_eq!(sample.formatted_time, "1970-01-01 00:00:00");
    }

    #[test]
    fn test_deserialize_service_payload() {
        let json = r#"{
            "time": 1700000000000,
            "formattedTime": "2023-11-14 22:13:20",
            "activeData": {"temp": 21.5},
            "allData": {"temp": 21.5, "pressure": null}
        }"#;
        let sample: SensorData = serde_json::from_str(json).unwrap();
        assert_eq!(sample.raw_value("temp"), Some(21.5));
        assert_eq!(sample.raw_value("pressure"), None);
        assert!(!sample.machinery_off);
        assert!(sample.aggregation_data.is_empty());
    }
}
