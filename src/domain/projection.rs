// Derived chart projections - Y-axis bounds, value histograms, ring sizing
use super::widget::MonitoredSeries;
use super::window::SlidingSensorData;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fraction of the observed range added above and below the Y-axis bounds.
const Y_AXIS_PADDING: f64 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartProps {
    pub y_axis_data_min: Option<f64>,
    pub y_axis_data_max: Option<f64>,
}

impl ChartProps {
    /// Widens the bounds to cover every loaded non-gap value. Bounds only grow.
    pub fn expand(self, window: &SlidingSensorData, series: &[MonitoredSeries]) -> Self {
        let observed = window
            .timeline()
            .filter(|s| !s.is_gap())
            .flat_map(|s| series.iter().filter_map(move |m| m.value(s)))
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            });

        let Some((lo, hi)) = observed else {
            return self;
        };

        let pad = if hi > lo {
            (hi - lo) * Y_AXIS_PADDING
        } else if lo != 0.0 {
            lo.abs() * Y_AXIS_PADDING
        } else {
            1.0
        };

        Self {
            y_axis_data_min: Some(self.y_axis_data_min.map_or(lo - pad, |m| m.min(lo - pad))),
            y_axis_data_max: Some(self.y_axis_data_max.map_or(hi + pad, |m| m.max(hi + pad))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    /// Lower bound of the unit-wide bucket.
    pub value: i64,
    pub count: usize,
}

/// Bucketed value counts for one monitored series, used by pie and scatter charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolarChartSensorData {
    pub name: String,
    pub color: String,
    pub buckets: Vec<HistogramBucket>,
}

pub fn bucket_histograms(
    window: &SlidingSensorData,
    series: &[MonitoredSeries],
) -> Vec<PolarChartSensorData> {
    series
        .iter()
        .map(|m| {
            let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
            for value in window
                .timeline()
                .filter(|s| !s.is_gap())
                .filter_map(|s| m.bucket_value(s))
            {
                *counts.entry(value.floor() as i64).or_default() += 1;
            }

            PolarChartSensorData {
                name: m.name().to_string(),
                color: m.color.clone(),
                buckets: counts
                    .into_iter()
                    .map(|(value, count)| HistogramBucket { value, count })
                    .collect(),
            }
        })
        .collect()
}

/// Thickness of each pie ring when `num_series` rings share `available_px`.
pub fn pie_ring_thickness(available_px: f64, num_series: usize, min_thickness: f64) -> f64 {
    if num_series == 0 {
        return available_px.max(min_thickness);
    }
    (available_px / num_series as f64).max(min_thickness)
}
