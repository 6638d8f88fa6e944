// Sliding window store - left/display/right segments over a loaded timeline
use super::sample::{count_non_gap, SensorData};
use serde::Serialize;

/// Smallest number of samples a display segment may be zoomed down to.
pub const MIN_DISPLAY_SAMPLES: usize = 5;

/// Below this many samples in `left_data` older history is backfilled.
pub const CACHE_LOW_WATER: usize = 5;

/// Three-segment window over one widget's loaded samples.
///
/// `left_data` and `display_data` are ascending; `right_data` is stored
/// newest-first, so `left ++ display ++ reverse(right)` is the full loaded
/// timeline in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidingSensorData {
    pub left_data: Vec<SensorData>,
    pub display_data: Vec<SensorData>,
    pub right_data: Vec<SensorData>,
    pub num_samples_displaying: usize,
    pub end_of_data: bool,
    pub has_new_data: bool,
    pub min_display_time: Option<i64>,
}

impl SlidingSensorData {
    /// Window produced by a `first-time` load. The cache arrives separately.
    pub fn from_first_load(
        display_data: Vec<SensorData>,
        cached: Vec<SensorData>,
        end_of_data: bool,
        min_display_time: Option<i64>,
    ) -> Self {
        let window = Self {
            left_data: cached,
            display_data,
            right_data: Vec::new(),
            num_samples_displaying: 0,
            end_of_data,
            has_new_data: false,
            min_display_time: None,
        }
        .settle();
        Self {
            min_display_time: min_display_time.or(window.min_display_time),
            ..window
        }
    }

    /// Rebuilds a window from an ascending timeline, showing `len` samples
    /// starting at `start`. Flags other than the derived ones are carried over.
    pub(crate) fn from_timeline(
        mut timeline: Vec<SensorData>,
        start: usize,
        len: usize,
        end_of_data: bool,
        has_new_data: bool,
    ) -> Self {
        let start = start.min(timeline.len());
        let end = (start + len).min(timeline.len());
        let mut right_data = timeline.split_off(end);
        right_data.reverse();
        let display_data = timeline.split_off(start);
        Self {
            left_data: timeline,
            display_data,
            right_data,
            num_samples_displaying: 0,
            end_of_data,
            has_new_data,
            min_display_time: None,
        }
        .settle()
    }

    /// Recomputes the derived fields after any segment changed.
    pub(crate) fn settle(mut self) -> Self {
        self.num_samples_displaying = count_non_gap(&self.display_data);
        self.min_display_time = self.display_data.first().map(|s| s.time);
        if self.right_data.is_empty() {
            self.has_new_data = false;
        }
        self
    }

    /// Full loaded timeline, oldest first.
    pub fn timeline(&self) -> impl Iterator<Item = &SensorData> {
        self.left_data
            .iter()
            .chain(self.display_data.iter())
            .chain(self.right_data.iter().rev())
    }

    pub(crate) fn into_timeline(self) -> Vec<SensorData> {
        let mut timeline = self.left_data;
        timeline.extend(self.display_data);
        timeline.extend(self.right_data.into_iter().rev());
        timeline
    }

    pub fn len(&self) -> usize {
        self.left_data.len() + self.display_data.len() + self.right_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn oldest_time(&self) -> Option<i64> {
        self.timeline().next().map(|s| s.time)
    }

    pub fn newest_time(&self) -> Option<i64> {
        self.right_data
            .first()
            .or_else(|| self.display_data.last())
            .or_else(|| self.left_data.last())
            .map(|s| s.time)
    }

    /// True when older history should be requested to keep `left_data` stocked.
    pub fn is_cache_starved(&self) -> bool {
        !self.end_of_data && self.left_data.len() < CACHE_LOW_WATER
    }
}
