// Window operations - pan, zoom, navigate, live append and cache extend
//
// Every operation consumes the window and returns the next one. Segment
// moves across the display/right boundary reverse order, since `right_data`
// is stored newest-first.
use super::sample::SensorData;
use super::widget::WidgetCategory;
use super::window::{SlidingSensorData, MIN_DISPLAY_SAMPLES};
use serde::{Deserialize, Serialize};

/// Which half of the display segment a zoom was anchored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoomPivot {
    Left,
    Center,
    Right,
}

impl ZoomPivot {
    /// Classifies a display index. The middle one or two indices count as
    /// centered; indices past the end count as the last one.
    pub fn from_index(index: usize, len: usize) -> Self {
        let index = index.min(len.saturating_sub(1));
        let doubled = index.saturating_mul(2).saturating_add(1);
        if doubled.abs_diff(len) <= 1 {
            ZoomPivot::Center
        } else if doubled < len {
            ZoomPivot::Left
        } else {
            ZoomPivot::Right
        }
    }
}

/// A user interaction over a widget window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum WindowAction {
    /// `amount < 0` zooms in, `amount > 0` zooms out. Without a pivot the
    /// zoom is centered.
    Zoom {
        #[serde(default)]
        pivot_index: Option<usize>,
        amount: i64,
    },
    ZoomToRange {
        start_index: usize,
        end_index: usize,
    },
    /// `amount < 0` pans toward newer data, `amount > 0` toward older.
    Pan { amount: i64 },
    QuickNavigate { offset: usize },
    QuickNavigateToTime { time: i64 },
    NavigateToNewData,
}

impl SlidingSensorData {
    pub fn apply(self, action: &WindowAction) -> Self {
        match *action {
            WindowAction::Zoom {
                pivot_index,
                amount,
            } => {
                let pivot = pivot_index
                    .map(|i| ZoomPivot::from_index(i, self.display_data.len()))
                    .unwrap_or(ZoomPivot::Center);
                self.zoom(pivot, amount)
            }
            WindowAction::ZoomToRange {
                start_index,
                end_index,
            } => self.zoom_to_range(start_index, end_index),
            WindowAction::Pan { amount } => self.pan(amount),
            WindowAction::QuickNavigate { offset } => self.quick_navigate(offset),
            WindowAction::QuickNavigateToTime { time } => self.quick_navigate_to_time(time),
            WindowAction::NavigateToNewData => self.navigate_to_new_data(),
        }
    }

    pub fn zoom(self, pivot: ZoomPivot, amount: i64) -> Self {
        match amount.cmp(&0) {
            std::cmp::Ordering::Less => self.zoom_in(pivot, amount.unsigned_abs() as usize),
            std::cmp::Ordering::Greater => self.zoom_out(pivot, amount as usize),
            std::cmp::Ordering::Equal => self,
        }
    }

    fn zoom_in(mut self, pivot: ZoomPivot, amount: usize) -> Self {
        let amount = amount.min(
            self.display_data
                .len()
                .saturating_sub(MIN_DISPLAY_SAMPLES),
        );
        if amount == 0 {
            return self;
        }

        let (head, tail) = match pivot {
            ZoomPivot::Left => (amount, 0),
            ZoomPivot::Right => (0, amount),
            ZoomPivot::Center => (amount / 2, amount - amount / 2),
        };
        self.trim_head(head);
        self.trim_tail(tail);
        self.settle()
    }

    fn zoom_out(mut self, pivot: ZoomPivot, amount: usize) -> Self {
        match pivot {
            ZoomPivot::Center => {
                let tail_share = amount - amount / 2;
                let grown_tail = self.grow_tail(tail_share);
                let grown_head = self.grow_head(amount / 2 + (tail_share - grown_tail));
                let remaining = amount - grown_tail - grown_head;
                if remaining > 0 {
                    self.grow_tail(remaining);
                }
            }
            ZoomPivot::Left | ZoomPivot::Right => {
                let grown_tail = self.grow_tail(amount);
                self.grow_head(amount - grown_tail);
            }
        }
        self.settle()
    }

    /// Zooms onto a selected index range of the display segment. Ranges
    /// narrower than the minimum are widened from the neighbouring data; if
    /// not enough data exists the window is returned unchanged.
    pub fn zoom_to_range(self, start_index: usize, end_index: usize) -> Self {
        let len = self.display_data.len();
        if len == 0 {
            return self;
        }

        let end = start_index.max(end_index).min(len - 1);
        let start = start_index.min(end_index).min(end);
        let selected = end - start + 1;

        let (left_take, right_take) = if selected >= MIN_DISPLAY_SAMPLES {
            (0, 0)
        } else {
            let deficit = MIN_DISPLAY_SAMPLES - selected;
            let available_left = self.left_data.len() + start;
            let available_right = self.right_data.len() + (len - 1 - end);
            if available_left + available_right < deficit {
                return self;
            }
            let left_take = (deficit / 2).min(available_left);
            let right_take = (deficit - left_take).min(available_right);
            let left_take = (deficit - right_take).min(available_left);
            (left_take, right_take)
        };

        let abs_start = self.left_data.len() + start - left_take;
        let new_len = selected + left_take + right_take;
        let (end_of_data, has_new_data) = (self.end_of_data, self.has_new_data);
        Self::from_timeline(
            self.into_timeline(),
            abs_start,
            new_len,
            end_of_data,
            has_new_data,
        )
    }

    /// Shifts the display segment by up to `|amount|` samples, keeping its length.
    pub fn pan(mut self, amount: i64) -> Self {
        match amount.cmp(&0) {
            std::cmp::Ordering::Less => {
                let moved = self.grow_tail(amount.unsigned_abs() as usize);
                self.trim_head(moved);
            }
            std::cmp::Ordering::Greater => {
                let moved = self.grow_head(amount as usize);
                self.trim_tail(moved);
            }
            std::cmp::Ordering::Equal => return self,
        }
        self.settle()
    }

    /// Re-centers the display on the sample `offset` positions back from the
    /// newest one, keeping the display length.
    pub fn quick_navigate(self, offset: usize) -> Self {
        let total = self.len();
        if total == 0 {
            return self;
        }

        let width = if self.display_data.is_empty() {
            MIN_DISPLAY_SAMPLES.min(total)
        } else {
            self.display_data.len()
        };
        let target = total - 1 - offset.min(total - 1);
        let start = target.saturating_sub(width / 2).min(total - width);

        // Showing any of `right_data` means the new samples have been seen
        let seen_edge = self.left_data.len() + self.display_data.len();
        let has_new_data = self.has_new_data && start + width <= seen_edge;
        let end_of_data = self.end_of_data;
        Self::from_timeline(
            self.into_timeline(),
            start,
            width,
            end_of_data,
            has_new_data,
        )
    }

    /// Quick-navigates to the loaded sample nearest to `time`.
    pub fn quick_navigate_to_time(self, time: i64) -> Self {
        let times: Vec<i64> = self.timeline().map(|s| s.time).collect();
        if times.is_empty() {
            return self;
        }

        let after = times.partition_point(|&t| t < time);
        let index = match after {
            0 => 0,
            i if i == times.len() => i - 1,
            i if time - times[i - 1] <= times[i] - time => i - 1,
            i => i,
        };
        self.quick_navigate(times.len() - 1 - index)
    }

    /// Merges samples from a `new-only` poll.
    ///
    /// Single-value widgets always show just the latest samples. Multi-value
    /// widgets slide forward when the user is at the live edge; otherwise the
    /// samples queue up in `right_data` and `has_new_data` is raised.
    pub fn append_live(mut self, mut new_samples: Vec<SensorData>, category: WidgetCategory) -> Self {
        if let Some(newest) = self.newest_time() {
            new_samples.retain(|s| s.time > newest);
        }
        if new_samples.is_empty() {
            return self;
        }
        new_samples.sort_by_key(|s| s.time);

        match category {
            WidgetCategory::SingleValue => {
                self.left_data.append(&mut self.display_data);
                self.left_data.extend(self.right_data.drain(..).rev());
                self.display_data = new_samples;
                self.has_new_data = false;
            }
            WidgetCategory::MultiValue if self.right_data.is_empty() => {
                let previous_len = self.display_data.len();
                self.display_data.extend(new_samples);
                if previous_len > 0 {
                    let keep = previous_len.max(MIN_DISPLAY_SAMPLES);
                    let excess = self.display_data.len().saturating_sub(keep);
                    self.trim_head(excess);
                }
            }
            WidgetCategory::MultiValue => {
                new_samples.reverse();
                new_samples.append(&mut self.right_data);
                self.right_data = new_samples;
                self.has_new_data = true;
            }
        }
        self.settle()
    }

    /// Prepends older history from a `cache-only` fetch.
    pub fn extend_cache(mut self, mut older: Vec<SensorData>, end_of_data: bool) -> Self {
        if let Some(oldest) = self.oldest_time() {
            older.retain(|s| s.time < oldest);
        }
        older.sort_by_key(|s| s.time);
        older.append(&mut self.left_data);
        self.left_data = older;
        self.end_of_data |= end_of_data;
        self.settle()
    }

    /// Jumps to the live edge, showing the newest `display_data.len()` samples.
    pub fn navigate_to_new_data(mut self) -> Self {
        if self.right_data.is_empty() {
            self.has_new_data = false;
            return self.settle();
        }

        let width = self.display_data.len();
        let mut combined = std::mem::take(&mut self.display_data);
        combined.extend(self.right_data.drain(..).rev());
        let keep = if width == 0 {
            combined.len()
        } else {
            width.min(combined.len())
        };
        self.display_data = combined.split_off(combined.len() - keep);
        self.left_data.append(&mut combined);
        self.has_new_data = false;
        self.settle()
    }

    fn trim_head(&mut self, count: usize) {
        let count = count.min(self.display_data.len());
        self.left_data.extend(self.display_data.drain(..count));
    }

    fn trim_tail(&mut self, count: usize) {
        let at = self.display_data.len() - count.min(self.display_data.len());
        let moved = self.display_data.split_off(at);
        self.right_data.extend(moved.into_iter().rev());
    }

    fn grow_head(&mut self, count: usize) -> usize {
        let count = count.min(self.left_data.len());
        let moved = self.left_data.split_off(self.left_data.len() - count);
        self.display_data.splice(0..0, moved);
        count
    }

    fn grow_tail(&mut self, count: usize) -> usize {
        let count = count.min(self.right_data.len());
        if count > 0 {
            let moved = self.right_data.split_off(self.right_data.len() - count);
            self.display_data.extend(moved.into_iter().rev());
            self.has_new_data = false;
        }
        count
    }
}
