// Fetch orchestrator - turns window needs into first-time / cache-only / new-only requests
use crate::application::error::FetchError;
use crate::application::sensor_data_source::{
    SensorDataRequest, SensorDataResponse, SensorDataSource,
};
use crate::domain::widget::{SensorsMonitoring, WidgetCategory};
use crate::domain::window::SlidingSensorData;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Outcome of a `first-time` load.
///
/// The first-time response carries the display page only; older history is
/// requested by a follow-up `cache-only` fetch bounded by the oldest loaded
/// sample, already in flight when this value is returned.
pub struct InitialLoad {
    pub window: SlidingSensorData,
    pub cache: Option<JoinHandle<Result<SensorDataResponse, FetchError>>>,
}

#[derive(Clone)]
pub struct FetchOrchestrator {
    source: Arc<dyn SensorDataSource>,
}

impl FetchOrchestrator {
    pub fn new(source: Arc<dyn SensorDataSource>) -> Self {
        Self { source }
    }

    pub async fn load_initial(
        &self,
        monitoring: &SensorsMonitoring,
        category: WidgetCategory,
    ) -> Result<InitialLoad, FetchError> {
        let response = self
            .fetch(SensorDataRequest::first_time(monitoring, category))
            .await?;

        let window = SlidingSensorData::from_first_load(
            response.display_sensor_data,
            response.cached_sensor_data,
            response.end_of_data,
            response.min_display_time,
        );

        let cache = match window.oldest_time() {
            Some(boundary) if !window.end_of_data => {
                let this = self.clone();
                let request = SensorDataRequest::cache_only(monitoring, category, boundary);
                Some(tokio::spawn(async move { this.fetch(request).await }))
            }
            _ => None,
        };

        Ok(InitialLoad { window, cache })
    }

    /// History older than `before`, merged with `extend_cache`.
    pub async fn fetch_older(
        &self,
        monitoring: &SensorsMonitoring,
        category: WidgetCategory,
        before: i64,
    ) -> Result<SensorDataResponse, FetchError> {
        self.fetch(SensorDataRequest::cache_only(monitoring, category, before))
            .await
    }

    /// Live-tail samples newer than `after`, merged with `append_live`.
    pub async fn fetch_newer(
        &self,
        monitoring: &SensorsMonitoring,
        category: WidgetCategory,
        after: i64,
    ) -> Result<SensorDataResponse, FetchError> {
        self.fetch(SensorDataRequest::new_only(monitoring, category, after))
            .await
    }

    async fn fetch(&self, request: SensorDataRequest) -> Result<SensorDataResponse, FetchError> {
        tracing::debug!(
            "Dispatching {:?} sensor data request (cache max {:?}, new min {:?})",
            request.request_type,
            request.cache_data_request_max_time,
            request.new_data_request_min_time
        );

        self.source
            .fetch(&request)
            .await
            .map_err(|source| FetchError {
                request_type: request.request_type,
                source,
            })
    }
}

/// Time to request older history before, if the window needs a backfill.
///
/// Nothing is requested while another backfill is in flight, once the source
/// reported the end of its data, or while `left_data` is still stocked.
pub fn backfill_boundary(window: &SlidingSensorData, cache_loading: bool) -> Option<i64> {
    if cache_loading || !window.is_cache_starved() {
        return None;
    }
    window.oldest_time()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::sensor_data_source::RequestType;
    use crate::domain::sample::SensorData;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves a fixed timeline and records every request it receives.
    pub(crate) struct TimelineSource {
        pub timeline: Mutex<Vec<SensorData>>,
        pub page: usize,
        pub requests: Mutex<Vec<SensorDataRequest>>,
        pub fail: bool,
    }

    impl TimelineSource {
        pub(crate) fn new(times: std::ops::RangeInclusive<i64>, page: usize) -> Self {
            Self {
                timeline: Mutex::new(
                    times
                        .map(|t| SensorData::new(t).with_value("temp", Some(t as f64)))
                        .collect(),
                ),
                page,
                requests: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(1..=0, 0)
            }
        }

        pub(crate) fn request_types(&self) -> Vec<RequestType> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.request_type)
                .collect()
        }

        pub(crate) fn push(&self, samples: Vec<SensorData>) {
            self.timeline.lock().unwrap().extend(samples);
        }
    }

    #[async_trait]
    impl SensorDataSource for TimelineSource {
        async fn fetch(&self, request: &SensorDataRequest) -> anyhow::Result<SensorDataResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                anyhow::bail!("sensor service unavailable");
            }

            let timeline = self.timeline.lock().unwrap().clone();
            let mut response = SensorDataResponse {
                request_type: Some(request.request_type),
                ..Default::default()
            };
            match request.request_type {
                RequestType::FirstTime => {
                    let start = timeline.len().saturating_sub(self.page);
                    response.display_sensor_data = timeline[start..].to_vec();
                    response.end_of_data = start == 0;
                }
                RequestType::CacheOnly => {
                    let before = request.cache_data_request_max_time.unwrap_or(i64::MAX);
                    let older: Vec<SensorData> =
                        timeline.into_iter().filter(|s| s.time < before).collect();
                    let start = older.len().saturating_sub(self.page);
                    response.end_of_data = start == 0;
                    response.cached_sensor_data = older[start..].to_vec();
                }
                RequestType::NewOnly => {
                    let after = request.new_data_request_min_time.unwrap_or(i64::MIN);
                    response.new_sensor_data =
                        timeline.into_iter().filter(|s| s.time > after).collect();
                }
            }
            response.num_sensor_data = response.display_sensor_data.len();
            Ok(response)
        }
    }

    #[tokio::test]
    async fn test_first_time_load_prewarms_cache() {
        let source = Arc::new(TimelineSource::new(1..=50, 10));
        let orchestrator = FetchOrchestrator::new(source.clone());

        let load = orchestrator
            .load_initial(&SensorsMonitoring::default(), WidgetCategory::MultiValue)
            .await
            .unwrap();
        assert_eq!(load.window.display_data.len(), 10);
        assert!(load.window.left_data.is_empty());

        let cache = load.cache.expect("cache fetch should be in flight");
        let response = cache.await.unwrap().unwrap();
        assert_eq!(response.cached_sensor_data.len(), 10);
        assert_eq!(response.cached_sensor_data.last().map(|s| s.time), Some(40));

        let requests = source.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].request_type, RequestType::CacheOnly);
        assert_eq!(requests[1].cache_data_request_max_time, Some(41));
    }

    #[tokio::test]
    async fn test_first_time_load_skips_cache_at_end_of_data() {
        let source = Arc::new(TimelineSource::new(1..=8, 10));
        let orchestrator = FetchOrchestrator::new(source.clone());

        let load = orchestrator
            .load_initial(&SensorsMonitoring::default(), WidgetCategory::MultiValue)
            .await
            .unwrap();
        assert!(load.window.end_of_data);
        assert!(load.cache.is_none());
        assert_eq!(source.request_types(), vec![RequestType::FirstTime]);
    }

    #[tokio::test]
    async fn test_fetch_failure_carries_request_type() {
        let orchestrator = FetchOrchestrator::new(Arc::new(TimelineSource::failing()));
        let err = orchestrator
            .fetch_newer(&SensorsMonitoring::default(), WidgetCategory::SingleValue, 0)
            .await
            .err()
            .unwrap();
        assert_eq!(err.request_type, RequestType::NewOnly);
    }

    #[test]
    fn test_backfill_boundary_gating() {
        let mut window = SlidingSensorData::from_first_load(
            (10..=20).map(SensorData::new).collect(),
            Vec::new(),
            false,
            None,
        );
        assert_eq!(backfill_boundary(&window, false), Some(10));
        assert_eq!(backfill_boundary(&window, true), None);

        window.end_of_data = true;
        assert_eq!(backfill_boundary(&window, false), None);
    }
}
