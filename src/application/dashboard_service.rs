// Dashboard service - one dashboard session: window operations, fetches and merges
use crate::application::dashboard_repository::{DashboardRepository, PersistenceError};
use crate::application::error::DashboardError;
use crate::application::fetch_orchestrator::{backfill_boundary, FetchOrchestrator, InitialLoad};
use crate::application::sensor_data_source::SensorDataResponse;
use crate::domain::dashboard::{
    Dashboard, DashboardRecord, DashboardSize, WidgetDefaults, WidgetModification,
};
use crate::domain::error::DomainError;
use crate::domain::widget::{GridWidget, LoadState, SensorsMonitoring, WidgetCategory};
use crate::domain::window_ops::WindowAction;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 256;

/// Change notifications pushed to connected front ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum DashboardEvent {
    DashboardLoaded { name: String },
    DashboardChanged { num_unsaved_changes: u32 },
    DashboardSaved { name: String },
    WidgetUpdated { widget_id: String },
    WidgetRemoved { widget_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveOutcome {
    Saved,
    /// The dashboard was never stored under its current name.
    SaveAsRequired,
}

/// Snapshot of what a fetch needs, taken under the lock.
struct FetchTarget {
    epoch: u64,
    id: String,
    generation: u64,
    monitoring: SensorsMonitoring,
    category: WidgetCategory,
}

#[derive(Clone)]
pub struct DashboardService {
    machinery_id: String,
    orchestrator: FetchOrchestrator,
    repository: Arc<dyn DashboardRepository>,
    state: Arc<RwLock<Dashboard>>,
    events: broadcast::Sender<DashboardEvent>,
}

impl DashboardService {
    pub fn new(
        machinery_id: String,
        orchestrator: FetchOrchestrator,
        repository: Arc<dyn DashboardRepository>,
        size: DashboardSize,
        defaults: WidgetDefaults,
    ) -> Self {
        let dashboard = Dashboard::new("default".to_string(), machinery_id.clone(), size, defaults);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            machinery_id,
            orchestrator,
            repository,
            state: Arc::new(RwLock::new(dashboard)),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Dashboard {
        self.state.read().await.clone()
    }

    pub async fn widget(&self, id: &str) -> Result<GridWidget, DashboardError> {
        self.state
            .read()
            .await
            .widget(id)
            .cloned()
            .ok_or_else(|| DomainError::WidgetNotFound(id.to_string()).into())
    }

    /// Loads a named dashboard, or the machinery's default one, and runs a
    /// first-time fetch for every configured widget.
    pub async fn load(&self, name: Option<&str>) -> Result<Dashboard, DashboardError> {
        let record = match name {
            Some(name) => self.repository.load_dashboard(&self.machinery_id, name).await?,
            None => self.repository.load_default_dashboard(&self.machinery_id).await?,
        };

        let ids: Vec<String> = {
            let mut guard = self.state.write().await;
            let (defaults, epoch) = (guard.defaults, guard.epoch + 1);
            *guard = Dashboard::from_record(record, defaults);
            guard.epoch = epoch;
            tracing::info!(
                "Loaded dashboard {} with {} widgets",
                guard.name,
                guard.widgets.len()
            );
            self.emit(DashboardEvent::DashboardLoaded {
                name: guard.name.clone(),
            });
            guard.widgets.iter().map(|w| w.id.clone()).collect()
        };

        join_all(ids.iter().map(|id| self.refresh(id))).await;
        Ok(self.snapshot().await)
    }

    pub async fn save(&self) -> Result<SaveOutcome, DashboardError> {
        let (record, pending) = self.pending_record().await;
        match self.repository.save_dashboard(&record).await {
            Ok(()) => {
                self.mark_saved(None, pending).await;
                Ok(SaveOutcome::Saved)
            }
            Err(PersistenceError::NotFound(name)) => {
                tracing::info!("Dashboard {} does not exist yet, save-as required", name);
                Ok(SaveOutcome::SaveAsRequired)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Stores the dashboard under a new name. On a name collision the
    /// in-memory dashboard is left untouched.
    pub async fn save_as(&self, name: &str) -> Result<(), DashboardError> {
        let (mut record, pending) = self.pending_record().await;
        record.name = name.to_string();
        record.is_default = false;

        self.repository.save_as_dashboard(&record).await?;
        self.mark_saved(Some(name), pending).await;
        Ok(())
    }

    /// The record to persist and the number of changes it covers.
    async fn pending_record(&self) -> (DashboardRecord, u32) {
        let guard = self.state.read().await;
        (guard.to_record(), guard.num_unsaved_changes)
    }

    async fn mark_saved(&self, rename: Option<&str>, saved_changes: u32) {
        let mut guard = self.state.write().await;
        let mut dashboard = std::mem::take(&mut *guard).mark_saved(Utc::now(), saved_changes);
        if let Some(name) = rename {
            dashboard.name = name.to_string();
            dashboard.is_default = false;
        }
        self.emit(DashboardEvent::DashboardSaved {
            name: dashboard.name.clone(),
        });
        *guard = dashboard;
    }

    /// Applies a structural change. Reconfigured widgets reload from scratch.
    pub async fn modify(&self, modification: WidgetModification) -> Result<Dashboard, DashboardError> {
        let reload = match &modification {
            WidgetModification::Configure { id, .. } => Some(id.clone()),
            _ => None,
        };
        let removed = match &modification {
            WidgetModification::Delete { id } => Some(id.clone()),
            _ => None,
        };

        {
            let mut guard = self.state.write().await;
            let next = guard.clone().apply(modification)?;
            *guard = next;
            self.emit(DashboardEvent::DashboardChanged {
                num_unsaved_changes: guard.num_unsaved_changes,
            });
        }

        if let Some(id) = removed {
            self.emit(DashboardEvent::WidgetRemoved { widget_id: id });
        }
        if let Some(id) = reload {
            self.refresh(&id).await?;
        }
        Ok(self.snapshot().await)
    }

    /// Runs a first-time load for a widget followed by its cache pre-warm.
    ///
    /// Fetch failures do not error; they leave the widget in the error state.
    pub async fn refresh(&self, id: &str) -> Result<GridWidget, DashboardError> {
        let target = {
            let mut guard = self.state.write().await;
            let index = guard
                .widget_index(id)
                .ok_or_else(|| DomainError::WidgetNotFound(id.to_string()))?;
            if guard.widgets[index].sensors_monitoring.is_empty() {
                return Ok(guard.widgets[index].clone());
            }
            let dashboard = std::mem::take(&mut *guard).map_widget(index, GridWidget::begin_first_time);
            *guard = dashboard;
            Self::target(guard.epoch, &guard.widgets[index])
        };
        self.emit_widget(id);

        match self
            .orchestrator
            .load_initial(&target.monitoring, target.category)
            .await
        {
            Ok(InitialLoad { window, cache }) => {
                let has_cache = cache.is_some();
                self.merge(&target, move |w| {
                    let w = w.finish_first_time(window);
                    if has_cache { w.begin_cache_load() } else { w }
                })
                .await;

                if let Some(cache) = cache {
                    let result = match cache.await {
                        Ok(result) => result.map_err(anyhow::Error::from),
                        Err(join_err) => Err(anyhow::Error::from(join_err)),
                    };
                    self.merge_backfill(&target, result).await;
                }
            }
            Err(err) => {
                tracing::warn!("First-time load for widget {} failed: {}", id, err);
                self.merge(&target, GridWidget::fail_first_time).await;
            }
        }

        self.widget(id).await
    }

    /// Applies a pan/zoom/navigate action, then backfills older history if
    /// the window ran low and no backfill is already running.
    pub async fn apply_window_action(
        &self,
        id: &str,
        action: WindowAction,
    ) -> Result<GridWidget, DashboardError> {
        let backfill = {
            let mut guard = self.state.write().await;
            let index = guard
                .widget_index(id)
                .ok_or_else(|| DomainError::WidgetNotFound(id.to_string()))?;
            let dashboard = std::mem::take(&mut *guard).map_widget(index, |w| w.apply_window(&action));
            *guard = dashboard;

            let widget = &guard.widgets[index];
            let boundary = match widget.load_state {
                LoadState::Ready => backfill_boundary(&widget.sensor_data, widget.cache_loading),
                _ => None,
            };
            match boundary {
                Some(before) => {
                    let target = Self::target(guard.epoch, widget);
                    let dashboard = std::mem::take(&mut *guard).map_widget(index, GridWidget::begin_cache_load);
                    *guard = dashboard;
                    Some((target, before))
                }
                None => None,
            }
        };
        self.emit_widget(id);

        if let Some((target, before)) = backfill {
            tracing::debug!("Backfilling widget {} before {}", id, before);
            let result = self
                .orchestrator
                .fetch_older(&target.monitoring, target.category, before)
                .await
                .map_err(anyhow::Error::from);
            self.merge_backfill(&target, result).await;
        }

        self.widget(id).await
    }

    /// Polls the live tail of every ready widget once.
    pub async fn poll_new_data(&self) {
        let targets: Vec<(FetchTarget, i64)> = {
            let guard = self.state.read().await;
            guard
                .widgets
                .iter()
                .filter(|w| w.load_state == LoadState::Ready && !w.sensors_monitoring.is_empty())
                .map(|w| {
                    let after = w
                        .sensor_data
                        .newest_time()
                        .unwrap_or_else(|| Utc::now().timestamp_millis());
                    (Self::target(guard.epoch, w), after)
                })
                .collect()
        };

        join_all(targets.into_iter().map(|(target, after)| async move {
            match self
                .orchestrator
                .fetch_newer(&target.monitoring, target.category, after)
                .await
            {
                Ok(response) => {
                    if !response.new_sensor_data.is_empty() {
                        self.merge(&target, move |w| w.append_live(response.new_sensor_data))
                            .await;
                    }
                }
                Err(err) => {
                    tracing::warn!("Live-tail poll for widget {} failed: {}", target.id, err);
                    self.merge(&target, GridWidget::flag_fetch_error).await;
                }
            }
        }))
        .await;
    }

    /// Spawns the periodic live-tail poller.
    pub fn spawn_live_tail(&self, period: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                this.poll_new_data().await;
            }
        })
    }

    async fn merge_backfill(&self, target: &FetchTarget, result: anyhow::Result<SensorDataResponse>) {
        match result {
            Ok(response) => {
                self.merge(target, move |w| {
                    w.finish_cache_load(response.cached_sensor_data, response.end_of_data)
                })
                .await;
            }
            Err(err) => {
                tracing::warn!("Cache fetch for widget {} failed: {:#}", target.id, err);
                self.merge(target, GridWidget::flag_fetch_error).await;
            }
        }
    }

    /// Applies `f` to the widget if it still exists and no newer load started.
    async fn merge(&self, target: &FetchTarget, f: impl FnOnce(GridWidget) -> GridWidget) -> bool {
        let mut guard = self.state.write().await;
        let index = match guard.widget_index(&target.id) {
            Some(index)
                if guard.epoch == target.epoch
                    && guard.widgets[index].generation == target.generation =>
            {
                index
            }
            _ => {
                tracing::debug!(
                    "Discarding stale fetch result for widget {} (epoch {}, generation {})",
                    target.id,
                    target.epoch,
                    target.generation
                );
                return false;
            }
        };
        let dashboard = std::mem::take(&mut *guard).map_widget(index, f);
        *guard = dashboard;
        drop(guard);

        self.emit_widget(&target.id);
        true
    }

    fn target(epoch: u64, widget: &GridWidget) -> FetchTarget {
        FetchTarget {
            epoch,
            id: widget.id.clone(),
            generation: widget.generation,
            monitoring: widget.sensors_monitoring.clone(),
            category: widget.category,
        }
    }

    fn emit_widget(&self, id: &str) {
        self.emit(DashboardEvent::WidgetUpdated {
            widget_id: id.to_string(),
        });
    }

    fn emit(&self, event: DashboardEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fetch_orchestrator::tests::TimelineSource;
    use crate::application::sensor_data_source::RequestType;
    use crate::domain::dashboard::{DashboardRecord, LayoutItem, WidgetRecord};
    use crate::domain::sample::SensorData;
    use crate::domain::widget::{HeadSensors, SensorSelection, WidgetType};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MemoryRepository {
        records: Mutex<HashMap<String, DashboardRecord>>,
    }

    impl MemoryRepository {
        fn with(records: Vec<DashboardRecord>) -> Self {
            Self {
                records: Mutex::new(records.into_iter().map(|r| (r.name.clone(), r)).collect()),
            }
        }
    }

    #[async_trait]
    impl DashboardRepository for MemoryRepository {
        async fn load_dashboard(
            &self,
            _machinery_id: &str,
            name: &str,
        ) -> Result<DashboardRecord, PersistenceError> {
            self.records
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| PersistenceError::NotFound(name.to_string()))
        }

        async fn load_default_dashboard(
            &self,
            _machinery_id: &str,
        ) -> Result<DashboardRecord, PersistenceError> {
            self.records
                .lock()
                .unwrap()
                .values()
                .find(|r| r.is_default)
                .cloned()
                .ok_or_else(|| PersistenceError::NotFound("default".to_string()))
        }

        async fn save_dashboard(&self, record: &DashboardRecord) -> Result<(), PersistenceError> {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(&record.name) {
                Some(existing) => {
                    *existing = record.clone();
                    Ok(())
                }
                None => Err(PersistenceError::NotFound(record.name.clone())),
            }
        }

        async fn save_as_dashboard(&self, record: &DashboardRecord) -> Result<(), PersistenceError> {
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&record.name) {
                return Err(PersistenceError::Conflict(record.name.clone()));
            }
            records.insert(record.name.clone(), record.clone());
            Ok(())
        }
    }

    /// Holds `save_dashboard` until released.
    struct GatedRepository {
        inner: MemoryRepository,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DashboardRepository for GatedRepository {
        async fn load_dashboard(
            &self,
            machinery_id: &str,
            name: &str,
        ) -> Result<DashboardRecord, PersistenceError> {
            self.inner.load_dashboard(machinery_id, name).await
        }

        async fn load_default_dashboard(
            &self,
            machinery_id: &str,
        ) -> Result<DashboardRecord, PersistenceError> {
            self.inner.load_default_dashboard(machinery_id).await
        }

        async fn save_dashboard(&self, record: &DashboardRecord) -> Result<(), PersistenceError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.save_dashboard(record).await
        }

        async fn save_as_dashboard(&self, record: &DashboardRecord) -> Result<(), PersistenceError> {
            self.inner.save_as_dashboard(record).await
        }
    }

    fn monitoring() -> SensorsMonitoring {
        let mut monitoring = SensorsMonitoring::default();
        monitoring.sensors.insert(
            "temperature".to_string(),
            vec![HeadSensors {
                head_number: 1,
                sensor_names: vec![SensorSelection {
                    name: "temp".to_string(),
                    color: "#ff8800".to_string(),
                }],
            }],
        );
        monitoring
    }

    fn record(name: &str) -> DashboardRecord {
        DashboardRecord {
            name: name.to_string(),
            machinery_uid: "press-7".to_string(),
            timestamp: 0,
            is_default: true,
            size: DashboardSize::default(),
            widgets: vec![WidgetRecord {
                id: "w1".to_string(),
                name: "Temperatures".to_string(),
                category: WidgetCategory::MultiValue,
                widget_type: WidgetType::LineChart,
                max_sensors: 10,
                is_static: false,
                sensors_monitoring: monitoring(),
            }],
            layout: vec![LayoutItem {
                i: "w1".to_string(),
                x: 0,
                y: 0,
                w: 6,
                h: 4,
                is_static: false,
            }],
        }
    }

    fn service(source: Arc<TimelineSource>, repository: Arc<MemoryRepository>) -> DashboardService {
        DashboardService::new(
            "press-7".to_string(),
            FetchOrchestrator::new(source),
            repository,
            DashboardSize::default(),
            WidgetDefaults::default(),
        )
    }

    fn times(samples: &[SensorData]) -> Vec<i64> {
        samples.iter().map(|s| s.time).collect()
    }

    #[tokio::test]
    async fn test_load_runs_first_time_then_cache() {
        let source = Arc::new(TimelineSource::new(1..=100, 20));
        let service = service(source.clone(), Arc::new(MemoryRepository::with(vec![record("main")])));

        let dashboard = service.load(Some("main")).await.unwrap();
        let widget = &dashboard.widgets[0];
        assert_eq!(widget.load_state, LoadState::Ready);
        assert!(!widget.cache_loading);
        assert_eq!(times(&widget.sensor_data.display_data), (81..=100).collect::<Vec<_>>());
        assert_eq!(times(&widget.sensor_data.left_data), (61..=80).collect::<Vec<_>>());
        assert_eq!(widget.chart_props.y_axis_data_max, Some(100.0 + 39.0 * 0.2));
        assert_eq!(
            source.request_types(),
            vec![RequestType::FirstTime, RequestType::CacheOnly]
        );
    }

    #[tokio::test]
    async fn test_pan_backfills_starved_history() {
        let source = Arc::new(TimelineSource::new(1..=100, 10));
        let service = service(source.clone(), Arc::new(MemoryRepository::with(vec![record("main")])));
        service.load(None).await.unwrap();

        let widget = service
            .apply_window_action("w1", WindowAction::Pan { amount: 8 })
            .await
            .unwrap();
        assert_eq!(times(&widget.sensor_data.display_data), (83..=92).collect::<Vec<_>>());
        assert_eq!(times(&widget.sensor_data.left_data), (71..=82).collect::<Vec<_>>());
        assert!(!widget.cache_loading);

        let requests = source.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].request_type, RequestType::CacheOnly);
        assert_eq!(requests[2].cache_data_request_max_time, Some(81));
    }

    #[tokio::test]
    async fn test_no_backfill_after_end_of_data() {
        let source = Arc::new(TimelineSource::new(1..=15, 10));
        let service = service(source.clone(), Arc::new(MemoryRepository::with(vec![record("main")])));
        let dashboard = service.load(Some("main")).await.unwrap();
        assert!(dashboard.widgets[0].sensor_data.end_of_data);

        let widget = service
            .apply_window_action("w1", WindowAction::Pan { amount: 3 })
            .await
            .unwrap();
        assert_eq!(widget.sensor_data.left_data.len(), 2);
        assert_eq!(
            source.request_types(),
            vec![RequestType::FirstTime, RequestType::CacheOnly]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_sets_widget_error() {
        let service = service(
            Arc::new(TimelineSource::failing()),
            Arc::new(MemoryRepository::with(vec![record("main")])),
        );
        let dashboard = service.load(Some("main")).await.unwrap();
        let widget = &dashboard.widgets[0];
        assert_eq!(widget.load_state, LoadState::Error);
        assert!(widget.sensor_data_error);
    }

    #[tokio::test]
    async fn test_stale_results_are_discarded() {
        let source = Arc::new(TimelineSource::new(1..=100, 20));
        let service = service(source, Arc::new(MemoryRepository::with(vec![record("main")])));
        service.load(Some("main")).await.unwrap();

        let epoch = service.snapshot().await.epoch;
        let stale = DashboardService::target(epoch, &service.widget("w1").await.unwrap());
        service.refresh("w1").await.unwrap();
        assert!(!service.merge(&stale, GridWidget::fail_first_time).await);
        assert_eq!(service.widget("w1").await.unwrap().load_state, LoadState::Ready);

        service
            .modify(WidgetModification::Delete { id: "w1".to_string() })
            .await
            .unwrap();
        let current = FetchTarget { id: "w1".to_string(), ..stale };
        assert!(!service.merge(&current, GridWidget::fail_first_time).await);
    }

    #[tokio::test]
    async fn test_reload_discards_results_from_previous_load() {
        let source = Arc::new(TimelineSource::new(1..=100, 20));
        let service = service(source, Arc::new(MemoryRepository::with(vec![record("main")])));
        service.load(Some("main")).await.unwrap();

        let epoch = service.snapshot().await.epoch;
        let previous = DashboardService::target(epoch, &service.widget("w1").await.unwrap());
        service.load(Some("main")).await.unwrap();

        let reloaded = service.widget("w1").await.unwrap();
        assert_eq!(reloaded.generation, previous.generation);
        assert!(!service.merge(&previous, GridWidget::fail_first_time).await);
        assert_eq!(service.widget("w1").await.unwrap().load_state, LoadState::Ready);
    }

    #[tokio::test]
    async fn test_changes_during_save_stay_unsaved() {
        let repository = Arc::new(GatedRepository {
            inner: MemoryRepository::with(vec![record("main")]),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let service = DashboardService::new(
            "press-7".to_string(),
            FetchOrchestrator::new(Arc::new(TimelineSource::new(1..=30, 10))),
            repository.clone(),
            DashboardSize::default(),
            WidgetDefaults::default(),
        );
        service.load(Some("main")).await.unwrap();
        service
            .modify(WidgetModification::Rename {
                id: "w1".to_string(),
                name: "Oven".to_string(),
            })
            .await
            .unwrap();

        let saving = tokio::spawn({
            let service = service.clone();
            async move { service.save().await }
        });
        repository.entered.notified().await;
        service
            .modify(WidgetModification::Add {
                widget_type: WidgetType::Thermostat,
                name: None,
                position: None,
            })
            .await
            .unwrap();
        repository.release.notify_one();

        assert_eq!(saving.await.unwrap().unwrap(), SaveOutcome::Saved);
        let dashboard = service.snapshot().await;
        assert_eq!(dashboard.widgets.len(), 2);
        assert_eq!(dashboard.num_unsaved_changes, 1);
        assert!(dashboard.last_save.is_some());
        let persisted = repository.inner.records.lock().unwrap()["main"].clone();
        assert_eq!(persisted.widgets.len(), 1);
        assert_eq!(persisted.widgets[0].name, "Oven");
    }

    #[tokio::test]
    async fn test_live_tail_slides_window() {
        let source = Arc::new(TimelineSource::new(1..=100, 20));
        let service = service(source.clone(), Arc::new(MemoryRepository::with(vec![record("main")])));
        service.load(Some("main")).await.unwrap();

        source.push(
            (101..=103)
                .map(|t| SensorData::new(t).with_value("temp", Some(t as f64)))
                .collect(),
        );
        service.poll_new_data().await;

        let widget = service.widget("w1").await.unwrap();
        assert_eq!(times(&widget.sensor_data.display_data), (84..=103).collect::<Vec<_>>());
        let requests = source.requests.lock().unwrap().clone();
        assert_eq!(requests[2].request_type, RequestType::NewOnly);
        assert_eq!(requests[2].new_data_request_min_time, Some(100));
    }

    #[tokio::test]
    async fn test_save_and_save_as_outcomes() {
        let repository = Arc::new(MemoryRepository::with(vec![record("main")]));
        let service = service(Arc::new(TimelineSource::new(1..=30, 10)), repository.clone());

        // never stored under its initial name
        assert_eq!(service.save().await.unwrap(), SaveOutcome::SaveAsRequired);

        service.load(Some("main")).await.unwrap();
        service
            .modify(WidgetModification::Rename {
                id: "w1".to_string(),
                name: "Oven".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(service.save().await.unwrap(), SaveOutcome::Saved);
        assert_eq!(service.snapshot().await.num_unsaved_changes, 0);
        assert_eq!(repository.records.lock().unwrap()["main"].widgets[0].name, "Oven");

        let err = service.save_as("main").await.unwrap_err();
        assert!(matches!(err, DashboardError::NameTaken(_)));

        service.save_as("night shift").await.unwrap();
        let dashboard = service.snapshot().await;
        assert_eq!(dashboard.name, "night shift");
        assert!(dashboard.last_save.is_some());
        assert!(repository.records.lock().unwrap().contains_key("night shift"));
    }

    #[tokio::test]
    async fn test_configure_reloads_widget() {
        let source = Arc::new(TimelineSource::new(1..=30, 10));
        let service = service(source.clone(), Arc::new(MemoryRepository::default()));

        let dashboard = service
            .modify(WidgetModification::Add {
                widget_type: WidgetType::AreaChart,
                name: None,
                position: None,
            })
            .await
            .unwrap();
        let id = dashboard.widgets[0].id.clone();
        assert_eq!(dashboard.widgets[0].load_state, LoadState::Idle);
        assert!(source.request_types().is_empty());

        let mut events = service.subscribe();
        let dashboard = service
            .modify(WidgetModification::Configure {
                id: id.clone(),
                sensors_monitoring: monitoring(),
            })
            .await
            .unwrap();
        let widget = dashboard.widget(&id).unwrap();
        assert_eq!(widget.load_state, LoadState::Ready);
        assert_eq!(widget.sensor_data.display_data.len(), 10);
        assert_eq!(dashboard.num_unsaved_changes, 2);
        assert_eq!(
            events.recv().await.unwrap(),
            DashboardEvent::DashboardChanged { num_unsaved_changes: 2 }
        );
    }
}
