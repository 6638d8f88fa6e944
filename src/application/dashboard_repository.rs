// Repository trait for dashboard persistence
use crate::domain::dashboard::DashboardRecord;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The named dashboard does not exist (404)
    #[error("dashboard {0} does not exist")]
    NotFound(String),

    /// A dashboard with that name already exists (409)
    #[error("a dashboard named {0} already exists")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn load_dashboard(
        &self,
        machinery_id: &str,
        name: &str,
    ) -> Result<DashboardRecord, PersistenceError>;

    async fn load_default_dashboard(
        &self,
        machinery_id: &str,
    ) -> Result<DashboardRecord, PersistenceError>;

    /// Overwrite an existing dashboard
    async fn save_dashboard(&self, record: &DashboardRecord) -> Result<(), PersistenceError>;

    /// Create a dashboard under a new name
    async fn save_as_dashboard(&self, record: &DashboardRecord) -> Result<(), PersistenceError>;
}
