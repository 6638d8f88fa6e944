// Application error taxonomy
use crate::application::dashboard_repository::PersistenceError;
use crate::application::sensor_data_source::RequestType;
use crate::domain::error::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{request_type:?} sensor data request failed: {source}")]
pub struct FetchError {
    pub request_type: RequestType,
    #[source]
    pub source: anyhow::Error,
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("dashboard {0} does not exist")]
    DashboardNotFound(String),

    #[error("a dashboard named {0} already exists")]
    NameTaken(String),

    #[error("dashboard persistence failed: {0:#}")]
    Persistence(anyhow::Error),
}

impl From<PersistenceError> for DashboardError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(name) => DashboardError::DashboardNotFound(name),
            PersistenceError::Conflict(name) => DashboardError::NameTaken(name),
            PersistenceError::Other(err) => DashboardError::Persistence(err),
        }
    }
}
