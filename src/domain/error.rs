use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("widget {0} not found")]
    WidgetNotFound(String),

    #[error("widget {widget} monitors at most {max} sensors, got {requested}")]
    SensorLimitExceeded {
        widget: String,
        max: usize,
        requested: usize,
    },
}
