// Infrastructure layer - External dependencies and adapters
pub mod chunked_json;
pub mod config;
pub mod http_dashboard_repository;
pub mod http_response;
pub mod http_sensor_source;
