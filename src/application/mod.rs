// Application layer - use cases and the seams to remote services
pub mod dashboard_repository;
pub mod dashboard_service;
pub mod error;
pub mod fetch_orchestrator;
pub mod sensor_data_source;
