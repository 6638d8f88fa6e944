// HTTP dashboard persistence implementation
use crate::application::dashboard_repository::{DashboardRepository, PersistenceError};
use crate::domain::dashboard::DashboardRecord;
use crate::infrastructure::config::{prepare_path, PersistenceSettings};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct HttpDashboardRepository {
    client: reqwest::Client,
    base_url: String,
    settings: PersistenceSettings,
}

impl HttpDashboardRepository {
    pub fn new(settings: PersistenceSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            settings,
        }
    }

    fn url(&self, template: &str, machinery_id: &str, name: Option<&str>) -> String {
        let mut vars = HashMap::new();
        vars.insert("machinery", machinery_id);
        if let Some(name) = name {
            vars.insert("name", name);
        }
        format!("{}{}", self.base_url, prepare_path(template, &vars))
    }

    async fn fetch_record(&self, url: &str, name: &str) -> Result<DashboardRecord, PersistenceError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to dashboard store")?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(PersistenceError::NotFound(name.to_string())),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow::anyhow!("Dashboard load failed with status {}: {}", status, body).into())
            }
            _ => Ok(response
                .json::<DashboardRecord>()
                .await
                .context("Failed to parse dashboard record")?),
        }
    }
}

/// Maps a write response onto the persistence error taxonomy.
async fn check_write(response: reqwest::Response, name: &str) -> Result<(), PersistenceError> {
    match response.status() {
        StatusCode::NOT_FOUND => Err(PersistenceError::NotFound(name.to_string())),
        StatusCode::CONFLICT => Err(PersistenceError::Conflict(name.to_string())),
        status if !status.is_success() => {
            let body = response.text().await.unwrap_or_default();
            Err(anyhow::anyhow!("Dashboard write failed with status {}: {}", status, body).into())
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl DashboardRepository for HttpDashboardRepository {
    async fn load_dashboard(
        &self,
        machinery_id: &str,
        name: &str,
    ) -> Result<DashboardRecord, PersistenceError> {
        let url = self.url(&self.settings.dashboard_path, machinery_id, Some(name));
        self.fetch_record(&url, name).await
    }

    async fn load_default_dashboard(
        &self,
        machinery_id: &str,
    ) -> Result<DashboardRecord, PersistenceError> {
        let url = self.url(&self.settings.default_dashboard_path, machinery_id, None);
        self.fetch_record(&url, "default").await
    }

    async fn save_dashboard(&self, record: &DashboardRecord) -> Result<(), PersistenceError> {
        let url = self.url(
            &self.settings.dashboard_path,
            &record.machinery_uid,
            Some(&record.name),
        );
        tracing::debug!("Saving dashboard {} to {}", record.name, url);

        let response = self
            .client
            .put(&url)
            .json(record)
            .send()
            .await
            .context("Failed to send save request to dashboard store")?;
        check_write(response, &record.name).await
    }

    async fn save_as_dashboard(&self, record: &DashboardRecord) -> Result<(), PersistenceError> {
        let url = self.url(&self.settings.collection_path, &record.machinery_uid, None);
        tracing::debug!("Saving dashboard as {} to {}", record.name, url);

        let response = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .context("Failed to send save-as request to dashboard store")?;
        check_write(response, &record.name).await
    }
}
