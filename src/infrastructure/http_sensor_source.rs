// HTTP sensor data source implementation
use crate::application::sensor_data_source::{
    SensorDataRequest, SensorDataResponse, SensorDataSource,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpSensorDataSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSensorDataSource {
    pub fn new(base_url: &str, data_path: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build sensor data HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), data_path),
        })
    }
}

#[async_trait]
impl SensorDataSource for HttpSensorDataSource {
    async fn fetch(&self, request: &SensorDataRequest) -> Result<SensorDataResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .context("Failed to send request to sensor data service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Sensor data request failed with status {}: {}", status, body);
        }

        let data = response
            .json::<SensorDataResponse>()
            .await
            .context("Failed to parse sensor data response")?;

        tracing::debug!(
            "Sensor data {:?}: {} display, {} cached, {} new, end of data {}",
            request.request_type,
            data.display_sensor_data.len(),
            data.cached_sensor_data.len(),
            data.new_sensor_data.len(),
            data.end_of_data
        );

        Ok(data)
    }
}
