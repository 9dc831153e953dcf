//! Dashboard aggregation
//!
//! Builds the rendered dashboard view from three upstream APIs: country facts
//! (REST Countries), hourly weather (Open-Meteo) and exchange rates.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dw_common::Dashboard;
use dw_config::UpstreamConfig;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },

    #[error("no data for {0}")]
    Missing(String),
}

// ============================================================================
// View types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Feature values; unselected features are omitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewFeatures {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    pub target_currencies: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub country: String,
    pub iso_code: String,
    pub features: ViewFeatures,
    /// `YYYY-MM-DD HH:MM`, UTC
    pub last_retrieval: String,
}

/// HTTP status of each upstream; 503 when unreachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct UpstreamStatus {
    pub countries_api: u16,
    pub meteo_api: u16,
    pub currency_api: u16,
}

#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn render(&self, dashboard: &Dashboard) -> Result<DashboardView, AggregatorError>;

    async fn probe(&self) -> UpstreamStatus;
}

// ============================================================================
// Upstream response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct CountryInfo {
    #[serde(default)]
    capital: Vec<String>,
    #[serde(default)]
    latlng: Vec<f64>,
    #[serde(default)]
    population: u64,
    #[serde(default)]
    area: f64,
    #[serde(default)]
    currencies: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    hourly: HourlySeries,
}

#[derive(Debug, Default, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    temperature_2m: Vec<f64>,
    #[serde(default)]
    precipitation: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct Rates {
    #[serde(default)]
    rates: BTreeMap<String, f64>,
}

fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

// ============================================================================
// HTTP implementation
// ============================================================================

pub struct HttpAggregator {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpAggregator {
    pub fn new(config: UpstreamConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, AggregatorError> {
        debug!(url = %url, "Fetching upstream data");
        let request_error = |source| AggregatorError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.json().await.map_err(request_error)
    }

    async fn country(&self, iso_code: &str) -> Result<CountryInfo, AggregatorError> {
        let url = format!("{}/alpha/{}", self.config.countries_url, iso_code);
        let countries: Vec<CountryInfo> = self.get_json(&url, &[]).await?;
        countries
            .into_iter()
            .next()
            .ok_or_else(|| AggregatorError::Missing(format!("country {}", iso_code)))
    }

    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<HourlySeries, AggregatorError> {
        let url = format!("{}/forecast", self.config.weather_url);
        let forecast: Forecast = self
            .get_json(
                &url,
                &[
                    ("latitude", format!("{:.2}", latitude)),
                    ("longitude", format!("{:.2}", longitude)),
                    ("hourly", "temperature_2m,precipitation".to_string()),
                ],
            )
            .await?;
        Ok(forecast.hourly)
    }

    async fn rates(&self, base: &str) -> Result<BTreeMap<String, f64>, AggregatorError> {
        let url = format!("{}/{}", self.config.currency_url, base);
        let rates: Rates = self.get_json(&url, &[]).await?;
        Ok(rates.rates)
    }

    async fn status_of(&self, url: &str) -> u16 {
        match self.client.get(url).send().await {
            Ok(response) => response.status().as_u16(),
            Err(e) => {
                warn!(url = %url, error = %e, "Upstream unreachable");
                StatusCode::SERVICE_UNAVAILABLE.as_u16()
            }
        }
    }
}

#[async_trait]
impl Aggregator for HttpAggregator {
    async fn render(&self, dashboard: &Dashboard) -> Result<DashboardView, AggregatorError> {
        let selected = &dashboard.features;
        let country = self.country(&dashboard.iso_code).await?;

        let coordinates = match country.latlng.as_slice() {
            [latitude, longitude, ..] => Some(Coordinates {
                latitude: *latitude,
                longitude: *longitude,
            }),
            _ => None,
        };

        let mut features = ViewFeatures::default();

        if selected.temperature || selected.precipitation {
            let position = coordinates
                .as_ref()
                .ok_or_else(|| AggregatorError::Missing(format!("coordinates of {}", dashboard.iso_code)))?;
            let series = self.forecast(position.latitude, position.longitude).await?;
            if selected.temperature {
                features.temperature = Some(mean(&series.temperature_2m));
            }
            if selected.precipitation {
                features.precipitation = Some(mean(&series.precipitation));
            }
        }

        if selected.capital {
            features.capital = country.capital.first().cloned();
        }
        if selected.coordinates {
            features.coordinates = coordinates.clone();
        }
        if selected.population {
            features.population = Some(country.population);
        }
        if selected.area {
            features.area = Some(country.area);
        }

        if !selected.target_currencies.is_empty() {
            let base = country
                .currencies
                .keys()
                .find(|code| code.len() == 3)
                .ok_or_else(|| AggregatorError::Missing(format!("currency of {}", dashboard.iso_code)))?;
            let rates = self.rates(base).await?;
            for target in &selected.target_currencies {
                let code = target.trim().to_uppercase();
                let rate = rates.get(&code).copied().unwrap_or_default();
                features.target_currencies.insert(code, rate);
            }
        }

        Ok(DashboardView {
            country: dashboard.country.clone(),
            iso_code: dashboard.iso_code.clone(),
            features,
            last_retrieval: Utc::now().format("%Y-%m-%d %H:%M").to_string(),
        })
    }

    async fn probe(&self) -> UpstreamStatus {
        let countries = format!("{}/alpha/no", self.config.countries_url);
        let weather = format!(
            "{}/forecast?latitude=60&longitude=10&hourly=temperature_2m",
            self.config.weather_url
        );
        let currency = format!("{}/NOK", self.config.currency_url);

        let (countries_api, meteo_api, currency_api) = tokio::join!(
            self.status_of(&countries),
            self.status_of(&weather),
            self.status_of(&currency),
        );

        UpstreamStatus {
            countries_api,
            meteo_api,
            currency_api,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_common::{DashboardDraft, Features};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upstream(server: &MockServer) -> UpstreamConfig {
        UpstreamConfig {
            countries_url: format!("{}/countries", server.uri()),
            weather_url: format!("{}/meteo", server.uri()),
            currency_url: format!("{}/currency", server.uri()),
        }
    }

    async fn mount_norway(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/countries/alpha/NO"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "capital": ["Oslo"],
                "latlng": [62.0, 10.0],
                "population": 5379475,
                "area": 323802.0,
                "currencies": {"NOK": {"name": "Norwegian krone", "symbol": "kr"}}
            }])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/meteo/forecast"))
            .and(query_param("latitude", "62.00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "temperature_2m": [1.0, 2.0, 3.0],
                    "precipitation": [0.0, 0.5]
                }
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/currency/NOK"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rates": {"EUR": 0.087, "SEK": 0.98, "USD": 0.094}
            })))
            .mount(server)
            .await;
    }

    fn norway(features: Features) -> Dashboard {
        Dashboard::from_draft(
            "1",
            DashboardDraft {
                country: "Norway".into(),
                iso_code: "NO".into(),
                features,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_render_selected_features() {
        let server = MockServer::start().await;
        mount_norway(&server).await;

        let aggregator = HttpAggregator::new(upstream(&server), Duration::from_secs(5)).unwrap();
        let view = aggregator
            .render(&norway(Features {
                temperature: true,
                precipitation: true,
                capital: true,
                coordinates: true,
                population: false,
                area: false,
                target_currencies: vec!["eur".into(), "SEK".into()],
            }))
            .await
            .unwrap();

        assert_eq!(view.iso_code, "NO");
        assert_eq!(view.features.temperature, Some(2.0));
        assert_eq!(view.features.precipitation, Some(0.25));
        assert_eq!(view.features.capital.as_deref(), Some("Oslo"));
        assert_eq!(
            view.features.coordinates,
            Some(Coordinates {
                latitude: 62.0,
                longitude: 10.0
            })
        );
        assert!(view.features.population.is_none());
        assert_eq!(view.features.target_currencies.get("EUR"), Some(&0.087));
        assert_eq!(view.features.target_currencies.len(), 2);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["features"].get("population").is_none());
        assert_eq!(json["lastRetrieval"].as_str().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_unknown_country_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let aggregator = HttpAggregator::new(upstream(&server), Duration::from_secs(5)).unwrap();
        let err = aggregator.render(&norway(Features::default())).await.unwrap_err();
        assert!(matches!(err, AggregatorError::Status { status, .. } if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_probe_reports_status_codes() {
        let server = MockServer::start().await;
        mount_norway(&server).await;

        let mut config = upstream(&server);
        config.countries_url = "http://127.0.0.1:1".to_string();
        let aggregator = HttpAggregator::new(config, Duration::from_secs(2)).unwrap();
        let status = aggregator.probe().await;

        assert_eq!(status.countries_api, 503);
        assert_eq!(status.currency_api, 200);
    }
}
