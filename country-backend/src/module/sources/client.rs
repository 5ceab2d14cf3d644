use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::{ExchangeRates, RatesPayload, RemoteCountry};
use crate::config::SourcesConfig;

const USER_AGENT: &str = concat!("country-backend/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Could not fetch data from {source_name}: {source}")]
    Request {
        source_name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not fetch data from {source_name}: HTTP {status}")]
    Status {
        source_name: String,
        status: StatusCode,
    },

    #[error("Malformed payload from {source_name}: {source}")]
    Decode {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{source_name} returned no data")]
    Empty { source_name: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Provider of the two refresh inputs
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch_countries(&self) -> Result<Vec<RemoteCountry>, SourceError>;

    async fn fetch_rates(&self) -> Result<ExchangeRates, SourceError>;
}

/// Fetches both datasets over HTTP with a shared client
pub struct HttpDataSource {
    client: Client,
    countries_url: String,
    rates_url: String,
}

impl HttpDataSource {
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(SourceError::Client)?;

        Ok(Self {
            client,
            countries_url: config.countries_url.clone(),
            rates_url: config.rates_url.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let source_name = source_name(url);
        tracing::debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Request {
                source_name: source_name.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { source_name, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| SourceError::Request {
                source_name: source_name.clone(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|source| SourceError::Decode { source_name, source })
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_countries(&self) -> Result<Vec<RemoteCountry>, SourceError> {
        let countries: Vec<RemoteCountry> = self.get_json(&self.countries_url).await?;
        if countries.is_empty() {
            return Err(SourceError::Empty {
                source_name: source_name(&self.countries_url),
            });
        }
        tracing::info!("Fetched {} countries", countries.len());
        Ok(countries)
    }

    async fn fetch_rates(&self) -> Result<ExchangeRates, SourceError> {
        let payload: RatesPayload = self.get_json(&self.rates_url).await?;
        let rates = payload.into_rates();
        if rates.is_empty() {
            return Err(SourceError::Empty {
                source_name: source_name(&self.rates_url),
            });
        }
        tracing::info!("Fetched {} exchange rates", rates.len());
        Ok(rates)
    }
}

/// Host part of a provider URL, used in error messages
fn source_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Json, Router};
    use rust_decimal_macros::dec;
    use serde_json::json;

    async fn spawn_provider() -> String {
        let app = Router::new()
            .route(
                "/countries",
                get(|| async {
                    Json(json!([
                        {"name": "Testland", "population": 1000000, "currencies": [{"code": "tst"}]}
                    ]))
                }),
            )
            .route(
                "/rates",
                get(|| async { Json(json!({"result": "success", "rates": {"TST": 2.0}})) }),
            )
            .route("/empty", get(|| async { Json(json!([])) }))
            .route("/no-rates", get(|| async { Json(json!({"result": "error"})) }))
            .route("/broken", get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }))
            .route("/garbage", get(|| async { "<html>not json</html>" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn source(base: &str, countries: &str, rates: &str) -> HttpDataSource {
        HttpDataSource::new(&SourcesConfig {
            countries_url: format!("{}{}", base, countries),
            rates_url: format!("{}{}", base, rates),
            request_timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_both_datasets() {
        let base = spawn_provider().await;
        let source = source(&base, "/countries", "/rates");

        let countries = source.fetch_countries().await.unwrap();
        assert_eq!(countries.len(), 1);
        assert_eq!(countries[0].name, "Testland");

        let rates = source.fetch_rates().await.unwrap();
        assert_eq!(rates["TST"], dec!(2));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let base = spawn_provider().await;
        let source = source(&base, "/broken", "/broken");

        let err = source.fetch_countries().await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status, .. } if status.as_u16() == 500));
        assert!(err.to_string().contains("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_malformed_and_empty_payloads() {
        let base = spawn_provider().await;

        let err = source(&base, "/garbage", "/rates").fetch_countries().await.unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));

        let err = source(&base, "/empty", "/rates").fetch_countries().await.unwrap_err();
        assert!(matches!(err, SourceError::Empty { .. }));

        let err = source(&base, "/countries", "/no-rates").fetch_rates().await.unwrap_err();
        assert!(matches!(err, SourceError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = format!("http://{}", addr);
        let err = source(&base, "/countries", "/rates").fetch_countries().await.unwrap_err();
        assert!(matches!(err, SourceError::Request { .. }));
    }

    #[test]
    fn test_source_name_uses_host() {
        assert_eq!(source_name("https://open.er-api.com/v6/latest/USD"), "open.er-api.com");
        assert_eq!(source_name("not a url"), "not a url");
    }
}
