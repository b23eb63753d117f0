use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use super::{ClientError, CommandAck, SignalBackend, TickSource};
use crate::config::{ApiSettings, HttpSettings};
use crate::types::{Frequency, ProcessCommand, RunningStatus, SignalsResponse, Tick};

const USER_AGENT: &str = concat!("signal-dashboard/", env!("CARGO_PKG_VERSION"));

/// JSON client for the prediction backend and the external ticker.
///
/// One request per call: no retries, no backoff. Timeouts apply only when
/// configured.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    ticker_url: String,
}

impl ApiClient {
    pub fn new(api: &ApiSettings, http: &HttpSettings) -> Result<Self, ClientError> {
        Url::parse(&api.base_url).map_err(|_| ClientError::Url(api.base_url.clone()))?;
        Url::parse(&api.ticker_url).map_err(|_| ClientError::Url(api.ticker_url.clone()))?;

        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = http.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            ticker_url: api.ticker_url.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(endpoint)).json(body);
        let result = Self::send_json(request, endpoint).await;
        if let Err(e) = &result {
            error!("POST request failed: {} - {}", endpoint, e);
        }
        result
    }

    pub async fn get<T>(&self, endpoint: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let request = self
            .client
            .get(self.url(endpoint))
            .header(CONTENT_TYPE, "application/json");
        let result = Self::send_json(request, endpoint).await;
        if let Err(e) = &result {
            error!("GET request failed: {} - {}", endpoint, e);
        }
        result
    }

    /// Single sample from the external ticker. Failures are passed through.
    pub async fn second_ticks(&self) -> Result<Tick, ClientError> {
        let request = self.client.get(&self.ticker_url);
        let result = Self::send_json(request, &self.ticker_url).await;
        if let Err(e) = &result {
            debug!("Ticker fetch failed: {}", e);
        }
        result
    }

    async fn send_json<T: DeserializeOwned>(
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn start_fetch(&self, frequency: Frequency) -> Result<CommandAck, ClientError> {
        self.send_command(ProcessCommand::Start, frequency).await
    }

    pub async fn stop_fetch(&self, frequency: Frequency) -> Result<CommandAck, ClientError> {
        self.send_command(ProcessCommand::Stop, frequency).await
    }
}

#[async_trait]
impl SignalBackend for ApiClient {
    async fn is_running(&self, frequency: Frequency) -> Result<RunningStatus, ClientError> {
        self.post("/is_running", &json!({ "key": frequency })).await
    }

    async fn send_command(
        &self,
        command: ProcessCommand,
        frequency: Frequency,
    ) -> Result<CommandAck, ClientError> {
        self.post(command.endpoint(), &json!({ "frequency": frequency }))
            .await
    }

    async fn signals(&self) -> Result<SignalsResponse, ClientError> {
        self.get("/signals").await
    }
}

#[async_trait]
impl TickSource for ApiClient {
    async fn second_ticks(&self) -> Result<Tick, ClientError> {
        ApiClient::second_ticks(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::spawn_stub;
    use crate::types::SignalKind;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::Value;
    use tokio_test::{assert_err, assert_ok};

    fn client_for(base_url: &str, ticker_url: &str) -> ApiClient {
        let api = ApiSettings {
            base_url: base_url.to_string(),
            ws_url: None,
            ticker_url: ticker_url.to_string(),
        };
        ApiClient::new(&api, &HttpSettings::default()).unwrap()
    }

    fn backend_stub() -> Router {
        Router::new()
            .route(
                "/is_running",
                post(|Json(body): Json<Value>| async move {
                    // Running only for the hourly process
                    Json(json!({ "message": body["key"] == "hour" }))
                }),
            )
            .route(
                "/start_fetch",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({ "message": format!("started {}", body["frequency"].as_str().unwrap_or("?")) }))
                }),
            )
            .route(
                "/stop_fetch",
                post(|| async {
                    (StatusCode::BAD_REQUEST, Json(json!({ "message": "Data fetching is not in progress" })))
                }),
            )
            .route(
                "/signals",
                get(|| async {
                    Json(json!({ "signal_data": [
                        { "signal": "Hold", "time": "2024-05-01 10:00:00", "profit": 0 },
                        { "signal": "Buy", "time": "2024-05-01 10:01:00", "profit": 0 }
                    ]}))
                }),
            )
            .route(
                "/ticker",
                get(|| async {
                    Json(json!({ "price": "64000.50", "time": "2024-05-01T10:01:00Z", "bid": "64000.00" }))
                }),
            )
            .route("/broken", get(|| async { "not json" }))
    }

    #[tokio::test]
    async fn test_is_running_sends_frequency_key() {
        let base = spawn_stub(backend_stub()).await;
        let client = client_for(&base, &format!("{}/ticker", base));

        let hourly = assert_ok!(client.is_running(Frequency::Hour).await);
        let minutely = assert_ok!(client.is_running(Frequency::Minute).await);

        assert!(hourly.is_running());
        assert!(!minutely.is_running());
    }

    #[tokio::test]
    async fn test_start_fetch_returns_ack() {
        let base = spawn_stub(backend_stub()).await;
        let client = client_for(&base, &format!("{}/ticker", base));

        let ack = assert_ok!(client.start_fetch(Frequency::Day).await);
        assert_eq!(ack.describe(), "started day");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let base = spawn_stub(backend_stub()).await;
        let client = client_for(&base, &format!("{}/ticker", base));

        let err = assert_err!(client.stop_fetch(Frequency::Minute).await);
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.to_string(), "Error: 400 from /stop_fetch");
    }

    #[tokio::test]
    async fn test_signals_and_ticks() {
        let base = spawn_stub(backend_stub()).await;
        let client = client_for(&base, &format!("{}/ticker", base));

        let signals = assert_ok!(client.signals().await).into_display_order().unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].signal, SignalKind::Buy);

        let tick = assert_ok!(client.second_ticks().await);
        assert_eq!(tick.price, "64000.50");
        assert_eq!(tick.time, "2024-05-01T10:01:00Z");
    }

    #[tokio::test]
    async fn test_bad_body_is_decode_error() {
        let base = spawn_stub(backend_stub()).await;
        let client = client_for(&base, &format!("{}/ticker", base));

        let err = assert_err!(client.get::<Value>("/broken").await);
        assert!(matches!(err, ClientError::Decode(_)));

        let err = assert_err!(client.get::<Value>("/missing").await);
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = client_for("http://127.0.0.1:9", "http://127.0.0.1:9/ticker");
        let err = assert_err!(client.second_ticks().await);
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let api = ApiSettings {
            base_url: "not a url".to_string(),
            ..ApiSettings::default()
        };
        let err = ApiClient::new(&api, &HttpSettings::default()).unwrap_err();
        assert!(matches!(err, ClientError::Url(_)));
    }
}
