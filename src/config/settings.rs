use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chart::{DEFAULT_BAR_MAX, DEFAULT_BAR_MIN, DEFAULT_PADDING_PCT, DEFAULT_TRUNCATE_TAIL};
use crate::types::{Frequency, DEFAULT_TICK_CAPACITY};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TICKER_URL: &str = "https://api.pro.coinbase.com/products/BTC-USD/ticker";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub frequency: Frequency,
    pub api: ApiSettings,
    pub http: HttpSettings,
    pub ticks: TickSettings,
    pub chart: ChartSettings,
    pub websocket: WebSocketSettings,
    pub server: ServerSettings,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Endpoints
        if let Err(e) = parse_http_url(&self.api.base_url) {
            errors.push(format!("api.base_url: {}", e));
        }
        if let Err(e) = parse_http_url(&self.api.ticker_url) {
            errors.push(format!("api.ticker_url: {}", e));
        }
        if let Some(ws) = &self.api.ws_url {
            match Url::parse(ws) {
                Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
                Ok(url) => errors.push(format!("api.ws_url: unsupported scheme '{}'", url.scheme())),
                Err(e) => errors.push(format!("api.ws_url: {}", e)),
            }
        }
        if self.http.timeout_secs == Some(0) {
            errors.push("http.timeout_secs must be > 0 when set".to_string());
        }

        // Live ticks
        if self.ticks.capacity == 0 {
            errors.push("ticks.capacity must be > 0".to_string());
        }
        if self.ticks.interval_ms == 0 {
            errors.push("ticks.interval_ms must be > 0".to_string());
        }
        if self.ticks.bar_min >= self.ticks.bar_max {
            errors.push("ticks.bar_min must be < ticks.bar_max".to_string());
        }

        // Prediction chart
        if self.chart.padding_pct < 0.0 {
            errors.push("chart.padding_pct must be >= 0".to_string());
        }

        // WebSocket reconnect
        if self.websocket.initial_backoff_ms == 0 {
            errors.push("websocket.initial_backoff_ms must be > 0".to_string());
        }
        if self.websocket.max_backoff_ms < self.websocket.initial_backoff_ms {
            errors.push("websocket.max_backoff_ms must be >= websocket.initial_backoff_ms".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Signal stream. Derived from `base_url` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    pub ticker_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_url: None,
            ticker_url: DEFAULT_TICKER_URL.to_string(),
        }
    }
}

impl ApiSettings {
    /// `ws://<host>/ws` for an `http://<host>` base, `wss://` for `https://`.
    pub fn ws_url(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let host = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            format!("ws://{}", base)
        };
        format!("{}/ws", host)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl HttpSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickSettings {
    pub capacity: usize,
    pub interval_ms: u64,
    pub bar_min: f64,
    pub bar_max: f64,
}

impl Default for TickSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TICK_CAPACITY,
            interval_ms: 1000,
            bar_min: DEFAULT_BAR_MIN,
            bar_max: DEFAULT_BAR_MAX,
        }
    }
}

impl TickSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Points dropped from the end of the merged prediction series.
    pub truncate_tail: usize,
    pub padding_pct: f64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            truncate_tail: DEFAULT_TRUNCATE_TAIL,
            padding_pct: DEFAULT_PADDING_PCT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketSettings {
    /// Consecutive failed connection attempts before giving up.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ticks.capacity, 60);
        assert_eq!(config.chart.truncate_tail, 40);
        assert_eq!(config.frequency, Frequency::Minute);
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut config = AppConfig::default();
        config.api.base_url = "ftp://example.com".to_string();
        config.ticks.capacity = 0;
        config.ticks.bar_min = 200.0;
        config.websocket.max_backoff_ms = 1;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].starts_with("api.base_url"));
    }

    #[test]
    fn test_ws_url_derived_from_base() {
        let mut api = ApiSettings::default();
        assert_eq!(api.ws_url(), "ws://localhost:8000/ws");

        api.base_url = "https://signals.example.com/".to_string();
        assert_eq!(api.ws_url(), "wss://signals.example.com/ws");

        api.ws_url = Some("ws://other:9000/stream".to_string());
        assert_eq!(api.ws_url(), "ws://other:9000/stream");
    }
}
