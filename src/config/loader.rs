use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use super::settings::AppConfig;

const ENV_PREFIX: &str = "DASHBOARD";
const LEGACY_BASE_URL: &str = "BASE_URL";
const LEGACY_TICKS_URL: &str = "TICKS_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {}", .0.join(", "))]
    Invalid(Vec<String>),
}

/// Loads the configuration from defaults, an optional TOML file and the
/// environment, in increasing precedence.
///
/// `.env` is read first. The unprefixed `BASE_URL` / `TICKS_URL` variables
/// seed the endpoint defaults; `DASHBOARD__SECTION__KEY` variables override
/// everything.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Ok(dotenv) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", dotenv.display());
    }

    let legacy = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
    load_with(
        path,
        legacy(LEGACY_BASE_URL),
        legacy(LEGACY_TICKS_URL),
        env_overrides(),
    )
}

/// `DASHBOARD__SECTION__KEY` variables, e.g. `DASHBOARD__API__BASE_URL`.
fn env_overrides() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

fn load_with(
    path: Option<&Path>,
    legacy_base_url: Option<String>,
    legacy_ticks_url: Option<String>,
    env: Environment,
) -> Result<AppConfig, ConfigError> {
    let mut seed = AppConfig::default();
    if let Some(url) = legacy_base_url {
        seed.api.base_url = url;
    }
    if let Some(url) = legacy_ticks_url {
        seed.api.ticker_url = url;
    }

    let mut builder = Config::builder().add_source(Config::try_from(&seed)?);
    if let Some(path) = path {
        let name = path.to_string_lossy();
        builder = builder.add_source(File::new(&name, FileFormat::Toml).required(false));
    }

    let settings: AppConfig = builder
        .add_source(env)
        .build()?
        .try_deserialize()?;

    settings.validate().map_err(ConfigError::Invalid)?;

    info!(
        "Configuration loaded: api={}, ticker={}, frequency={}",
        settings.api.base_url, settings.api.ticker_url, settings.frequency
    );
    Ok(settings)
}

/// Effective configuration rendered as TOML.
pub fn render_toml(config: &AppConfig) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frequency;
    use std::io::Write;

    /// Override layer fed from `vars` instead of the process environment.
    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_overrides().source(Some(map))
    }

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", name, uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("does-not-exist-dashboard.toml");
        let config = load_with(Some(&path), None, None, env(&[])).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.ticks.capacity, 60);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = temp_file(
            "dashboard",
            r#"
frequency = "hour"

[api]
base_url = "http://10.0.0.5:8000"

[chart]
truncate_tail = 10
"#,
        );

        let config = load_with(Some(&path), None, None, env(&[])).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.api.base_url, "http://10.0.0.5:8000");
        assert_eq!(config.chart.truncate_tail, 10);
        assert_eq!(config.frequency, Frequency::Hour);
        assert_eq!(config.ticks.interval_ms, 1000);
    }

    #[test]
    fn test_env_overrides_file() {
        let path = temp_file(
            "dashboard-env",
            r#"
[api]
base_url = "http://10.0.0.5:8000"

[chart]
truncate_tail = 10
"#,
        );

        let vars = [
            ("DASHBOARD__API__BASE_URL", "http://override:9000"),
            ("DASHBOARD__CHART__TRUNCATE_TAIL", "5"),
        ];
        let config = load_with(Some(&path), None, None, env(&vars)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.api.base_url, "http://override:9000");
        assert_eq!(config.chart.truncate_tail, 5);
        assert_eq!(config.ticks.capacity, 60);
    }

    #[test]
    fn test_env_overrides_legacy_seed() {
        let vars = [("DASHBOARD__API__BASE_URL", "http://override:9000")];
        let config = load_with(None, Some("http://backend:8000".to_string()), None, env(&vars)).unwrap();
        assert_eq!(config.api.base_url, "http://override:9000");
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        let vars = [("DASHBOARD__TICKS__CAPACITY", "0")];
        assert!(matches!(
            load_with(None, None, None, env(&vars)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_legacy_variables_seed_endpoints() {
        let config = load_with(
            None,
            Some("http://backend:8000".to_string()),
            Some("https://ticker.example.com/btc".to_string()),
            env(&[]),
        )
        .unwrap();
        assert_eq!(config.api.base_url, "http://backend:8000");
        assert_eq!(config.api.ticker_url, "https://ticker.example.com/btc");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let path = temp_file("dashboard-bad", "[ticks]\ncapacity = 0\n");
        let result = load_with(Some(&path), None, None, env(&[]));
        std::fs::remove_file(&path).ok();

        match result {
            Err(ConfigError::Invalid(errors)) => {
                assert!(errors.iter().any(|e| e.contains("ticks.capacity")))
            }
            other => panic!("expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_render_toml_round_trips_sections() {
        let rendered = render_toml(&AppConfig::default()).unwrap();
        assert!(rendered.contains("[api]"));
        assert!(rendered.contains("truncate_tail = 40"));
    }
}
