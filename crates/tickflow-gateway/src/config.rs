//! Gateway configuration, loaded from environment variables once at startup.

use std::env;

use thiserror::Error;
use tickflow_core::{ApiKey, Symbol, ValidationError, DEFAULT_SYMBOL};

/// Listen port injected by the runtime; falls back to 8080.
pub const DEFAULT_PORT: u16 = 8080;

const DEFAULT_PROJECT_ID: &str = "local-project";
const DEFAULT_TOPIC_ID: &str = "stock-ticks";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT value '{0}'")]
    InvalidPort(String),
    #[error("invalid SYMBOL value '{value}': {source}")]
    InvalidSymbol {
        value: String,
        source: ValidationError,
    },
}

/// Which trigger shape an empty-body request means for this deployment.
///
/// A non-empty JSON body always takes the direct path regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// Empty body is a caller error (400).
    #[default]
    Direct,
    /// Empty body triggers a provider fetch using the configured credential.
    Pull,
}

impl IngestMode {
    pub fn from_str_case_insensitive(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pull" => Self::Pull,
            _ => Self::Direct,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Pull => "pull",
        }
    }
}

/// Process-wide gateway settings, read once and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub project_id: String,
    pub topic_id: String,
    pub mode: IngestMode,
    pub api_key: Option<ApiKey>,
    pub symbol: Symbol,
    pub port: u16,
}

impl GatewayConfig {
    /// Read `PROJECT_ID`, `TOPIC_ID`, `INGEST_MODE`, `API_KEY`, `SYMBOL`,
    /// and `PORT`. Everything but the credential has a fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_id =
            env::var("PROJECT_ID").unwrap_or_else(|_| String::from(DEFAULT_PROJECT_ID));
        let topic_id = env::var("TOPIC_ID").unwrap_or_else(|_| String::from(DEFAULT_TOPIC_ID));
        let mode = env::var("INGEST_MODE")
            .map(|raw| IngestMode::from_str_case_insensitive(&raw))
            .unwrap_or_default();
        let api_key = env::var("API_KEY")
            .ok()
            .filter(|value| !value.is_empty())
            .map(ApiKey::new);

        let symbol = match env::var("SYMBOL") {
            Ok(raw) => Symbol::parse(&raw).map_err(|source| ConfigError::InvalidSymbol {
                value: raw,
                source,
            })?,
            Err(_) => Symbol::parse(DEFAULT_SYMBOL).expect("default symbol is valid"),
        };

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            project_id,
            topic_id,
            mode,
            api_key,
            symbol,
            port,
        })
    }

    /// Fully-qualified channel identity used in log lines.
    pub fn topic_path(&self) -> String {
        format!("projects/{}/topics/{}", self.project_id, self.topic_id)
    }
}
