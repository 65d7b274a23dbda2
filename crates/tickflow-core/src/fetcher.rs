//! Provider quote fetcher.
//!
//! Retrieves one `GLOBAL_QUOTE` for a symbol and normalizes the response into
//! a [`TickRecord`], classifying the result into the tri-state
//! [`FetchOutcome`]. The fetcher makes exactly one attempt per call: retry
//! policy belongs to the caller/scheduler, not this layer.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::{Symbol, TickRecord};

/// Ticker fetched when no symbol is configured.
pub const DEFAULT_SYMBOL: &str = "IBM";

/// Fixed connect/read budget for the provider call.
const PROVIDER_TIMEOUT_MS: u64 = 10_000;

const PROVIDER_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Provider credential. Redacts on `Debug` so it can never leak via logs.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Tri-state result of one provider call.
///
/// A 2xx payload without the expected quote object is the common signature of
/// provider rate limiting and is not a hard failure at this layer; the raw
/// payload is carried for diagnostics. The connectivity probe classifies the
/// same three outcomes.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Normalized record with the ingestion timestamp stamped.
    Quote(TickRecord),
    /// HTTP success but no quote object in the payload.
    RateLimitedOrMalformed { raw: String },
    /// Timeout, connection failure, or a non-2xx provider status.
    Transport(HttpError),
}

/// Fetches and normalizes quotes from the upstream provider.
///
/// Holds a shared transport handle; one instance is created at startup and
/// reused across concurrent requests.
#[derive(Clone)]
pub struct QuoteFetcher {
    http_client: Arc<dyn HttpClient>,
    api_key: ApiKey,
}

impl QuoteFetcher {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: ApiKey) -> Self {
        Self {
            http_client,
            api_key,
        }
    }

    /// Full provider URL including the credential. Never log this directly;
    /// use [`QuoteFetcher::sanitized_endpoint`].
    fn endpoint(&self, symbol: &Symbol) -> String {
        format!(
            "{PROVIDER_BASE_URL}?function=GLOBAL_QUOTE&symbol={}&apikey={}",
            urlencoding::encode(symbol.as_str()),
            self.api_key.expose()
        )
    }

    /// Provider URL with the credential masked, safe for logging.
    pub fn sanitized_endpoint(&self, symbol: &Symbol) -> String {
        sanitize_endpoint(&self.endpoint(symbol))
    }

    /// Fetch one quote. One outbound call, no retry, fixed timeout.
    pub async fn fetch(&self, symbol: &Symbol) -> FetchOutcome {
        let endpoint = self.endpoint(symbol);
        tracing::debug!(url = %sanitize_endpoint(&endpoint), "fetching provider quote");

        let request = HttpRequest::get(endpoint).with_timeout_ms(PROVIDER_TIMEOUT_MS);
        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(error) => return FetchOutcome::Transport(error),
        };

        if !response.is_success() {
            return FetchOutcome::Transport(HttpError::new(format!(
                "provider returned status {}",
                response.status
            )));
        }

        let decoded: GlobalQuoteResponse = match serde_json::from_str(&response.body) {
            Ok(decoded) => decoded,
            Err(_) => {
                return FetchOutcome::RateLimitedOrMalformed {
                    raw: response.body,
                }
            }
        };

        match decoded.quote {
            Some(payload) => FetchOutcome::Quote(payload.into_record(ingestion_timestamp())),
            None => FetchOutcome::RateLimitedOrMalformed {
                raw: response.body,
            },
        }
    }
}

/// Mask the `apikey` query parameter in a provider URL.
pub fn sanitize_endpoint(url: &str) -> String {
    match url.split_once("&apikey=") {
        Some((base, _)) => format!("{base}&apikey=***"),
        None => url.to_string(),
    }
}

fn ingestion_timestamp() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

// Provider response structures. Field names follow the provider's numbered
// JSON keys; everything arrives as strings.
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    quote: Option<GlobalQuotePayload>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuotePayload {
    #[serde(rename = "01. symbol", default)]
    symbol: String,
    #[serde(rename = "05. price", default)]
    price: Option<String>,
    #[serde(rename = "06. volume", default)]
    volume: Option<String>,
    #[serde(rename = "10. change percent", default)]
    change_percent: Option<String>,
}

impl GlobalQuotePayload {
    /// Numeric fields default to zero when absent or unparseable.
    fn into_record(self, timestamp: Option<String>) -> TickRecord {
        TickRecord {
            symbol: self.symbol,
            price: self
                .price
                .as_deref()
                .and_then(|raw| raw.parse::<f64>().ok())
                .unwrap_or(0.0),
            volume: Some(
                self.volume
                    .as_deref()
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .unwrap_or(0),
            ),
            change_percent: self.change_percent,
            timestamp,
            processing_status: None,
        }
    }
}
