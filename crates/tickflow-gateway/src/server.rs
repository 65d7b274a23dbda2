//! Ingestion router and handler.
//!
//! `POST /` with a JSON body is direct-ingest; an empty body is pull-ingest
//! when the deployment is configured for it. Either way the handler performs
//! exactly one publish attempt and only reports success after the channel
//! confirms acceptance.
//!
//! Status mapping (the primary observable contract — an external scheduler
//! interprets these to decide whether to retry):
//!
//! | Condition | Status |
//! |---|---|
//! | Publish confirmed | 200 "Data published." |
//! | Missing body on direct-ingest | 400 "No JSON data provided" |
//! | Unparseable or invalid record body | 400 "Invalid tick payload: …" |
//! | Pull-ingest without a configured credential | 500 |
//! | Provider transport/timeout failure | 429 |
//! | Provider rate-limited / malformed payload | 429 |
//! | Publish confirmation failure | 500 (sanitized error text) |

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;

use crate::config::IngestMode;
use tickflow_core::{ChannelPublisher, FetchOutcome, QuoteFetcher, Symbol, TickRecord};

/// Shared per-process gateway state: one publisher handle and one fetcher,
/// constructed at startup and reused across concurrent requests.
pub struct GatewayState {
    pub publisher: Arc<dyn ChannelPublisher>,
    pub fetcher: Option<QuoteFetcher>,
    pub mode: IngestMode,
    pub symbol: Symbol,
    pub topic_path: String,
}

/// Build the ingestion router.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new().route("/", post(ingest)).with_state(state)
}

async fn ingest(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> (StatusCode, String) {
    let record = if body.is_empty() {
        match pull_record(&state).await {
            Ok(record) => record,
            Err(response) => return response,
        }
    } else {
        match parse_body(&body) {
            Ok(record) => record,
            Err(reason) => {
                tracing::warn!(%reason, "rejecting direct-ingest request");
                return (
                    StatusCode::BAD_REQUEST,
                    format!("Invalid tick payload: {reason}"),
                );
            }
        }
    };

    publish_record(&state, record).await
}

async fn pull_record(state: &GatewayState) -> Result<TickRecord, (StatusCode, String)> {
    if state.mode != IngestMode::Pull {
        return Err((
            StatusCode::BAD_REQUEST,
            String::from("No JSON data provided"),
        ));
    }

    let Some(fetcher) = &state.fetcher else {
        tracing::error!("pull-ingest triggered but no provider credential is configured");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Server is not configured with a provider credential."),
        ));
    };

    match fetcher.fetch(&state.symbol).await {
        FetchOutcome::Quote(record) => Ok(record),
        FetchOutcome::RateLimitedOrMalformed { raw } => {
            tracing::warn!(
                symbol = %state.symbol,
                raw_len = raw.len(),
                "provider response lacked a quote object; likely rate limited"
            );
            Err((
                StatusCode::TOO_MANY_REQUESTS,
                String::from("Provider rate limited or returned a malformed payload."),
            ))
        }
        FetchOutcome::Transport(error) => {
            tracing::error!(symbol = %state.symbol, %error, "provider transport failure");
            Err((
                StatusCode::TOO_MANY_REQUESTS,
                String::from("Provider unreachable; retry later."),
            ))
        }
    }
}

fn parse_body(body: &[u8]) -> Result<TickRecord, String> {
    let record: TickRecord =
        serde_json::from_slice(body).map_err(|error| error.to_string())?;
    record.validate().map_err(|error| error.to_string())?;
    Ok(record)
}

async fn publish_record(state: &GatewayState, record: TickRecord) -> (StatusCode, String) {
    let payload = match serde_json::to_vec(&record) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::error!(%error, "failed to serialize record for publish");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Publish Error: {error}"),
            );
        }
    };

    match state.publisher.publish(payload).await {
        Ok(receipt) => {
            tracing::info!(
                symbol = %record.symbol,
                price = record.price,
                message_id = %receipt.message_id,
                topic = %state.topic_path,
                "published tick"
            );
            (StatusCode::OK, String::from("Data published."))
        }
        Err(error) => {
            tracing::error!(%error, topic = %state.topic_path, "publish failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Publish Error: {error}"),
            )
        }
    }
}
