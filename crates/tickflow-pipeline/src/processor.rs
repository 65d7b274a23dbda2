//! Channel-to-warehouse stream processor.
//!
//! Drains the subscription one delivery at a time. Decode and validation
//! failures drop the single offending record; sink write failures are logged
//! and skipped. In all three failure shapes the loop keeps running.

use std::sync::Arc;

use thiserror::Error;

use tickflow_core::{ChannelSubscription, TickRecord, ValidationError};
use tickflow_warehouse::{TickRow, TickWarehouse, WarehouseError};

#[derive(Debug, Error)]
enum DecodeError {
    #[error("payload is not a tick record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tick record failed validation: {0}")]
    Invalid(#[from] ValidationError),
}

/// Where processed rows land. `TickWarehouse` is the production sink; tests
/// substitute their own.
pub trait SinkWriter: Send + Sync {
    fn append(&self, row: TickRow) -> Result<(), WarehouseError>;
}

impl SinkWriter for TickWarehouse {
    fn append(&self, row: TickRow) -> Result<(), WarehouseError> {
        self.append_ticks(std::slice::from_ref(&row))
    }
}

/// Counters reported when the subscription closes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Rows confirmed written to the sink.
    pub written: u64,
    /// Deliveries dropped because they failed decode or validation.
    pub dropped: u64,
    /// Decoded records lost to a sink write failure.
    pub write_failures: u64,
}

/// Single-consumer streaming stage. Owns the subscription for its lifetime;
/// `run` returns only when every publisher handle has been dropped.
pub struct StreamProcessor<S: ChannelSubscription> {
    subscription: S,
    sink: Arc<dyn SinkWriter>,
}

impl<S: ChannelSubscription> StreamProcessor<S> {
    pub fn new(subscription: S, sink: Arc<dyn SinkWriter>) -> Self {
        Self { subscription, sink }
    }

    /// Drain the subscription until it closes.
    pub async fn run(mut self) -> ProcessorStats {
        let mut stats = ProcessorStats::default();

        while let Some(delivery) = self.subscription.receive().await {
            let record = match decode(&delivery.payload) {
                Ok(record) => record,
                Err(error) => {
                    stats.dropped += 1;
                    tracing::warn!(
                        message_id = %delivery.message_id,
                        %error,
                        "dropping undecodable delivery"
                    );
                    continue;
                }
            };

            let processed = record.into_processed();
            let row = TickRow {
                symbol: processed.symbol.clone(),
                price: processed.price,
                timestamp: processed.timestamp.clone(),
                processing_status: processed
                    .processing_status
                    .clone()
                    .expect("into_processed always stamps processing_status"),
            };

            match self.sink.append(row) {
                Ok(()) => {
                    stats.written += 1;
                    tracing::debug!(
                        message_id = %delivery.message_id,
                        symbol = %processed.symbol,
                        "tick written to sink"
                    );
                }
                Err(error) => {
                    stats.write_failures += 1;
                    tracing::error!(
                        message_id = %delivery.message_id,
                        symbol = %processed.symbol,
                        %error,
                        "sink write failed; record lost"
                    );
                }
            }
        }

        tracing::info!(
            written = stats.written,
            dropped = stats.dropped,
            write_failures = stats.write_failures,
            "subscription closed; processor stopping"
        );
        stats
    }
}

fn decode(payload: &[u8]) -> Result<TickRecord, DecodeError> {
    let record: TickRecord = serde_json::from_slice(payload)?;
    record.validate()?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tickflow_core::{ChannelPublisher, InProcessChannel};

    struct MemorySink {
        rows: Mutex<Vec<TickRow>>,
        fail_next: Mutex<bool>,
    }

    impl MemorySink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(Vec::new()),
                fail_next: Mutex::new(false),
            })
        }

        fn rows(&self) -> Vec<TickRow> {
            self.rows.lock().expect("rows mutex").clone()
        }

        fn fail_next_append(&self) {
            *self.fail_next.lock().expect("fail flag mutex") = true;
        }
    }

    impl SinkWriter for MemorySink {
        fn append(&self, row: TickRow) -> Result<(), WarehouseError> {
            let mut fail = self.fail_next.lock().expect("fail flag mutex");
            if *fail {
                *fail = false;
                return Err(WarehouseError::InvalidTableName(String::from(
                    "simulated write failure",
                )));
            }
            self.rows.lock().expect("rows mutex").push(row);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stamps_marker_and_writes_each_delivery() {
        let (publisher, subscription) = InProcessChannel::bounded(8);
        let sink = MemorySink::new();
        let processor = StreamProcessor::new(subscription, sink.clone());

        publisher
            .publish(br#"{"symbol":"IBM","price":150.0,"timestamp":"2026-08-27T12:00:00Z"}"#.to_vec())
            .await
            .expect("publish");
        drop(publisher);

        let stats = processor.run().await;
        assert_eq!(stats.written, 1);
        assert_eq!(stats.dropped, 0);

        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "IBM");
        assert_eq!(rows[0].processing_status, "processed");
    }

    #[tokio::test]
    async fn malformed_delivery_is_dropped_without_stopping_the_stream() {
        let (publisher, subscription) = InProcessChannel::bounded(8);
        let sink = MemorySink::new();
        let processor = StreamProcessor::new(subscription, sink.clone());

        publisher
            .publish(b"not json at all".to_vec())
            .await
            .expect("publish");
        publisher
            .publish(br#"{"symbol":"MSFT","price":401.5}"#.to_vec())
            .await
            .expect("publish");
        drop(publisher);

        let stats = processor.run().await;
        assert_eq!(stats.written, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(sink.rows()[0].symbol, "MSFT");
    }

    #[tokio::test]
    async fn invalid_record_is_dropped() {
        let (publisher, subscription) = InProcessChannel::bounded(8);
        let sink = MemorySink::new();
        let processor = StreamProcessor::new(subscription, sink.clone());

        // Decodes fine but fails validation: negative price.
        publisher
            .publish(br#"{"symbol":"IBM","price":-1.0}"#.to_vec())
            .await
            .expect("publish");
        drop(publisher);

        let stats = processor.run().await;
        assert_eq!(stats.written, 0);
        assert_eq!(stats.dropped, 1);
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn sink_failure_loses_one_record_and_continues() {
        let (publisher, subscription) = InProcessChannel::bounded(8);
        let sink = MemorySink::new();
        sink.fail_next_append();
        let processor = StreamProcessor::new(subscription, sink.clone());

        publisher
            .publish(br#"{"symbol":"AAPL","price":210.0}"#.to_vec())
            .await
            .expect("publish");
        publisher
            .publish(br#"{"symbol":"GOOG","price":180.0}"#.to_vec())
            .await
            .expect("publish");
        drop(publisher);

        let stats = processor.run().await;
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.written, 1);
        assert_eq!(sink.rows()[0].symbol, "GOOG");
    }
}
