//! End-to-end pipeline tests: channel deliveries flowing through the stream
//! processor into a real warehouse file.

use std::sync::Arc;

use tempfile::tempdir;

use tickflow_pipeline::StreamProcessor;
use tickflow_tests::{ChannelPublisher, InProcessChannel};
use tickflow_warehouse::{TickWarehouse, WarehouseConfig};

fn open_warehouse(dir: &tempfile::TempDir) -> TickWarehouse {
    TickWarehouse::open(WarehouseConfig::new(dir.path().join("ticks.duckdb"), "ticks"))
        .expect("warehouse opens")
}

#[tokio::test]
async fn published_ticks_land_in_the_sink_with_the_enrichment_marker() {
    // Given a channel wired into a processor backed by a real warehouse
    let dir = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&dir);
    let (publisher, subscription) = InProcessChannel::bounded(8);
    let processor = StreamProcessor::new(subscription, Arc::new(warehouse.clone()));

    // When a raw ingested record is published and the channel closes
    publisher
        .publish(
            br#"{"symbol":"IBM","price":150.0,"volume":4500000,"change_percent":"1.23%","timestamp":"2026-08-27T12:00:00Z"}"#
                .to_vec(),
        )
        .await
        .expect("publish confirmed");
    drop(publisher);
    let stats = processor.run().await;

    // Then the sink holds the narrowed, marker-stamped row
    assert_eq!(stats.written, 1);
    let rows = warehouse.fetch_ticks(10).expect("fetch");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "IBM");
    assert_eq!(rows[0].price, 150.0);
    assert_eq!(rows[0].timestamp.as_deref(), Some("2026-08-27T12:00:00Z"));
    assert_eq!(rows[0].processing_status, "processed");
}

#[tokio::test]
async fn a_poison_message_does_not_take_down_the_stream() {
    let dir = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&dir);
    let (publisher, subscription) = InProcessChannel::bounded(8);
    let processor = StreamProcessor::new(subscription, Arc::new(warehouse.clone()));

    // Given a malformed payload followed by a healthy one
    publisher
        .publish(b"\xff\xfe not even utf-8 json".to_vec())
        .await
        .expect("publish confirmed");
    publisher
        .publish(br#"{"symbol":"MSFT","price":401.5}"#.to_vec())
        .await
        .expect("publish confirmed");
    drop(publisher);

    let stats = processor.run().await;

    // Then the bad record is dropped alone and the good one is written
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.written, 1);
    let rows = warehouse.fetch_ticks(10).expect("fetch");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "MSFT");
}

#[tokio::test]
async fn redelivered_payloads_become_additional_rows() {
    // At-least-once delivery with an append-only sink: duplicates persist.
    let dir = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&dir);
    let (publisher, subscription) = InProcessChannel::bounded(8);
    let processor = StreamProcessor::new(subscription, Arc::new(warehouse.clone()));

    let payload = br#"{"symbol":"IBM","price":150.0}"#.to_vec();
    publisher.publish(payload.clone()).await.expect("first");
    publisher.publish(payload).await.expect("redelivery");
    drop(publisher);

    let stats = processor.run().await;

    assert_eq!(stats.written, 2);
    assert_eq!(warehouse.count_ticks().expect("count"), 2);
}

#[tokio::test]
async fn a_record_without_optional_fields_is_still_written() {
    let dir = tempdir().expect("tempdir");
    let warehouse = open_warehouse(&dir);
    let (publisher, subscription) = InProcessChannel::bounded(8);
    let processor = StreamProcessor::new(subscription, Arc::new(warehouse.clone()));

    publisher
        .publish(br#"{"symbol":"AAPL","price":210.0}"#.to_vec())
        .await
        .expect("publish confirmed");
    drop(publisher);

    let stats = processor.run().await;

    assert_eq!(stats.written, 1);
    let rows = warehouse.fetch_ticks(10).expect("fetch");
    assert_eq!(rows[0].timestamp, None);
    assert_eq!(rows[0].processing_status, "processed");
}
