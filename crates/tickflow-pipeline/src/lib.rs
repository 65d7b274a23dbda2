//! # Tickflow Pipeline
//!
//! Streaming stage between the message channel and the warehouse. Each
//! delivery is decoded, validated, stamped with its enrichment marker, and
//! appended to the sink. A record that fails any of those steps is logged
//! and dropped; the stream itself never stops for a bad record.

pub mod processor;

pub use processor::{ProcessorStats, SinkWriter, StreamProcessor};
