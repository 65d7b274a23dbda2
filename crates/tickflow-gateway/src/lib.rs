//! # Tickflow Gateway
//!
//! HTTP ingestion gateway bridging an inbound trigger to a confirmed publish
//! on the message channel.
//!
//! Two trigger shapes converge on the same publish contract:
//!
//! - **Direct-ingest**: the caller posts the full JSON record in the body.
//! - **Pull-ingest**: the caller posts an empty body and the gateway fetches
//!   a quote from the upstream provider itself.
//!
//! A `200` response is a delivery guarantee: it is only sent after the
//! channel has confirmed acceptance of the payload.

pub mod config;
pub mod server;

pub use config::{ConfigError, GatewayConfig, IngestMode};
pub use server::{router, GatewayState};
