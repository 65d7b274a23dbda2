//! # Tickflow Core
//!
//! Core contracts and domain types for the tickflow quote pipeline.
//!
//! ## Overview
//!
//! This crate provides the foundational components shared by the ingestion
//! gateway and the stream processor:
//!
//! - **Canonical tick record** published on the message channel
//! - **Quote fetcher** for the upstream provider with a tri-state outcome
//! - **HTTP client abstraction** so provider calls are testable offline
//! - **Message channel seams** (publish/confirm, subscribe/receive) with a
//!   bundled in-process transport
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | Publisher/subscription traits and the in-process channel |
//! | [`domain`] | Domain models (`TickRecord`, `Symbol`) |
//! | [`error`] | Validation errors |
//! | [`fetcher`] | Provider quote fetcher and `FetchOutcome` |
//! | [`http_client`] | HTTP client abstraction |
//!
//! ## Data flow
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │ QuoteFetcher │────▶│ Ingestion       │────▶│ Message Channel  │
//! │ (provider)   │     │ Gateway (HTTP)  │     │ (at-least-once)  │
//! └──────────────┘     └─────────────────┘     └────────┬─────────┘
//!                                                       │
//!                                                       ▼
//!                                              ┌──────────────────┐
//!                                              │ Stream Processor │
//!                                              │ → warehouse sink │
//!                                              └──────────────────┘
//! ```
//!
//! ## Security
//!
//! The provider API key is wrapped in [`ApiKey`], which redacts on `Debug`,
//! and provider URLs are sanitized with [`fetcher::sanitize_endpoint`] before
//! they reach any log line.

pub mod channel;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http_client;

// Channel seams and the bundled in-process transport
pub use channel::{
    ChannelError, ChannelPublisher, ChannelSubscription, Delivery, InProcessChannel,
    InProcessPublisher, InProcessSubscription, PublishReceipt,
};

// Domain models
pub use domain::{Symbol, TickRecord, PROCESSED_MARKER};

// Error types
pub use error::ValidationError;

// Fetcher and outcome classification
pub use fetcher::{sanitize_endpoint, ApiKey, FetchOutcome, QuoteFetcher, DEFAULT_SYMBOL};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};
