use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Marker stamped by the stream processor on every record it forwards.
pub const PROCESSED_MARKER: &str = "processed";

/// Canonical market-quote observation flowing through the pipeline.
///
/// This is also the published wire shape: a bare JSON object with optional
/// fields omitted, no envelope and no version field. Unknown fields are
/// ignored on decode, which is where a future envelope would be introduced.
///
/// A record is immutable once published; the processor derives a new record
/// via [`TickRecord::into_processed`] instead of mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub symbol: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<String>,
    /// RFC 3339 timestamp; ingestion time when sourced from the fetcher,
    /// caller-supplied (or absent) on direct ingress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Set exactly once, by the stream processor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<String>,
}

impl TickRecord {
    /// Boundary validation applied once, right after decode.
    ///
    /// Records failing this are dropped by the processor (logged, never
    /// forwarded) and rejected with 400 by the gateway's direct-ingest path.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if !self.price.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }
        if self.price < 0.0 {
            return Err(ValidationError::NegativeValue { field: "price" });
        }
        Ok(())
    }

    /// Derive the enriched record forwarded to the sink.
    ///
    /// The constant marker is the current extent of enrichment; stateful or
    /// windowed analysis would slot in here. It never filters on content.
    #[must_use]
    pub fn into_processed(self) -> Self {
        Self {
            processing_status: Some(String::from(PROCESSED_MARKER)),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted_from_wire_json() {
        let record = TickRecord {
            symbol: String::from("IBM"),
            price: 150.0,
            volume: None,
            change_percent: None,
            timestamp: None,
            processing_status: None,
        };

        let json = serde_json::to_string(&record).expect("serializes");
        assert_eq!(json, r#"{"symbol":"IBM","price":150.0}"#);
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let record: TickRecord =
            serde_json::from_str(r#"{"symbol":"IBM","price":1.5,"exchange":"NYSE"}"#)
                .expect("decodes");
        assert_eq!(record.symbol, "IBM");
        assert_eq!(record.volume, None);
    }

    #[test]
    fn into_processed_stamps_marker_and_keeps_fields() {
        let record = TickRecord {
            symbol: String::from("IBM"),
            price: 150.0,
            volume: Some(1000),
            change_percent: Some(String::from("-0.5%")),
            timestamp: Some(String::from("2026-08-27T12:00:00Z")),
            processing_status: None,
        };

        let processed = record.clone().into_processed();
        assert_eq!(processed.processing_status.as_deref(), Some(PROCESSED_MARKER));
        assert_eq!(processed.symbol, record.symbol);
        assert_eq!(processed.volume, record.volume);
    }

    #[test]
    fn validate_rejects_blank_symbol_and_negative_price() {
        let blank = TickRecord {
            symbol: String::from("  "),
            price: 1.0,
            volume: None,
            change_percent: None,
            timestamp: None,
            processing_status: None,
        };
        assert_eq!(blank.validate(), Err(ValidationError::EmptySymbol));

        let negative = TickRecord {
            symbol: String::from("IBM"),
            price: -1.0,
            ..blank
        };
        assert_eq!(
            negative.validate(),
            Err(ValidationError::NegativeValue { field: "price" })
        );
    }
}
