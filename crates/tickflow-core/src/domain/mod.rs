//! Domain models for the quote pipeline.

mod record;
mod symbol;

pub use record::{TickRecord, PROCESSED_MARKER};
pub use symbol::Symbol;
