//! Time normalization: turn a raw `Time` column into comparable seconds.

pub mod column;
pub mod formats;

pub use column::{DateTimePrecision, TimeColumn, TimeKind, parse_column};
