//! Loading of delimited log exports (firewall event tables, Wireshark CSV).

pub mod error;
pub mod parse;
pub mod row;

pub use parse::{TableOptions, load_table};
pub use row::Table;
