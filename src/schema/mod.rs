//! Raw event table schema
//!
//! This module defines the tabular input boundary of the engine: the required
//! column set, the row representation, and parsers for JSON and NDJSON rows.

mod adapter;
mod raw_table;

pub use adapter::*;
pub use raw_table::*;
