//! Rust bambulabs mqtt client.
//!
//! Only the slice of the printer's LAN protocol needed for diagnostics lives
//! here: the request payloads used to wake the report stream, the report
//! payloads, and a client that waits for a single report.

#![deny(missing_docs)]

pub mod client;
pub mod command;
pub mod message;
pub mod parser;
pub mod sequence_id;
mod tls;

pub use client::{Client, ReportOutcome, TlsMode};
pub use parser::Report;
