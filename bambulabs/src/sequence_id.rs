//! The sequence id type.

use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

static NEXT_SEQUENCE_ID: AtomicU32 = AtomicU32::new(0);

/// The sequence id type.
///
/// The printer echoes whatever it was sent, and firmware versions disagree on
/// whether that is a JSON string or a number, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, FromStr)]
#[serde(untagged)]
#[display("{0}")]
pub enum SequenceId {
    /// A string sequence id.
    String(String),
    /// An integer sequence id.
    Integer(u32),
}

impl SequenceId {
    /// Take the next id from the process-wide counter, rendered as a string
    /// the way the vendor tools send it.
    pub fn new() -> Self {
        Self::String(NEXT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed).to_string())
    }

    /// Get the sequence id as a u32.
    pub fn as_u32(&self) -> Result<u32> {
        match self {
            Self::String(s) => s.parse().map_err(Into::into),
            Self::Integer(i) => Ok(*i),
        }
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}
