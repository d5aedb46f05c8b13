#![allow(refining_impl_trait)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

//! This crate implements diagnostics for Bambu Lab printers on the local
//! network: finding them, reading their MQTT status, pulling the current
//! camera snapshot off the SD card, and handing a printer's details to the
//! companion display.

pub mod config;
pub mod discover;
pub mod provision;
pub mod snapshot;
pub mod status;

pub use config::Config;
pub use snapshot::{Snapshot, SnapshotEntry, SnapshotError, ValidityWindow};
