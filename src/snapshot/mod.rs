//! Picking and downloading the printer's current camera snapshot.
//!
//! While recording, printers drop a small JPEG thumbnail on the SD card every
//! few minutes, named after the moment it was taken. The selector lists the
//! camera thumbnail directory (and the timelapse one if the first has nothing
//! usable), keeps only names whose timestamp falls inside a
//! [`ValidityWindow`], and picks the latest.

mod ftps;
mod listing;
mod storage;
mod timestamp;
mod window;

use std::{future::Future, path::PathBuf};

use anyhow::Result;
use bytes::Bytes;
use chrono::{Duration, NaiveDateTime};

pub use ftps::{FtpsSource, FTPS_PORT};
pub use listing::{parse_listing_line, RemoteFileEntry};
pub use storage::DirectorySink;
pub use timestamp::parse_timestamp;
pub use window::ValidityWindow;

/// Where thumbnails live, in the order they are searched.
pub const SNAPSHOT_DIRECTORIES: [&str; 2] = ["/ipcam/thumbnail", "/timelapse/thumbnail"];

/// The stable name every fetched snapshot is also saved under.
pub const LATEST_SNAPSHOT_NAME: &str = "latest_snapshot.jpg";

/// Read access to the printer's file store.
pub trait SnapshotSource {
    /// Raw `LIST` lines for a directory.
    fn list(&self, directory: &str) -> impl Future<Output = Result<Vec<String>>>;

    /// The full contents of a file, by absolute path.
    fn retrieve(&self, path: &str) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Somewhere to keep downloaded snapshots.
pub trait SnapshotSink {
    /// Persist `data` under `name`, returning where it ended up.
    fn store(&self, name: &str, data: &[u8]) -> impl Future<Output = Result<PathBuf>>;
}

/// The file chosen by [`select_latest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// The directory the file was listed in.
    pub directory: String,
    /// The file name.
    pub name: String,
    /// The recording time from the file name.
    pub timestamp: NaiveDateTime,
}

impl SnapshotEntry {
    /// Absolute path of the file on the printer.
    pub fn remote_path(&self) -> String {
        format!("{}/{}", self.directory.trim_end_matches('/'), self.name)
    }
}

/// A downloaded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The image bytes.
    pub data: Bytes,
    /// The name of the file on the printer.
    pub filename: String,
    /// The recording time from the file name.
    pub timestamp: NaiveDateTime,
    /// Everywhere the image was written.
    pub saved: Vec<PathBuf>,
}

impl Snapshot {
    /// Whether the data starts with the JPEG start-of-image marker.
    pub fn is_jpeg(&self) -> bool {
        self.data.starts_with(&[0xFF, 0xD8])
    }

    /// How long ago the snapshot was taken.
    pub fn age(&self, now: NaiveDateTime) -> Duration {
        now - self.timestamp
    }
}

/// Failures that end a snapshot fetch.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The selected file could not be downloaded.
    #[error("downloading {path} failed")]
    Transfer {
        /// The remote path.
        path: String,
        /// Why.
        #[source]
        source: anyhow::Error,
    },
    /// The downloaded file could not be saved.
    #[error("saving snapshot as {name} failed")]
    Storage {
        /// The name it was being saved under.
        name: String,
        /// Why.
        #[source]
        source: anyhow::Error,
    },
}

/// Find the latest valid snapshot.
///
/// Directories are listed one at a time, in order, and the search stops at
/// the first directory holding at least one valid snapshot. A directory that
/// cannot be listed counts as empty. Among equally recent snapshots the one
/// listed first wins.
pub async fn select_latest<S: SnapshotSource>(
    source: &S,
    directories: &[&str],
    window: &ValidityWindow,
    now: NaiveDateTime,
) -> Option<SnapshotEntry> {
    for directory in directories {
        let lines = match source.list(directory).await {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!(directory, "could not list directory: {:#}", err);
                continue;
            }
        };

        let mut latest: Option<SnapshotEntry> = None;
        for entry in lines.iter().filter_map(|line| RemoteFileEntry::from_listing_line(line)) {
            if !window.is_valid(entry.parsed_timestamp, now) {
                continue;
            }
            let Some(timestamp) = entry.parsed_timestamp else {
                continue;
            };
            if latest.as_ref().map_or(true, |best| timestamp > best.timestamp) {
                latest = Some(SnapshotEntry {
                    directory: directory.to_string(),
                    name: entry.name,
                    timestamp,
                });
            }
        }

        if let Some(latest) = latest {
            tracing::debug!(directory, name = %latest.name, "selected snapshot");
            return Some(latest);
        }
        tracing::debug!(directory, lines = lines.len(), "no valid snapshots");
    }

    None
}

/// Download `entry` and save it twice: as [`LATEST_SNAPSHOT_NAME`] and under
/// its own name. Both writes have to succeed.
pub async fn fetch_and_save<S: SnapshotSource, K: SnapshotSink>(
    source: &S,
    sink: &K,
    entry: &SnapshotEntry,
) -> Result<Snapshot, SnapshotError> {
    let path = entry.remote_path();
    let data = source
        .retrieve(&path)
        .await
        .map_err(|source| SnapshotError::Transfer {
            path: path.clone(),
            source,
        })?;
    tracing::debug!(path, bytes = data.len(), "downloaded snapshot");

    let mut saved = Vec::with_capacity(2);
    for name in [LATEST_SNAPSHOT_NAME, entry.name.as_str()] {
        let written = sink
            .store(name, &data)
            .await
            .map_err(|source| SnapshotError::Storage {
                name: name.to_string(),
                source,
            })?;
        saved.push(written);
    }

    Ok(Snapshot {
        data: Bytes::from(data),
        filename: entry.name.clone(),
        timestamp: entry.timestamp,
        saved,
    })
}

/// Select the latest valid snapshot from [`SNAPSHOT_DIRECTORIES`] and save
/// it. `Ok(None)` means nothing valid was found.
pub async fn fetch_latest<S: SnapshotSource, K: SnapshotSink>(
    source: &S,
    sink: &K,
    window: &ValidityWindow,
    now: NaiveDateTime,
) -> Result<Option<Snapshot>, SnapshotError> {
    match select_latest(source, &SNAPSHOT_DIRECTORIES, window, now).await {
        Some(entry) => fetch_and_save(source, sink, &entry).await.map(Some),
        None => Ok(None),
    }
}
