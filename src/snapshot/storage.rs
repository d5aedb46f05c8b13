use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

use super::SnapshotSink;

/// Saves snapshots as files in a local directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// A sink writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Names come off the printer, so anything but a single plain file name is
/// refused.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

impl SnapshotSink for DirectorySink {
    async fn store(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        if !is_plain_file_name(name) {
            anyhow::bail!("refusing to write {:?}: not a plain file name", name);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let path = self.dir.join(name);
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "saved snapshot");
        Ok(path)
    }
}
