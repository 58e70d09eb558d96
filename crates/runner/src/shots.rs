//! Tagged screenshot artifacts, one per run.

use std::{
    fs,
    path::{Path, PathBuf},
};

use {chrono::Local, tracing::info};

/// Persists PNG captures under a fixed directory, named by outcome tag plus
/// timestamp so scheduled runs never overwrite each other.
#[derive(Debug, Clone)]
pub struct ShotStore {
    dir: PathBuf,
}

impl ShotStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one capture; returns the path written to.
    pub fn save(&self, tag: &str, png: &[u8]) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let filename = format!("{tag}_{}.png", Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(filename);
        fs::write(&path, png)?;
        info!(path = %path.display(), bytes = png.len(), "saved screenshot");
        Ok(path)
    }
}
