//! Runtime configuration for the WordNet engine.
//!
//! The specification calls out a process-wide, write-once configuration
//! object holding the active data directory. Rather than a global, this
//! crate exposes it as an explicit context struct passed into constructors
//! (`Wordnet::open`, `Ingestor::new`), with `Config::default()` as a
//! convenience that resolves the OS-appropriate data directory the way the
//! teacher's `get_default_db_path` did.

use crate::error::{Error, Result};
use directories_next::ProjectDirs;
use std::path::{Path, PathBuf};

/// Where the engine keeps its persisted state: the store file, a
/// `downloads/` cache directory, and a copy of the project index.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory under which `wn.db`, `downloads/`, and `index.toml` live.
    pub data_dir: PathBuf,
}

impl Config {
    /// Builds a configuration rooted at an explicit directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
        }
    }

    /// Resolves the default OS data directory (`$HOME/.wn_ts_data`-equivalent
    /// per-platform location via `directories-next`).
    pub fn default_data_dir() -> Result<PathBuf> {
        let dirs =
            ProjectDirs::from("org", "GlobalWordnet", "wn-engine").ok_or(Error::DataDirNotFound)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("wn.db")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }

    pub fn project_index_path(&self) -> PathBuf {
        self.data_dir.join("index.toml")
    }

    /// Ensures the data directory (and `downloads/`) exist on disk.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.downloads_dir())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        match Self::default_data_dir() {
            Ok(dir) => Config::new(dir),
            Err(_) => Config::new(Path::new(".wn_ts_data")),
        }
    }
}
