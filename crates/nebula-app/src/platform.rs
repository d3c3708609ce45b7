//! Where the demo keeps its files on each OS.

use std::io;
use std::path::{Path, PathBuf};

/// Errors resolving or creating the application directories.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("could not determine OS configuration directory")]
    NoConfigDir,
    #[error("platform I/O error: {0}")]
    Io(#[from] io::Error),
}

/// OS-specific directories (XDG on Linux, Known Folders on Windows,
/// Library on macOS).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// Holds user trail catalogs.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

const APP_NAME: &str = "nebula-effects";

/// File name looked up in [`PlatformDirs::data_dir`] when the config names
/// no trail catalog.
pub const CATALOG_FILE_NAME: &str = "trails.ron";

impl PlatformDirs {
    /// Resolve directories without touching the disk.
    pub fn resolve() -> Result<Self, PlatformError> {
        let app_config = dirs::config_dir()
            .ok_or(PlatformError::NoConfigDir)?
            .join(APP_NAME);
        let data_dir = dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .unwrap_or_else(|| app_config.join("data"));

        Ok(Self {
            config_dir: app_config.join("config"),
            data_dir,
            log_dir: app_config.join("logs"),
        })
    }

    /// Directories rooted under `root`, used by tests and `--config`.
    pub fn resolve_with_root(root: &Path) -> Self {
        Self {
            config_dir: root.to_path_buf(),
            data_dir: root.join("data"),
            log_dir: root.join("logs"),
        }
    }

    /// Resolve from `override_dir` when given, else from the OS, and create
    /// everything on disk.
    pub fn resolve_and_create(override_dir: Option<&Path>) -> Result<Self, PlatformError> {
        let dirs = match override_dir {
            Some(root) => Self::resolve_with_root(root),
            None => Self::resolve()?,
        };
        dirs.create_dirs()?;
        Ok(dirs)
    }

    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }

    /// Trail catalog to load: `configured` if set, else `trails.ron` in the
    /// data directory when present.
    pub fn catalog_path(&self, configured: Option<&Path>) -> Option<PathBuf> {
        match configured {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default = self.data_dir.join(CATALOG_FILE_NAME);
                default.is_file().then_some(default)
            }
        }
    }
}
