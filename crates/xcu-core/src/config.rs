use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, XcuError};
use crate::paths::PATH_MAX;

/// Root configuration, loaded from `~/.config/xcu/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XcuConfig {
    pub classifier: ClassifierConfig,
    pub paths: PathsConfig,
}

/// How the libmagic handle is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Compiled signature database. `None` uses libmagic's own lookup
    /// (the `MAGIC` environment variable, then the system default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Classify the target of a symlink rather than the link itself.
    pub follow_symlinks: bool,
    /// Report unreadable files as errors instead of as descriptions.
    pub report_errors: bool,
}

/// Limits applied to every path argument before it is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Longest accepted path in bytes; longer input is cut to this length.
    pub max_len: usize,
    /// Fail the call instead of truncating silently.
    pub strict_length: bool,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            database: None,
            follow_symlinks: true,
            report_errors: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            max_len: PATH_MAX - 1,
            strict_length: false,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl XcuConfig {
    /// Standard config file path: `~/.config/xcu/config.toml`
    pub fn config_path() -> PathBuf {
        // Allow override via env var
        if let Ok(path) = std::env::var("XCU_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("xcu")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`XcuConfig::load`], but never fails: a broken config file is
    /// logged and the defaults are used. Extension load must not abort over it.
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&Self::config_path())
    }

    /// [`XcuConfig::load_or_default`] for a specific path.
    pub fn load_or_default_from(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.paths.max_len == 0 {
            return Err(XcuError::Config("paths.max_len must be at least 1".to_string()));
        }
        Ok(())
    }
}
