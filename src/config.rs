//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `config.toml` in the platform config dir)
//! 3. `CERTSCAN_*` environment variables
//! 4. CLI flags (applied by the caller)
//!
//! ```toml
//! cooldown_ms = 1500
//! frame_interval_ms = 33
//! facing = "user"
//! verify_origin = "https://etat-civil.example"
//! timeout_secs = 120
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scan::{Facing, PipelineSettings};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CERTSCAN_";

/// Default origin of the verification site (the web app's dev server).
pub const DEFAULT_VERIFY_ORIGIN: &str = "http://localhost:5173";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cool-down after an unusable QR payload, in milliseconds.
    pub cooldown_ms: u64,
    /// Time between frame samples during live capture, in milliseconds.
    pub frame_interval_ms: u64,
    /// Preferred camera orientation.
    pub facing: Facing,
    /// Origin under which verification links are built.
    pub verify_origin: String,
    /// Give up live capture after this many seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cooldown_ms: 2000,
            frame_interval_ms: 16,
            facing: Facing::Environment,
            verify_origin: DEFAULT_VERIFY_ORIGIN.to_string(),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from an explicit file or the default location.
    ///
    /// Falls back to defaults (still honoring the environment) if the file
    /// is invalid.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = explicit.map(Path::to_path_buf).or_else(Self::config_path);
        match Self::figment(path.as_deref()).extract() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::figment(None).extract().unwrap_or_default()
            }
        }
    }

    /// Load configuration from a specific file plus the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(Some(path.as_ref())).extract()
    }

    /// Build the layered figment: defaults < file < environment.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            log::debug!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "certscan", "certscan")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Cool-down as a duration.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Frame interval as a duration.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Pipeline settings derived from this configuration.
    #[must_use]
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings::default()
            .with_cooldown(self.cooldown())
            .with_facing(self.facing)
    }
}
