use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::ReinConfig;

pub const DEFAULT_CONFIG_FILE: &str = "rein.toml";

/// Loads the Rein rule configuration once and hands out shared read-only copies.
pub struct ConfigLoader {
    config: Arc<ReinConfig>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > REIN_CONFIG env > <root>/rein.toml
    pub fn resolve_path(explicit: Option<&Path>, root: &Path) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("REIN_CONFIG") {
            return PathBuf::from(p);
        }
        root.join(DEFAULT_CONFIG_FILE)
    }

    /// Load the config from disk. A missing or unreadable rules file degrades
    /// to defaults; a file that parses but fails validation is an error.
    pub fn load(path: Option<&Path>, root: &Path) -> rein_core::Result<Self> {
        let config_path = Self::resolve_path(path, root);
        let config = if config_path.exists() {
            info!(?config_path, "loading rules");
            match std::fs::read_to_string(&config_path)
                .map_err(|e| e.to_string())
                .and_then(|raw| Self::parse(&raw, &config_path))
            {
                Ok(config) => config,
                Err(e) => {
                    warn!(?config_path, error = %e, "rules file unusable, using defaults");
                    ReinConfig::default()
                }
            }
        } else {
            warn!(?config_path, "rules file not found, using defaults");
            ReinConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(rein_core::ReinError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(config),
            config_path,
        })
    }

    /// Parse a rules document; `.json` files are read as JSON, anything else as TOML.
    pub fn parse(raw: &str, path: &Path) -> Result<ReinConfig, String> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(raw)
                .map_err(|e| format!("failed to parse {}: {}", path.display(), e))
        } else {
            toml::from_str(raw).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
        }
    }

    /// Get a shared handle to the loaded config.
    pub fn shared(&self) -> Arc<ReinConfig> {
        Arc::clone(&self.config)
    }

    /// Get an owned snapshot of the loaded config.
    pub fn get(&self) -> ReinConfig {
        (*self.config).clone()
    }

    /// Path the config was (or would have been) read from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (REIN_AUTO_THRESHOLD, REIN_LOG_LEVEL, etc.)
    fn apply_env_overrides(mut config: ReinConfig) -> ReinConfig {
        if let Ok(v) = std::env::var("REIN_AUTO_THRESHOLD") {
            if let Ok(t) = v.parse::<f64>() {
                config.autonomy.auto_threshold = t;
            }
        }
        if let Ok(v) = std::env::var("REIN_NOTIFY_THRESHOLD") {
            if let Ok(t) = v.parse::<f64>() {
                config.autonomy.notify_threshold = t;
            }
        }
        if let Ok(v) = std::env::var("REIN_MAX_QUEUE_SIZE") {
            if let Ok(size) = v.parse::<usize>() {
                config.batching.max_queue_size = size;
            }
        }
        if let Ok(v) = std::env::var("REIN_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("REIN_STATE_DIR") {
            config.persistence.state_dir = PathBuf::from(v);
        }
        config
    }
}
