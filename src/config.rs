use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "hf-advisor";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_ENTITY_URL: &str = "HF_ADVISOR_ENTITY_URL";
pub const ENV_ENTITY_TIMEOUT: &str = "HF_ADVISOR_ENTITY_TIMEOUT_SECS";
pub const ENV_RULES: &str = "HF_ADVISOR_RULES";

pub const DEFAULT_ENTITY_TIMEOUT_SECS: u64 = 10;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "hf_advisor=info"
}

/// Get the application data directory
/// ~/.hf-advisor/ when a home directory can be determined.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{APP_NAME}")))
}

/// Rule table picked up without explicit configuration.
pub fn default_rules_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("rules.json"))
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Runtime configuration assembled from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorConfig {
    /// Base URL of the remote entity service; `None` disables it.
    pub entity_url: Option<String>,
    pub entity_timeout_secs: u64,
    /// Guideline rule table; `None` means the built-in table.
    pub rules_path: Option<PathBuf>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            entity_url: None,
            entity_timeout_secs: DEFAULT_ENTITY_TIMEOUT_SECS,
            rules_path: None,
        }
    }
}

impl AdvisorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok(), default_rules_path().as_deref())
    }

    /// Build from an arbitrary variable lookup. `fallback_rules` is used when
    /// `HF_ADVISOR_RULES` is unset and the file exists.
    pub fn from_vars(
        lookup: impl Fn(&str) -> Option<String>,
        fallback_rules: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let entity_timeout_secs = match non_empty(ENV_ENTITY_TIMEOUT) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: ENV_ENTITY_TIMEOUT,
                        value: raw,
                    })
                }
            },
            None => DEFAULT_ENTITY_TIMEOUT_SECS,
        };

        let rules_path = non_empty(ENV_RULES).map(PathBuf::from).or_else(|| {
            fallback_rules
                .filter(|path| path.is_file())
                .map(Path::to_path_buf)
        });

        Ok(Self {
            entity_url: non_empty(ENV_ENTITY_URL),
            entity_timeout_secs,
            rules_path,
        })
    }
}
