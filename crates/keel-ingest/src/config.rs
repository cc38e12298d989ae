use serde::{Deserialize, Serialize};

/// Errors from loading or validating an [`IngestConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tuning for the ingestion processors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows per bulk insert call.
    pub max_batch_size: usize,
    /// Distinct buffered keys that trigger an incremental flush.
    pub flush_threshold: usize,
    /// Whether bootstrap checks for an already-populated table and falls
    /// back to per-row upserts when it finds one.
    pub check_bootstrap_table_count: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100_000,
            flush_threshold: 10_000,
            check_bootstrap_table_count: true,
        }
    }
}

impl IngestConfig {
    /// Parse from TOML. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_batch_size",
                reason: "must be greater than zero".into(),
            });
        }
        if self.flush_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "flush_threshold",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}
