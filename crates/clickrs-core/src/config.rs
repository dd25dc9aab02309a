// Clickrs Timing Configuration
// Hold/level window delays, owned by the host configuration layer

use std::path::Path;
use std::time::Duration;

/// Classification timing windows.
///
/// `hold_ms` is how long a press must stay down before it is consumed as a
/// hold/modifier; `level_ms` is how long the click cycle stays open for a
/// further press to continue a double/triple-click sequence. Both default to
/// 250 ms. The engine takes these by value at construction; they are sourced
/// from external configuration, not hardcoded in the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ClickTiming {
    pub hold_ms: u64,
    pub level_ms: u64,
}

impl Default for ClickTiming {
    fn default() -> Self {
        Self {
            hold_ms: Self::DEFAULT_HOLD_MS,
            level_ms: Self::DEFAULT_LEVEL_MS,
        }
    }
}

/// Errors that can occur when loading timing configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

/// TOML representation for deserializing the timing section
#[derive(Debug, Clone, serde::Deserialize, Default)]
struct ConfigToml {
    #[serde(default)]
    timing: Option<ClickTiming>,
}

impl ClickTiming {
    pub const DEFAULT_HOLD_MS: u64 = 250;
    pub const DEFAULT_LEVEL_MS: u64 = 250;

    pub fn new(hold_ms: u64, level_ms: u64) -> Self {
        Self { hold_ms, level_ms }
    }

    pub fn hold_delay(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    pub fn level_delay(&self) -> Duration {
        Duration::from_millis(self.level_ms)
    }

    /// Load the `[timing]` section from a TOML file; missing keys fall back
    /// to the defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        Ok(parsed.timing.unwrap_or_default())
    }
}
