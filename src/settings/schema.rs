//! Settings schema definitions for framepilot configuration.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Root settings structure.
///
/// Loaded from `~/.framepilot/settings.toml` with environment variable interpolation support.
/// Version field enables future migrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Presentation of the embedded frame
    pub frame: FrameSection,

    /// Host connection settings
    pub host: HostSettings,

    /// Wallet provider discovery
    pub discovery: DiscoverySettings,

    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FrameSection {
    /// Frame title (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// How long to wait for each host response
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Subscribe to wallet provider announcements during bootstrap
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: "error" | "warn" | "info" | "debug" | "trace"
    pub level: String,
}

// =============================================================================
// Default implementations
// =============================================================================

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            version: 1,
            frame: FrameSection::default(),
            host: HostSettings::default(),
            discovery: DiscoverySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
