//! TOML-based settings for framepilot.
//!
//! Settings are loaded from `~/.framepilot/settings.toml` with environment variable
//! interpolation support. Values missing from the file fall back to environment
//! variables through the `get_with_env_fallback` helper.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::settings::{resolve_title, SettingsManager};
//!
//! let manager = SettingsManager::new().await?;
//! let settings = manager.get().await;
//!
//! // CLI flag, then settings, then FRAMEPILOT_TITLE, then the default
//! let title = resolve_title(args.title.as_deref(), &settings);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{get_with_env_fallback, resolve_title, settings_path, SettingsManager};
pub use schema::FrameSettings;
