//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the speech
//! services and audio capture, `AppPaths` for cross-platform directories,
//! and TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{ApiConfig, AppConfig, AudioConfig};
