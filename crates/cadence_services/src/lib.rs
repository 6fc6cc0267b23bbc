//! Cadence Services Layer
//!
//! Host-side concerns around the kernel: settings files today.

pub mod settings;

pub use settings::{LoggingSettings, RuntimeSettings, Settings, SettingsError};
