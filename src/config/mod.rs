//! Configuration module for SpendGuard
//!
//! - XDG-compliant path resolution
//! - User settings persistence (currency, timeouts, warning threshold, log filter)

pub mod paths;
pub mod settings;

pub use paths::SpendPaths;
pub use settings::Settings;
