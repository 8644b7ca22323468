// Context Actions - user-defined file manager context menu actions
//
// This is the library crate: item model, edition tracking, I/O providers,
// export formats and the selection services. The binary crate (main.rs)
// provides the command line entry point.

pub mod config;
pub mod edition;
pub mod export;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use edition::{Duplicable, Duplicate, EditionChange, EditionConsumer, EditionTracker};
pub use export::{ExportFormat, ExportResolver, FormatId};
pub use io::{IoProvider, Messages, ProviderCode, ProviderRegistry, WritabilityStatus};
pub use metrics::Metrics;
pub use models::{Action, Menu, ObjectItem, Preferences, Profile};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
