//! Data models for context actions.
//!
//! - [`ObjectItem`]: a top-level item, either an [`Action`] or a [`Menu`]
//! - [`Profile`]: one command line of an action and its [`Conditions`]
//! - [`Preferences`]: provider ordering, locks, import and export options
//!
//! Items are plain typed structs. Edition status (modified/valid) is not
//! stored on them; it lives on the [`Duplicate`](crate::edition::Duplicate)
//! wrapper an editor works on.

pub mod config;
pub mod item;

pub use config::{
    ExportPreferences, ImportMode, ImportPreferences, LockPreferences, LoggingPreferences,
    Preferences, ProviderFlags, ProvidersPreferences,
};
pub use item::{
    Action, Conditions, ItemKind, Menu, ObjectItem, Profile, Provenance, Targets, new_item_id,
};
