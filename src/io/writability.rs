//! Writability of an item.
//!
//! An item can be updated only when no lock applies, the item itself is not
//! read-only and its provider is both willing and able to write. When
//! several reasons apply, the first one in this order is reported:
//!
//! 1. the whole configuration is locked by the administrator
//! 2. no provider could be found
//! 3. the provider is locked by the administrator
//! 4. the provider is locked by the user
//! 5. the item is read-only
//! 6. the provider is not willing or not able to write
//! 7. the provider has no write capability

use crate::models::{LockPreferences, ProviderFlags};

/// Why an item is, or is not, writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritabilityStatus {
    Undetermined,
    Writable,
    ItemReadonly,
    ProviderNotWillingTo,
    NoProviderFound,
    ProviderLockedByAdmin,
    ProviderLockedByUser,
    ConfigurationLockedByAdmin,
    NoApi,
}

impl WritabilityStatus {
    pub fn is_writable(self) -> bool {
        self == WritabilityStatus::Writable
    }

    /// Tooltip explaining why an item cannot be edited.
    pub fn tooltip(self) -> &'static str {
        match self {
            WritabilityStatus::Undetermined => "Writability status has not been determined.",
            WritabilityStatus::Writable => "",
            WritabilityStatus::ItemReadonly => "Item is read-only.",
            WritabilityStatus::ProviderNotWillingTo => {
                "I/O provider is not willing or not able to write."
            }
            WritabilityStatus::NoProviderFound => "No writable I/O provider found.",
            WritabilityStatus::ProviderLockedByAdmin => {
                "I/O provider has been locked by the administrator."
            }
            WritabilityStatus::ProviderLockedByUser => "I/O provider has been locked by the user.",
            WritabilityStatus::ConfigurationLockedByAdmin => {
                "The whole configuration has been locked by the administrator."
            }
            WritabilityStatus::NoApi => "I/O provider does not implement the write interface.",
        }
    }
}

/// Raw write capability bits of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub willing_to_write: bool,
    pub able_to_write: bool,
    pub has_writer: bool,
}

/// Combine locks, provider flags and capabilities into a status.
///
/// `provider` is `None` when the item's provider is unknown, or when a new
/// item has no candidate provider.
pub fn evaluate(
    item_readonly: bool,
    provider: Option<(ProviderCapabilities, &ProviderFlags)>,
    locks: &LockPreferences,
) -> WritabilityStatus {
    if locks.configuration_locked {
        return WritabilityStatus::ConfigurationLockedByAdmin;
    }

    let Some((caps, flags)) = provider else {
        return WritabilityStatus::NoProviderFound;
    };

    if flags.locked {
        WritabilityStatus::ProviderLockedByAdmin
    } else if !flags.writable {
        WritabilityStatus::ProviderLockedByUser
    } else if item_readonly {
        WritabilityStatus::ItemReadonly
    } else if !caps.willing_to_write || !caps.able_to_write {
        WritabilityStatus::ProviderNotWillingTo
    } else if !caps.has_writer {
        WritabilityStatus::NoApi
    } else {
        WritabilityStatus::Writable
    }
}
