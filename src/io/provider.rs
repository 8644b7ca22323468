use crate::models::ObjectItem;

/// Human-readable diagnostics accumulated by an operation.
///
/// Providers and the registry only ever append to it.
pub type Messages = Vec<String>;

/// Result code of a provider write, delete or data duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderCode {
    Ok,
    /// The caller or the provider broke a contract.
    ProgramError,
    /// The provider does not want to do the requested operation.
    NotWillingToRun,
    WriteError,
    DeleteError,
}

impl ProviderCode {
    pub fn is_ok(self) -> bool {
        self == ProviderCode::Ok
    }

    pub fn label(self) -> &'static str {
        match self {
            ProviderCode::Ok => "Operation was successful.",
            ProviderCode::ProgramError => "Program flow error. Please report it.",
            ProviderCode::NotWillingToRun => "The I/O provider is not willing to do that.",
            ProviderCode::WriteError => "Write error in I/O provider.",
            ProviderCode::DeleteError => "Unable to delete the item from the I/O provider.",
        }
    }
}

impl std::fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A configuration storage backend.
///
/// Every provider reads. Writing and provider-data duplication are optional
/// capabilities, queried through [`writer()`](Self::writer) and
/// [`data_duplicator()`](Self::data_duplicator).
pub trait IoProvider: Send + Sync {
    /// Stable identifier, unique among providers (e.g. `io-yaml`).
    fn id(&self) -> &str;

    /// Name displayed to the user.
    fn name(&self) -> String {
        String::new()
    }

    /// Read every item this provider stores.
    ///
    /// Returns a flat, unordered list; failures are reported by appending
    /// to `messages`.
    fn read_items(&self, messages: &mut Messages) -> Vec<ObjectItem>;

    /// Whether the provider has write support at all. Static.
    fn is_willing_to_write(&self) -> bool {
        false
    }

    /// Whether writing currently works (permissions, storage...). Runtime.
    fn is_able_to_write(&self) -> bool {
        false
    }

    fn writer(&self) -> Option<&dyn ItemWriter> {
        None
    }

    fn data_duplicator(&self) -> Option<&dyn DataDuplicator> {
        None
    }
}

/// Write capability of a provider.
pub trait ItemWriter {
    /// Write `item`, replacing any previous version with the same id.
    ///
    /// The provider records itself in the item provenance on success.
    fn write_item(&self, item: &mut ObjectItem, messages: &mut Messages) -> ProviderCode;

    fn delete_item(&self, item: &ObjectItem, messages: &mut Messages) -> ProviderCode;
}

/// Provider-data duplication capability.
pub trait DataDuplicator {
    /// Copy the provider-specific data of `source` into `dest`.
    fn duplicate_data(
        &self,
        dest: &mut ObjectItem,
        source: &ObjectItem,
        messages: &mut Messages,
    ) -> ProviderCode;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReadOnly;

    impl IoProvider for ReadOnly {
        fn id(&self) -> &str {
            "read-only"
        }

        fn read_items(&self, _messages: &mut Messages) -> Vec<ObjectItem> {
            Vec::new()
        }
    }

    #[test]
    fn test_default_capabilities() {
        let provider = ReadOnly;
        assert!(!provider.is_willing_to_write());
        assert!(!provider.is_able_to_write());
        assert!(provider.writer().is_none());
        assert!(provider.data_duplicator().is_none());
        assert!(provider.name().is_empty());
    }

    #[test]
    fn test_code_labels() {
        assert!(ProviderCode::Ok.is_ok());
        assert!(!ProviderCode::WriteError.is_ok());
        assert_eq!(
            ProviderCode::NotWillingToRun.to_string(),
            "The I/O provider is not willing to do that."
        );
    }
}
