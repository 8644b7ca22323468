use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// User preferences from `preferences.yaml`, optionally overridden by
/// `CONTEXT_ACTIONS__*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub providers: ProvidersPreferences,
    pub locks: LockPreferences,
    pub import: ImportPreferences,
    pub export: ExportPreferences,
    pub logging: LoggingPreferences,
}

/// Ordering and per-provider flags of the I/O providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersPreferences {
    /// Provider ids in the order they are read and offered for writing.
    /// Providers not listed come after, in registration order.
    pub order: Vec<String>,

    /// Per-provider flags, keyed by provider id.
    pub flags: IndexMap<String, ProviderFlags>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderFlags {
    /// Whether the provider is read when items are loaded.
    pub read_at_startup: bool,

    /// The user allows writing through this provider.
    pub writable: bool,

    /// The administrator has locked this provider.
    pub locked: bool,
}

impl Default for ProviderFlags {
    fn default() -> Self {
        Self {
            read_at_startup: true,
            writable: true,
            locked: false,
        }
    }
}

/// Global locks set by an administrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LockPreferences {
    /// The whole configuration is read-only.
    pub configuration_locked: bool,
}

/// How an imported item whose id already exists is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Skip the imported item.
    #[default]
    NoImport,
    /// Give the imported item a fresh id.
    Renumber,
    /// Replace the existing item.
    Override,
    /// Let the caller decide item by item.
    Ask,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPreferences {
    pub mode: ImportMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportPreferences {
    /// Format used when none is given explicitly.
    pub default_format: String,
}

impl Default for ExportPreferences {
    fn default() -> Self {
        Self {
            default_format: crate::io::yaml::FORMAT_YAML_ITEM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    pub directory: String,
    pub debug: bool,

    /// Write the log file as JSON lines instead of plain text.
    pub json: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            debug: false,
            json: false,
        }
    }
}

impl Preferences {
    /// Flags of a provider; providers without an entry get the defaults.
    pub fn provider_flags(&self, provider_id: &str) -> ProviderFlags {
        self.providers
            .flags
            .get(provider_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_flags_defaults() {
        let prefs = Preferences::default();
        let flags = prefs.provider_flags("unknown");
        assert!(flags.read_at_startup);
        assert!(flags.writable);
        assert!(!flags.locked);
    }

    #[test]
    fn test_import_mode_serialization() {
        let yaml = serde_yaml_ng::to_string(&ImportMode::Renumber).unwrap();
        assert_eq!(yaml.trim(), "renumber");

        let mode: ImportMode = serde_yaml_ng::from_str("no_import").unwrap();
        assert_eq!(mode, ImportMode::NoImport);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let prefs: Preferences =
            serde_yaml_ng::from_str("locks:\n  configuration_locked: true\n").unwrap();
        assert!(prefs.locks.configuration_locked);
        assert_eq!(prefs.logging.directory, "logs");
        assert_eq!(prefs.import.mode, ImportMode::NoImport);
    }
}
