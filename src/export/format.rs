use crate::export::Exporter;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

static FORMAT_IDS: OnceLock<Mutex<HashSet<Arc<str>>>> = OnceLock::new();

/// Interned export format identifier.
///
/// Two ids built from the same string share one allocation, so comparing
/// them is a pointer comparison in the common case.
#[derive(Clone, Eq)]
pub struct FormatId(Arc<str>);

impl FormatId {
    pub fn new(format: &str) -> Self {
        let mut interned = FORMAT_IDS
            .get_or_init(|| Mutex::new(HashSet::new()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = interned.get(format) {
            return Self(Arc::clone(existing));
        }
        let id: Arc<str> = Arc::from(format);
        interned.insert(Arc::clone(&id));
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for FormatId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl std::hash::Hash for FormatId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormatId({:?})", &*self.0)
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FormatId {
    fn from(format: &str) -> Self {
        FormatId::new(format)
    }
}

/// Exporter interface version which produced a format descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceVersion {
    V1,
    V2,
}

/// Version 1 format descriptor.
///
/// Version 1 exporters publish a static array of these, terminated by
/// [`LegacyFormat::SENTINEL`]. Entries after the sentinel are never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyFormat {
    pub format: Option<&'static str>,
    pub label: &'static str,
    pub description: &'static str,
}

impl LegacyFormat {
    pub const SENTINEL: LegacyFormat = LegacyFormat {
        format: None,
        label: "",
        description: "",
    };
}

/// Version 2 format descriptor, owned by the exporter until released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterFormat {
    pub format: String,
    pub label: String,
    pub description: String,
    pub icon: Option<String>,
}

/// What an exporter returns when asked for its formats.
#[derive(Debug)]
pub enum FormatList {
    V1(&'static [LegacyFormat]),
    V2(Vec<ExporterFormat>),
}

/// Uniform format descriptor, whatever the exporter interface version.
#[derive(Clone)]
pub struct ExportFormat {
    id: FormatId,
    label: String,
    description: String,
    icon: Option<String>,
    version: InterfaceVersion,
    exporter: Arc<dyn Exporter>,
}

impl ExportFormat {
    pub(crate) fn from_legacy(legacy: &LegacyFormat, format: &str, exporter: &Arc<dyn Exporter>) -> Self {
        Self {
            id: FormatId::new(format),
            label: legacy.label.to_string(),
            description: legacy.description.to_string(),
            icon: None,
            version: InterfaceVersion::V1,
            exporter: Arc::clone(exporter),
        }
    }

    pub(crate) fn from_v2(format: &ExporterFormat, exporter: &Arc<dyn Exporter>) -> Self {
        Self {
            id: FormatId::new(&format.format),
            label: format.label.clone(),
            description: format.description.clone(),
            icon: format.icon.clone(),
            version: InterfaceVersion::V2,
            exporter: Arc::clone(exporter),
        }
    }

    pub fn id(&self) -> &FormatId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn version(&self) -> InterfaceVersion {
        self.version
    }

    pub fn exporter(&self) -> &Arc<dyn Exporter> {
        &self.exporter
    }
}

impl fmt::Debug for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportFormat")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("version", &self.version)
            .field("exporter", &self.exporter.id())
            .finish()
    }
}
