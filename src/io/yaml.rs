use crate::export::{BufferExport, Exporter, ExporterFormat, FileExport, FormatId, FormatList};
use crate::io::{DataDuplicator, IoProvider, ItemWriter, Messages, ProviderCode};
use crate::models::ObjectItem;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// Format id of the YAML item export.
pub const FORMAT_YAML_ITEM: &str = "YamlItem";

/// Key of the backing file path in the item provider data.
pub const PROVIDER_DATA_PATH: &str = "path";

const EXTENSION: &str = "yaml";

/// Errors of the YAML directory provider
#[derive(Error, Debug)]
pub enum YamlProviderError {
    #[error("Unable to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to delete {path}: {source}")]
    Delete {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid item in {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        source: serde_yaml_ng::Error,
    },

    #[error("Id {id:?} cannot be used as a file name")]
    InvalidId { id: String },

    #[error("Unable to serialize {id}: {source}")]
    Serialize {
        id: String,
        source: serde_yaml_ng::Error,
    },
}

/// I/O provider storing one YAML document per item in a directory.
///
/// Files are named `<id>.yaml`. An item read from a file the user cannot
/// write is flagged read-only.
#[derive(Debug, Clone)]
pub struct YamlProvider {
    dir: Utf8PathBuf,
}

impl YamlProvider {
    pub const ID: &'static str = "io-yaml";

    pub fn new<P: AsRef<Utf8Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Default location of an item. Fails for ids which would not name a
    /// file directly inside the directory.
    pub fn item_path(&self, id: &str) -> Result<Utf8PathBuf, YamlProviderError> {
        let basename = file_basename(id)?;
        Ok(self.dir.join(basename))
    }

    /// Backing file of an item: the one it was read from, else the default.
    fn backing_path(&self, item: &ObjectItem) -> Result<Utf8PathBuf, YamlProviderError> {
        match item.provenance().provider_data.get(PROVIDER_DATA_PATH) {
            Some(path) => Ok(Utf8PathBuf::from(path)),
            None => self.item_path(item.id()),
        }
    }

    fn list_files(&self) -> Result<Vec<Utf8PathBuf>, YamlProviderError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| YamlProviderError::Read {
            path: self.dir.clone(),
            source,
        })?;

        let mut files: Vec<Utf8PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.path()).ok())
            .filter(|path| path.is_file() && path.extension() == Some(EXTENSION))
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &Utf8Path) -> Result<ObjectItem, YamlProviderError> {
        let contents = fs::read_to_string(path).map_err(|source| YamlProviderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut item: ObjectItem =
            serde_yaml_ng::from_str(&contents).map_err(|source| YamlProviderError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let readonly = fs::metadata(path)
            .map(|m| m.permissions().readonly())
            .unwrap_or(true);
        item.set_readonly(readonly);
        item.provenance_mut()
            .provider_data
            .insert(PROVIDER_DATA_PATH.to_string(), path.to_string());
        Ok(item)
    }

    fn write_file(&self, item: &ObjectItem) -> Result<Utf8PathBuf, YamlProviderError> {
        let path = self.backing_path(item)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| YamlProviderError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let yaml = serde_yaml_ng::to_string(item).map_err(|source| {
            YamlProviderError::Serialize {
                id: item.id().to_string(),
                source,
            }
        })?;
        fs::write(&path, yaml).map_err(|source| YamlProviderError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl IoProvider for YamlProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> String {
        "YAML directory".to_string()
    }

    fn read_items(&self, messages: &mut Messages) -> Vec<ObjectItem> {
        if !self.dir.exists() {
            tracing::debug!("{} does not exist, nothing to read", self.dir);
            return Vec::new();
        }

        let files = match self.list_files() {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("{}", e);
                messages.push(e.to_string());
                return Vec::new();
            }
        };

        files
            .iter()
            .filter_map(|path| match self.read_file(path) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("{}", e);
                    messages.push(e.to_string());
                    None
                }
            })
            .collect()
    }

    fn is_willing_to_write(&self) -> bool {
        true
    }

    /// Writable when the directory, or the nearest existing ancestor it
    /// would be created in, is writable.
    fn is_able_to_write(&self) -> bool {
        self.dir
            .ancestors()
            .find(|dir| dir.exists())
            .and_then(|dir| fs::metadata(dir).ok())
            .is_some_and(|m| m.is_dir() && !m.permissions().readonly())
    }

    fn writer(&self) -> Option<&dyn ItemWriter> {
        Some(self)
    }

    fn data_duplicator(&self) -> Option<&dyn DataDuplicator> {
        Some(self)
    }
}

impl ItemWriter for YamlProvider {
    fn write_item(&self, item: &mut ObjectItem, messages: &mut Messages) -> ProviderCode {
        match self.write_file(item) {
            Ok(path) => {
                tracing::info!("Wrote {} {} to {}", item.kind(), item.id(), path);
                let provenance = item.provenance_mut();
                provenance.provider_id = Some(Self::ID.to_string());
                provenance
                    .provider_data
                    .insert(PROVIDER_DATA_PATH.to_string(), path.to_string());
                ProviderCode::Ok
            }
            Err(e) => {
                tracing::error!("{}", e);
                messages.push(e.to_string());
                ProviderCode::WriteError
            }
        }
    }

    fn delete_item(&self, item: &ObjectItem, messages: &mut Messages) -> ProviderCode {
        let path = match self.backing_path(item) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("{}", e);
                messages.push(e.to_string());
                return ProviderCode::DeleteError;
            }
        };
        if !path.exists() {
            tracing::debug!("{} already absent", path);
            return ProviderCode::Ok;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Deleted {} {} ({})", item.kind(), item.id(), path);
                ProviderCode::Ok
            }
            Err(source) => {
                let e = YamlProviderError::Delete { path, source };
                tracing::error!("{}", e);
                messages.push(e.to_string());
                ProviderCode::DeleteError
            }
        }
    }
}

impl DataDuplicator for YamlProvider {
    /// A copy with the same id shares the backing file; a renumbered copy
    /// gets its own default file.
    fn duplicate_data(
        &self,
        dest: &mut ObjectItem,
        source: &ObjectItem,
        messages: &mut Messages,
    ) -> ProviderCode {
        let path = if dest.id() == source.id() {
            self.backing_path(source)
        } else {
            self.item_path(dest.id())
        };
        let path = match path {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("{}", e);
                messages.push(e.to_string());
                return ProviderCode::WriteError;
            }
        };

        let provenance = dest.provenance_mut();
        provenance.provider_id = source.provenance().provider_id.clone();
        provenance
            .provider_data
            .insert(PROVIDER_DATA_PATH.to_string(), path.to_string());
        ProviderCode::Ok
    }
}

/// Version 2 exporter writing items as the YAML documents the
/// [`YamlProvider`] reads.
#[derive(Debug, Default)]
pub struct YamlExporter;

impl YamlExporter {
    pub const ID: &'static str = "yaml-exporter";

    pub fn new() -> Self {
        Self
    }

    fn serialize(
        &self,
        item: &ObjectItem,
        format: &FormatId,
        messages: &mut Messages,
    ) -> Option<String> {
        if format.as_str() != FORMAT_YAML_ITEM {
            messages.push(format!("{}: unsupported format {}", Self::ID, format));
            return None;
        }
        match serde_yaml_ng::to_string(item) {
            Ok(yaml) => Some(yaml),
            Err(source) => {
                let e = YamlProviderError::Serialize {
                    id: item.id().to_string(),
                    source,
                };
                messages.push(e.to_string());
                None
            }
        }
    }
}

impl Exporter for YamlExporter {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> String {
        "YAML exporter".to_string()
    }

    fn version(&self) -> u32 {
        2
    }

    fn formats(&self) -> FormatList {
        FormatList::V2(vec![ExporterFormat {
            format: FORMAT_YAML_ITEM.to_string(),
            label: "Export as a YAML document".to_string(),
            description: "Writes the item in the format read back by the YAML directory provider."
                .to_string(),
            icon: None,
        }])
    }

    fn buffer_export(&self) -> Option<&dyn BufferExport> {
        Some(self)
    }

    fn file_export(&self) -> Option<&dyn FileExport> {
        Some(self)
    }
}

impl BufferExport for YamlExporter {
    fn to_buffer(
        &self,
        item: &ObjectItem,
        format: &FormatId,
        messages: &mut Messages,
    ) -> Option<String> {
        self.serialize(item, format, messages)
    }
}

impl FileExport for YamlExporter {
    fn to_file(
        &self,
        item: &ObjectItem,
        folder: &str,
        format: &FormatId,
        messages: &mut Messages,
    ) -> Option<String> {
        let basename = match file_basename(item.id()) {
            Ok(basename) => basename,
            Err(e) => {
                messages.push(e.to_string());
                return None;
            }
        };
        let yaml = self.serialize(item, format, messages)?;
        let path = Utf8PathBuf::from(folder).join(&basename);

        if let Err(source) = fs::write(&path, yaml) {
            messages.push(YamlProviderError::Write { path, source }.to_string());
            return None;
        }
        Some(basename)
    }
}

/// `<id>.yaml`, as long as the id is a plain file name: not empty, no path
/// separator and no leading dot.
fn file_basename(id: &str) -> Result<String, YamlProviderError> {
    if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
        return Err(YamlProviderError::InvalidId { id: id.to_string() });
    }
    Ok(format!("{id}.{EXTENSION}"))
}
