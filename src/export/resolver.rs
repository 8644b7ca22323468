use crate::export::{ExportFormat, Exporter, FormatId, FormatList};
use crate::io::{Messages, ProviderRegistry};
use crate::models::ObjectItem;
use std::path::MAIN_SEPARATOR;
use std::sync::Arc;

/// Steps of an export attempt. `Ok`, `ProviderError` and `NoProviderFound`
/// are terminal; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Requested,
    ResolvingProvider,
    ProviderFound,
    Delegating,
    Ok,
    ProviderError,
    NoProviderFound,
}

impl ExportState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExportState::Ok | ExportState::ProviderError | ExportState::NoProviderFound
        )
    }
}

/// Routes export requests to the exporter implementing a format.
///
/// Failures never panic nor return `Err`: the result is `None` and a
/// message is appended to the caller's list.
pub struct ExportResolver<'a> {
    registry: &'a ProviderRegistry,
}

impl<'a> ExportResolver<'a> {
    pub fn new(registry: &'a ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Every format offered by the registered exporters.
    ///
    /// Exporters are visited in registration order; the formats of one
    /// exporter keep their declaration order.
    pub fn get_formats(&self) -> Vec<ExportFormat> {
        self.registry
            .exporters()
            .iter()
            .flat_map(normalize_formats)
            .collect()
    }

    /// The exporter of the first format whose id matches.
    pub fn find_exporter(&self, format: &FormatId) -> Option<Arc<dyn Exporter>> {
        self.get_formats()
            .into_iter()
            .find(|f| f.id() == format)
            .map(|f| Arc::clone(f.exporter()))
    }

    /// Serialize `item` to a string in `format`.
    pub fn to_buffer(
        &self,
        item: &ObjectItem,
        format: &FormatId,
        messages: &mut Messages,
    ) -> Option<String> {
        let (state, buffer) = self.run(item, format, messages, |exporter, messages| {
            let Some(capability) = exporter.buffer_export() else {
                messages.push(format!(
                    "Exporter {} doesn't implement 'to_buffer' interface.",
                    exporter_name(exporter)
                ));
                return None;
            };
            capability.to_buffer(item, format, messages)
        });
        tracing::debug!("Export of {} to buffer as {}: {:?}", item.id(), format, state);
        buffer
    }

    /// Export `item` into `folder_uri` in `format`.
    ///
    /// Returns the URI of the written file: the folder, the platform
    /// separator and the basename chosen by the exporter.
    pub fn to_file(
        &self,
        item: &ObjectItem,
        folder_uri: &str,
        format: &FormatId,
        messages: &mut Messages,
    ) -> Option<String> {
        let (state, uri) = self.run(item, format, messages, |exporter, messages| {
            let Some(capability) = exporter.file_export() else {
                messages.push(format!(
                    "Exporter {} doesn't implement 'to_file' interface.",
                    exporter_name(exporter)
                ));
                return None;
            };
            capability
                .to_file(item, folder_uri, format, messages)
                .map(|basename| format!("{folder_uri}{MAIN_SEPARATOR}{basename}"))
        });
        tracing::debug!(
            "Export of {} to {} as {}: {:?}",
            item.id(),
            folder_uri,
            format,
            state
        );
        uri
    }

    fn run<F>(
        &self,
        item: &ObjectItem,
        format: &FormatId,
        messages: &mut Messages,
        delegate: F,
    ) -> (ExportState, Option<String>)
    where
        F: FnOnce(&dyn Exporter, &mut Messages) -> Option<String>,
    {
        let mut state = ExportState::Requested;
        tracing::trace!("{} {}: {:?}", item.kind(), item.id(), state);

        state = ExportState::ResolvingProvider;
        tracing::trace!("{} {}: {:?}", item.kind(), item.id(), state);
        let Some(exporter) = self.find_exporter(format) else {
            messages.push(format!("No exporter implementation found for {format} format."));
            self.registry.metrics().record_export(false);
            return (ExportState::NoProviderFound, None);
        };

        state = ExportState::ProviderFound;
        tracing::trace!("{} {}: {:?} ({})", item.kind(), item.id(), state, exporter.id());

        state = ExportState::Delegating;
        tracing::trace!("{} {}: {:?}", item.kind(), item.id(), state);
        let output = delegate(exporter.as_ref(), messages);

        state = if output.is_some() {
            ExportState::Ok
        } else {
            ExportState::ProviderError
        };
        self.registry.metrics().record_export(output.is_some());
        (state, output)
    }
}

fn exporter_name(exporter: &dyn Exporter) -> String {
    let name = exporter.name();
    if name.is_empty() {
        exporter.id().to_string()
    } else {
        name
    }
}

/// Turn an exporter's own format list into uniform descriptors.
///
/// Version 1 arrays are read up to their sentinel; version 2 lists are
/// handed back to the exporter once copied.
fn normalize_formats(exporter: &Arc<dyn Exporter>) -> Vec<ExportFormat> {
    let list = exporter.formats();
    let declared = exporter.version();

    match list {
        FormatList::V1(legacy) => {
            if declared != 1 {
                tracing::warn!(
                    "Exporter {} declares version {} but returned version 1 formats",
                    exporter.id(),
                    declared
                );
            }
            legacy
                .iter()
                .map_while(|entry| entry.format.map(|format| (entry, format)))
                .map(|(entry, format)| ExportFormat::from_legacy(entry, format, exporter))
                .collect()
        }
        FormatList::V2(formats) => {
            if declared < 2 {
                tracing::warn!(
                    "Exporter {} declares version {} but returned version 2 formats",
                    exporter.id(),
                    declared
                );
            }
            let normalized = formats
                .iter()
                .map(|format| ExportFormat::from_v2(format, exporter))
                .collect();
            exporter.release_formats(formats);
            normalized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExporterFormat, InterfaceVersion, LegacyFormat};

    struct Legacy;

    static LEGACY_FORMATS: [LegacyFormat; 3] = [
        LegacyFormat {
            format: Some("Legacy1"),
            label: "Legacy one",
            description: "",
        },
        LegacyFormat::SENTINEL,
        LegacyFormat {
            format: Some("AfterSentinel"),
            label: "never read",
            description: "",
        },
    ];

    impl Exporter for Legacy {
        fn id(&self) -> &str {
            "legacy"
        }

        fn formats(&self) -> FormatList {
            FormatList::V1(&LEGACY_FORMATS)
        }
    }

    struct Modern;

    impl Exporter for Modern {
        fn id(&self) -> &str {
            "modern"
        }

        fn version(&self) -> u32 {
            2
        }

        fn formats(&self) -> FormatList {
            FormatList::V2(vec![
                ExporterFormat {
                    format: "ModernA".to_string(),
                    label: "A".to_string(),
                    description: String::new(),
                    icon: None,
                },
                ExporterFormat {
                    format: "ModernB".to_string(),
                    label: "B".to_string(),
                    description: String::new(),
                    icon: Some("text-x-generic".to_string()),
                },
            ])
        }
    }

    #[test]
    fn test_legacy_formats_stop_at_sentinel() {
        let exporter: Arc<dyn Exporter> = Arc::new(Legacy);
        let formats = normalize_formats(&exporter);
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].id().as_str(), "Legacy1");
        assert_eq!(formats[0].version(), InterfaceVersion::V1);
    }

    #[test]
    fn test_v2_formats_keep_declaration_order() {
        let exporter: Arc<dyn Exporter> = Arc::new(Modern);
        let formats = normalize_formats(&exporter);
        let ids: Vec<&str> = formats.iter().map(|f| f.id().as_str()).collect();
        assert_eq!(ids, vec!["ModernA", "ModernB"]);
        assert_eq!(formats[1].icon(), Some("text-x-generic"));
        assert!(formats.iter().all(|f| f.version() == InterfaceVersion::V2));
    }

    #[test]
    fn test_terminal_states() {
        assert!(ExportState::Ok.is_terminal());
        assert!(ExportState::NoProviderFound.is_terminal());
        assert!(!ExportState::Delegating.is_terminal());
    }
}
