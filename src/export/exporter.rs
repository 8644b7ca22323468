use crate::export::{FormatId, FormatList};
use crate::io::Messages;
use crate::models::ObjectItem;

/// A provider of export formats.
///
/// Exporters declare their formats through one of two interface versions:
/// version 1 publishes a static sentinel-terminated array, version 2 an
/// owned list given back through [`release_formats()`](Self::release_formats).
/// Serialization itself is an optional capability, either to a buffer or to
/// a file.
pub trait Exporter: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> String {
        String::new()
    }

    /// Interface version implemented; exporters which do not say are
    /// version 1.
    fn version(&self) -> u32 {
        1
    }

    fn formats(&self) -> FormatList;

    /// Take back a list returned by a version 2 [`formats()`](Self::formats).
    fn release_formats(&self, formats: Vec<crate::export::ExporterFormat>) {
        drop(formats);
    }

    fn buffer_export(&self) -> Option<&dyn BufferExport> {
        None
    }

    fn file_export(&self) -> Option<&dyn FileExport> {
        None
    }
}

/// Serialize an item to a string.
pub trait BufferExport {
    /// Returns `None` on failure, after appending the reason to `messages`.
    fn to_buffer(
        &self,
        item: &ObjectItem,
        format: &FormatId,
        messages: &mut Messages,
    ) -> Option<String>;
}

/// Serialize an item into a file of a target folder.
pub trait FileExport {
    /// Write the item into `folder` and return the chosen basename.
    ///
    /// Returns `None` on failure, after appending the reason to `messages`.
    fn to_file(
        &self,
        item: &ObjectItem,
        folder: &str,
        format: &FormatId,
        messages: &mut Messages,
    ) -> Option<String>;
}
