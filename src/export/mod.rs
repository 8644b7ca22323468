//! Export of items to external formats.
//!
//! Exporters come in two interface versions; [`ExportResolver`] hides the
//! difference and routes each request to the exporter owning the format.

pub mod desktop;
pub mod exporter;
pub mod format;
pub mod resolver;

pub use desktop::{DesktopExporter, FORMAT_DESKTOP_ENTRY};
pub use exporter::{BufferExport, Exporter, FileExport};
pub use format::{
    ExportFormat, ExporterFormat, FormatId, FormatList, InterfaceVersion, LegacyFormat,
};
pub use resolver::{ExportResolver, ExportState};
