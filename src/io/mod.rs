//! Configuration storage.
//!
//! Items live in I/O providers. The [`ProviderRegistry`] reads them all,
//! decides whether an item may be written and routes writes, deletions and
//! provider-data duplication to the right provider.

pub mod provider;
pub mod registry;
pub mod writability;
pub mod yaml;

pub use provider::{DataDuplicator, IoProvider, ItemWriter, Messages, ProviderCode};
pub use registry::ProviderRegistry;
pub use writability::{ProviderCapabilities, WritabilityStatus};
pub use yaml::{FORMAT_YAML_ITEM, YamlExporter, YamlProvider, YamlProviderError};
