//! Services module - runtime behavior of the configured items.
//!
//! - [`selection`]: the file-manager selection an action is evaluated against
//! - [`conditions`]: whether an action is a candidate for a selection
//! - [`parameters`]: expansion of `%` parameter templates into command lines
//! - [`import`]: merging imported items, with id collision handling
//!
//! Nothing here touches a provider; callers read items through the
//! [`ProviderRegistry`](crate::io::ProviderRegistry) and pass them in.

pub mod conditions;
pub mod import;
pub mod parameters;
pub mod selection;

pub use conditions::{ConditionMatcher, TargetContext, candidates, is_candidate, matching_profile};
pub use import::{ImportOutcome, Importer, owning_item_mut, read_import_file};
pub use parameters::{command_line, expand, preview};
pub use selection::SelectedItem;
