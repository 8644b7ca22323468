use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default label given to a newly created action.
pub const DEFAULT_ACTION_LABEL: &str = "New file manager action";

/// Default label given to a newly created menu.
pub const DEFAULT_MENU_LABEL: &str = "New file manager menu";

/// Default label given to a newly created profile.
pub const DEFAULT_PROFILE_LABEL: &str = "Default profile";

/// Allocate a fresh, collision-free item identifier.
pub fn new_item_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Which kind of item a value is. Used in edition events and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Action,
    Menu,
    Profile,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Action => write!(f, "action"),
            ItemKind::Menu => write!(f, "menu"),
            ItemKind::Profile => write!(f, "profile"),
        }
    }
}

/// Where an item came from.
///
/// Set by the provider registry when items are read, and by providers when
/// they persist an item. Never part of the item equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    /// Id of the provider which last persisted the item.
    pub provider_id: Option<String>,

    /// Opaque provider-specific data (e.g. the backing file path).
    pub provider_data: IndexMap<String, String>,
}

/// Applicability conditions of an execution profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    /// Basename globs, e.g. `*.txt`.
    pub basenames: Vec<String>,
    pub matchcase: bool,

    /// Mimetype patterns: `*/*`, `image/*` or an exact `text/plain`.
    pub mimetypes: Vec<String>,
    pub schemes: Vec<String>,
    pub folders: Vec<String>,

    pub is_file: bool,
    pub is_dir: bool,
    pub accept_multiple: bool,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            basenames: vec!["*".to_string()],
            matchcase: true,
            mimetypes: vec!["*/*".to_string()],
            schemes: vec!["file".to_string()],
            folders: vec!["/".to_string()],
            is_file: true,
            is_dir: false,
            accept_multiple: false,
        }
    }
}

/// Execution profile of an action: one command line and the conditions under
/// which it applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    id: String,

    #[serde(default)]
    pub label: String,

    /// Command path; a profile is valid only with a non-empty path.
    #[serde(default)]
    pub path: String,

    /// Parameter template, see [`crate::services::parameters`].
    #[serde(default)]
    pub parameters: String,

    #[serde(default)]
    pub conditions: Conditions,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: DEFAULT_PROFILE_LABEL.to_string(),
            path: String::new(),
            parameters: String::new(),
            conditions: Conditions::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_valid(&self) -> bool {
        !self.path.trim().is_empty()
    }

    pub fn are_equal(&self, other: &Profile) -> bool {
        self.id == other.id
            && self.label == other.label
            && self.path == other.path
            && self.parameters == other.parameters
            && self.conditions == other.conditions
    }
}

/// Where an action is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targets {
    pub selection: bool,
    pub background: bool,
    pub toolbar: bool,
    pub toolbar_label: String,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            selection: true,
            background: false,
            toolbar: false,
            toolbar_label: String::new(),
        }
    }
}

/// A user-defined action: a labelled menu entry with one or more profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    id: String,

    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub tooltip: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub targets: Targets,
    #[serde(default)]
    pub profiles: Vec<Profile>,

    /// Runtime flag set by the provider when the item cannot be updated.
    #[serde(skip)]
    pub readonly: bool,

    #[serde(skip)]
    pub provenance: Provenance,
}

fn default_enabled() -> bool {
    true
}

impl Action {
    /// Create an empty action with the given id and the default label.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: DEFAULT_ACTION_LABEL.to_string(),
            tooltip: String::new(),
            icon: String::new(),
            enabled: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            targets: Targets::default(),
            profiles: Vec::new(),
            readonly: false,
            provenance: Provenance::default(),
        }
    }

    /// Create a brand new action with a freshly allocated id and one default
    /// (still invalid) profile.
    pub fn with_default_profile() -> Self {
        let mut action = Self::new(new_item_id());
        action.profiles.push(Profile::new("profile-main"));
        action
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Name for an additional profile, unique within this action.
    pub fn new_profile_id(&self) -> String {
        let mut counter = self.profiles.len() + 1;
        loop {
            let candidate = format!("profile-{counter}");
            if self.profile(&candidate).is_none() {
                return candidate;
            }
            counter += 1;
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.label.trim().is_empty() && self.profiles.iter().any(Profile::is_valid)
    }

    pub fn are_equal(&self, other: &Action) -> bool {
        self.id == other.id
            && self.label == other.label
            && self.tooltip == other.tooltip
            && self.icon == other.icon
            && self.enabled == other.enabled
            && self.version == other.version
            && self.targets == other.targets
            && self.profiles.len() == other.profiles.len()
            && self
                .profiles
                .iter()
                .zip(&other.profiles)
                .all(|(a, b)| a.are_equal(b))
    }
}

/// A submenu grouping other items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    id: String,

    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub tooltip: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub items: Vec<ObjectItem>,

    #[serde(skip)]
    pub readonly: bool,

    #[serde(skip)]
    pub provenance: Provenance,
}

impl Menu {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: DEFAULT_MENU_LABEL.to_string(),
            tooltip: String::new(),
            icon: String::new(),
            enabled: true,
            items: Vec::new(),
            readonly: false,
            provenance: Provenance::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_valid(&self) -> bool {
        !self.label.trim().is_empty() && !self.items.is_empty()
    }

    pub fn are_equal(&self, other: &Menu) -> bool {
        self.id == other.id
            && self.label == other.label
            && self.tooltip == other.tooltip
            && self.icon == other.icon
            && self.enabled == other.enabled
            && self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.are_equal(b))
    }
}

/// Any top-level item a provider reads or writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectItem {
    Action(Action),
    Menu(Menu),
}

impl ObjectItem {
    pub fn id(&self) -> &str {
        match self {
            ObjectItem::Action(a) => a.id(),
            ObjectItem::Menu(m) => m.id(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ObjectItem::Action(a) => &a.label,
            ObjectItem::Menu(m) => &m.label,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ObjectItem::Action(_) => ItemKind::Action,
            ObjectItem::Menu(_) => ItemKind::Menu,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            ObjectItem::Action(a) => a.is_valid(),
            ObjectItem::Menu(m) => m.is_valid(),
        }
    }

    /// Field-by-field comparison; items of different kinds are never equal.
    pub fn are_equal(&self, other: &ObjectItem) -> bool {
        match (self, other) {
            (ObjectItem::Action(a), ObjectItem::Action(b)) => a.are_equal(b),
            (ObjectItem::Menu(a), ObjectItem::Menu(b)) => a.are_equal(b),
            _ => false,
        }
    }

    pub fn is_readonly(&self) -> bool {
        match self {
            ObjectItem::Action(a) => a.readonly,
            ObjectItem::Menu(m) => m.readonly,
        }
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        match self {
            ObjectItem::Action(a) => a.readonly = readonly,
            ObjectItem::Menu(m) => m.readonly = readonly,
        }
    }

    pub fn provenance(&self) -> &Provenance {
        match self {
            ObjectItem::Action(a) => &a.provenance,
            ObjectItem::Menu(m) => &m.provenance,
        }
    }

    pub fn provenance_mut(&mut self) -> &mut Provenance {
        match self {
            ObjectItem::Action(a) => &mut a.provenance,
            ObjectItem::Menu(m) => &mut m.provenance,
        }
    }

    /// Give this item a new identity.
    ///
    /// This is the only way an id changes after creation; it is used when
    /// importing an item whose id collides with an existing one.
    pub fn renumber(&mut self, new_id: impl Into<String>) {
        let new_id = new_id.into();
        tracing::debug!("Renumbering {} {} to {}", self.kind(), self.id(), new_id);
        match self {
            ObjectItem::Action(a) => a.id = new_id,
            ObjectItem::Menu(m) => m.id = new_id,
        }
    }

    /// Ids of this item and of every item nested in it, depth first.
    pub fn collect_ids(&self) -> Vec<String> {
        let mut ids = vec![self.id().to_string()];
        if let ObjectItem::Menu(menu) = self {
            for child in &menu.items {
                ids.extend(child.collect_ids());
            }
        }
        ids
    }
}

impl From<Action> for ObjectItem {
    fn from(action: Action) -> Self {
        ObjectItem::Action(action)
    }
}

impl From<Menu> for ObjectItem {
    fn from(menu: Menu) -> Self {
        ObjectItem::Menu(menu)
    }
}
