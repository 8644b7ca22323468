//! Whether an action applies to the current file-manager selection.

use crate::models::{Action, Conditions, ObjectItem, Profile};
use crate::services::selection::SelectedItem;
use regex::{Regex, RegexBuilder};

/// Where the menu is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetContext {
    /// Context menu of selected files or folders.
    Selection,
    /// Context menu of a folder background; the selection is the folder.
    Background,
}

/// Compiled form of the conditions of one profile.
#[derive(Debug)]
pub struct ConditionMatcher<'a> {
    conditions: &'a Conditions,
    basenames: Vec<Regex>,
}

impl<'a> ConditionMatcher<'a> {
    pub fn new(conditions: &'a Conditions) -> Self {
        let basenames = conditions
            .basenames
            .iter()
            .filter_map(|glob| match glob_to_regex(glob, conditions.matchcase) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!("Ignoring basename pattern {:?}: {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            conditions,
            basenames,
        }
    }

    /// Every condition holds for the whole selection.
    pub fn matches(&self, selection: &[SelectedItem]) -> bool {
        if selection.is_empty() {
            return false;
        }
        if selection.len() > 1 && !self.conditions.accept_multiple {
            return false;
        }
        selection.iter().all(|item| self.matches_item(item))
    }

    fn matches_item(&self, item: &SelectedItem) -> bool {
        let kind_ok = if item.is_dir() {
            self.conditions.is_dir
        } else {
            self.conditions.is_file
        };

        kind_ok
            && self.matches_scheme(item.scheme())
            && self.matches_basename(item.basename())
            && self.matches_mimetype(item.mimetype())
            && self.matches_folder(item.dirname())
    }

    fn matches_scheme(&self, scheme: &str) -> bool {
        self.conditions
            .schemes
            .iter()
            .any(|s| s == "*" || s.eq_ignore_ascii_case(scheme))
    }

    fn matches_basename(&self, basename: &str) -> bool {
        self.basenames.iter().any(|re| re.is_match(basename))
    }

    fn matches_mimetype(&self, mimetype: &str) -> bool {
        self.conditions
            .mimetypes
            .iter()
            .any(|pattern| mimetype_matches(pattern, mimetype))
    }

    fn matches_folder(&self, dirname: &str) -> bool {
        self.conditions.folders.iter().any(|folder| {
            let folder = folder.trim_end_matches('/');
            folder.is_empty()
                || dirname == folder
                || dirname
                    .strip_prefix(folder)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Translate a shell glob (`*`, `?`) into an anchored regex.
fn glob_to_regex(glob: &str, matchcase: bool) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');

    RegexBuilder::new(&pattern)
        .case_insensitive(!matchcase)
        .build()
}

/// `*` and `*/*` match anything, `type/*` a whole family, anything else
/// must be equal (case-insensitively).
fn mimetype_matches(pattern: &str, mimetype: &str) -> bool {
    if pattern == "*" || pattern == "*/*" {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(family) => mimetype
            .split_once('/')
            .is_some_and(|(group, _)| group.eq_ignore_ascii_case(family)),
        None => pattern.eq_ignore_ascii_case(mimetype),
    }
}

pub fn profile_matches(profile: &Profile, selection: &[SelectedItem]) -> bool {
    profile.is_valid() && ConditionMatcher::new(&profile.conditions).matches(selection)
}

/// First profile of the action which applies, if the action itself is
/// displayable in this context.
pub fn matching_profile<'a>(
    action: &'a Action,
    context: TargetContext,
    selection: &[SelectedItem],
) -> Option<&'a Profile> {
    if !action.enabled || !action.is_valid() {
        return None;
    }
    let targeted = match context {
        TargetContext::Selection => action.targets.selection,
        TargetContext::Background => action.targets.background,
    };
    if !targeted {
        return None;
    }
    action
        .profiles
        .iter()
        .find(|profile| profile_matches(profile, selection))
}

pub fn is_candidate(action: &Action, context: TargetContext, selection: &[SelectedItem]) -> bool {
    matching_profile(action, context, selection).is_some()
}

/// Candidate actions among `items`, depth first. Disabled or invalid menus
/// hide their whole subtree.
pub fn candidates<'a>(
    items: &'a [ObjectItem],
    context: TargetContext,
    selection: &[SelectedItem],
) -> Vec<&'a Action> {
    let mut found = Vec::new();
    for item in items {
        match item {
            ObjectItem::Action(action) => {
                if is_candidate(action, context, selection) {
                    found.push(action);
                }
            }
            ObjectItem::Menu(menu) => {
                if menu.enabled && menu.is_valid() {
                    found.extend(candidates(&menu.items, context, selection));
                }
            }
        }
    }
    found
}
