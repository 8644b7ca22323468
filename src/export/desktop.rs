//! Desktop-entry exporter.
//!
//! Writes items as freedesktop-style key files (`<id>.desktop`). This is a
//! version 1 exporter: its formats are a static array ended by a sentinel.

use crate::export::{BufferExport, Exporter, FileExport, FormatId, FormatList, LegacyFormat};
use crate::io::Messages;
use crate::models::{Action, Menu, ObjectItem, Profile};
use camino::Utf8PathBuf;
use std::fmt::Write as _;
use std::fs;

pub const FORMAT_DESKTOP_ENTRY: &str = "DesktopEntry";

static DESKTOP_FORMATS: [LegacyFormat; 2] = [
    LegacyFormat {
        format: Some(FORMAT_DESKTOP_ENTRY),
        label: "Export as a .desktop file",
        description: "Writes the item as a desktop entry key file, \
                      suitable for the file-manager actions directory.",
    },
    LegacyFormat::SENTINEL,
];

#[derive(Debug, Default)]
pub struct DesktopExporter;

impl DesktopExporter {
    pub const ID: &'static str = "desktop-exporter";

    pub fn new() -> Self {
        Self
    }

    fn supports(&self, format: &FormatId, messages: &mut Messages) -> bool {
        if format.as_str() == FORMAT_DESKTOP_ENTRY {
            return true;
        }
        messages.push(format!("{}: unsupported format {}", Self::ID, format));
        false
    }
}

impl Exporter for DesktopExporter {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> String {
        "Desktop entry exporter".to_string()
    }

    fn formats(&self) -> FormatList {
        FormatList::V1(&DESKTOP_FORMATS)
    }

    fn buffer_export(&self) -> Option<&dyn BufferExport> {
        Some(self)
    }

    fn file_export(&self) -> Option<&dyn FileExport> {
        Some(self)
    }
}

impl BufferExport for DesktopExporter {
    fn to_buffer(
        &self,
        item: &ObjectItem,
        format: &FormatId,
        messages: &mut Messages,
    ) -> Option<String> {
        if !self.supports(format, messages) {
            return None;
        }
        Some(render(item))
    }
}

impl FileExport for DesktopExporter {
    fn to_file(
        &self,
        item: &ObjectItem,
        folder: &str,
        format: &FormatId,
        messages: &mut Messages,
    ) -> Option<String> {
        if !self.supports(format, messages) {
            return None;
        }

        let basename = format!("{}.desktop", item.id());
        let path = Utf8PathBuf::from(folder).join(&basename);
        match fs::write(&path, render(item)) {
            Ok(()) => {
                tracing::debug!("Wrote desktop entry {}", path);
                Some(basename)
            }
            Err(e) => {
                messages.push(format!("Unable to write {path}: {e}"));
                None
            }
        }
    }
}

/// Render an item as a desktop entry key file.
pub fn render(item: &ObjectItem) -> String {
    let mut out = String::new();
    match item {
        ObjectItem::Action(action) => render_action(&mut out, action),
        ObjectItem::Menu(menu) => render_menu(&mut out, menu),
    }
    out
}

fn render_action(out: &mut String, action: &Action) {
    out.push_str("[Desktop Entry]\n");
    out.push_str("Type=Action\n");
    write_common(out, &action.label, &action.tooltip, &action.icon, action.enabled);
    if !action.version.is_empty() {
        let _ = writeln!(out, "X-Version={}", action.version);
    }
    let _ = writeln!(out, "TargetContext={}", action.targets.selection);
    let _ = writeln!(out, "TargetLocation={}", action.targets.background);
    let _ = writeln!(out, "TargetToolbar={}", action.targets.toolbar);
    if !action.targets.toolbar_label.is_empty() {
        let _ = writeln!(out, "ToolbarLabel={}", escape(&action.targets.toolbar_label));
    }
    let _ = writeln!(out, "Profiles={}", join_list(action.profiles.iter().map(Profile::id)));

    for profile in &action.profiles {
        out.push('\n');
        render_profile(out, profile);
    }
}

fn render_profile(out: &mut String, profile: &Profile) {
    let _ = writeln!(out, "[X-Action-Profile {}]", profile.id());
    let _ = writeln!(out, "Name={}", escape(&profile.label));

    let exec = if profile.parameters.is_empty() {
        profile.path.clone()
    } else {
        format!("{} {}", profile.path, profile.parameters)
    };
    let _ = writeln!(out, "Exec={}", escape(&exec));

    let conditions = &profile.conditions;
    let _ = writeln!(out, "Basenames={}", join_list(conditions.basenames.iter()));
    let _ = writeln!(out, "Matchcase={}", conditions.matchcase);
    let _ = writeln!(out, "MimeTypes={}", join_list(conditions.mimetypes.iter()));
    let _ = writeln!(out, "Schemes={}", join_list(conditions.schemes.iter()));
    let _ = writeln!(out, "Folders={}", join_list(conditions.folders.iter()));

    let count = if conditions.accept_multiple { ">0" } else { "=1" };
    let _ = writeln!(out, "SelectionCount={count}");
}

fn render_menu(out: &mut String, menu: &Menu) {
    out.push_str("[Desktop Entry]\n");
    out.push_str("Type=Menu\n");
    write_common(out, &menu.label, &menu.tooltip, &menu.icon, menu.enabled);
    let _ = writeln!(out, "ItemsList={}", join_list(menu.items.iter().map(ObjectItem::id)));
}

fn write_common(out: &mut String, label: &str, tooltip: &str, icon: &str, enabled: bool) {
    let _ = writeln!(out, "Name={}", escape(label));
    if !tooltip.is_empty() {
        let _ = writeln!(out, "Tooltip={}", escape(tooltip));
    }
    if !icon.is_empty() {
        let _ = writeln!(out, "Icon={}", escape(icon));
    }
    let _ = writeln!(out, "Enabled={enabled}");
}

/// Semicolon-terminated string list.
fn join_list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values.into_iter().fold(String::new(), |mut acc, v| {
        acc.push_str(&escape(v.as_ref()).replace(';', "\\;"));
        acc.push(';');
        acc
    })
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_action() -> ObjectItem {
        let mut action = Action::new("open-terminal");
        action.label = "Open a terminal here".to_string();
        let mut profile = Profile::new("profile-main");
        profile.path = "/usr/bin/gnome-terminal".to_string();
        profile.parameters = "--working-directory=%d".to_string();
        profile.conditions.is_dir = true;
        action.profiles.push(profile);
        action.into()
    }

    #[test]
    fn test_render_action() {
        let text = render(&sample_action());
        assert!(text.starts_with("[Desktop Entry]\nType=Action\n"));
        assert!(text.contains("Name=Open a terminal here\n"));
        assert!(text.contains("Profiles=profile-main;\n"));
        assert!(text.contains("[X-Action-Profile profile-main]\n"));
        assert!(text.contains("Exec=/usr/bin/gnome-terminal --working-directory=%d\n"));
        assert!(text.contains("SelectionCount==1\n"));
    }

    #[test]
    fn test_render_menu_lists_children() {
        let mut menu = Menu::new("tools");
        menu.label = "Tools".to_string();
        menu.items.push(sample_action());
        let text = render(&menu.into());
        assert!(text.contains("Type=Menu\n"));
        assert!(text.contains("ItemsList=open-terminal;\n"));
    }

    #[test]
    fn test_list_values_are_escaped() {
        assert_eq!(join_list(["a;b", "c"]), "a\\;b;c;");
        assert_eq!(escape("two\nlines"), "two\\nlines");
    }

    #[test]
    fn test_to_file_returns_basename() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().to_str().unwrap();
        let mut messages = Messages::new();

        let basename = DesktopExporter::new()
            .to_file(
                &sample_action(),
                folder,
                &FormatId::new(FORMAT_DESKTOP_ENTRY),
                &mut messages,
            )
            .unwrap();

        assert_eq!(basename, "open-terminal.desktop");
        assert!(temp.path().join(&basename).exists());
        assert!(messages.is_empty());
    }

    #[test]
    fn test_unsupported_format() {
        let mut messages = Messages::new();
        let result =
            DesktopExporter::new().to_buffer(&sample_action(), &FormatId::new("Nope"), &mut messages);
        assert!(result.is_none());
        assert_eq!(messages.len(), 1);
    }
}
