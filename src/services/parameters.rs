//! Expansion of profile parameter templates.
//!
//! | Sequence | Expands to |
//! |---|---|
//! | `%d` | base folder of the first selected item |
//! | `%f` | basename of the first selected item |
//! | `%h` | host of the first item's URI |
//! | `%m` | space-separated basenames of the selection |
//! | `%M` | space-separated full paths of the selection |
//! | `%s` | scheme of the first item's URI |
//! | `%u` | URI of the first item |
//! | `%U` | user name of the first item's URI |
//! | `%%` | a percent sign |
//!
//! Any other `%x` pair is dropped, as is a trailing lone `%`.

use crate::models::Profile;
use crate::services::selection::SelectedItem;

/// Expand `template` against a selection.
///
/// With an empty selection, every per-item sequence expands to nothing.
pub fn expand(template: &str, selection: &[SelectedItem]) -> String {
    let first = selection.first();
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('d') => out.push_str(first.map_or("", SelectedItem::dirname)),
            Some('f') => out.push_str(first.map_or("", SelectedItem::basename)),
            Some('h') => out.push_str(first.map_or("", SelectedItem::host)),
            Some('m') => out.push_str(&join(selection, SelectedItem::basename)),
            Some('M') => out.push_str(&join(selection, SelectedItem::path)),
            Some('s') => out.push_str(first.map_or("", SelectedItem::scheme)),
            Some('u') => out.push_str(first.map_or("", SelectedItem::uri)),
            Some('U') => out.push_str(first.map_or("", SelectedItem::user)),
            Some('%') => out.push('%'),
            Some(other) => tracing::debug!("Dropping unknown parameter %{}", other),
            None => {}
        }
    }
    out
}

fn join(selection: &[SelectedItem], field: fn(&SelectedItem) -> &str) -> String {
    selection.iter().map(field).collect::<Vec<_>>().join(" ")
}

/// Full command line of a profile for a selection: the command path
/// followed by the expanded parameters.
pub fn command_line(profile: &Profile, selection: &[SelectedItem]) -> String {
    let parameters = expand(&profile.parameters, selection);
    if parameters.is_empty() {
        profile.path.clone()
    } else {
        format!("{} {}", profile.path, parameters)
    }
}

/// Command line of a profile against a sample selection shaped by its
/// conditions, for display while editing.
pub fn preview(profile: &Profile) -> String {
    command_line(profile, &example_selection(profile))
}

fn example_selection(profile: &Profile) -> Vec<SelectedItem> {
    let conditions = &profile.conditions;

    let scheme = conditions
        .schemes
        .iter()
        .find(|s| !s.eq_ignore_ascii_case("file"))
        .or(conditions.schemes.first())
        .map_or("file", String::as_str);
    let authority = if scheme.eq_ignore_ascii_case("file") {
        String::new()
    } else {
        "root@test.example.net".to_string()
    };

    let dirs_only = conditions.is_dir && !conditions.is_file;
    let names: &[&str] = match (conditions.accept_multiple, conditions.is_file, conditions.is_dir) {
        (true, true, true) => &["file1.txt", "folder1"],
        (true, false, true) => &["folder1", "folder2"],
        (true, _, _) => &["file1.txt", "file2.txt"],
        (false, _, _) if dirs_only => &["folder"],
        (false, _, _) => &["file.txt"],
    };

    names
        .iter()
        .map(|name| {
            let uri = format!("{scheme}://{authority}/path/to/{name}");
            if name.starts_with("folder") {
                SelectedItem::dir(&uri)
            } else {
                SelectedItem::file(&uri, "text/plain")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> Vec<SelectedItem> {
        vec![
            SelectedItem::file("file:///home/user/a.txt", "text/plain"),
            SelectedItem::file("file:///home/user/b c.txt", "text/plain"),
        ]
    }

    #[test]
    fn test_expand_each_sequence() {
        let s = selection();
        assert_eq!(expand("%d", &s), "/home/user");
        assert_eq!(expand("%f", &s), "a.txt");
        assert_eq!(expand("%m", &s), "a.txt b c.txt");
        assert_eq!(expand("%M", &s), "/home/user/a.txt /home/user/b c.txt");
        assert_eq!(expand("%s", &s), "file");
        assert_eq!(expand("%u", &s), "file:///home/user/a.txt");
        assert_eq!(expand("%h|%U", &s), "|");
        assert_eq!(expand("100%%", &s), "100%");
    }

    #[test]
    fn test_remote_host_and_user() {
        let s = vec![SelectedItem::file("sftp://me@example.net/x", "text/plain")];
        assert_eq!(expand("%U@%h:%d", &s), "me@example.net:/");
    }

    #[test]
    fn test_unknown_and_trailing_percent_dropped() {
        assert_eq!(expand("a%zb%", &selection()), "ab");
    }

    #[test]
    fn test_empty_selection() {
        assert_eq!(expand("--dir=%d %m", &[]), "--dir= ");
    }

    #[test]
    fn test_command_line() {
        let mut profile = Profile::new("p");
        profile.path = "/usr/bin/gedit".to_string();
        assert_eq!(command_line(&profile, &selection()), "/usr/bin/gedit");

        profile.parameters = "%M".to_string();
        assert_eq!(
            command_line(&profile, &selection()[..1]),
            "/usr/bin/gedit /home/user/a.txt"
        );
    }

    #[test]
    fn test_preview_follows_conditions() {
        let mut profile = Profile::new("p");
        profile.path = "nautilus".to_string();
        profile.parameters = "%m".to_string();
        profile.conditions.accept_multiple = true;
        profile.conditions.is_file = false;
        profile.conditions.is_dir = true;
        assert_eq!(preview(&profile), "nautilus folder1 folder2");

        profile.conditions.accept_multiple = false;
        profile.conditions.schemes = vec!["file".to_string(), "sftp".to_string()];
        profile.parameters = "%s %h %f".to_string();
        assert_eq!(preview(&profile), "nautilus sftp test.example.net folder");
    }
}
