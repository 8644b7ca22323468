use crate::io::Messages;
use crate::models::{ImportMode, ObjectItem, new_item_id};
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::collections::HashSet;
use std::fs;

/// What happened to an imported item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// No id collision; the item was appended.
    Inserted { id: String },
    /// The item collided and was given fresh ids.
    Renumbered { from: String, to: String },
    /// The item replaced the existing one with the same id.
    Overridden { id: String },
    /// The item collided and was left out.
    Skipped { id: String },
}

type AskFn<'a> = dyn FnMut(&ObjectItem, &ObjectItem) -> ImportMode + 'a;

/// Merges imported items into an existing list, resolving id collisions
/// according to an [`ImportMode`].
pub struct Importer<'a> {
    mode: ImportMode,
    ask: Option<Box<AskFn<'a>>>,
}

impl<'a> Importer<'a> {
    pub fn new(mode: ImportMode) -> Self {
        Self { mode, ask: None }
    }

    /// Callback deciding collisions in [`ImportMode::Ask`] mode. It receives
    /// the imported item and the existing one, and returns the mode to apply.
    pub fn with_ask<F>(mut self, ask: F) -> Self
    where
        F: FnMut(&ObjectItem, &ObjectItem) -> ImportMode + 'a,
    {
        self.ask = Some(Box::new(ask));
        self
    }

    pub fn mode(&self) -> ImportMode {
        self.mode
    }

    /// Import one item into `items`.
    pub fn import(
        &mut self,
        items: &mut Vec<ObjectItem>,
        mut item: ObjectItem,
        messages: &mut Messages,
    ) -> ImportOutcome {
        let existing_ids = all_ids(items);
        let id = item.id().to_string();

        let Some(collision) = item
            .collect_ids()
            .into_iter()
            .find(|i| existing_ids.contains(i))
        else {
            tracing::debug!("Importing {} {}", item.kind(), id);
            items.push(item);
            return ImportOutcome::Inserted { id };
        };

        let mode = self.resolve_mode(items, &item, &collision);
        match mode {
            ImportMode::Renumber => {
                renumber_colliding(&mut item, &existing_ids);
                item.provenance_mut().provider_id = None;
                let to = item.id().to_string();
                messages.push(format!("{id}: id {collision} already exists, imported as {to}"));
                items.push(item);
                ImportOutcome::Renumbered { from: id, to }
            }
            ImportMode::Override if collision == id => {
                let Some(target) = find_mut(items, &id) else {
                    items.push(item);
                    return ImportOutcome::Inserted { id };
                };
                // Only the ids of the replaced subtree may be reused.
                let replaced: HashSet<String> = target.collect_ids().into_iter().collect();
                if let Some(other) = item
                    .collect_ids()
                    .into_iter()
                    .find(|i| existing_ids.contains(i) && !replaced.contains(i))
                {
                    messages.push(format!(
                        "{id}: not overridden, nested id {other} already exists"
                    ));
                    return ImportOutcome::Skipped { id };
                }
                item.provenance_mut().clone_from(target.provenance());
                item.set_readonly(target.is_readonly());
                *target = item;
                messages.push(format!("{id}: existing item overridden"));
                ImportOutcome::Overridden { id }
            }
            ImportMode::Override => {
                messages.push(format!(
                    "{id}: not imported, nested id {collision} already exists"
                ));
                ImportOutcome::Skipped { id }
            }
            ImportMode::NoImport | ImportMode::Ask => {
                messages.push(format!("{id}: not imported, id {collision} already exists"));
                ImportOutcome::Skipped { id }
            }
        }
    }

    /// Import every item of a YAML document holding one item or a list.
    pub fn import_file(
        &mut self,
        items: &mut Vec<ObjectItem>,
        path: &Utf8Path,
        messages: &mut Messages,
    ) -> Result<Vec<ImportOutcome>> {
        let imported = read_import_file(path)?;
        Ok(imported
            .into_iter()
            .map(|item| self.import(items, item, messages))
            .collect())
    }

    fn resolve_mode(&mut self, items: &[ObjectItem], item: &ObjectItem, collision: &str) -> ImportMode {
        if self.mode != ImportMode::Ask {
            return self.mode;
        }
        let Some(ask) = self.ask.as_mut() else {
            tracing::warn!("Import mode is 'ask' but no callback was given");
            return ImportMode::NoImport;
        };
        let Some(existing) = find(items, collision) else {
            return ImportMode::NoImport;
        };
        match ask(item, existing) {
            ImportMode::Ask => ImportMode::NoImport,
            decided => decided,
        }
    }
}

/// Top-level item of `items` holding `id`, itself or in its subtree. This
/// is the item to persist after an import touched `id`.
pub fn owning_item_mut<'a>(items: &'a mut [ObjectItem], id: &str) -> Option<&'a mut ObjectItem> {
    items
        .iter_mut()
        .find(|item| item.collect_ids().iter().any(|i| i == id))
}

/// Items of a YAML import file: either a single item or a sequence.
pub fn read_import_file(path: &Utf8Path) -> Result<Vec<ObjectItem>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read import file: {}", path))?;

    if let Ok(items) = serde_yaml_ng::from_str::<Vec<ObjectItem>>(&contents) {
        return Ok(items);
    }
    let item: ObjectItem = serde_yaml_ng::from_str(&contents)
        .with_context(|| format!("Failed to parse import file: {}", path))?;
    Ok(vec![item])
}

fn all_ids(items: &[ObjectItem]) -> HashSet<String> {
    items.iter().flat_map(ObjectItem::collect_ids).collect()
}

fn find<'a>(items: &'a [ObjectItem], id: &str) -> Option<&'a ObjectItem> {
    items.iter().find_map(|item| {
        if item.id() == id {
            return Some(item);
        }
        match item {
            ObjectItem::Menu(menu) => find(&menu.items, id),
            ObjectItem::Action(_) => None,
        }
    })
}

fn find_mut<'a>(items: &'a mut [ObjectItem], id: &str) -> Option<&'a mut ObjectItem> {
    for item in items.iter_mut() {
        if item.id() == id {
            return Some(item);
        }
        if let ObjectItem::Menu(menu) = item
            && let Some(found) = find_mut(&mut menu.items, id)
        {
            return Some(found);
        }
    }
    None
}

fn renumber_colliding(item: &mut ObjectItem, existing: &HashSet<String>) {
    if existing.contains(item.id()) {
        item.renumber(new_item_id());
    }
    if let ObjectItem::Menu(menu) = item {
        for child in &mut menu.items {
            renumber_colliding(child, existing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Menu};

    fn named(id: &str, label: &str) -> ObjectItem {
        let mut action = Action::new(id);
        action.label = label.to_string();
        action.into()
    }

    fn existing() -> Vec<ObjectItem> {
        let mut item = named("a1", "Existing");
        item.provenance_mut().provider_id = Some("io-yaml".to_string());
        vec![item]
    }

    #[test]
    fn test_insert_without_collision() {
        let mut items = existing();
        let mut messages = Messages::new();
        let outcome = Importer::new(ImportMode::NoImport).import(
            &mut items,
            named("a2", "New"),
            &mut messages,
        );
        assert_eq!(outcome, ImportOutcome::Inserted { id: "a2".into() });
        assert_eq!(items.len(), 2);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_no_import_skips() {
        let mut items = existing();
        let mut messages = Messages::new();
        let outcome = Importer::new(ImportMode::NoImport).import(
            &mut items,
            named("a1", "Imported"),
            &mut messages,
        );
        assert_eq!(outcome, ImportOutcome::Skipped { id: "a1".into() });
        assert_eq!(items[0].label(), "Existing");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_renumber() {
        let mut items = existing();
        let mut messages = Messages::new();
        let outcome = Importer::new(ImportMode::Renumber).import(
            &mut items,
            named("a1", "Imported"),
            &mut messages,
        );
        let ImportOutcome::Renumbered { from, to } = outcome else {
            panic!("expected a renumbered item");
        };
        assert_eq!(from, "a1");
        assert_ne!(to, "a1");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id(), to);
        assert!(items[1].provenance().provider_id.is_none());
    }

    #[test]
    fn test_override_keeps_provenance() {
        let mut items = existing();
        let mut messages = Messages::new();
        let outcome = Importer::new(ImportMode::Override).import(
            &mut items,
            named("a1", "Imported"),
            &mut messages,
        );
        assert_eq!(outcome, ImportOutcome::Overridden { id: "a1".into() });
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label(), "Imported");
        assert_eq!(items[0].provenance().provider_id.as_deref(), Some("io-yaml"));
    }

    #[test]
    fn test_override_refuses_nested_collision() {
        let mut items = existing();
        let mut menu = Menu::new("m1");
        menu.items.push(named("a1", "Nested"));
        let mut messages = Messages::new();
        let outcome =
            Importer::new(ImportMode::Override).import(&mut items, menu.into(), &mut messages);
        assert_eq!(outcome, ImportOutcome::Skipped { id: "m1".into() });
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_override_refuses_child_id_used_elsewhere() {
        let mut items = existing();
        items.push(named("a2", "Other"));
        let mut menu = Menu::new("a1");
        menu.items.push(named("a2", "Nested"));
        let mut messages = Messages::new();

        let outcome =
            Importer::new(ImportMode::Override).import(&mut items, menu.into(), &mut messages);

        assert_eq!(outcome, ImportOutcome::Skipped { id: "a1".into() });
        let ids = all_ids(&items);
        assert_eq!(ids.len(), 2);
        assert_eq!(items[0].label(), "Existing");
        assert_eq!(
            messages,
            vec!["a1: not overridden, nested id a2 already exists".to_string()]
        );
    }

    #[test]
    fn test_override_may_reuse_ids_of_replaced_subtree() {
        let mut old = Menu::new("m1");
        old.items.push(named("a1", "Old child"));
        let mut items = vec![old.into(), named("a2", "Other")];

        let mut new = Menu::new("m1");
        new.items.push(named("a1", "New child"));
        new.items.push(named("a3", "Added"));
        let mut messages = Messages::new();

        let outcome =
            Importer::new(ImportMode::Override).import(&mut items, new.into(), &mut messages);

        assert_eq!(outcome, ImportOutcome::Overridden { id: "m1".into() });
        assert_eq!(items[0].collect_ids(), vec!["m1", "a1", "a3"]);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_owning_item_of_nested_override() {
        let mut menu = Menu::new("m1");
        menu.items.push(named("a1", "Nested"));
        let mut items = vec![named("a0", "Top"), menu.into()];
        let mut messages = Messages::new();

        let outcome = Importer::new(ImportMode::Override).import(
            &mut items,
            named("a1", "Replaced"),
            &mut messages,
        );
        assert_eq!(outcome, ImportOutcome::Overridden { id: "a1".into() });

        let owner = owning_item_mut(&mut items, "a1").unwrap();
        assert_eq!(owner.id(), "m1");
        let ObjectItem::Menu(menu) = owner else {
            panic!("expected the menu");
        };
        assert_eq!(menu.items[0].label(), "Replaced");
        assert!(owning_item_mut(&mut items, "missing").is_none());
    }

    #[test]
    fn test_renumber_nested_collision() {
        let mut items = existing();
        let mut menu = Menu::new("m1");
        menu.items.push(named("a1", "Nested"));
        let mut messages = Messages::new();
        Importer::new(ImportMode::Renumber).import(&mut items, menu.into(), &mut messages);

        let ids = items[1].collect_ids();
        assert_eq!(ids[0], "m1");
        assert_ne!(ids[1], "a1");
    }

    #[test]
    fn test_ask_callback_decides() {
        let mut items = existing();
        let mut messages = Messages::new();
        let mut asked = Vec::new();

        let outcome = Importer::new(ImportMode::Ask)
            .with_ask(|imported, existing| {
                asked.push((imported.label().to_string(), existing.label().to_string()));
                ImportMode::Override
            })
            .import(&mut items, named("a1", "Imported"), &mut messages);

        assert_eq!(outcome, ImportOutcome::Overridden { id: "a1".into() });
        assert_eq!(asked, vec![("Imported".to_string(), "Existing".to_string())]);
    }

    #[test]
    fn test_ask_without_callback_skips() {
        let mut items = existing();
        let mut messages = Messages::new();
        let outcome = Importer::new(ImportMode::Ask).import(
            &mut items,
            named("a1", "Imported"),
            &mut messages,
        );
        assert_eq!(outcome, ImportOutcome::Skipped { id: "a1".into() });
    }
}
