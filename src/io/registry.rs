use crate::export::Exporter;
use crate::io::writability::{self, ProviderCapabilities, WritabilityStatus};
use crate::io::{IoProvider, Messages, ProviderCode};
use crate::metrics::Metrics;
use crate::models::{ObjectItem, Preferences};
use std::collections::HashSet;
use std::sync::Arc;

/// Registry of the I/O providers and exporters known to the application.
///
/// Providers are kept in registration order; [`providers()`](Self::providers)
/// applies the `providers.order` preference on top of it. Every read, write,
/// delete or provider-data duplication goes through the registry, which
/// checks preferences and writability before delegating.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn IoProvider>>,
    exporters: Vec<Arc<dyn Exporter>>,
    preferences: Preferences,
    metrics: Arc<Metrics>,
}

impl ProviderRegistry {
    pub fn new(preferences: Preferences) -> Self {
        Self::with_metrics(preferences, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(preferences: Preferences, metrics: Arc<Metrics>) -> Self {
        Self {
            providers: Vec::new(),
            exporters: Vec::new(),
            preferences,
            metrics,
        }
    }

    /// Add a provider. A second provider with an already known id is ignored.
    pub fn register_provider(&mut self, provider: Arc<dyn IoProvider>) -> bool {
        if self.providers.iter().any(|p| p.id() == provider.id()) {
            tracing::warn!("I/O provider {} is already registered", provider.id());
            return false;
        }
        tracing::debug!("Registered I/O provider {}", provider.id());
        self.providers.push(provider);
        true
    }

    /// Add an exporter. A second exporter with an already known id is ignored.
    pub fn register_exporter(&mut self, exporter: Arc<dyn Exporter>) -> bool {
        if self.exporters.iter().any(|e| e.id() == exporter.id()) {
            tracing::warn!("Exporter {} is already registered", exporter.id());
            return false;
        }
        tracing::debug!("Registered exporter {}", exporter.id());
        self.exporters.push(exporter);
        true
    }

    /// Providers in preference order, unlisted ones last in registration
    /// order.
    pub fn providers(&self) -> Vec<Arc<dyn IoProvider>> {
        let order = &self.preferences.providers.order;
        let mut ordered: Vec<Arc<dyn IoProvider>> = order
            .iter()
            .filter_map(|id| self.find_provider(id))
            .collect();

        for provider in &self.providers {
            if !order.iter().any(|id| id == provider.id()) {
                ordered.push(Arc::clone(provider));
            }
        }
        ordered
    }

    pub fn exporters(&self) -> &[Arc<dyn Exporter>] {
        &self.exporters
    }

    pub fn find_provider(&self, id: &str) -> Option<Arc<dyn IoProvider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Read the items of every provider enabled for reading.
    ///
    /// Each item is stamped with the id of the provider it comes from. An
    /// item whose id (or the id of one of its children) was already read
    /// from a previous provider is dropped with a message.
    pub fn read_items(&self, messages: &mut Messages) -> Vec<ObjectItem> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut items = Vec::new();

        for provider in self.providers() {
            let id = provider.id();
            if !self.preferences.provider_flags(id).read_at_startup {
                tracing::debug!("Provider {} is not read at startup", id);
                continue;
            }

            let read = provider.read_items(messages);
            tracing::debug!("Provider {} returned {} item(s)", id, read.len());

            for mut item in read {
                let ids = item.collect_ids();
                if let Some(duplicate) = ids.iter().find(|i| seen.contains(*i)) {
                    messages.push(format!(
                        "{id}: {} {} ignored: id {duplicate} is already used",
                        item.kind(),
                        item.id()
                    ));
                    continue;
                }
                seen.extend(ids);
                item.provenance_mut().provider_id = Some(id.to_string());
                items.push(item);
            }
        }

        self.metrics.record_items_read(items.len());
        tracing::info!("Read {} item(s)", items.len());
        items
    }

    /// Raw write capability bits of a provider.
    pub fn capabilities(&self, provider: &dyn IoProvider) -> ProviderCapabilities {
        ProviderCapabilities {
            willing_to_write: provider.is_willing_to_write(),
            able_to_write: provider.is_able_to_write(),
            has_writer: provider.writer().is_some(),
        }
    }

    /// First provider, in preference order, which would accept a new item.
    pub fn writable_provider(&self) -> Option<Arc<dyn IoProvider>> {
        self.providers().into_iter().find(|provider| {
            let flags = self.preferences.provider_flags(provider.id());
            let caps = self.capabilities(provider.as_ref());
            !flags.locked
                && flags.writable
                && caps.willing_to_write
                && caps.able_to_write
                && caps.has_writer
        })
    }

    /// The provider an item would be written to: its owner when it has
    /// one, else the first writable provider.
    pub fn target_provider(&self, item: &ObjectItem) -> Option<Arc<dyn IoProvider>> {
        match &item.provenance().provider_id {
            Some(id) => self.find_provider(id),
            None => self.writable_provider(),
        }
    }

    pub fn writability(&self, item: &ObjectItem) -> WritabilityStatus {
        let target = self.target_provider(item);
        let flags = target
            .as_ref()
            .map(|p| self.preferences.provider_flags(p.id()));

        writability::evaluate(
            item.is_readonly(),
            target
                .as_ref()
                .zip(flags.as_ref())
                .map(|(p, f)| (self.capabilities(p.as_ref()), f)),
            &self.preferences.locks,
        )
    }

    /// Persist an item through its provider.
    ///
    /// A new item goes to the first writable provider, which records itself
    /// in the item provenance.
    pub fn write_item(&self, item: &mut ObjectItem, messages: &mut Messages) -> ProviderCode {
        let code = self.write_or_delete(item, messages, |writer, item, messages| {
            writer.write_item(item, messages)
        });
        self.metrics.record_write(code.is_ok());
        code
    }

    /// Remove an item from its provider.
    ///
    /// An item which was never persisted has nothing to delete.
    pub fn delete_item(&self, item: &ObjectItem, messages: &mut Messages) -> ProviderCode {
        if item.provenance().provider_id.is_none() {
            tracing::debug!("{} {} was never persisted", item.kind(), item.id());
            return ProviderCode::Ok;
        }

        let mut target = item.clone();
        let code = self.write_or_delete(&mut target, messages, |writer, item, messages| {
            writer.delete_item(item, messages)
        });
        self.metrics.record_write(code.is_ok());
        code
    }

    fn write_or_delete<F>(
        &self,
        item: &mut ObjectItem,
        messages: &mut Messages,
        operation: F,
    ) -> ProviderCode
    where
        F: FnOnce(&dyn crate::io::ItemWriter, &mut ObjectItem, &mut Messages) -> ProviderCode,
    {
        let status = self.writability(item);
        if !status.is_writable() {
            tracing::debug!("{} {} is not writable: {:?}", item.kind(), item.id(), status);
            messages.push(status.tooltip().to_string());
            return ProviderCode::NotWillingToRun;
        }

        let Some(provider) = self.target_provider(item) else {
            return ProviderCode::ProgramError;
        };
        let Some(writer) = provider.writer() else {
            return ProviderCode::NotWillingToRun;
        };

        let code = operation(writer, item, messages);
        if code.is_ok() && item.provenance().provider_id.is_none() {
            item.provenance_mut().provider_id = Some(provider.id().to_string());
        }
        tracing::debug!("{} {} via {}: {:?}", item.kind(), item.id(), provider.id(), code);
        code
    }

    /// Let the provider owning `source` copy its private data into `dest`.
    ///
    /// Providers without the capability, and items without a provider, need
    /// no duplication.
    pub fn duplicate_data(
        &self,
        dest: &mut ObjectItem,
        source: &ObjectItem,
        messages: &mut Messages,
    ) -> ProviderCode {
        let Some(provider) = self.target_provider(source) else {
            return ProviderCode::Ok;
        };
        match provider.data_duplicator() {
            Some(duplicator) => duplicator.duplicate_data(dest, source, messages),
            None => ProviderCode::Ok,
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.id()).collect::<Vec<_>>(),
            )
            .field(
                "exporters",
                &self.exporters.iter().map(|e| e.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Menu, ProviderFlags};

    struct Fixed {
        id: &'static str,
        ids: Vec<&'static str>,
    }

    impl IoProvider for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn read_items(&self, _messages: &mut Messages) -> Vec<ObjectItem> {
            self.ids.iter().map(|id| Action::new(*id).into()).collect()
        }
    }

    fn registry(prefs: Preferences) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new(prefs);
        registry.register_provider(Arc::new(Fixed {
            id: "first",
            ids: vec!["a", "b"],
        }));
        registry.register_provider(Arc::new(Fixed {
            id: "second",
            ids: vec!["b", "c"],
        }));
        registry
    }

    #[test]
    fn test_duplicate_registration_ignored() {
        let mut registry = registry(Preferences::default());
        assert!(!registry.register_provider(Arc::new(Fixed {
            id: "first",
            ids: vec![],
        })));
        assert_eq!(registry.providers().len(), 2);
    }

    #[test]
    fn test_preference_order() {
        let mut prefs = Preferences::default();
        prefs.providers.order = vec!["second".to_string(), "missing".to_string()];
        let ids: Vec<String> = registry(prefs)
            .providers()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, vec!["second", "first"]);
    }

    #[test]
    fn test_read_items_drops_duplicates_and_stamps_provenance() {
        let registry = registry(Preferences::default());
        let mut messages = Messages::new();
        let items = registry.read_items(&mut messages);

        let ids: Vec<&str> = items.iter().map(ObjectItem::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(messages.len(), 1);
        assert_eq!(items[2].provenance().provider_id.as_deref(), Some("second"));
        assert_eq!(
            registry
                .metrics()
                .items_read
                .load(std::sync::atomic::Ordering::Relaxed),
            3
        );
    }

    #[test]
    fn test_read_items_detects_nested_duplicates() {
        struct Nested;
        impl IoProvider for Nested {
            fn id(&self) -> &str {
                "nested"
            }
            fn read_items(&self, _messages: &mut Messages) -> Vec<ObjectItem> {
                let mut menu = Menu::new("m");
                menu.items.push(Action::new("a").into());
                vec![Action::new("a").into(), menu.into()]
            }
        }

        let mut registry = ProviderRegistry::new(Preferences::default());
        registry.register_provider(Arc::new(Nested));
        let mut messages = Messages::new();
        let items = registry.read_items(&mut messages);
        assert_eq!(items.len(), 1);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_read_at_startup_disabled() {
        let mut prefs = Preferences::default();
        prefs.providers.flags.insert(
            "first".to_string(),
            ProviderFlags {
                read_at_startup: false,
                ..Default::default()
            },
        );
        let mut messages = Messages::new();
        let items = registry(prefs).read_items(&mut messages);
        let ids: Vec<&str> = items.iter().map(ObjectItem::id).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_write_without_writable_provider() {
        let registry = registry(Preferences::default());
        let mut item: ObjectItem = Action::new("new").into();
        let mut messages = Messages::new();

        assert_eq!(
            registry.writability(&item),
            WritabilityStatus::NoProviderFound
        );
        assert_eq!(
            registry.write_item(&mut item, &mut messages),
            ProviderCode::NotWillingToRun
        );
        assert_eq!(
            messages,
            vec![WritabilityStatus::NoProviderFound.tooltip().to_string()]
        );
    }

    #[test]
    fn test_delete_unpersisted_item_is_ok() {
        let registry = registry(Preferences::default());
        let item: ObjectItem = Action::new("never-saved").into();
        let mut messages = Messages::new();
        assert_eq!(registry.delete_item(&item, &mut messages), ProviderCode::Ok);
    }

    #[test]
    fn test_duplicate_data_without_capability_is_ok() {
        let registry = registry(Preferences::default());
        let mut source: ObjectItem = Action::new("a").into();
        source.provenance_mut().provider_id = Some("first".to_string());
        let mut dest = source.clone();
        let mut messages = Messages::new();
        assert_eq!(
            registry.duplicate_data(&mut dest, &source, &mut messages),
            ProviderCode::Ok
        );
    }
}
