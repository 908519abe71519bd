//! The single place sources are registered.

use super::{AbeBooks, AnnasArchive, BiblioCommons, Goodreads, GoogleBooks, Indigo, Kobo, SourceAdapter};
use crate::config::Config;
use crate::error::SourceError;
use crate::models::SourceId;
use std::sync::Arc;
use tracing::debug;

/// Source id -> adapter, in registration order.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every supported source, configured from `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        registry.register(AbeBooks::new(&config.marketplace));
        registry.register(Kobo::new(&config.kobo_store, &config.kobo_currency));
        registry.register(Indigo::new());
        for library in &config.libraries {
            registry.register(BiblioCommons::new(library));
        }
        registry.register(AnnasArchive::new(config.include_partial_matches));
        registry.register(Goodreads::new());
        registry.register(GoogleBooks::new());

        debug!("Registered sources: {}", registry.ids().iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", "));
        registry
    }

    /// Adds an adapter, replacing any previous one with the same id.
    pub fn register(&mut self, adapter: impl SourceAdapter + 'static) -> &mut Self {
        self.register_arc(Arc::new(adapter))
    }

    pub fn register_arc(&mut self, adapter: Arc<dyn SourceAdapter>) -> &mut Self {
        match self.adapters.iter().position(|a| a.id() == adapter.id()) {
            Some(index) => self.adapters[index] = adapter,
            None => self.adapters.push(adapter),
        }
        self
    }

    pub fn get(&self, id: &SourceId) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.iter().find(|a| a.id() == id).cloned()
    }

    /// Like [`get`](Self::get), but an unregistered id is a source error.
    pub fn resolve(&self, id: &SourceId) -> Result<Arc<dyn SourceAdapter>, SourceError> {
        self.get(id).ok_or_else(|| SourceError::UnknownSource(id.to_string()))
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn SourceAdapter>> {
        self.adapters.iter()
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.adapters.iter().map(|a| a.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceKind;

    #[test]
    fn test_registry_from_default_config() {
        let registry = AdapterRegistry::from_config(&Config::default());
        let ids: Vec<String> = registry.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(
            ids,
            vec!["abebooks", "kobo", "indigo", "epl", "calgary", "annas_archive", "goodreads", "google_books"]
        );

        let epl = registry.get(&SourceId::new("epl")).unwrap();
        assert_eq!(epl.kind(), SourceKind::LibraryCatalog);
        assert_eq!(epl.base_url(), "https://epl.bibliocommons.com");

        assert_eq!(registry.get(&SourceId::new("google_books")).unwrap().kind(), SourceKind::Ratings);
        assert_eq!(registry.get(&SourceId::new("indigo")).unwrap().kind(), SourceKind::Storefront);
    }

    #[test]
    fn test_registry_libraries_are_configuration() {
        let config = Config { libraries: vec!["vpl".to_string()], ..Config::default() };
        let registry = AdapterRegistry::from_config(&config);
        assert!(registry.get(&SourceId::new("vpl")).is_some());
        assert!(registry.get(&SourceId::new("epl")).is_none());
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = AdapterRegistry::new();
        registry.register(Goodreads::new());
        registry.register(Goodreads::new().with_base_url("http://localhost:1"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&SourceId::new("goodreads")).unwrap().base_url(), "http://localhost:1");
    }

    #[test]
    fn test_resolve_unknown_source() {
        let registry = AdapterRegistry::new();
        assert!(registry.is_empty());
        let err = registry.resolve(&SourceId::new("ebay")).err().unwrap();
        assert!(matches!(err, SourceError::UnknownSource(ref id) if id == "ebay"));
    }
}
