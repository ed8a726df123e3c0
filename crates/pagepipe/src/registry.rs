//! Per-table cache registry.
//!
//! Each table id owns its own `PagedResultCache`; windows are never shared
//! between tables and are discarded when the table is closed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::PagedResultCache;
use crate::config::PipeConfig;
use crate::transport::Transport;
use crate::types::{PipeError, PipeResult};

/// Registry of page caches keyed by table id.
pub struct TableRegistry<T: Transport> {
    config: PipeConfig,
    tables: HashMap<String, Arc<PagedResultCache<T>>>,
}

impl<T: Transport> TableRegistry<T> {
    /// Create an empty registry whose caches share `config`.
    pub fn new(config: PipeConfig) -> Self {
        Self {
            config,
            tables: HashMap::new(),
        }
    }

    /// Get the cache for `table_id`, creating it over `transport` if it is not open yet.
    ///
    /// When the table is already open the existing cache is returned and
    /// `transport` is dropped.
    pub fn open(&mut self, table_id: &str, transport: T) -> Arc<PagedResultCache<T>> {
        self.open_with(table_id, || transport)
    }

    /// Like `open`, building the transport from `make` only on first use.
    pub fn open_with<F>(&mut self, table_id: &str, make: F) -> Arc<PagedResultCache<T>>
    where
        F: FnOnce() -> T,
    {
        if let Some(cache) = self.tables.get(table_id) {
            return cache.clone();
        }

        tracing::info!("Opening page cache for table '{table_id}'");
        let cache = Arc::new(PagedResultCache::new(make(), self.config.clone()));
        self.tables.insert(table_id.to_string(), cache.clone());
        cache
    }

    /// Cache for an already opened table.
    pub fn get(&self, table_id: &str) -> PipeResult<Arc<PagedResultCache<T>>> {
        self.tables
            .get(table_id)
            .cloned()
            .ok_or_else(|| PipeError::TableNotFound(table_id.to_string()))
    }

    /// Discard a table's cache. Returns whether it existed.
    ///
    /// Holders of the `Arc` keep a working cache; the registry just forgets it.
    pub fn close(&mut self, table_id: &str) -> bool {
        let existed = self.tables.remove(table_id).is_some();
        if existed {
            tracing::info!("Closed page cache for table '{table_id}'");
        }
        existed
    }

    /// Open table ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tables.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of open tables.
    pub fn count(&self) -> usize {
        self.tables.len()
    }

    pub fn config(&self) -> &PipeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryTable, MemoryTransport};
    use crate::types::{PageLength, PageRequest};
    use crate::window::WindowState;

    fn registry() -> TableRegistry<MemoryTransport> {
        TableRegistry::new(PipeConfig::default())
    }

    #[tokio::test]
    async fn test_tables_have_separate_windows() {
        let mut reg = registry();
        let offices = reg.open("org_office", MemoryTransport::new(MemoryTable::generate(500)));
        let shelters = reg.open("cr_shelter", MemoryTransport::new(MemoryTable::generate(40)));

        offices
            .resolve(&PageRequest::new(300, PageLength::Rows(25)))
            .await
            .unwrap();

        assert_eq!(
            offices.snapshot().await.state,
            WindowState::Partial { lower: 300, upper: 450 }
        );
        assert_eq!(shelters.snapshot().await.state, WindowState::Empty);
        assert_eq!(shelters.transport().fetch_count(), 0);
    }

    #[test]
    fn test_open_returns_existing() {
        let mut reg = registry();
        let first = reg.open_with("org_office", || MemoryTransport::new(MemoryTable::generate(5)));
        let mut called = false;
        let second = reg.open_with("org_office", || {
            called = true;
            MemoryTransport::new(MemoryTable::default())
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!called, "transport factory should not run for an open table");
        assert_eq!(reg.count(), 1);
    }

    #[test]
    fn test_close_discards_table() {
        let mut reg = registry();
        reg.open_with("b", MemoryTransport::default);
        reg.open_with("a", MemoryTransport::default);
        assert_eq!(reg.ids(), vec!["a".to_string(), "b".to_string()]);

        assert!(reg.close("a"));
        assert!(!reg.close("a"));
        assert!(matches!(reg.get("a"), Err(PipeError::TableNotFound(_))));
        assert!(reg.get("b").is_ok());
        assert_eq!(reg.count(), 1);
    }

    #[tokio::test]
    async fn test_reopen_after_close_starts_empty() {
        let mut reg = registry();
        let cache = reg.open("org_office", MemoryTransport::new(MemoryTable::generate(100)));
        cache
            .resolve(&PageRequest::new(0, PageLength::Rows(25)))
            .await
            .unwrap();
        assert!(reg.close("org_office"));

        let reopened = reg.open("org_office", MemoryTransport::new(MemoryTable::generate(100)));
        assert!(!Arc::ptr_eq(&cache, &reopened));
        assert_eq!(reopened.snapshot().await.state, WindowState::Empty);
    }
}
