//! Top-level session facade: wires the engine, the state store, the tab
//! collections, and the memory monitor together, and forwards the
//! operations an embedder calls.

use crate::engine::RenderEngine;
use crate::managers::memory_monitor::{
    default_max_active_tabs, MemoryMonitor, FREE_AS_MUCH_AS_POSSIBLE,
};
use crate::managers::tab_collection_set::TabCollectionSet;
use crate::managers::tab_record::TabRecord;
use crate::services::state_store::StateStore;
use crate::services::SessionServices;
use crate::types::errors::{StateError, TabError};
use crate::types::tab::{LaunchType, SelectionType, TabId};

use std::path::PathBuf;

/// Embedder-supplied session parameters.
pub struct SessionConfig {
    /// Device memory class in megabytes, as reported by the OS. Drives
    /// the default live-tab cap.
    pub memory_class_mb: usize,
    /// Directory for per-tab state files.
    pub state_dir: PathBuf,
    /// Explicit live-tab cap, overriding the memory-class default.
    pub max_active_tabs: Option<usize>,
}

/// One browsing session: the two tab collections plus the collaborators
/// every operation needs. This is the only type an embedder has to hold.
pub struct BrowserSession {
    services: SessionServices,
    tabs: TabCollectionSet,
    monitor: MemoryMonitor,
}

impl BrowserSession {
    pub fn new(engine: Box<dyn RenderEngine>, config: SessionConfig) -> Result<Self, StateError> {
        let store = StateStore::open(config.state_dir)?;
        let cap = config
            .max_active_tabs
            .unwrap_or_else(|| default_max_active_tabs(config.memory_class_mb));
        Ok(Self {
            services: SessionServices::new(engine, store),
            tabs: TabCollectionSet::new(),
            monitor: MemoryMonitor::new(cap),
        })
    }

    pub fn tabs(&self) -> &TabCollectionSet {
        &self.tabs
    }

    pub fn tabs_mut(&mut self) -> &mut TabCollectionSet {
        &mut self.tabs
    }

    pub fn engine(&self) -> &dyn RenderEngine {
        &*self.services.engine
    }

    pub fn monitor(&self) -> &MemoryMonitor {
        &self.monitor
    }

    pub fn current_tab_id(&self) -> Option<TabId> {
        self.tabs.current_tab().map(|t| t.id())
    }

    // === Tab operations ===

    pub fn create_tab(&mut self, url: &str, launch_type: LaunchType) -> TabId {
        self.tabs
            .create_new_tab(url, launch_type, &mut self.services, &mut self.monitor)
    }

    /// Long-press "open in new tab", optionally crossing into incognito.
    pub fn open_new_tab(&mut self, url: &str, parent_id: TabId, incognito: bool) -> TabId {
        self.tabs
            .open_new_tab(url, parent_id, incognito, &mut self.services, &mut self.monitor)
    }

    pub fn launch_ntp(&mut self) -> TabId {
        self.tabs.launch_ntp(&mut self.services, &mut self.monitor)
    }

    pub fn prerender_ntp(&mut self) {
        self.tabs.prerender_ntp(&mut self.services);
    }

    pub fn launch_url_from_external_app(
        &mut self,
        url: &str,
        app_id: Option<&str>,
        force_new_tab: bool,
    ) -> TabId {
        self.tabs.launch_url_from_external_app(
            url,
            app_id,
            force_new_tab,
            &mut self.services,
            &mut self.monitor,
        )
    }

    pub fn close_tab(&mut self, id: TabId) -> Result<(), TabError> {
        self.tabs
            .close_tab(id, false, &mut self.services, &mut self.monitor)
    }

    pub fn select_tab(&mut self, index: usize) {
        self.tabs
            .set_index(index, SelectionType::FromUser, &mut self.services, &mut self.monitor);
    }

    pub fn select_model(&mut self, incognito: bool) {
        self.tabs
            .select_model(incognito, &mut self.services, &mut self.monitor);
    }

    pub fn move_tab(&mut self, id: TabId, new_index: usize) {
        self.tabs.move_tab(id, new_index);
    }

    // === Memory pressure ===

    /// OS low-memory callback: free everything freezable.
    pub fn notify_out_of_memory(&mut self) -> i64 {
        self.monitor
            .free_memory(&mut self.tabs, &mut self.services, FREE_AS_MUCH_AS_POSSIBLE)
    }

    /// Targeted reclaim of roughly `expected_kb` kilobytes.
    pub fn free_memory(&mut self, expected_kb: i64) -> i64 {
        self.monitor
            .free_memory(&mut self.tabs, &mut self.services, expected_kb)
    }

    // === Persistence ===

    /// Writes one tab's state to disk. The tab keeps its live view.
    pub fn persist_tab(&mut self, id: TabId) -> Result<(), StateError> {
        let SessionServices { engine, store } = &mut self.services;
        match self.tabs.find_tab_mut(id) {
            Some(tab) => tab.persist(&mut **engine, store),
            None => Ok(()),
        }
    }

    /// Writes every dirty tab's state to disk, returning the first error.
    pub fn persist_dirty_tabs(&mut self) -> Result<(), StateError> {
        let SessionServices { engine, store } = &mut self.services;
        for incognito in [false, true] {
            for tab in self.tabs.model_mut(incognito).iter_mut() {
                if tab.is_dirty() {
                    tab.persist(&mut **engine, store)?;
                }
            }
        }
        Ok(())
    }

    /// Rebuilds a persisted tab as a frozen background entry. Returns the
    /// id on success, `None` when no usable state exists on disk.
    pub fn restore_persisted_tab(&mut self, id: TabId) -> Option<TabId> {
        let state = self.services.store.read(id)?;
        let record = TabRecord::from_frozen_state(id, state);
        Some(
            self.tabs
                .register_restored_tab(record, &mut self.services, &mut self.monitor),
        )
    }

    /// Starts incognito key generation early, off the critical path of
    /// the first incognito tab.
    pub fn warm_up_crypto(&mut self) {
        self.services.store.trigger_key_generation();
    }
}
