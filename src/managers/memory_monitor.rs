//! Memory-pressure policy: an MRU registry of every open tab, a cap on
//! how many keep live engine views, and the bulk reclaim pass run when
//! the OS reports low memory.
//!
//! The monitor is pure bookkeeping plus decisions. It never mutates tabs
//! itself; the event hooks return the ids to freeze and the caller
//! applies them, so the registry can be reasoned about (and tested)
//! without an engine.

use crate::managers::tab_collection_set::TabCollectionSet;
use crate::services::SessionServices;
use crate::types::tab::{ProcessId, TabId, INVALID_RENDER_PROCESS_PID};

/// Reclaim target meaning "freeze everything freezable".
pub const FREE_AS_MUCH_AS_POSSIBLE: i64 = i64::MAX;

/// Tabs of one render process, grouped for process-granular freezing.
/// Freezing a single tab of a shared process frees almost nothing, so
/// the reclaim pass always takes whole processes.
struct ProcessGroup {
    pid: ProcessId,
    tab_ids: Vec<TabId>,
    footprint_kb: i64,
    oldest_shown: i64,
}

pub struct MemoryMonitor {
    /// Registry of every open tab, most recently used first.
    tabs: Vec<TabId>,
    max_active_tabs: usize,
}

/// Cap derived from the device memory class: one live tab per 8 MB of
/// heap budget, never less than one.
pub fn default_max_active_tabs(memory_class_mb: usize) -> usize {
    (memory_class_mb / 8).max(1)
}

impl MemoryMonitor {
    pub fn new(max_active_tabs: usize) -> Self {
        debug_assert!(max_active_tabs >= 1);
        log::info!("Max active tabs: {}", max_active_tabs);
        Self {
            tabs: Vec::new(),
            max_active_tabs,
        }
    }

    pub fn max_active_tabs(&self) -> usize {
        self.max_active_tabs
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// Recency rank of a tab (0 = most recent), if registered.
    pub fn position_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|&t| t == id)
    }

    /// Registers a tab about to be created. A tab that will take the
    /// foreground leads the registry; a background tab slots in right
    /// behind the current one so it outranks older tabs without
    /// displacing the visible one. Returns the ids pushed over the cap.
    pub fn on_tab_creating(&mut self, id: TabId, will_be_selected: bool) -> Vec<TabId> {
        debug_assert!(!self.tabs.contains(&id));
        if will_be_selected || self.tabs.is_empty() {
            self.tabs.insert(0, id);
        } else {
            self.tabs.insert(1, id);
        }
        self.freeze_overflow()
    }

    /// Moves a tab to the front of the registry. Returns the ids pushed
    /// over the cap (a restored frozen tab re-enters the live set, so a
    /// selection can evict).
    pub fn on_tab_selected(&mut self, id: TabId) -> Vec<TabId> {
        self.tabs.retain(|&t| t != id);
        self.tabs.insert(0, id);
        self.freeze_overflow()
    }

    pub fn on_tab_closing(&mut self, id: TabId) {
        self.tabs.retain(|&t| t != id);
    }

    /// Ids beyond the live cap, least recently used first.
    fn freeze_overflow(&self) -> Vec<TabId> {
        if self.tabs.len() <= self.max_active_tabs {
            return Vec::new();
        }
        self.tabs[self.max_active_tabs..]
            .iter()
            .rev()
            .copied()
            .collect()
    }

    /// Bulk reclaim, run on an OS low-memory signal. Freezes whole render
    /// processes (largest footprint first, oldest tabs breaking ties)
    /// until `expected_kb` is covered; if freezing falls short, the
    /// surviving candidate processes get their caches purged and the
    /// prerendered NTP view and thumbnails are dropped. Candidates are
    /// the non-current, non-frozen tabs of both collections. The
    /// foreground tab's render process, its parent, and its children are
    /// never touched. Returns the kilobytes freed by freezing.
    pub fn free_memory(
        &mut self,
        tabs: &mut TabCollectionSet,
        services: &mut SessionServices,
        expected_kb: i64,
    ) -> i64 {
        let engine = &*services.engine;
        let foreground = tabs
            .current_tab()
            .map(|t| (t.id(), t.parent_id(), t.render_process_id(engine)));

        let mut groups: Vec<ProcessGroup> = Vec::new();
        for incognito in [false, true] {
            let model = tabs.model(incognito);
            for (position, tab) in model.iter().enumerate() {
                // Each collection's current tab stays live, even in the
                // collection that is off screen.
                if tab.is_frozen() || Some(position) == model.index() {
                    continue;
                }
                let pid = tab.render_process_id(engine);
                if pid == INVALID_RENDER_PROCESS_PID {
                    continue;
                }
                if let Some((fg_id, fg_parent_id, fg_pid)) = foreground {
                    // The foreground tab's process and family are
                    // protected: its parent and its children stay usable
                    // for the user's immediate back-and-forth.
                    if pid == fg_pid || tab.id() == fg_parent_id || tab.parent_id() == fg_id {
                        continue;
                    }
                }
                match groups.iter_mut().find(|g| g.pid == pid) {
                    Some(group) => {
                        group.tab_ids.push(tab.id());
                        group.oldest_shown = group.oldest_shown.min(tab.last_shown_timestamp());
                    }
                    None => groups.push(ProcessGroup {
                        pid,
                        tab_ids: vec![tab.id()],
                        footprint_kb: i64::from(engine.render_process_private_size_kb(pid)),
                        oldest_shown: tab.last_shown_timestamp(),
                    }),
                }
            }
        }
        groups.sort_by(|a, b| {
            b.footprint_kb
                .cmp(&a.footprint_kb)
                .then(a.oldest_shown.cmp(&b.oldest_shown))
        });

        let mut freed_kb: i64 = 0;
        let mut frozen_groups = 0;
        for group in &groups {
            if freed_kb >= expected_kb {
                break;
            }
            for &id in &group.tab_ids {
                tabs.save_state_and_destroy_tab(id, services);
            }
            freed_kb += group.footprint_kb;
            frozen_groups += 1;
        }

        // Freezing alone did not cover the target: make the surviving
        // candidate processes shed their in-process caches, and drop the
        // prerendered NTP view and thumbnails as a last resort.
        if freed_kb < expected_kb {
            for group in &groups[frozen_groups..] {
                services.engine.purge_render_process_memory(group.pid);
            }
            tabs.clear_cached_ntp_and_thumbnails(services);
        }
        log::info!(
            "freed {} kB by freezing {} of {} candidate processes",
            freed_kb,
            frozen_groups,
            groups.len()
        );
        freed_kb
    }
}
