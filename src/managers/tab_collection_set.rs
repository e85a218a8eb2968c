//! The pair of tab collections (normal and incognito) plus everything
//! that needs to see both at once: the active-slot switch, id allocation,
//! tab creation placement, the close-then-reselect policy, and the
//! thumbnail / cached-NTP storage.

use crate::engine::ViewHandle;
use crate::managers::memory_monitor::MemoryMonitor;
use crate::managers::order_controller;
use crate::managers::tab_collection::TabCollection;
use crate::managers::tab_record::TabRecord;
use crate::managers::thumbnail_cache::ThumbnailCache;
use crate::services::SessionServices;
use crate::types::errors::TabError;
use crate::types::tab::{
    transition_for_launch, LaunchType, PageTransition, SelectionType, TabId,
    INVALID_RENDER_PROCESS_PID, NO_PARENT_ID, NTP_URL,
};

/// App id recorded for external launches that did not identify
/// themselves, so their tabs can still be reused.
const UNKNOWN_APP_ID: &str = "unknown_app";

/// Holds the two tab collections and routes operations to whichever is
/// on screen. The sole owner of "which mode is visible".
pub struct TabCollectionSet {
    normal: TabCollection,
    incognito: TabCollection,
    active_incognito: bool,
    next_id: TabId,
    overview_mode: bool,
    thumbnails: ThumbnailCache,
    cached_ntp_view: Option<ViewHandle>,
}

impl TabCollectionSet {
    pub fn new() -> Self {
        Self {
            normal: TabCollection::new(false),
            incognito: TabCollection::new(true),
            active_incognito: false,
            next_id: 0,
            overview_mode: false,
            thumbnails: ThumbnailCache::new(),
            cached_ntp_view: None,
        }
    }

    // === Lookup ===

    pub fn model(&self, incognito: bool) -> &TabCollection {
        if incognito {
            &self.incognito
        } else {
            &self.normal
        }
    }

    pub fn model_mut(&mut self, incognito: bool) -> &mut TabCollection {
        if incognito {
            &mut self.incognito
        } else {
            &mut self.normal
        }
    }

    pub fn current_model(&self) -> &TabCollection {
        self.model(self.active_incognito)
    }

    pub fn is_incognito_selected(&self) -> bool {
        self.active_incognito
    }

    /// The tab visible on screen, if any.
    pub fn current_tab(&self) -> Option<&TabRecord> {
        self.current_model().current_tab()
    }

    /// Looks a tab up by id in both collections. Ids for normal and
    /// incognito tabs share one number range, so freezing and restoring
    /// must check both.
    pub fn find_tab(&self, id: TabId) -> Option<&TabRecord> {
        self.normal.get_by_id(id).or_else(|| self.incognito.get_by_id(id))
    }

    pub fn find_tab_mut(&mut self, id: TabId) -> Option<&mut TabRecord> {
        if self.normal.get_by_id(id).is_some() {
            return self.normal.get_by_id_mut(id);
        }
        self.incognito.get_by_id_mut(id)
    }

    fn collection_of(&self, id: TabId) -> Option<bool> {
        if self.normal.index_of_id(id).is_some() {
            Some(false)
        } else if self.incognito.index_of_id(id).is_some() {
            Some(true)
        } else {
            None
        }
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    pub fn thumbnails_mut(&mut self) -> &mut ThumbnailCache {
        &mut self.thumbnails
    }

    pub fn in_overview_mode(&self) -> bool {
        self.overview_mode
    }

    pub fn set_overview_mode(&mut self, overview: bool) {
        self.overview_mode = overview;
    }

    fn allocate_id(&mut self) -> TabId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Keeps the id allocator above ids read back from persisted state.
    fn ensure_next_id_above(&mut self, id: TabId) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }

    // === Selection ===

    /// Switches the visible collection. Re-applies the incoming slot's
    /// selection (triggering show/restore side effects) only when the
    /// slot actually changes.
    pub fn select_model(
        &mut self,
        incognito: bool,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) {
        if incognito == self.active_incognito {
            return;
        }
        let outgoing = self.active_incognito;
        if let Some(tab) = self.model_mut(outgoing).current_tab_mut() {
            tab.hide();
        }
        self.active_incognito = incognito;
        if let Some(index) = self.model(incognito).index() {
            self.set_index(index, SelectionType::FromUser, services, monitor);
        }
    }

    /// Selects a tab in the active collection by position, hiding the
    /// previous one and showing (restoring, if frozen) the new one.
    pub fn set_index(
        &mut self,
        index: usize,
        selection_type: SelectionType,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) {
        let incognito = self.active_incognito;
        let selected_id;
        {
            let model = self.model_mut(incognito);
            if model.is_empty() {
                model.set_index_raw(None);
                return;
            }
            let index = index.min(model.len() - 1);
            let prev_id = model.current_tab().map(|t| t.id());
            let Some(new_id) = model.get(index).map(|t| t.id()) else {
                return;
            };
            if prev_id != Some(new_id) {
                if let Some(prev_id) = prev_id {
                    if let Some(prev) = model.get_by_id_mut(prev_id) {
                        prev.hide();
                    }
                }
            }
            model.set_index_raw(Some(index));
            if let Some(tab) = model.get_mut(index) {
                tab.show(&mut *services.engine);
            }
            selected_id = new_id;
        }
        log::debug!("tab {} selected ({:?})", selected_id, selection_type);
        let to_freeze = monitor.on_tab_selected(selected_id);
        self.freeze_tabs(&to_freeze, services);
    }

    // === Creation ===

    /// Creates a tab in the active collection at the end of the strip.
    pub fn create_new_tab(
        &mut self,
        url: &str,
        launch_type: LaunchType,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> TabId {
        self.create_new_tab_at(url, launch_type, None, services, monitor)
    }

    /// Creates a tab in the active collection at `position` (insert
    /// before; `None` = end). Link and long-press opens become children
    /// of the current tab and land directly after it, overriding the
    /// requested position.
    pub fn create_new_tab_at(
        &mut self,
        url: &str,
        launch_type: LaunchType,
        position: Option<usize>,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> TabId {
        let incognito = self.active_incognito;
        let mut position = position;
        let mut parent_id = NO_PARENT_ID;
        let mut parent_is_incognito = incognito;

        if matches!(launch_type, LaunchType::FromLink | LaunchType::FromLongpress) {
            if let Some(current) = self.model(incognito).current_tab() {
                parent_id = current.id();
                parent_is_incognito = current.is_incognito();
                if let Some(parent_index) = self.model(incognito).index_of_id(parent_id) {
                    position = Some(parent_index + 1);
                }
            }
        }

        self.create_new_tab_in(
            incognito,
            url,
            launch_type,
            position,
            parent_id,
            parent_is_incognito,
            services,
            monitor,
        )
    }

    /// Long-press "open in new tab" entry point: the new tab may target
    /// either collection and is placed right after its parent.
    pub fn open_new_tab(
        &mut self,
        url: &str,
        parent_id: TabId,
        incognito: bool,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> TabId {
        let parent_is_incognito = self.collection_of(parent_id).unwrap_or(incognito);
        let position = self.model(incognito).index_of_id(parent_id).map(|i| i + 1);
        self.create_new_tab_in(
            incognito,
            url,
            LaunchType::FromLongpress,
            position,
            parent_id,
            parent_is_incognito,
            services,
            monitor,
        )
    }

    fn create_new_tab_in(
        &mut self,
        incognito: bool,
        url: &str,
        launch_type: LaunchType,
        position: Option<usize>,
        parent_id: TabId,
        parent_is_incognito: bool,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> TabId {
        let open_in_foreground =
            order_controller::will_open_in_foreground(launch_type, incognito, self.active_incognito);
        let id = self.allocate_id();

        let mut to_freeze = monitor.on_tab_creating(id, open_in_foreground);
        to_freeze.retain(|&f| f != id);
        self.freeze_tabs(&to_freeze, services);

        let record = TabRecord::new(
            id,
            incognito,
            launch_type,
            parent_id,
            parent_is_incognito,
            &mut *services.engine,
        );
        let position =
            order_controller::determine_insertion_index(launch_type, position, self.model(incognito).len());
        let is_active = self.active_incognito == incognito;
        let new_index = self.model_mut(incognito).add_tab(position, record, is_active);

        if let Some(tab) = self.model_mut(incognito).get_mut(new_index) {
            tab.load_url(&mut *services.engine, url, transition_for_launch(launch_type));
        }

        if open_in_foreground {
            self.select_model(incognito, services, monitor);
            self.set_index(new_index, SelectionType::FromNew, services, monitor);
        }
        id
    }

    /// Adopts a view that already exists in the engine (popup handoff).
    /// The tab lands right after its parent and is selected unless it
    /// came from session restore.
    pub fn create_tab_with_native_view(
        &mut self,
        incognito: bool,
        view: ViewHandle,
        parent_id: TabId,
        app_id: Option<&str>,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> TabId {
        let position = self.model(incognito).index_of_id(parent_id).map(|i| i + 1);
        self.insert_adopted(
            incognito,
            view,
            LaunchType::FromLink,
            position,
            parent_id,
            app_id,
            true,
            services,
            monitor,
        )
    }

    fn insert_adopted(
        &mut self,
        incognito: bool,
        view: ViewHandle,
        launch_type: LaunchType,
        position: Option<usize>,
        parent_id: TabId,
        app_id: Option<&str>,
        select: bool,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> TabId {
        let id = self.allocate_id();
        let mut to_freeze = monitor.on_tab_creating(id, select);
        to_freeze.retain(|&f| f != id);
        self.freeze_tabs(&to_freeze, services);

        let mut record = TabRecord::adopt(id, incognito, launch_type, parent_id, incognito, view);
        if let Some(app_id) = app_id {
            record.associate_with_app(app_id);
        }
        let position =
            order_controller::determine_insertion_index(launch_type, position, self.model(incognito).len());
        let is_active = self.active_incognito == incognito;
        let new_index = self.model_mut(incognito).add_tab(position, record, is_active);

        if select {
            self.select_model(incognito, services, monitor);
            self.set_index(new_index, SelectionType::FromNew, services, monitor);
        }
        id
    }

    /// Re-registers a tab rebuilt from persisted state. The tab joins the
    /// end of its collection in the background; its view is recreated
    /// lazily on first show.
    ///
    /// Startup-phase exception: restoring into the active collection does
    /// not move its cursor, so right after restore the collection can
    /// hold tabs with nothing selected. Auto-selecting here would force
    /// an immediate show (and engine view rebuild) of a tab the user may
    /// never return to; the embedder selects explicitly once restore is
    /// done.
    pub fn register_restored_tab(
        &mut self,
        record: TabRecord,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> TabId {
        let id = record.id();
        let incognito = record.is_incognito();
        self.ensure_next_id_above(id);

        let mut to_freeze = monitor.on_tab_creating(id, false);
        to_freeze.retain(|&f| f != id);
        self.freeze_tabs(&to_freeze, services);

        let is_active = self.active_incognito == incognito;
        self.model_mut(incognito).add_tab(None, record, is_active);
        id
    }

    /// Opens the new-tab page, consuming the prerendered NTP view when
    /// one is cached.
    pub fn launch_ntp(
        &mut self,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> TabId {
        if let Some(view) = self.cached_ntp_view.take() {
            return self.insert_adopted(
                self.active_incognito,
                view,
                LaunchType::FromOverview,
                None,
                NO_PARENT_ID,
                None,
                true,
                services,
                monitor,
            );
        }
        self.create_new_tab(NTP_URL, LaunchType::FromOverview, services, monitor)
    }

    /// Warms up a hidden NTP view so the next [`launch_ntp`](Self::launch_ntp)
    /// is instant.
    pub fn prerender_ntp(&mut self, services: &mut SessionServices) {
        if self.cached_ntp_view.is_some() {
            return;
        }
        let view = services.engine.create_view(false);
        services
            .engine
            .load_url(view, NTP_URL, PageTransition::StartPage);
        self.cached_ntp_view = Some(view);
    }

    pub fn has_cached_ntp(&self) -> bool {
        self.cached_ntp_view.is_some()
    }

    /// External-app launch: a tab previously opened by the same app is
    /// replaced in place (new tab at its index, old one closed) instead
    /// of piling up one tab per intent.
    pub fn launch_url_from_external_app(
        &mut self,
        url: &str,
        app_id: Option<&str>,
        force_new_tab: bool,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> TabId {
        if force_new_tab {
            return self.create_new_tab_in(
                false,
                url,
                LaunchType::FromExternalApp,
                None,
                NO_PARENT_ID,
                false,
                services,
                monitor,
            );
        }
        let app_id = app_id.filter(|s| !s.is_empty()).unwrap_or(UNKNOWN_APP_ID);

        let existing = self
            .normal
            .iter()
            .enumerate()
            .find(|(_, t)| t.opener_app_id() == Some(app_id))
            .map(|(i, t)| (i, t.id()));

        let id = match existing {
            Some((index, old_id)) => {
                // Reusing the old tab would mean scrubbing its history and
                // contents, so create a fresh one in the same slot.
                let new_id = self.create_new_tab_in(
                    false,
                    url,
                    LaunchType::FromExternalApp,
                    Some(index),
                    NO_PARENT_ID,
                    false,
                    services,
                    monitor,
                );
                let _ = self.close_tab(old_id, false, services, monitor);
                new_id
            }
            None => self.create_new_tab_in(
                false,
                url,
                LaunchType::FromExternalApp,
                None,
                NO_PARENT_ID,
                false,
                services,
                monitor,
            ),
        };
        if let Some(tab) = self.normal.get_by_id_mut(id) {
            tab.associate_with_app(app_id);
        }
        id
    }

    // === Movement ===

    /// Moves a tab within its collection. Out-of-range positions are
    /// clamped; unknown ids and degenerate moves are no-ops.
    pub fn move_tab(&mut self, id: TabId, new_index: usize) {
        let Some(incognito) = self.collection_of(id) else {
            return;
        };
        if let Some((from, to)) = self.model_mut(incognito).move_tab(id, new_index) {
            log::debug!("tab {} moved {} -> {}", id, from, to);
        }
    }

    // === Closing ===

    /// Pure query form of the close-selection policy: which tab would be
    /// selected if `id` were closed right now.
    ///
    /// Precedence: a background close keeps the current tab; otherwise
    /// the parent (unless the tab overview is showing); otherwise the
    /// adjacent tab (before, or after when closing index 0); otherwise,
    /// for the last incognito tab, the current normal tab; otherwise
    /// nothing. Returns `(incognito, id)` of the tab to select.
    pub fn get_next_tab_if_closed(&self, id: TabId) -> Option<(bool, TabId)> {
        let closing_inc = self.collection_of(id)?;
        let model = self.model(closing_inc);
        let closing = model.get_by_id(id)?;
        let closing_index = model.index_of_id(id)?;

        let adjacent_pos = if closing_index == 0 { 1 } else { closing_index - 1 };
        let adjacent = model.get(adjacent_pos);
        let parent = self
            .model(closing.parent_is_incognito())
            .get_by_id(closing.parent_id());

        // Closing anything but the on-screen tab keeps the screen.
        if let Some(current) = self.current_tab() {
            if current.id() != id {
                return Some((self.active_incognito, current.id()));
            }
        }
        if let Some(parent) = parent {
            if !self.overview_mode {
                return Some((parent.is_incognito(), parent.id()));
            }
        }
        if let Some(adjacent) = adjacent {
            return Some((closing_inc, adjacent.id()));
        }
        if closing_inc {
            if let Some(current) = self.normal.current_tab() {
                return Some((false, current.id()));
            }
        }
        None
    }

    /// Closes a tab permanently: selection handoff, history recording,
    /// shared-process cache purge, view destruction, and state-file
    /// deletion. Closing a tab that is not a member of either collection
    /// is a programmer error.
    pub fn close_tab(
        &mut self,
        id: TabId,
        animate: bool,
        services: &mut SessionServices,
        monitor: &mut MemoryMonitor,
    ) -> Result<(), TabError> {
        let Some(closing_inc) = self.collection_of(id) else {
            debug_assert!(false, "closing a tab that is not a model member");
            return Err(TabError::NotFound(id));
        };
        log::debug!("closing tab {} (animate={})", id, animate);

        // Everything the selection handoff needs, computed before any
        // mutation.
        let (current_id, adjacent_id) = {
            let model = self.model(closing_inc);
            let closing_index = model.index_of_id(id).ok_or(TabError::NotFound(id))?;
            let adjacent_pos = if closing_index == 0 { 1 } else { closing_index - 1 };
            (
                model.current_tab().map(|t| t.id()),
                model.get(adjacent_pos).map(|t| t.id()),
            )
        };
        let next = self.get_next_tab_if_closed(id);

        monitor.on_tab_closing(id);

        let mut closed = self
            .model_mut(closing_inc)
            .remove_tab_by_id(id)
            .ok_or(TabError::NotFound(id))?;
        self.thumbnails.remove(id);

        let next_is_current =
            matches!(next, Some((ninc, nid)) if ninc == closing_inc && Some(nid) == current_id);

        match next {
            Some((next_inc, next_id)) if !next_is_current => {
                if next_inc != closing_inc {
                    // Leaving this collection: re-derive its cursor so it
                    // is not stale on return. The surviving cursor tab
                    // keeps it; a closed cursor falls to the adjacent tab.
                    let survivor = current_id
                        .filter(|&cid| cid != id)
                        .or(adjacent_id);
                    let index = survivor.and_then(|sid| self.model(closing_inc).index_of_id(sid));
                    self.model_mut(closing_inc).set_index_raw(index);
                }
                if self.active_incognito != next_inc {
                    self.active_incognito = next_inc;
                }
                if let Some(next_index) = self.model(next_inc).index_of_id(next_id) {
                    self.set_index(next_index, SelectionType::FromClose, services, monitor);
                }
            }
            Some((_, next_id)) => {
                // Background close: the current tab is unchanged but its
                // position may have shifted.
                let next_index = self.model(closing_inc).index_of_id(next_id);
                self.model_mut(closing_inc).set_index_raw(next_index);
            }
            None => {
                self.model_mut(closing_inc).set_index_raw(None);
            }
        }

        if !closing_inc {
            if let Some(url) = closed.url(&*services.engine) {
                let title = closed.title(&*services.engine).unwrap_or_default();
                services.engine.create_historical_tab(&url, &title);
            }
        }

        let closed_pid = if closed.is_frozen() {
            INVALID_RENDER_PROCESS_PID
        } else {
            closed.render_process_id(&*services.engine)
        };
        closed.destroy(&mut *services.engine);
        closed.delete_state(&mut services.store);

        if closing_inc && self.incognito.is_empty() {
            services.engine.destroy_incognito_profile();
        }

        if closed_pid != INVALID_RENDER_PROCESS_PID {
            // If the closed tab's render process still hosts other tabs,
            // its in-process caches can be reclaimed right away instead
            // of waiting for a future GC or memory-pressure pass.
            let engine_ref = &*services.engine;
            let has_sharer = self
                .model(closing_inc)
                .iter()
                .any(|t| !t.is_frozen() && t.render_process_id(engine_ref) == closed_pid);
            if has_sharer {
                services.engine.purge_render_process_memory(closed_pid);
            }
        }

        Ok(())
    }

    /// Closes every tab in the collection that is active on entry.
    /// Closing the last one may hand the screen to the other collection.
    pub fn close_all_tabs(&mut self, services: &mut SessionServices, monitor: &mut MemoryMonitor) {
        let incognito = self.active_incognito;
        while let Some(id) = self.model(incognito).get(0).map(|t| t.id()) {
            let _ = self.close_tab(id, false, services, monitor);
        }
    }

    // === Freezing ===

    /// Freeze-dries one tab: state saved to a blob, view destroyed. The
    /// tab stays in its collection as a lightweight placeholder. Checks
    /// both collections since ids share one range.
    pub fn save_state_and_destroy_tab(&mut self, id: TabId, services: &mut SessionServices) {
        match self.find_tab_mut(id) {
            Some(tab) => tab.save_state_and_destroy(&mut *services.engine),
            None => log::warn!("asked to freeze unknown tab {}", id),
        }
    }

    fn freeze_tabs(&mut self, ids: &[TabId], services: &mut SessionServices) {
        for &id in ids {
            self.save_state_and_destroy_tab(id, services);
        }
    }

    /// Last-resort memory reclaim: drops the prerendered NTP view and
    /// every cached thumbnail.
    pub fn clear_cached_ntp_and_thumbnails(&mut self, services: &mut SessionServices) {
        if let Some(view) = self.cached_ntp_view.take() {
            services.engine.destroy_view(view);
        }
        self.thumbnails.clear();
    }
}

impl Default for TabCollectionSet {
    fn default() -> Self {
        Self::new()
    }
}
