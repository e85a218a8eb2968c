//! One browser tab: identity, launch metadata, and ownership of the
//! heavyweight engine view (or, when frozen, of the saved-state blob
//! standing in for it).

use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::{RenderEngine, ViewHandle};
use crate::services::state_store::StateStore;
use crate::types::errors::StateError;
use crate::types::state::TabState;
use crate::types::tab::{
    LaunchType, PageTransition, ProcessId, TabId, INVALID_RENDER_PROCESS_PID, NTP_URL,
};

/// A single tab. At most one of `view` and `saved_state` is authoritative
/// at a time: a tab with no view is "frozen" and lives on as a blob until
/// it is shown again.
pub struct TabRecord {
    id: TabId,
    incognito: bool,
    launch_type: LaunchType,
    parent_id: TabId,
    parent_is_incognito: bool,
    opener_app_id: Option<String>,
    view: Option<ViewHandle>,
    saved_state: Option<Vec<u8>>,
    // Mirrors of the last known engine-side values, consulted while frozen.
    url: Option<String>,
    title: Option<String>,
    last_shown_timestamp: i64,
    dirty: bool,
    hidden: bool,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

impl TabRecord {
    /// Creates a tab with an eagerly allocated engine view.
    pub fn new(
        id: TabId,
        incognito: bool,
        launch_type: LaunchType,
        parent_id: TabId,
        parent_is_incognito: bool,
        engine: &mut dyn RenderEngine,
    ) -> Self {
        let view = engine.create_view(incognito);
        Self {
            id,
            incognito,
            launch_type,
            parent_id,
            parent_is_incognito,
            opener_app_id: None,
            view: Some(view),
            saved_state: None,
            url: None,
            title: None,
            last_shown_timestamp: now_ms(),
            dirty: false,
            hidden: true,
        }
    }

    /// Adopts a view that already exists in the engine (popup handoff,
    /// prerendered NTP).
    pub fn adopt(
        id: TabId,
        incognito: bool,
        launch_type: LaunchType,
        parent_id: TabId,
        parent_is_incognito: bool,
        view: ViewHandle,
    ) -> Self {
        Self {
            id,
            incognito,
            launch_type,
            parent_id,
            parent_is_incognito,
            opener_app_id: None,
            view: Some(view),
            saved_state: None,
            url: None,
            title: None,
            last_shown_timestamp: now_ms(),
            dirty: false,
            hidden: true,
        }
    }

    /// Rebuilds a frozen placeholder from persisted state. No engine view
    /// is created until the tab is first shown.
    pub fn from_frozen_state(id: TabId, state: TabState) -> Self {
        Self {
            id,
            incognito: state.is_incognito,
            launch_type: LaunchType::FromRestore,
            parent_id: state.parent_id,
            parent_is_incognito: state.is_incognito,
            opener_app_id: state.opener_app_id,
            view: None,
            saved_state: Some(state.state),
            url: None,
            title: None,
            last_shown_timestamp: state.last_shown_timestamp,
            dirty: false,
            hidden: true,
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn is_incognito(&self) -> bool {
        self.incognito
    }

    pub fn launch_type(&self) -> LaunchType {
        self.launch_type
    }

    pub fn parent_id(&self) -> TabId {
        self.parent_id
    }

    pub fn parent_is_incognito(&self) -> bool {
        self.parent_is_incognito
    }

    pub fn opener_app_id(&self) -> Option<&str> {
        self.opener_app_id.as_deref()
    }

    /// Associates this tab with the external application that opened it.
    pub fn associate_with_app(&mut self, app_id: &str) {
        self.opener_app_id = Some(app_id.to_string());
    }

    pub fn view(&self) -> Option<ViewHandle> {
        self.view
    }

    /// A frozen tab has released its engine view; only the saved-state
    /// blob (if any) remains.
    pub fn is_frozen(&self) -> bool {
        self.view.is_none()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_shown_timestamp(&self) -> i64 {
        self.last_shown_timestamp
    }

    /// Used when restoring a persisted session to keep the original
    /// recency ordering.
    pub fn set_last_shown_timestamp(&mut self, timestamp: i64) {
        self.last_shown_timestamp = timestamp;
    }

    /// Last known URL: live view first, frozen mirror second.
    pub fn url(&self, engine: &dyn RenderEngine) -> Option<String> {
        match self.view {
            Some(view) => engine.url(view).or_else(|| self.url.clone()),
            None => self.url.clone(),
        }
    }

    /// Last known title, same resolution as [`url`](Self::url).
    pub fn title(&self, engine: &dyn RenderEngine) -> Option<String> {
        match self.view {
            Some(view) => engine.title(view).or_else(|| self.title.clone()),
            None => self.title.clone(),
        }
    }

    /// Render process hosting this tab's content, or
    /// [`INVALID_RENDER_PROCESS_PID`] while frozen.
    pub fn render_process_id(&self, engine: &dyn RenderEngine) -> ProcessId {
        match self.view {
            Some(view) => engine.render_process_id(view),
            None => INVALID_RENDER_PROCESS_PID,
        }
    }

    /// Asks the engine to drop this tab's render-process caches.
    pub fn purge_render_process_memory(&self, engine: &mut dyn RenderEngine) {
        let pid = self.render_process_id(engine);
        if pid != INVALID_RENDER_PROCESS_PID {
            engine.purge_render_process_memory(pid);
        }
    }

    /// Navigates the tab. A frozen tab ignores the request; callers are
    /// expected to show/restore it first.
    pub fn load_url(&mut self, engine: &mut dyn RenderEngine, url: &str, transition: PageTransition) {
        let Some(view) = self.view else {
            return;
        };
        engine.load_url(view, url, transition);
        self.url = Some(url.to_string());
        self.dirty = true;
    }

    /// Marks the tab visible, bumping its recency mark. A frozen tab is
    /// transparently restored.
    pub fn show(&mut self, engine: &mut dyn RenderEngine) {
        self.hidden = false;
        self.last_shown_timestamp = now_ms();
        if self.view.is_none() {
            self.restore(engine);
        }
    }

    pub fn hide(&mut self) {
        self.hidden = true;
    }

    /// Serializes engine state and releases the view. No-op for the
    /// visible tab and idempotent for an already-frozen one. An existing
    /// blob is reused rather than re-serialized.
    pub fn save_state_and_destroy(&mut self, engine: &mut dyn RenderEngine) {
        if !self.hidden {
            return;
        }
        let Some(view) = self.view else {
            return;
        };
        if self.saved_state.is_none() {
            self.saved_state = engine.serialize_state(view);
        }
        // Refresh the mirrors so the frozen tab still answers url/title
        // queries and can fall back to its last page on a bad blob.
        if let Some(url) = engine.url(view) {
            self.url = Some(url);
        }
        if let Some(title) = engine.title(view) {
            self.title = Some(title);
        }
        engine.destroy_view(view);
        self.view = None;
    }

    /// Rebuilds the engine view from the saved-state blob. A missing or
    /// corrupt blob falls back to reloading the last known URL, or the
    /// new-tab page — restoration never fails outward.
    pub fn restore(&mut self, engine: &mut dyn RenderEngine) {
        if self.view.is_some() {
            return;
        }
        if self.saved_state.is_none() {
            log::warn!("Restoring tab {} with no previously saved state", self.id);
        }
        let restored = self
            .saved_state
            .take()
            .and_then(|state| engine.restore_from_state(&state));
        match restored {
            Some(view) => {
                self.view = Some(view);
            }
            None => {
                let view = engine.create_view(self.incognito);
                self.view = Some(view);
                match self.url.clone() {
                    Some(url) => self.load_url(engine, &url, PageTransition::Reload),
                    None => {
                        log::info!(
                            "Unable to restore tab {} from saved state, falling back to NTP",
                            self.id
                        );
                        self.load_url(engine, NTP_URL, PageTransition::StartPage);
                    }
                }
            }
        }
    }

    /// Captures a persistable snapshot. A live view is re-serialized so
    /// the snapshot is current; a frozen tab reuses its blob. Returns
    /// `None` when there is nothing worth persisting.
    pub fn state_snapshot(&mut self, engine: &mut dyn RenderEngine) -> Option<TabState> {
        if let Some(view) = self.view {
            if let Some(state) = engine.serialize_state(view) {
                self.saved_state = Some(state);
            }
        }
        let state = self.saved_state.clone()?;
        Some(TabState {
            last_shown_timestamp: self.last_shown_timestamp,
            state,
            parent_id: self.parent_id,
            opener_app_id: self.opener_app_id.clone(),
            is_incognito: self.incognito,
        })
    }

    /// Writes the tab's state to disk. On success the dirty flag clears;
    /// on failure it stays set so a later retry re-attempts persistence.
    /// The engine view is never released on this path.
    pub fn persist(
        &mut self,
        engine: &mut dyn RenderEngine,
        store: &mut StateStore,
    ) -> Result<(), StateError> {
        let Some(state) = self.state_snapshot(engine) else {
            return Ok(());
        };
        store.write(self.id, &state)?;
        self.dirty = false;
        Ok(())
    }

    /// Removes the tab's state file. Called on permanent close.
    pub fn delete_state(&self, store: &mut StateStore) {
        store.delete(self.id, self.incognito);
    }

    /// Releases the engine view without saving anything. Permanent close.
    pub fn destroy(&mut self, engine: &mut dyn RenderEngine) {
        if let Some(view) = self.view.take() {
            // Keep the mirrors for history recording after destruction.
            if let Some(url) = engine.url(view) {
                self.url = Some(url);
            }
            if let Some(title) = engine.title(view) {
                self.title = Some(title);
            }
            engine.destroy_view(view);
        }
    }
}
