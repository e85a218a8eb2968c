//! In-memory reference implementation of [`RenderEngine`].
//!
//! Simulates the parts of a real engine this crate depends on: view
//! creation/destruction, state blobs that genuinely round-trip (and
//! genuinely fail on corrupt input), render-process packing with
//! configurable per-process memory footprints, and purge/history logs
//! that tests can assert against.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::{RenderEngine, ViewHandle};
use crate::types::tab::{PageTransition, ProcessId, INVALID_RENDER_PROCESS_PID};

/// Magic prefix of blobs produced by [`InMemoryEngine::serialize_state`].
const STATE_MAGIC: &[u8; 4] = b"TPST";

/// One entry in the engine-side history log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalTab {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone)]
struct ViewState {
    url: String,
    title: String,
    incognito: bool,
    pid: ProcessId,
}

/// In-memory engine. Views are packed into simulated render processes,
/// `views_per_process` at a time, in creation order.
pub struct InMemoryEngine {
    views: HashMap<u64, ViewState>,
    next_view: u64,
    views_per_process: usize,
    current_pid: ProcessId,
    slots_left_in_current_pid: usize,
    footprints_kb: HashMap<ProcessId, i32>,
    default_footprint_kb: i32,
    purged: Vec<ProcessId>,
    history: Vec<HistoricalTab>,
    incognito_profile_alive: bool,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::with_views_per_process(1)
    }

    /// Engine that packs up to `views_per_process` views into each
    /// simulated render process before opening a new one.
    pub fn with_views_per_process(views_per_process: usize) -> Self {
        Self {
            views: HashMap::new(),
            next_view: 1,
            views_per_process: views_per_process.max(1),
            current_pid: 0,
            slots_left_in_current_pid: 0,
            footprints_kb: HashMap::new(),
            default_footprint_kb: 4096,
            purged: Vec::new(),
            history: Vec::new(),
            incognito_profile_alive: false,
        }
    }

    /// Overrides the reported private size of one process.
    pub fn set_process_footprint_kb(&mut self, pid: ProcessId, kb: i32) {
        self.footprints_kb.insert(pid, kb);
    }

    /// Processes that had their caches purged, in purge order.
    pub fn purged_processes(&self) -> &[ProcessId] {
        &self.purged
    }

    /// Tabs recorded into history, in close order.
    pub fn recorded_history(&self) -> &[HistoricalTab] {
        &self.history
    }

    pub fn live_view_count(&self) -> usize {
        self.views.len()
    }

    pub fn incognito_profile_alive(&self) -> bool {
        self.incognito_profile_alive
    }

    fn allocate_view(&mut self, url: String, title: String, incognito: bool) -> ViewHandle {
        if self.slots_left_in_current_pid == 0 {
            self.current_pid += 1;
            self.slots_left_in_current_pid = self.views_per_process;
        }
        self.slots_left_in_current_pid -= 1;

        if incognito {
            self.incognito_profile_alive = true;
        }

        let handle = ViewHandle(self.next_view);
        self.next_view += 1;
        self.views.insert(
            handle.0,
            ViewState {
                url,
                title,
                incognito,
                pid: self.current_pid,
            },
        );
        handle
    }

    fn put_chunk(out: &mut Vec<u8>, data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(data);
    }

    fn take_chunk<'a>(input: &mut &'a [u8]) -> Option<&'a [u8]> {
        if input.len() < 4 {
            return None;
        }
        let len = u32::from_be_bytes([input[0], input[1], input[2], input[3]]) as usize;
        let rest = &input[4..];
        if rest.len() < len {
            return None;
        }
        *input = &rest[len..];
        Some(&rest[..len])
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine for InMemoryEngine {
    fn create_view(&mut self, incognito: bool) -> ViewHandle {
        self.allocate_view(String::new(), String::new(), incognito)
    }

    fn destroy_view(&mut self, view: ViewHandle) {
        self.views.remove(&view.0);
    }

    fn serialize_state(&mut self, view: ViewHandle) -> Option<Vec<u8>> {
        let state = self.views.get(&view.0)?;
        let mut blob = STATE_MAGIC.to_vec();
        blob.push(state.incognito as u8);
        Self::put_chunk(&mut blob, state.url.as_bytes());
        Self::put_chunk(&mut blob, state.title.as_bytes());
        Some(blob)
    }

    fn restore_from_state(&mut self, state: &[u8]) -> Option<ViewHandle> {
        if state.len() < STATE_MAGIC.len() + 1 || &state[..STATE_MAGIC.len()] != STATE_MAGIC {
            return None;
        }
        let incognito = state[STATE_MAGIC.len()] != 0;
        let mut rest = &state[STATE_MAGIC.len() + 1..];
        let url = String::from_utf8(Self::take_chunk(&mut rest)?.to_vec()).ok()?;
        let title = String::from_utf8(Self::take_chunk(&mut rest)?.to_vec()).ok()?;
        Some(self.allocate_view(url, title, incognito))
    }

    fn load_url(&mut self, view: ViewHandle, url: &str, _transition: PageTransition) {
        if let Some(state) = self.views.get_mut(&view.0) {
            state.url = url.to_string();
            state.title = url.to_string();
        }
    }

    fn url(&self, view: ViewHandle) -> Option<String> {
        self.views.get(&view.0).map(|v| v.url.clone())
    }

    fn title(&self, view: ViewHandle) -> Option<String> {
        self.views.get(&view.0).map(|v| v.title.clone())
    }

    fn render_process_id(&self, view: ViewHandle) -> ProcessId {
        self.views
            .get(&view.0)
            .map(|v| v.pid)
            .unwrap_or(INVALID_RENDER_PROCESS_PID)
    }

    fn render_process_private_size_kb(&self, pid: ProcessId) -> i32 {
        self.footprints_kb
            .get(&pid)
            .copied()
            .unwrap_or(self.default_footprint_kb)
    }

    fn purge_render_process_memory(&mut self, pid: ProcessId) {
        self.purged.push(pid);
    }

    fn create_historical_tab(&mut self, url: &str, title: &str) {
        self.history.push(HistoricalTab {
            url: url.to_string(),
            title: title.to_string(),
        });
    }

    fn destroy_incognito_profile(&mut self) {
        self.incognito_profile_alive = false;
    }
}

/// Shared-handle form: a caller can box a clone of the `Rc` into a
/// session while keeping its own handle for inspection.
impl RenderEngine for Rc<RefCell<InMemoryEngine>> {
    fn create_view(&mut self, incognito: bool) -> ViewHandle {
        self.borrow_mut().create_view(incognito)
    }

    fn destroy_view(&mut self, view: ViewHandle) {
        self.borrow_mut().destroy_view(view)
    }

    fn serialize_state(&mut self, view: ViewHandle) -> Option<Vec<u8>> {
        self.borrow_mut().serialize_state(view)
    }

    fn restore_from_state(&mut self, state: &[u8]) -> Option<ViewHandle> {
        self.borrow_mut().restore_from_state(state)
    }

    fn load_url(&mut self, view: ViewHandle, url: &str, transition: PageTransition) {
        self.borrow_mut().load_url(view, url, transition)
    }

    fn url(&self, view: ViewHandle) -> Option<String> {
        self.borrow().url(view)
    }

    fn title(&self, view: ViewHandle) -> Option<String> {
        self.borrow().title(view)
    }

    fn render_process_id(&self, view: ViewHandle) -> ProcessId {
        self.borrow().render_process_id(view)
    }

    fn render_process_private_size_kb(&self, pid: ProcessId) -> i32 {
        self.borrow().render_process_private_size_kb(pid)
    }

    fn purge_render_process_memory(&mut self, pid: ProcessId) {
        self.borrow_mut().purge_render_process_memory(pid)
    }

    fn create_historical_tab(&mut self, url: &str, title: &str) {
        self.borrow_mut().create_historical_tab(url, title)
    }

    fn destroy_incognito_profile(&mut self) {
        self.borrow_mut().destroy_incognito_profile()
    }
}
