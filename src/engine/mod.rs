//! Capability surface of the native content engine.
//!
//! Everything heavyweight about a tab (rendering, navigation, history
//! recording) lives behind [`RenderEngine`]. This crate only manages the
//! lifecycle of the opaque views the engine hands out.

pub mod in_memory;

use crate::types::tab::{PageTransition, ProcessId};

/// Opaque handle to a live engine view (one per non-frozen tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

/// The native engine collaborator.
///
/// All methods are infallible from this layer's perspective except
/// `serialize_state`/`restore_from_state`, which signal corrupt or
/// unserializable state by returning `None` — callers fall back rather
/// than propagate.
pub trait RenderEngine {
    /// Creates a fresh view with an empty navigation stack.
    fn create_view(&mut self, incognito: bool) -> ViewHandle;

    /// Releases a view and the resources it pins.
    fn destroy_view(&mut self, view: ViewHandle);

    /// Serializes the view's full session state into an opaque blob.
    fn serialize_state(&mut self, view: ViewHandle) -> Option<Vec<u8>>;

    /// Rebuilds a view from a blob produced by `serialize_state`.
    /// Returns `None` if the blob is corrupt.
    fn restore_from_state(&mut self, state: &[u8]) -> Option<ViewHandle>;

    /// Starts a navigation in the given view.
    fn load_url(&mut self, view: ViewHandle, url: &str, transition: PageTransition);

    /// URL currently committed in the view.
    fn url(&self, view: ViewHandle) -> Option<String>;

    /// Title of the currently committed page.
    fn title(&self, view: ViewHandle) -> Option<String>;

    /// OS process hosting the view's content, or
    /// [`INVALID_RENDER_PROCESS_PID`](crate::types::tab::INVALID_RENDER_PROCESS_PID).
    fn render_process_id(&self, view: ViewHandle) -> ProcessId;

    /// Private memory footprint of a render process, in kilobytes.
    fn render_process_private_size_kb(&self, pid: ProcessId) -> i32;

    /// Drops in-process caches (script heaps, image caches) of a render
    /// process without destroying any views it hosts.
    fn purge_render_process_memory(&mut self, pid: ProcessId);

    /// Records a closed tab into engine-side history.
    fn create_historical_tab(&mut self, url: &str, title: &str);

    /// Tears down the off-the-record profile once the last incognito tab
    /// is gone.
    fn destroy_incognito_profile(&mut self);
}
