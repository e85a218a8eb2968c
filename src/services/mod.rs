// tabpool services
// Services provide the infrastructure the tab managers lean on: the
// content engine, incognito crypto, and the persistent per-tab state store.

pub mod crypto;
pub mod state_store;

use crate::engine::RenderEngine;
use crate::services::state_store::StateStore;

/// Process-scoped bundle of the collaborators every tab mutation needs.
/// Passed by reference into collection operations instead of living in
/// globals, so init and teardown are explicit.
pub struct SessionServices {
    pub engine: Box<dyn RenderEngine>,
    pub store: StateStore,
}

impl SessionServices {
    pub fn new(engine: Box<dyn RenderEngine>, store: StateStore) -> Self {
        Self { engine, store }
    }
}
