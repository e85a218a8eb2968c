use serde::{Deserialize, Serialize};

use crate::types::tab::TabId;

/// Snapshot of a tab's persistable state: the opaque engine byte-blob plus
/// the metadata needed to rebuild the tab's place in the session.
///
/// This mirrors the on-disk record written by
/// [`StateStore`](crate::services::state_store::StateStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabState {
    /// When the tab was last the foreground tab (milliseconds since epoch).
    pub last_shown_timestamp: i64,
    /// Opaque serialized engine state.
    pub state: Vec<u8>,
    /// Id of the tab that spawned this one, or
    /// [`NO_PARENT_ID`](crate::types::tab::NO_PARENT_ID).
    pub parent_id: TabId,
    /// Package/app id of the external application that opened this tab.
    pub opener_app_id: Option<String>,
    /// Whether the state came from (and must go back to) an encrypted file.
    pub is_incognito: bool,
}
