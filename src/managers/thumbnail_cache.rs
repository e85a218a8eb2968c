//! Per-tab thumbnail bytes, keyed by tab id. The cached new-tab-page
//! entry lives here too, under [`NTP_TAB_ID`](crate::types::tab::NTP_TAB_ID).

use std::collections::HashMap;

use crate::types::tab::TabId;

pub struct ThumbnailCache {
    entries: HashMap<TabId, Vec<u8>>,
}

impl ThumbnailCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn put(&mut self, id: TabId, thumbnail: Vec<u8>) {
        self.entries.insert(id, thumbnail);
    }

    pub fn get(&self, id: TabId) -> Option<&[u8]> {
        self.entries.get(&id).map(|v| v.as_slice())
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn remove(&mut self, id: TabId) {
        self.entries.remove(&id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new()
    }
}
