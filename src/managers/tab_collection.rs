//! Ordered tab sequence for one browsing mode, with the current-index
//! cursor and its repair rules.
//!
//! The collection is purely structural: insertion, removal, movement, and
//! index queries. Selection side effects (show/hide, model switching,
//! eviction events) live in
//! [`TabCollectionSet`](crate::managers::tab_collection_set::TabCollectionSet).

use crate::engine::RenderEngine;
use crate::managers::tab_record::TabRecord;
use crate::types::tab::{TabId, INVALID_TAB_ID};

/// Ordered, indexed collection of tabs for one mode (normal or private).
///
/// Invariant: `index` is either a valid position into `tabs` or `None`
/// when the collection is empty or nothing is selected yet; every
/// structural mutation repairs it before returning.
pub struct TabCollection {
    incognito: bool,
    tabs: Vec<TabRecord>,
    index: Option<usize>,
}

impl TabCollection {
    pub fn new(incognito: bool) -> Self {
        Self {
            incognito,
            tabs: Vec::new(),
            index: None,
        }
    }

    pub fn is_incognito(&self) -> bool {
        self.incognito
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&TabRecord> {
        self.tabs.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut TabRecord> {
        self.tabs.get_mut(position)
    }

    pub fn get_by_id(&self, id: TabId) -> Option<&TabRecord> {
        if id == INVALID_TAB_ID {
            return None;
        }
        self.tabs.iter().find(|t| t.id() == id)
    }

    pub fn get_by_id_mut(&mut self, id: TabId) -> Option<&mut TabRecord> {
        if id == INVALID_TAB_ID {
            return None;
        }
        self.tabs.iter_mut().find(|t| t.id() == id)
    }

    /// Position of the tab with the given id. Linear scan.
    pub fn index_of_id(&self, id: TabId) -> Option<usize> {
        if id == INVALID_TAB_ID {
            return None;
        }
        self.tabs.iter().position(|t| t.id() == id)
    }

    /// Position of the first tab whose URL matches. Linear scan.
    pub fn index_of_url(&self, url: &str, engine: &dyn RenderEngine) -> Option<usize> {
        self.tabs
            .iter()
            .position(|t| t.url(engine).as_deref() == Some(url))
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Raw cursor assignment. Callers are responsible for handing in a
    /// valid position or `None`.
    pub(crate) fn set_index_raw(&mut self, index: Option<usize>) {
        debug_assert!(index.map_or(true, |i| i < self.tabs.len()));
        self.index = index;
    }

    pub fn current_tab(&self) -> Option<&TabRecord> {
        self.index.and_then(|i| self.tabs.get(i))
    }

    pub fn current_tab_mut(&mut self) -> Option<&mut TabRecord> {
        let i = self.index?;
        self.tabs.get_mut(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TabRecord> {
        self.tabs.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TabRecord> {
        self.tabs.iter_mut()
    }

    /// Inserts a tab at `position` (or the end when `None`), returning
    /// its actual index.
    ///
    /// Cursor repair: inserting at or before the current index shifts the
    /// cursor forward so it keeps pointing at the same logical tab. When
    /// this collection is not the one on screen, a previously-empty
    /// cursor is clamped to the first tab; the on-screen collection gets
    /// its cursor from the selection that follows creation.
    pub fn add_tab(&mut self, position: Option<usize>, tab: TabRecord, is_active: bool) -> usize {
        debug_assert_eq!(tab.is_incognito(), self.incognito);
        let new_index = match position {
            None => {
                self.tabs.push(tab);
                self.tabs.len() - 1
            }
            Some(p) => {
                let p = p.min(self.tabs.len());
                self.tabs.insert(p, tab);
                if let Some(i) = self.index {
                    if p <= i {
                        self.index = Some(i + 1);
                    }
                }
                p
            }
        };
        if !is_active && self.index.is_none() {
            self.index = Some(0);
        }
        new_index
    }

    /// Moves a tab to `new_index` (clamped to `[0, len]`, interpreted as
    /// an insert-before position). Moving a tab just before itself is the
    /// degenerate no-op. Returns `(old_index, new_index)` when something
    /// actually moved.
    pub fn move_tab(&mut self, id: TabId, new_index: usize) -> Option<(usize, usize)> {
        let new_index = new_index.min(self.tabs.len());
        let cur_index = self.index_of_id(id)?;
        if cur_index == new_index || cur_index + 1 == new_index {
            return None;
        }

        let tab = self.tabs.remove(cur_index);
        let new_index = if cur_index < new_index {
            new_index - 1
        } else {
            new_index
        };
        self.tabs.insert(new_index, tab);

        if let Some(i) = self.index {
            if cur_index == i {
                self.index = Some(new_index);
            } else if cur_index < i && new_index >= i {
                self.index = Some(i - 1);
            } else if cur_index > i && new_index <= i {
                self.index = Some(i + 1);
            }
        }

        Some((cur_index, new_index))
    }

    /// Removes a tab from the sequence. The cursor is left untouched —
    /// the close path reassigns it explicitly in every branch before any
    /// observer can see the collection.
    pub(crate) fn remove_tab_by_id(&mut self, id: TabId) -> Option<TabRecord> {
        let position = self.index_of_id(id)?;
        Some(self.tabs.remove(position))
    }
}
