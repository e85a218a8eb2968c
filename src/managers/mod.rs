// tabpool managers
// Managers own the tab lifecycle: records, the ordered per-mode
// collections, the normal/incognito pair, placement policy, and the
// memory-pressure monitor.

pub mod memory_monitor;
pub mod order_controller;
pub mod tab_collection;
pub mod tab_collection_set;
pub mod tab_record;
pub mod thumbnail_cache;
