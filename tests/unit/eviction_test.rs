// Memory-pressure behavior: the live-tab cap, eviction ordering, and
// the bulk reclaim pass.

use std::cell::RefCell;
use std::rc::Rc;

use tempfile::TempDir;

use tabpool::engine::in_memory::InMemoryEngine;
use tabpool::managers::memory_monitor::{MemoryMonitor, FREE_AS_MUCH_AS_POSSIBLE};
use tabpool::managers::tab_collection_set::TabCollectionSet;
use tabpool::services::state_store::StateStore;
use tabpool::services::SessionServices;
use tabpool::types::tab::LaunchType;

fn rig(views_per_process: usize) -> (Rc<RefCell<InMemoryEngine>>, SessionServices, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = StateStore::open(dir.path()).unwrap();
    let engine = Rc::new(RefCell::new(InMemoryEngine::with_views_per_process(
        views_per_process,
    )));
    let services = SessionServices::new(Box::new(engine.clone()), store);
    (engine, services, dir)
}

fn live_count(set: &TabCollectionSet) -> usize {
    set.model(false).iter().filter(|t| !t.is_frozen()).count()
        + set.model(true).iter().filter(|t| !t.is_frozen()).count()
}

#[test]
fn test_live_tab_cap_holds_across_foreground_creates() {
    let (_engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(2);
    let mut set = TabCollectionSet::new();

    let t1 = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let t2 = set.create_new_tab("b", LaunchType::FromOverview, &mut services, &mut monitor);
    let t3 = set.create_new_tab("c", LaunchType::FromOverview, &mut services, &mut monitor);

    assert!(live_count(&set) <= 2);
    assert!(set.find_tab(t1).unwrap().is_frozen());
    assert!(!set.find_tab(t2).unwrap().is_frozen());
    assert!(!set.find_tab(t3).unwrap().is_frozen());
}

#[test]
fn test_background_creates_evict_older_background_tabs() {
    let (_engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(2);
    let mut set = TabCollectionSet::new();

    let t1 = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let t2 = set.open_new_tab("b", t1, false, &mut services, &mut monitor);
    let t3 = set.open_new_tab("c", t1, false, &mut services, &mut monitor);

    // The newer background tab outranks the older one; the visible tab
    // is untouchable.
    assert!(!set.find_tab(t1).unwrap().is_frozen());
    assert!(set.find_tab(t2).unwrap().is_frozen());
    assert!(!set.find_tab(t3).unwrap().is_frozen());
    assert_eq!(set.current_tab().unwrap().id(), t1);
}

#[test]
fn test_selecting_frozen_tab_restores_it_and_evicts_another() {
    let (_engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(1);
    let mut set = TabCollectionSet::new();

    let t1 = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let t2 = set.create_new_tab("b", LaunchType::FromOverview, &mut services, &mut monitor);
    assert!(set.find_tab(t1).unwrap().is_frozen());

    let t1_index = set.current_model().index_of_id(t1).unwrap();
    set.set_index(
        t1_index,
        tabpool::types::tab::SelectionType::FromUser,
        &mut services,
        &mut monitor,
    );

    assert!(!set.find_tab(t1).unwrap().is_frozen());
    assert!(set.find_tab(t2).unwrap().is_frozen());
    assert_eq!(set.current_tab().unwrap().id(), t1);
    assert_eq!(set.current_tab().unwrap().url(services.engine.as_ref()).as_deref(), Some("a"));
}

#[test]
fn test_free_memory_spares_the_foreground_process() {
    let (engine, mut services, _dir) = rig(2);
    let mut monitor = MemoryMonitor::new(10);
    let mut set = TabCollectionSet::new();

    // t1/t2 share one render process, t3/t4 share the foreground one.
    let t1 = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let t2 = set.create_new_tab("b", LaunchType::FromOverview, &mut services, &mut monitor);
    let t3 = set.create_new_tab("c", LaunchType::FromOverview, &mut services, &mut monitor);
    let t4 = set.create_new_tab("d", LaunchType::FromOverview, &mut services, &mut monitor);

    let freed = monitor.free_memory(&mut set, &mut services, FREE_AS_MUCH_AS_POSSIBLE);

    assert!(freed > 0);
    assert!(set.find_tab(t1).unwrap().is_frozen());
    assert!(set.find_tab(t2).unwrap().is_frozen());
    // t3 is hidden but shares the foreground process, so it is spared
    // from freezing and its process is never purged.
    assert!(!set.find_tab(t3).unwrap().is_frozen());
    assert!(!set.find_tab(t4).unwrap().is_frozen());
    assert_eq!(set.current_tab().unwrap().id(), t4);
    assert!(engine.borrow().purged_processes().is_empty());
}

#[test]
fn test_free_memory_spares_the_foreground_tabs_parent() {
    let (_engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(10);
    let mut set = TabCollectionSet::new();

    let bystander = set.create_new_tab("x", LaunchType::FromOverview, &mut services, &mut monitor);
    let parent = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    // Link open: the new foreground tab records "a" as its parent.
    let child = set.create_new_tab("b", LaunchType::FromLink, &mut services, &mut monitor);
    assert_eq!(set.current_tab().unwrap().id(), child);
    assert_eq!(set.find_tab(child).unwrap().parent_id(), parent);

    monitor.free_memory(&mut set, &mut services, FREE_AS_MUCH_AS_POSSIBLE);

    assert!(!set.find_tab(parent).unwrap().is_frozen());
    assert!(set.find_tab(bystander).unwrap().is_frozen());
}

#[test]
fn test_free_memory_spares_the_foreground_tabs_children() {
    let (_engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(10);
    let mut set = TabCollectionSet::new();

    let bystander = set.create_new_tab("x", LaunchType::FromOverview, &mut services, &mut monitor);
    let parent = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let child = set.open_new_tab("b", parent, false, &mut services, &mut monitor);
    assert_eq!(set.current_tab().unwrap().id(), parent);

    monitor.free_memory(&mut set, &mut services, FREE_AS_MUCH_AS_POSSIBLE);

    assert!(!set.find_tab(child).unwrap().is_frozen());
    assert!(set.find_tab(bystander).unwrap().is_frozen());
}

#[test]
fn test_free_memory_spares_the_inactive_models_current_tab() {
    let (_engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(10);
    let mut set = TabCollectionSet::new();

    let t1 = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let t2 = set.create_new_tab("b", LaunchType::FromOverview, &mut services, &mut monitor);
    let t3 = set.create_new_tab("c", LaunchType::FromOverview, &mut services, &mut monitor);
    set.set_index(1, tabpool::types::tab::SelectionType::FromUser, &mut services, &mut monitor);
    let private = set.open_new_tab("p", t1, true, &mut services, &mut monitor);
    assert!(set.is_incognito_selected());

    monitor.free_memory(&mut set, &mut services, FREE_AS_MUCH_AS_POSSIBLE);

    // The normal collection's remembered selection stays live even while
    // off screen; only the unselected bystander is freezable.
    assert!(!set.find_tab(t2).unwrap().is_frozen());
    assert!(!set.find_tab(private).unwrap().is_frozen());
    assert!(set.find_tab(t3).unwrap().is_frozen());
}

#[test]
fn test_free_memory_takes_largest_processes_until_target_met() {
    let (engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(10);
    let mut set = TabCollectionSet::new();

    let t1 = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let t2 = set.create_new_tab("b", LaunchType::FromOverview, &mut services, &mut monitor);
    let t3 = set.create_new_tab("c", LaunchType::FromOverview, &mut services, &mut monitor);
    let _fg = set.create_new_tab("d", LaunchType::FromOverview, &mut services, &mut monitor);

    {
        let mut e = engine.borrow_mut();
        e.set_process_footprint_kb(1, 5000);
        e.set_process_footprint_kb(2, 2000);
        e.set_process_footprint_kb(3, 1000);
    }

    let freed = monitor.free_memory(&mut set, &mut services, 5500);

    assert_eq!(freed, 7000);
    assert!(set.find_tab(t1).unwrap().is_frozen());
    assert!(set.find_tab(t2).unwrap().is_frozen());
    // Freezing covered the target, so the smallest process is left alone.
    assert!(!set.find_tab(t3).unwrap().is_frozen());
    assert!(engine.borrow().purged_processes().is_empty());
}

#[test]
fn test_free_memory_purges_survivors_when_target_is_missed() {
    let (engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(10);
    let mut set = TabCollectionSet::new();

    let t1 = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let _fg = set.create_new_tab("b", LaunchType::FromOverview, &mut services, &mut monitor);
    engine.borrow_mut().set_process_footprint_kb(1, 1000);
    set.thumbnails_mut().put(t1, vec![0xAA; 8]);

    // Only 1000 kB is freezable; the rest of the target has to come from
    // cache purging and thumbnail clearing. Nothing survives to purge
    // here, but the thumbnails must go.
    let freed = monitor.free_memory(&mut set, &mut services, 8000);

    assert_eq!(freed, 1000);
    assert!(set.find_tab(t1).unwrap().is_frozen());
    assert!(set.thumbnails().is_empty());
    assert!(engine.borrow().purged_processes().is_empty());
}

#[test]
fn test_free_memory_drops_ntp_prerender_and_thumbnails() {
    let (_engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(10);
    let mut set = TabCollectionSet::new();

    set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    set.prerender_ntp(&mut services);
    set.thumbnails_mut().put(1, vec![0xFF; 16]);
    assert!(set.has_cached_ntp());

    monitor.free_memory(&mut set, &mut services, FREE_AS_MUCH_AS_POSSIBLE);

    assert!(!set.has_cached_ntp());
    assert!(set.thumbnails().is_empty());
}

#[test]
fn test_closing_a_tab_purges_its_shared_process() {
    let (engine, mut services, _dir) = rig(2);
    let mut monitor = MemoryMonitor::new(10);
    let mut set = TabCollectionSet::new();

    // t1 and t2 share a render process; t3 takes the next one.
    let _t1 = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let t2 = set.create_new_tab("b", LaunchType::FromOverview, &mut services, &mut monitor);
    let _t3 = set.create_new_tab("c", LaunchType::FromOverview, &mut services, &mut monitor);

    set.close_tab(t2, false, &mut services, &mut monitor).unwrap();
    assert_eq!(engine.borrow().purged_processes(), &[1]);
}

#[test]
fn test_closing_a_lone_process_tab_purges_nothing() {
    let (engine, mut services, _dir) = rig(1);
    let mut monitor = MemoryMonitor::new(10);
    let mut set = TabCollectionSet::new();

    let t1 = set.create_new_tab("a", LaunchType::FromOverview, &mut services, &mut monitor);
    let _t2 = set.create_new_tab("b", LaunchType::FromOverview, &mut services, &mut monitor);

    set.close_tab(t1, false, &mut services, &mut monitor).unwrap();
    assert!(engine.borrow().purged_processes().is_empty());
}
