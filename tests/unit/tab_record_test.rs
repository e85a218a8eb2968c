// Freeze/restore behavior of a single tab: state round trips, the
// visible-tab guard, idempotency, and fallback navigation when saved
// state is unusable.

use tempfile::TempDir;

use tabpool::engine::in_memory::InMemoryEngine;
use tabpool::managers::tab_record::TabRecord;
use tabpool::services::state_store::StateStore;
use tabpool::types::errors::StateError;
use tabpool::types::state::TabState;
use tabpool::types::tab::{LaunchType, PageTransition, NO_PARENT_ID, NTP_URL};

fn shown_tab(id: i32, url: &str, engine: &mut InMemoryEngine) -> TabRecord {
    let mut tab = TabRecord::new(id, false, LaunchType::FromOverview, NO_PARENT_ID, false, engine);
    tab.show(engine);
    tab.load_url(engine, url, PageTransition::Typed);
    tab
}

#[test]
fn test_freeze_then_show_restores_url() {
    let mut engine = InMemoryEngine::new();
    let mut tab = shown_tab(1, "https://example.com/", &mut engine);

    tab.hide();
    tab.save_state_and_destroy(&mut engine);
    assert!(tab.is_frozen());
    assert_eq!(engine.live_view_count(), 0);
    // The frozen tab still answers URL queries from its mirror.
    assert_eq!(tab.url(&engine).as_deref(), Some("https://example.com/"));

    tab.show(&mut engine);
    assert!(!tab.is_frozen());
    assert_eq!(tab.url(&engine).as_deref(), Some("https://example.com/"));
}

#[test]
fn test_visible_tab_refuses_to_freeze() {
    let mut engine = InMemoryEngine::new();
    let mut tab = shown_tab(1, "https://example.com/", &mut engine);

    tab.save_state_and_destroy(&mut engine);
    assert!(!tab.is_frozen());
    assert_eq!(engine.live_view_count(), 1);
}

#[test]
fn test_freeze_is_idempotent() {
    let mut engine = InMemoryEngine::new();
    let mut tab = shown_tab(1, "https://example.com/", &mut engine);
    tab.hide();

    tab.save_state_and_destroy(&mut engine);
    tab.save_state_and_destroy(&mut engine);
    assert!(tab.is_frozen());

    tab.show(&mut engine);
    assert_eq!(tab.url(&engine).as_deref(), Some("https://example.com/"));
}

#[test]
fn test_frozen_tab_ignores_navigation() {
    let mut engine = InMemoryEngine::new();
    let mut tab = shown_tab(1, "https://example.com/", &mut engine);
    tab.hide();
    tab.save_state_and_destroy(&mut engine);

    tab.load_url(&mut engine, "https://other.example/", PageTransition::Typed);
    assert_eq!(tab.url(&engine).as_deref(), Some("https://example.com/"));

    tab.show(&mut engine);
    assert_eq!(tab.url(&engine).as_deref(), Some("https://example.com/"));
}

#[test]
fn test_corrupt_saved_state_falls_back_to_ntp() {
    let mut engine = InMemoryEngine::new();
    let state = TabState {
        last_shown_timestamp: 42,
        state: b"not a real engine blob".to_vec(),
        parent_id: NO_PARENT_ID,
        opener_app_id: None,
        is_incognito: false,
    };
    let mut tab = TabRecord::from_frozen_state(9, state);
    assert!(tab.is_frozen());
    assert_eq!(tab.last_shown_timestamp(), 42);

    tab.show(&mut engine);
    assert!(!tab.is_frozen());
    assert_eq!(tab.url(&engine).as_deref(), Some(NTP_URL));
}

#[test]
fn test_restored_state_round_trips_through_store() {
    let dir = TempDir::new().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let mut engine = InMemoryEngine::new();

    let mut tab = shown_tab(4, "https://example.com/page", &mut engine);
    tab.persist(&mut engine, &mut store).unwrap();
    assert!(!tab.is_dirty());

    let state = store.read(4).unwrap();
    let mut restored = TabRecord::from_frozen_state(4, state);
    restored.show(&mut engine);
    assert_eq!(restored.url(&engine).as_deref(), Some("https://example.com/page"));
}

#[test]
fn test_navigation_marks_dirty_and_persist_clears_it() {
    let dir = TempDir::new().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let mut engine = InMemoryEngine::new();

    let mut tab = shown_tab(4, "https://example.com/", &mut engine);
    assert!(tab.is_dirty());

    tab.persist(&mut engine, &mut store).unwrap();
    assert!(!tab.is_dirty());
    // The live view survives persistence.
    assert!(!tab.is_frozen());

    tab.load_url(&mut engine, "https://example.com/next", PageTransition::Link);
    assert!(tab.is_dirty());
}

#[test]
fn test_failed_persist_leaves_tab_dirty_and_live() {
    let dir = TempDir::new().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let mut engine = InMemoryEngine::new();

    // Occupy the tab's state-file name with a directory so the write
    // cannot succeed.
    std::fs::create_dir(dir.path().join(StateStore::filename(false, 4))).unwrap();

    let mut tab = shown_tab(4, "https://example.com/", &mut engine);
    assert!(tab.is_dirty());

    let err = tab.persist(&mut engine, &mut store).unwrap_err();
    assert!(matches!(err, StateError::Io(_)));
    // The failure leaves the tab retryable: still dirty, view intact.
    assert!(tab.is_dirty());
    assert!(!tab.is_frozen());
    assert_eq!(engine.live_view_count(), 1);
}

#[test]
fn test_destroy_keeps_mirrors_for_history() {
    let mut engine = InMemoryEngine::new();
    let mut tab = shown_tab(1, "https://example.com/", &mut engine);

    tab.destroy(&mut engine);
    assert!(tab.is_frozen());
    assert_eq!(engine.live_view_count(), 0);
    assert_eq!(tab.url(&engine).as_deref(), Some("https://example.com/"));
}

#[test]
fn test_frozen_tab_reports_no_render_process() {
    let mut engine = InMemoryEngine::new();
    let mut tab = shown_tab(1, "https://example.com/", &mut engine);
    let live_pid = tab.render_process_id(&engine);
    assert_ne!(live_pid, tabpool::types::tab::INVALID_RENDER_PROCESS_PID);

    tab.hide();
    tab.save_state_and_destroy(&mut engine);
    assert_eq!(
        tab.render_process_id(&engine),
        tabpool::types::tab::INVALID_RENDER_PROCESS_PID
    );
}
