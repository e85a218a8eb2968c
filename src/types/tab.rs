use serde::{Deserialize, Serialize};

/// Process-unique tab identity. Ids are handed out monotonically by the
/// owning [`TabCollectionSet`](crate::managers::tab_collection_set::TabCollectionSet)
/// and are never reused while the process is alive.
pub type TabId = i32;

/// Sentinel for "no tab".
pub const INVALID_TAB_ID: TabId = -1;

/// Reserved id for the cached new-tab-page entry (thumbnails, prerender).
pub const NTP_TAB_ID: TabId = -2;

/// Sentinel for a tab with no opener.
pub const NO_PARENT_ID: TabId = INVALID_TAB_ID;

/// Identity of the OS process hosting a tab's content. Several tabs can
/// share one render process.
pub type ProcessId = i32;

/// Sentinel for "no render process" (frozen tab, dead view).
pub const INVALID_RENDER_PROCESS_PID: ProcessId = -1;

/// URL of the new-tab page, used as the known-safe fallback navigation
/// target when restoring a tab without usable saved state.
pub const NTP_URL: &str = "chrome://newtab/";

/// How a tab came into existence. Drives foreground/background placement
/// and insertion-index policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchType {
    /// Opened from a link in another tab (e.g. target=_blank).
    FromLink,
    /// Opened from a long-press context menu ("open in new tab").
    FromLongpress,
    /// Opened explicitly from the tab overview / new-tab button.
    FromOverview,
    /// Opened on behalf of an external application.
    FromExternalApp,
    /// Recreated from persisted state at startup.
    FromRestore,
}

/// Why a tab became the selected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionType {
    /// Explicit user action (tap on the tab strip, tab switcher).
    FromUser,
    /// A freshly created tab taking the foreground.
    FromNew,
    /// Selection fallout of closing another tab.
    FromClose,
}

/// Page transition hint forwarded to the engine with each navigation.
/// The engine uses it for history ranking; this layer only maps launch
/// types onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageTransition {
    Link,
    Typed,
    StartPage,
    Reload,
}

/// Maps a launch type onto the transition used for the tab's first load.
pub fn transition_for_launch(launch_type: LaunchType) -> PageTransition {
    match launch_type {
        LaunchType::FromLink | LaunchType::FromLongpress | LaunchType::FromExternalApp => {
            PageTransition::Link
        }
        LaunchType::FromOverview => PageTransition::StartPage,
        LaunchType::FromRestore => PageTransition::Reload,
    }
}
