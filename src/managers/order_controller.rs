//! Placement policy for newly created tabs: whether a launch takes the
//! foreground, and where it lands in the strip.

use crate::types::tab::LaunchType;

/// Whether a tab created with `launch_type` should immediately become the
/// visible tab.
///
/// Long-press ("open in new tab") opens stay in the background so the
/// user keeps reading the current page — unless the open crosses from a
/// normal session into incognito, which always foregrounds to make the
/// mode switch visible. Restored tabs never grab the foreground; the
/// restore path drives selection itself.
pub fn will_open_in_foreground(
    launch_type: LaunchType,
    is_new_tab_incognito: bool,
    active_is_incognito: bool,
) -> bool {
    match launch_type {
        LaunchType::FromRestore => false,
        LaunchType::FromLongpress => !active_is_incognito && is_new_tab_incognito,
        _ => true,
    }
}

/// Clamps a requested insertion position against the collection size.
/// `None` means "append at the end".
pub fn determine_insertion_index(
    _launch_type: LaunchType,
    requested: Option<usize>,
    len: usize,
) -> Option<usize> {
    requested.map(|p| p.min(len))
}
