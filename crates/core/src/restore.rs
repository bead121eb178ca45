//! Apply an [`Arrangement`] onto the live window set.

use desk_engine::{OpenWindow, WindowId, WindowSystem, WindowSystemError};
use std::collections::HashMap;
use tracing::{debug, warn};
use win_model::{Arrangement, WindowInfo, WindowKey};

/// Summary of one restore pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Entries applied to exactly one live window.
    pub applied: usize,
    /// Entries skipped: no match, ambiguous match, or window vanished.
    pub skipped: usize,
}

/// Single-pass greedy matching with consumption.
///
/// Arrangement entries are visited in snapshot order. An entry matching
/// exactly one unconsumed live window consumes it and applies desktop
/// assignment plus placement; zero or multiple matches skip the entry.
/// A window that vanishes under a consumed handle is treated as a no-match
/// skip. Any other window-system failure aborts the pass immediately;
/// entries already applied stay applied, nothing is rolled back.
///
/// Applying the same arrangement twice to an unchanged live set is
/// idempotent: desktop and placement are functions of the entry alone.
pub fn restore(
    system: &mut impl WindowSystem,
    arrangement: &Arrangement,
) -> Result<RestoreOutcome, WindowSystemError> {
    let mut pool = LivePool::new(system.windows());
    let mut outcome = RestoreOutcome::default();

    for info in arrangement.windows() {
        let Some(id) = pool.take_single(info.key()) else {
            debug!(title = %info.key().window_title, "no unambiguous live match, skipping");
            outcome.skipped += 1;
            continue;
        };
        match apply_entry(system, id, info) {
            Ok(()) => outcome.applied += 1,
            Err(WindowSystemError::StaleHandle(_)) => {
                warn!(title = %info.key().window_title, "window vanished mid-restore, skipping");
                outcome.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(outcome)
}

/// Reassigns the hosting desktop, creating a new desktop when the stored
/// index exceeds the current count, then reapplies the stored placement.
fn apply_entry(
    system: &mut impl WindowSystem,
    id: WindowId,
    info: &WindowInfo,
) -> Result<(), WindowSystemError> {
    let desktop = info.desktop_index();
    let target =
        if desktop >= system.desktop_count() { system.create_desktop()? } else { desktop };
    system.move_to_desktop(id, target)?;
    system.set_placement(id, info.placement())?;
    Ok(())
}

/// The live window set as a consumable multiset: an arena of open windows
/// plus a key-to-indices lookup. Duplicate keys are valid input; windows
/// are removed by identity as they are consumed.
struct LivePool {
    windows: Vec<Option<OpenWindow>>,
    by_key: HashMap<WindowKey, Vec<usize>>,
}

impl LivePool {
    fn new(windows: Vec<OpenWindow>) -> Self {
        let mut by_key: HashMap<WindowKey, Vec<usize>> = HashMap::new();
        for (at, window) in windows.iter().enumerate() {
            by_key.entry(window.key.clone()).or_default().push(at);
        }
        Self { windows: windows.into_iter().map(Some).collect(), by_key }
    }

    /// Consumes the window matching `key` iff exactly one unconsumed
    /// window matches; otherwise leaves the pool untouched.
    fn take_single(&mut self, key: &WindowKey) -> Option<WindowId> {
        let Self { windows, by_key } = self;
        let slots = by_key.get_mut(key)?;
        slots.retain(|&at| windows[at].is_some());
        match slots.as_slice() {
            &[at] => windows[at].take().map(|window| window.id),
            _ => None,
        }
    }
}
