//! Build an [`Arrangement`] from the live window set.

use desk_engine::{WindowSystem, WindowSystemError};
use tracing::debug;
use win_model::{Arrangement, WindowInfo};

/// Captures every live window the virtual-desktop service tracks.
///
/// A window whose hosting desktop cannot be determined (untracked system
/// surfaces, or a window that vanished mid-enumeration) is excluded
/// silently; this is a best-effort observation, not a partial failure.
/// Output order follows enumeration order and carries no meaning. Purely
/// observational: no window is touched.
pub fn capture(system: &impl WindowSystem) -> Result<Arrangement, WindowSystemError> {
    let mut windows = Vec::new();

    for window in system.windows() {
        let desktop = match system.desktop_of(window.id) {
            Ok(Some(desktop)) => desktop,
            Ok(None) => {
                debug!(title = %window.key.window_title, "window not tracked by any desktop, skipping");
                continue;
            }
            Err(WindowSystemError::StaleHandle(_)) => continue,
            Err(err) => return Err(err),
        };
        let placement = system.placement(window.id)?;
        windows.push(WindowInfo::new(window.key, desktop as i32, placement));
    }

    Ok(Arrangement::new(windows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_engine::SimWindowSystem;
    use win_model::{Point, Rect, WindowKey, WindowPlacement};

    fn placement_at(x: i32, y: i32) -> WindowPlacement {
        WindowPlacement {
            flags: 0,
            show_cmd: 1,
            min_position: Point { x: -1, y: -1 },
            max_position: Point { x: -1, y: -1 },
            normal_rect: Rect { left: x, top: y, right: x + 640, bottom: y + 480 },
        }
    }

    #[test]
    fn capture_records_key_desktop_and_placement() {
        let mut sys = SimWindowSystem::new();
        sys.create_desktop().unwrap();
        sys.open_window(WindowKey::new("editor.exe", "notes"), Some(1), placement_at(10, 20));

        let arrangement = capture(&sys).unwrap();

        assert_eq!(arrangement.len(), 1);
        let info = &arrangement.windows()[0];
        assert_eq!(info.key(), &WindowKey::new("editor.exe", "notes"));
        assert_eq!(info.desktop_index(), 1);
        assert_eq!(info.placement(), &placement_at(10, 20));
    }

    #[test]
    fn untracked_windows_are_silently_excluded() {
        let mut sys = SimWindowSystem::new();
        sys.open_window(WindowKey::new("a.exe", "A"), Some(0), placement_at(0, 0));
        sys.open_window(WindowKey::new("ghost.exe", "Ghost"), None, placement_at(0, 0));
        sys.open_window(WindowKey::new("b.exe", "B"), Some(0), placement_at(0, 0));

        let arrangement = capture(&sys).unwrap();

        let titles: Vec<_> =
            arrangement.windows().iter().map(|w| w.key().window_title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
    }

    #[test]
    fn capture_follows_enumeration_order() {
        let mut sys = SimWindowSystem::new();
        for title in ["one", "two", "three"] {
            sys.open_window(WindowKey::new("app.exe", title), Some(0), placement_at(0, 0));
        }

        let arrangement = capture(&sys).unwrap();
        let titles: Vec<_> =
            arrangement.windows().iter().map(|w| w.key().window_title.as_str()).collect();
        assert_eq!(titles, ["one", "two", "three"]);
    }

    #[test]
    fn capture_of_empty_system_is_empty() {
        let sys = SimWindowSystem::new();
        assert!(capture(&sys).unwrap().is_empty());
    }
}
