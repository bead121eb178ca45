use serde::{Deserialize, Deserializer, Serialize};
use std::hash::{Hash, Hasher};

/// Identity of a window: owning process name plus window title.
///
/// Equality is exact and case-sensitive on both fields. Two live windows
/// with the same process name and title are indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowKey {
    pub process_name: String,
    pub window_title: String,
}

impl WindowKey {
    pub fn new(process_name: impl Into<String>, window_title: impl Into<String>) -> Self {
        Self { process_name: process_name.into(), window_title: window_title.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Native presentation state of a window, captured verbatim and reapplied
/// verbatim. No field is interpreted or validated here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowPlacement {
    pub flags: u32,
    pub show_cmd: u32,
    pub min_position: Point,
    pub max_position: Point,
    pub normal_rect: Rect,
}

/// One saved window: identity, hosting desktop, and native placement.
///
/// Equality and hashing cover `(key, desktop_index)` only. Placement is
/// excluded so that repeated save/restore cycles compare equal even when
/// the placement encoding carries incidental noise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    #[serde(flatten)]
    key: WindowKey,
    #[serde(default, deserialize_with = "deserialize_desktop_index")]
    desktop_index: u32,
    placement: WindowPlacement,
}

impl WindowInfo {
    /// A negative index is clamped to the default desktop (index 0).
    pub fn new(key: WindowKey, desktop_index: i32, placement: WindowPlacement) -> Self {
        Self { key, desktop_index: desktop_index.max(0) as u32, placement }
    }

    pub fn key(&self) -> &WindowKey {
        &self.key
    }

    pub fn desktop_index(&self) -> u32 {
        self.desktop_index
    }

    pub fn placement(&self) -> &WindowPlacement {
        &self.placement
    }
}

impl PartialEq for WindowInfo {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.desktop_index == other.desktop_index
    }
}

impl Eq for WindowInfo {}

impl Hash for WindowInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.desktop_index.hash(state);
    }
}

/// Absent or negative desktop indices normalize to the default desktop.
fn deserialize_desktop_index<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.unwrap_or(0).clamp(0, u32::MAX as i64) as u32)
}

/// An ordered, immutable capture of window descriptors at one point in time.
///
/// Capture order is preserved but carries no meaning; matching during
/// restore is order-independent on the live side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arrangement {
    windows: Vec<WindowInfo>,
}

impl Arrangement {
    pub fn new(windows: Vec<WindowInfo>) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &[WindowInfo] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl FromIterator<WindowInfo> for Arrangement {
    fn from_iter<I: IntoIterator<Item = WindowInfo>>(iter: I) -> Self {
        Self { windows: iter.into_iter().collect() }
    }
}
