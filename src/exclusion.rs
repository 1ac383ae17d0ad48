//! Screen rectangles in which pointer presses are never recorded.
//!
//! The controlling UI rebuilds the whole set whenever its own geometry changes
//! (window moved, resized), so the set only supports full replacement.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Left coordinate.
    pub x: i32,
    /// Top coordinate.
    pub y: i32,
    /// Width in screen pixels.
    pub width: i32,
    /// Height in screen pixels.
    pub height: i32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check whether a point is inside this rectangle, edges included.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        let left = i64::from(self.x);
        let top = i64::from(self.y);
        let right = left + i64::from(self.width);
        let bottom = top + i64::from(self.height);
        left <= x && x <= right && top <= y && y <= bottom
    }
}

impl From<(i32, i32, i32, i32)> for Rect {
    fn from((x, y, width, height): (i32, i32, i32, i32)) -> Self {
        Self::new(x, y, width, height)
    }
}

/// Rectangles that recorded clicks must avoid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionZoneSet {
    zones: Vec<Rect>,
}

impl ExclusionZoneSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `(x, y)` falls inside any zone.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.zones.iter().any(|zone| zone.contains(x, y))
    }

    /// Replace every zone with `zones`.
    pub fn replace<I>(&mut self, zones: I)
    where
        I: IntoIterator,
        I::Item: Into<Rect>,
    {
        self.zones = zones.into_iter().map(Into::into).collect();
    }

    /// Remove every zone.
    pub fn clear(&mut self) {
        self.zones.clear();
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Check if there are no zones.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// The zones, in registration order.
    pub fn zones(&self) -> &[Rect] {
        &self.zones
    }
}
