//! Positioned text fragments and the rectangle math used on them.

use serde::{Deserialize, Serialize};

/// Identifier of a source fragment.
pub type FragmentId = String;

/// A point in page pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A recognized piece of text with its polygon bounds on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFragment {
    /// Stable fragment identifier.
    pub id: FragmentId,

    /// Recognized text content.
    pub text: String,

    /// Page number (1-based by convention, but any ordering works).
    pub page: u32,

    /// Polygon vertices in pixel coordinates.
    pub polygon: Vec<Point>,
}

impl SourceFragment {
    /// Create a fragment from an axis-aligned rectangle.
    pub fn from_rect(
        id: impl Into<String>,
        text: impl Into<String>,
        page: u32,
        rect: Rect,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            page,
            polygon: vec![
                Point::new(rect.left, rect.top),
                Point::new(rect.right, rect.top),
                Point::new(rect.right, rect.bottom),
                Point::new(rect.left, rect.bottom),
            ],
        }
    }

    /// Get the axis-aligned bounding rectangle of the polygon.
    ///
    /// An empty polygon yields a zero-sized rectangle at the origin.
    pub fn bounds(&self) -> Rect {
        if self.polygon.is_empty() {
            return Rect::default();
        }

        let min_x = self.polygon.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let max_x = self.polygon.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let min_y = self.polygon.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = self.polygon.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

        Rect {
            top: min_y,
            left: min_x,
            right: max_x,
            bottom: max_y,
        }
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f32,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(top: f32, left: f32, right: f32, bottom: f32) -> Self {
        Self {
            top,
            left,
            right,
            bottom,
        }
    }

    /// Get the width of the rectangle.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Get the height of the rectangle.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Check if `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }

    /// Check if this rectangle overlaps with another (touching edges do not count).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }

    /// Length of the vertical overlap between two rectangles (0 when disjoint).
    pub fn vertical_overlap(&self, other: &Rect) -> f32 {
        (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0)
    }
}
