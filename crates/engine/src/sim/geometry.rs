use serde::{Deserialize, Serialize};

/// World-space vector. Screen conventions apply: `y` grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Penetration depth on each axis, or `None` when the rectangles are apart.
    pub fn penetration(&self, other: &Rect) -> Option<Penetration> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Penetration {
            from_left: self.right() - other.left(),
            from_right: other.right() - self.left(),
            from_top: self.bottom() - other.top(),
            from_bottom: other.bottom() - self.top(),
        })
    }
}

/// Distances `self` must travel to leave `other` through each of its sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    pub from_left: f32,
    pub from_right: f32,
    pub from_top: f32,
    pub from_bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOut {
    Left,
    Right,
    Up,
    Down,
}

impl Penetration {
    pub fn smallest(&self) -> (PushOut, f32) {
        let mut best = (PushOut::Up, self.from_top);
        for candidate in [
            (PushOut::Down, self.from_bottom),
            (PushOut::Left, self.from_left),
            (PushOut::Right, self.from_right),
        ] {
            if candidate.1 < best.1 {
                best = candidate;
            }
        }
        best
    }

    /// Separation needed along the cheapest side.
    pub fn depth(&self) -> f32 {
        self.from_left
            .min(self.from_right)
            .min(self.from_top)
            .min(self.from_bottom)
    }
}
