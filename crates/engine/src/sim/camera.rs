use super::geometry::{Rect, Vec2};

/// Trailing-follow viewport over the world, clamped to the map bounds on both axes.
///
/// When the map is smaller than the viewport on an axis, the camera is pinned to 0 on that axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    map_width: f32,
    map_height: f32,
    viewport_width: f32,
    viewport_height: f32,
    position: Vec2,
    smoothing: f32,
}

impl Camera {
    pub fn new(
        map_width: f32,
        map_height: f32,
        viewport_width: f32,
        viewport_height: f32,
        smoothing: f32,
    ) -> Self {
        Self {
            map_width,
            map_height,
            viewport_width,
            viewport_height,
            position: Vec2::ZERO,
            smoothing: if smoothing.is_finite() {
                smoothing.clamp(0.0, 1.0)
            } else {
                1.0
            },
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn viewport(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.viewport_width,
            self.viewport_height,
        )
    }

    /// Inclusive upper bounds of the camera position on each axis.
    pub fn bounds(&self) -> Vec2 {
        Vec2::new(
            (self.map_width - self.viewport_width).max(0.0),
            (self.map_height - self.viewport_height).max(0.0),
        )
    }

    fn target_for(&self, focus: &Rect) -> Vec2 {
        let center = focus.center();
        Vec2::new(
            center.x - self.viewport_width * 0.5,
            center.y - self.viewport_height * 0.5,
        )
    }

    fn clamp(&self, position: Vec2) -> Vec2 {
        let bounds = self.bounds();
        let clamp_axis = |value: f32, max: f32| {
            if value.is_finite() {
                value.clamp(0.0, max)
            } else {
                0.0
            }
        };
        Vec2::new(clamp_axis(position.x, bounds.x), clamp_axis(position.y, bounds.y))
    }

    pub fn follow(&mut self, focus: &Rect) {
        let target = self.target_for(focus);
        let next = Vec2::new(
            self.position.x + (target.x - self.position.x) * self.smoothing,
            self.position.y + (target.y - self.position.y) * self.smoothing,
        );
        self.position = self.clamp(next);
    }

    /// Jumps straight to the focus without smoothing.
    pub fn snap_to(&mut self, focus: &Rect) {
        self.position = self.clamp(self.target_for(focus));
    }

    pub fn reset(&mut self, position: Vec2) {
        self.position = self.clamp(position);
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport_width = width.max(0.0);
        self.viewport_height = height.max(0.0);
        self.position = self.clamp(self.position);
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        Vec2::new(world.x - self.position.x, world.y - self.position.y)
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        Vec2::new(screen.x + self.position.x, screen.y + self.position.y)
    }

    /// AABB against the viewport. Edges that merely touch count as visible.
    pub fn is_visible(&self, rect: &Rect) -> bool {
        let view = self.viewport();
        rect.right() >= view.left()
            && rect.left() <= view.right()
            && rect.bottom() >= view.top()
            && rect.top() <= view.bottom()
    }
}
