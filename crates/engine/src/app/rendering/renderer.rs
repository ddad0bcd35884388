use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::sim::{ActorView, Camera, LifeState, Rect, RenderView, TerrainTag, TerrainVisual, Vec2};

use super::Viewport;

const SKY_COLOR: [u8; 4] = [0x87, 0xce, 0xeb, 0xff];
const STATIC_COLOR: [u8; 4] = [0x4a, 0x2c, 0x2a, 0xff];
const OSCILLATING_COLOR: [u8; 4] = [0xf4, 0xd0, 0x3f, 0xff];
const COLLAPSIBLE_COLOR: [u8; 4] = [0x7f, 0x8c, 0x8d, 0xff];
const COLLAPSE_WARNING_COLOR: [u8; 4] = [0xe7, 0x4c, 0x3c, 0xff];
const BOUNCY_COLOR: [u8; 4] = [0xff, 0x47, 0x7e, 0xff];
const LOW_FRICTION_COLOR: [u8; 4] = [0xa5, 0xf2, 0xf3, 0xff];
const ONE_DIRECTIONAL_COLOR: [u8; 4] = [0x2e, 0xcc, 0x71, 0xff];
const CONCEALED_COLOR: [u8; 4] = [0x3f, 0x10, 0xb6, 0xff];
const ACTOR_COLOR: [u8; 4] = [0xff, 0x6b, 0x6b, 0xff];
const ACTOR_DYING_COLOR: [u8; 4] = [0x8b, 0x1e, 0x1e, 0xff];
const CHARGE_BAR_BACK_COLOR: [u8; 4] = [0x22, 0x22, 0x22, 0xff];
const CHARGE_BAR_FILL_COLOR: [u8; 4] = [0xff, 0xc3, 0x12, 0xff];
const CHARGE_BAR_HEIGHT_PX: i32 = 4;
const CHARGE_BAR_GAP_PX: i32 = 6;
const RESPAWN_BLINK_STEPS: u64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRectPx {
    left: i32,
    right: i32,
    top: i32,
    bottom: i32,
}

impl ScreenRectPx {
    fn width(&self) -> i32 {
        self.right - self.left
    }

    fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_view(&mut self, view: &RenderView) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        let Viewport { width, height } = self.viewport;
        draw_view(self.pixels.frame_mut(), width, height, view);
        self.pixels.render()
    }
}

fn draw_view(frame: &mut [u8], width: u32, height: u32, view: &RenderView) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&SKY_COLOR);
    }

    for piece in &view.terrain {
        let Some(color) = terrain_color(piece.tag, piece.visual) else {
            continue;
        };
        let screen = screen_rect_px(&piece.rect, &view.camera);
        match piece.tag {
            TerrainTag::SlopeLeft => fill_slope_clipped(frame, width, height, screen, true, color),
            TerrainTag::SlopeRight => {
                fill_slope_clipped(frame, width, height, screen, false, color)
            }
            _ => fill_rect_clipped(frame, width, height, screen, color),
        }
    }

    draw_actor(frame, width, height, view.step, &view.camera, &view.actor);
}

fn draw_actor(
    frame: &mut [u8],
    width: u32,
    height: u32,
    step: u64,
    camera: &Camera,
    actor: &ActorView,
) {
    let Some(color) = actor_color(actor.life, step) else {
        return;
    };
    let screen = screen_rect_px(&actor.rect, camera);
    fill_rect_clipped(frame, width, height, screen, color);

    if actor.charge_fraction > 0.0 && actor.life == LifeState::Alive {
        let (back, fill) = charge_bar_rects(screen, actor.charge_fraction);
        fill_rect_clipped(frame, width, height, back, CHARGE_BAR_BACK_COLOR);
        fill_rect_clipped(frame, width, height, fill, CHARGE_BAR_FILL_COLOR);
    }
}

fn terrain_color(tag: TerrainTag, visual: TerrainVisual) -> Option<[u8; 4]> {
    match visual {
        TerrainVisual::Collapsed | TerrainVisual::Hidden => None,
        TerrainVisual::Armed { progress } => Some(blend_rgba(
            COLLAPSIBLE_COLOR,
            COLLAPSE_WARNING_COLOR,
            progress,
        )),
        TerrainVisual::Phantom => Some(CONCEALED_COLOR),
        TerrainVisual::Solid => Some(match tag {
            TerrainTag::Static | TerrainTag::SlopeLeft | TerrainTag::SlopeRight => STATIC_COLOR,
            TerrainTag::Oscillating => OSCILLATING_COLOR,
            TerrainTag::Collapsible => COLLAPSIBLE_COLOR,
            TerrainTag::Bouncy => BOUNCY_COLOR,
            TerrainTag::LowFriction => LOW_FRICTION_COLOR,
            TerrainTag::OneDirectional => ONE_DIRECTIONAL_COLOR,
            TerrainTag::Concealed => CONCEALED_COLOR,
        }),
    }
}

/// Respawning actors blink; dying actors darken in place.
fn actor_color(life: LifeState, step: u64) -> Option<[u8; 4]> {
    match life {
        LifeState::Alive => Some(ACTOR_COLOR),
        LifeState::Dying { .. } => Some(ACTOR_DYING_COLOR),
        LifeState::Respawning { .. } => {
            ((step / RESPAWN_BLINK_STEPS) % 2 == 0).then_some(ACTOR_COLOR)
        }
    }
}

fn blend_rgba(from: [u8; 4], to: [u8; 4], t: f32) -> [u8; 4] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let mut out = [0u8; 4];
    for (index, channel) in out.iter_mut().enumerate() {
        let a = from[index] as f32;
        let b = to[index] as f32;
        *channel = (a + (b - a) * t).round() as u8;
    }
    out
}

fn screen_rect_px(rect: &Rect, camera: &Camera) -> ScreenRectPx {
    let top_left = camera.world_to_screen(Vec2::new(rect.left(), rect.top()));
    let bottom_right = camera.world_to_screen(Vec2::new(rect.right(), rect.bottom()));
    ScreenRectPx {
        left: top_left.x.round() as i32,
        right: bottom_right.x.round() as i32,
        top: top_left.y.round() as i32,
        bottom: bottom_right.y.round() as i32,
    }
}

fn charge_bar_rects(actor: ScreenRectPx, fraction: f32) -> (ScreenRectPx, ScreenRectPx) {
    let bottom = actor.top - CHARGE_BAR_GAP_PX;
    let back = ScreenRectPx {
        left: actor.left,
        right: actor.right,
        top: bottom - CHARGE_BAR_HEIGHT_PX,
        bottom,
    };
    let filled = (actor.width() as f32 * fraction.clamp(0.0, 1.0)).round() as i32;
    let fill = ScreenRectPx {
        right: actor.left + filled,
        ..back
    };
    (back, fill)
}

fn clip_rect(rect: ScreenRectPx, width: u32, height: u32) -> Option<ScreenRectPx> {
    let clipped = ScreenRectPx {
        left: rect.left.max(0),
        right: rect.right.min(width as i32),
        top: rect.top.max(0),
        bottom: rect.bottom.min(height as i32),
    };
    (clipped.width() > 0 && clipped.height() > 0).then_some(clipped)
}

fn fill_rect_clipped(frame: &mut [u8], width: u32, height: u32, rect: ScreenRectPx, color: [u8; 4]) {
    let Some(clipped) = clip_rect(rect, width, height) else {
        return;
    };
    for y in clipped.top..clipped.bottom {
        for x in clipped.left..clipped.right {
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

/// Fills the solid part of a ramp column by column. `rises_right` ramps climb toward +x.
fn fill_slope_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    rect: ScreenRectPx,
    rises_right: bool,
    color: [u8; 4],
) {
    let Some(clipped) = clip_rect(rect, width, height) else {
        return;
    };
    let span = rect.width().max(1) as f32;
    for x in clipped.left..clipped.right {
        let t = ((x - rect.left) as f32 + 0.5) / span;
        let depth = if rises_right { 1.0 - t } else { t };
        let surface = rect.top + (depth * rect.height() as f32).round() as i32;
        for y in surface.max(clipped.top)..clipped.bottom {
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    if x >= width {
        return;
    }
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}
