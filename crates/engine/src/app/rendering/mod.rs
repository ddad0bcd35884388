mod renderer;

pub use renderer::Renderer;

/// Framebuffer size in physical pixels; world units map 1:1 onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
