//! Line-number gutter.
//!
//! Everything in here is independent of the UI toolkit: the editor feeds in
//! its text and a [`viewport::TextLayout`], and the renderer paints onto any
//! [`ruler::GutterSurface`]. The gpui glue lives in
//! `components::line_number_gutter`.

pub mod line_index;
pub mod ruler;
pub mod viewport;
pub mod wrap;

pub use line_index::LineIndex;
pub use ruler::{GUTTER_WIDTH, GutterRenderer, GutterStyle, GutterSurface};
pub use viewport::{LayoutSnapshot, LineBox};
pub use wrap::{ContainerConfig, ContainerWidth, WordWrapSwitch, WrapHost, WrapMode};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GutterPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GutterRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl GutterRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn intersects_vertically(&self, y: f32, height: f32) -> bool {
        y < self.max_y() && self.y < y + height
    }
}
