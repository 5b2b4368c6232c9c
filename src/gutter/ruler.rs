use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::viewport::{TextLayout, map_visible_lines};
use super::{GutterPoint, GutterRect, LineIndex};

/// Width of the line-number column. Not configurable.
pub const GUTTER_WIDTH: f32 = 40.0;
/// Gap between the end of a numeral and the gutter's right edge.
pub const LABEL_RIGHT_PADDING: f32 = 4.0;
/// Optical nudge that lines the numerals up with the text baseline.
pub const LABEL_BASELINE_OFFSET: f32 = 2.0;

/// Drawing primitives the renderer needs from the host.
pub trait GutterSurface {
    fn fill_rect(&mut self, rect: GutterRect, color: u32);
    fn stroke_vertical_line(&mut self, x: f32, from_y: f32, to_y: f32, color: u32);
    fn text_width(&mut self, text: &str) -> f32;
    fn draw_text(&mut self, text: &str, origin: GutterPoint, color: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GutterStyle {
    pub background: u32,
    pub border: u32,
    pub numeral: u32,
}

impl Default for GutterStyle {
    fn default() -> Self {
        Self {
            background: 0xf2f2e6,
            border: 0xaaaaaa,
            numeral: 0x808080,
        }
    }
}

/// Gutter state as a host framework or an older session file may have saved
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedGutterState {
    pub width: Option<f32>,
}

/// Pinned gutter width. Resize requests and restored state are accepted but
/// never change the width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GutterGeometry {
    width: f32,
}

impl GutterGeometry {
    pub fn new() -> Self {
        Self {
            width: GUTTER_WIDTH,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    /// Handles a resize coming from the host. Returns the width actually in
    /// effect.
    pub fn request_width(&mut self, requested: f32) -> f32 {
        if requested != GUTTER_WIDTH {
            debug!(
                target: "gutter",
                requested,
                pinned = GUTTER_WIDTH,
                "gutter_resize_rejected"
            );
        }
        self.reassert()
    }

    pub fn restore(&mut self, saved: &SavedGutterState) -> f32 {
        if let Some(width) = saved.width {
            if width != GUTTER_WIDTH {
                debug!(
                    target: "gutter",
                    saved = width,
                    pinned = GUTTER_WIDTH,
                    "gutter_restore_ignored"
                );
            }
        }
        self.reassert()
    }

    /// Called on every layout pass.
    pub fn reassert(&mut self) -> f32 {
        self.width = GUTTER_WIDTH;
        self.width
    }

    pub fn saved_state(&self) -> SavedGutterState {
        SavedGutterState {
            width: Some(self.width),
        }
    }
}

impl Default for GutterGeometry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GutterRenderer {
    geometry: GutterGeometry,
    style: GutterStyle,
    /// Set by content, selection and wrap changes. gpui repaints whole
    /// frames, so nothing skips a paint on it; it is only reported.
    dirty: bool,
}

impl GutterRenderer {
    pub fn new(style: GutterStyle) -> Self {
        Self {
            geometry: GutterGeometry::new(),
            style,
            dirty: true,
        }
    }

    pub fn geometry(&self) -> &GutterGeometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GutterGeometry {
        &mut self.geometry
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[cfg(test)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Paints the gutter for `region` (its `y` and `height` select the rows to
    /// redraw; the horizontal extent is always the pinned width).
    ///
    /// Returns the line numbers that were drawn.
    pub fn paint(
        &mut self,
        surface: &mut dyn GutterSurface,
        region: GutterRect,
        index: &LineIndex,
        layout: &dyn TextLayout,
    ) -> Vec<usize> {
        let width = self.geometry.reassert();
        let was_dirty = std::mem::replace(&mut self.dirty, false);
        trace!(target: "gutter", was_dirty, "gutter_paint_started");

        surface.fill_rect(
            GutterRect::new(0.0, region.y, width, region.height),
            self.style.background,
        );
        surface.stroke_vertical_line(width - 0.5, region.y, region.max_y(), self.style.border);

        let Some(lines) = map_visible_lines(index, layout) else {
            trace!(target: "gutter", "layout_unavailable_skip");
            return Vec::new();
        };

        let mut drawn = Vec::with_capacity(lines.len());
        for line in lines {
            if !region.intersects_vertically(line.y, line.height) {
                continue;
            }
            let label = line.number.to_string();
            let label_width = surface.text_width(&label);
            let origin = GutterPoint {
                x: width - label_width - LABEL_RIGHT_PADDING,
                y: line.y + LABEL_BASELINE_OFFSET,
            };
            surface.draw_text(&label, origin, self.style.numeral);
            drawn.push(line.number);
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gutter::viewport::{LayoutSnapshot, LineBox};
    use std::ops::Range;

    const CHAR_WIDTH: f32 = 7.0;

    #[derive(Debug, PartialEq)]
    enum Op {
        Fill(GutterRect, u32),
        Border(f32, f32, f32),
        Text(String, GutterPoint),
    }

    #[derive(Default)]
    struct RecordingSurface {
        ops: Vec<Op>,
    }

    impl GutterSurface for RecordingSurface {
        fn fill_rect(&mut self, rect: GutterRect, color: u32) {
            self.ops.push(Op::Fill(rect, color));
        }

        fn stroke_vertical_line(&mut self, x: f32, from_y: f32, to_y: f32, _color: u32) {
            self.ops.push(Op::Border(x, from_y, to_y));
        }

        fn text_width(&mut self, text: &str) -> f32 {
            text.chars().count() as f32 * CHAR_WIDTH
        }

        fn draw_text(&mut self, text: &str, origin: GutterPoint, _color: u32) {
            self.ops.push(Op::Text(text.to_string(), origin));
        }
    }

    struct NoLayout;

    impl TextLayout for NoLayout {
        fn visible_character_range(&self) -> Option<Range<usize>> {
            None
        }

        fn line_box(&self, _line: &Range<usize>) -> Option<LineBox> {
            None
        }

        fn scroll_offset(&self) -> f32 {
            0.0
        }

        fn line_height(&self) -> f32 {
            20.0
        }
    }

    fn whole_document(text: &str) -> LayoutSnapshot {
        let index = LineIndex::build(text);
        LayoutSnapshot {
            boxes: index
                .lines()
                .iter()
                .enumerate()
                .map(|(i, range)| {
                    (
                        range.clone(),
                        LineBox {
                            y: i as f32 * 20.0,
                            height: 20.0,
                        },
                    )
                })
                .collect(),
            scroll_offset: 0.0,
            viewport_height: 400.0,
            line_height: 20.0,
            content_inset: 0.0,
        }
    }

    #[test]
    fn hello_world_draws_two_right_aligned_numbers() {
        let text = "Hello\nWorld";
        let index = LineIndex::build(text);
        let layout = whole_document(text);
        let mut surface = RecordingSurface::default();
        let mut renderer = GutterRenderer::default();

        let drawn = renderer.paint(
            &mut surface,
            GutterRect::new(0.0, 0.0, GUTTER_WIDTH, 400.0),
            &index,
            &layout,
        );

        assert_eq!(drawn, vec![1, 2]);
        let style = GutterStyle::default();
        assert_eq!(
            surface.ops,
            vec![
                Op::Fill(GutterRect::new(0.0, 0.0, GUTTER_WIDTH, 400.0), style.background),
                Op::Border(GUTTER_WIDTH - 0.5, 0.0, 400.0),
                Op::Text("1".into(), GutterPoint { x: 40.0 - 7.0 - 4.0, y: 2.0 }),
                Op::Text("2".into(), GutterPoint { x: 40.0 - 7.0 - 4.0, y: 22.0 }),
            ]
        );
    }

    #[test]
    fn wider_numerals_stay_right_aligned() {
        let text = "\n".repeat(11);
        let index = LineIndex::build(&text);
        let layout = whole_document(&text);
        let mut surface = RecordingSurface::default();
        GutterRenderer::default().paint(
            &mut surface,
            GutterRect::new(0.0, 0.0, GUTTER_WIDTH, 400.0),
            &index,
            &layout,
        );
        let Some(Op::Text(label, origin)) = surface.ops.last() else {
            panic!("expected a numeral");
        };
        assert_eq!(label, "12");
        assert_eq!(origin.x + 2.0 * CHAR_WIDTH, GUTTER_WIDTH - LABEL_RIGHT_PADDING);
    }

    #[test]
    fn missing_layout_paints_chrome_only() {
        let index = LineIndex::build("abc");
        let mut surface = RecordingSurface::default();
        let drawn = GutterRenderer::default().paint(
            &mut surface,
            GutterRect::new(0.0, 0.0, GUTTER_WIDTH, 100.0),
            &index,
            &NoLayout,
        );
        assert!(drawn.is_empty());
        assert_eq!(surface.ops.len(), 2);
    }

    #[test]
    fn redraw_region_limits_numerals() {
        let text = "a\nb\nc\nd";
        let index = LineIndex::build(text);
        let layout = whole_document(text);
        let mut surface = RecordingSurface::default();
        let drawn = GutterRenderer::default().paint(
            &mut surface,
            GutterRect::new(0.0, 20.0, GUTTER_WIDTH, 40.0),
            &index,
            &layout,
        );
        assert_eq!(drawn, vec![2, 3]);
    }

    #[test]
    fn width_survives_resize_and_restore_events() {
        let mut geometry = GutterGeometry::new();
        for requested in [12.0, 80.0, 0.0, 40.0, 1000.0] {
            assert_eq!(geometry.request_width(requested), GUTTER_WIDTH);
        }
        for saved in [Some(55.0), None, Some(-3.0)] {
            geometry.restore(&SavedGutterState { width: saved });
            assert_eq!(geometry.width(), GUTTER_WIDTH);
        }
    }

    #[test]
    fn paint_clears_dirty_flag() {
        let mut renderer = GutterRenderer::new(GutterStyle::default());
        assert!(renderer.is_dirty());
        renderer.paint(
            &mut RecordingSurface::default(),
            GutterRect::new(0.0, 0.0, GUTTER_WIDTH, 10.0),
            &LineIndex::default(),
            &NoLayout,
        );
        assert!(!renderer.is_dirty());
        renderer.mark_dirty();
        assert!(renderer.is_dirty());
    }
}
