use gpui::{
    App, Bounds, ContentMask, ElementId, Entity, Font, GlobalElementId, LayoutId, Pixels,
    SharedString, Style, TextRun, Window, fill, font, point, prelude::*, px, relative, rgb, size,
};

use crate::components::note_editor::NoteEditor;
use crate::gutter::{GutterPoint, GutterRect, GutterSurface};

const NUMERAL_FONT: &str = "Menlo";
const NUMERAL_SIZE: f32 = 10.0;

/// Column of line numbers drawn beside a [`NoteEditor`].
///
/// Must be painted after the editor so it reads the layout of the current
/// frame.
pub struct LineNumberGutter {
    editor: Entity<NoteEditor>,
}

impl LineNumberGutter {
    pub fn new(editor: Entity<NoteEditor>) -> Self {
        Self { editor }
    }
}

impl IntoElement for LineNumberGutter {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

impl Element for LineNumberGutter {
    type RequestLayoutState = ();
    type PrepaintState = ();

    fn id(&self) -> Option<ElementId> {
        None
    }

    fn request_layout(
        &mut self,
        _id: Option<&GlobalElementId>,
        window: &mut Window,
        cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let width = self
            .editor
            .update(cx, |editor, _cx| editor.gutter_mut().geometry_mut().reassert());

        let mut style = Style::default();
        style.size.width = px(width).into();
        style.min_size.width = px(width).into();
        style.max_size.width = px(width).into();
        style.size.height = relative(1.).into();
        style.flex_shrink = 0.;
        (window.request_layout(style, [], cx), ())
    }

    fn prepaint(
        &mut self,
        _id: Option<&GlobalElementId>,
        bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        _window: &mut Window,
        cx: &mut App,
    ) -> Self::PrepaintState {
        // Layout handed us whatever the parent could fit; the gutter keeps its
        // own width regardless.
        self.editor.update(cx, |editor, _cx| {
            editor
                .gutter_mut()
                .geometry_mut()
                .request_width(bounds.size.width.0);
        });
    }

    fn paint(
        &mut self,
        _id: Option<&GlobalElementId>,
        bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        _prepaint: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    ) {
        let editor = self.editor.clone();
        let width = editor.read(cx).gutter().geometry().width();
        let clip = Bounds::new(bounds.origin, size(px(width), bounds.size.height));
        let line_height = editor.read(cx).line_height();

        window.with_content_mask(Some(ContentMask { bounds: clip }), |window| {
            editor.update(cx, |editor, cx| {
                let mut surface = WindowSurface {
                    origin: bounds.origin,
                    font: font(NUMERAL_FONT),
                    font_size: px(NUMERAL_SIZE),
                    line_height,
                    window,
                    cx,
                };
                let region = GutterRect::new(0.0, 0.0, width, bounds.size.height.0);
                editor.paint_gutter(&mut surface, region);
            });
        });
    }
}

/// [`GutterSurface`] over a gpui window, translating gutter-local
/// coordinates by `origin`.
struct WindowSurface<'a> {
    origin: gpui::Point<Pixels>,
    font: Font,
    font_size: Pixels,
    line_height: Pixels,
    window: &'a mut Window,
    cx: &'a mut App,
}

impl WindowSurface<'_> {
    fn to_window(&self, x: f32, y: f32) -> gpui::Point<Pixels> {
        point(self.origin.x + px(x), self.origin.y + px(y))
    }

    fn shape(&self, text: &str, color: u32) -> Option<gpui::ShapedLine> {
        let run = TextRun {
            len: text.len(),
            font: self.font.clone(),
            color: rgb(color).into(),
            background_color: None,
            underline: None,
            strikethrough: None,
        };
        self.window
            .text_system()
            .shape_line(SharedString::from(text.to_string()), self.font_size, &[run])
            .ok()
    }
}

impl GutterSurface for WindowSurface<'_> {
    fn fill_rect(&mut self, rect: GutterRect, color: u32) {
        let origin = self.to_window(rect.x, rect.y);
        self.window.paint_quad(fill(
            Bounds::new(origin, size(px(rect.width), px(rect.height))),
            rgb(color),
        ));
    }

    fn stroke_vertical_line(&mut self, x: f32, from_y: f32, to_y: f32, color: u32) {
        let origin = self.to_window(x - 0.5, from_y);
        self.window.paint_quad(fill(
            Bounds::new(origin, size(px(1.0), px(to_y - from_y))),
            rgb(color),
        ));
    }

    fn text_width(&mut self, text: &str) -> f32 {
        self.shape(text, 0).map(|line| line.width.0).unwrap_or(0.0)
    }

    fn draw_text(&mut self, text: &str, origin: GutterPoint, color: u32) {
        let Some(line) = self.shape(text, color) else {
            return;
        };
        let origin = self.to_window(origin.x, origin.y);
        if let Err(e) = line.paint(origin, self.line_height, self.window, self.cx) {
            tracing::trace!(target: "gutter", error = %e, "numeral_paint_failed");
        }
    }
}
