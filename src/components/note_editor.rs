use gpui::{
    App, AvailableSpace, Bounds, ClipboardItem, CursorStyle, ElementId, ElementInputHandler,
    Entity, EntityInputHandler, EventEmitter, FocusHandle, Focusable, Font, GlobalElementId,
    Hsla, KeyDownEvent, LayoutId, MouseButton, MouseDownEvent, MouseMoveEvent, MouseUpEvent,
    PaintQuad, Pixels, Point, Render, ScrollHandle, SharedString, Size, Style, TextRun,
    UTF16Selection, UnderlineStyle, Window, WrappedLine, div, fill, font, point, prelude::*, px,
    relative, rgb, rgba, size,
};
use std::ops::Range;
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::EditorConfig;
use crate::gutter::{
    ContainerConfig, ContainerWidth, GutterRect, GutterRenderer, GutterStyle, GutterSurface,
    LayoutSnapshot, LineBox, LineIndex, WrapHost, WrapMode,
};

/// Padding between the scroll viewport edges and the text.
pub const TEXT_INSET: f32 = 8.0;
const TEXT_COLOR: u32 = 0x000000;
const BACKGROUND: u32 = 0xfaf7ed;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ContentChanged(String),
}

pub struct NoteEditor {
    focus_handle: FocusHandle,
    content: SharedString,
    line_index: LineIndex,
    selected_range: Range<usize>,
    selection_reversed: bool,
    marked_range: Option<Range<usize>>,
    is_selecting: bool,
    scroll_to_cursor: bool,
    container: ContainerConfig,
    scroll_handle: ScrollHandle,
    last_layout: Option<EditorLayout>,
    snapshot: LayoutSnapshot,
    gutter: GutterRenderer,
    font: Font,
    font_size: Pixels,
    line_height: Pixels,
}

/// One logical line as laid out in the last frame.
struct LineRow {
    range: Range<usize>,
    text_end: usize,
    shaped: Option<WrappedLine>,
    /// Offset of the row's top from the element's top.
    y: Pixels,
    height: Pixels,
}

struct EditorLayout {
    rows: Vec<LineRow>,
    bounds: Bounds<Pixels>,
}

impl EventEmitter<EditorEvent> for NoteEditor {}

impl NoteEditor {
    pub fn new(config: &EditorConfig, cx: &mut Context<Self>) -> Self {
        Self {
            focus_handle: cx.focus_handle(),
            content: SharedString::from(""),
            line_index: LineIndex::default(),
            selected_range: 0..0,
            selection_reversed: false,
            marked_range: None,
            is_selecting: false,
            scroll_to_cursor: false,
            container: ContainerConfig::for_mode(WrapMode::default()),
            scroll_handle: ScrollHandle::new(),
            last_layout: None,
            snapshot: LayoutSnapshot::default(),
            gutter: GutterRenderer::new(GutterStyle::default()),
            font: font(config.font_family.clone()),
            font_size: px(config.font_size),
            line_height: px(config.line_height),
        }
    }

    /// Loads a different document. Does not emit `ContentChanged`.
    pub fn set_content(&mut self, content: impl Into<SharedString>, cx: &mut Context<Self>) {
        self.content = content.into();
        self.line_index = LineIndex::build(&self.content);
        self.selected_range = 0..0;
        self.selection_reversed = false;
        self.marked_range = None;
        self.last_layout = None;
        self.snapshot = LayoutSnapshot::default();
        self.scroll_handle.set_offset(point(px(0.), px(0.)));
        self.gutter.mark_dirty();
        cx.notify();
    }

    pub fn scroll_handle(&self) -> &ScrollHandle {
        &self.scroll_handle
    }

    pub fn gutter(&self) -> &GutterRenderer {
        &self.gutter
    }

    pub fn gutter_mut(&mut self) -> &mut GutterRenderer {
        &mut self.gutter
    }

    pub fn focus(&self, window: &mut Window) {
        self.focus_handle.focus(window);
    }

    pub fn line_height(&self) -> Pixels {
        self.line_height
    }

    /// Paints the line-number gutter against this frame's layout.
    pub fn paint_gutter(&mut self, surface: &mut dyn GutterSurface, region: GutterRect) {
        let drawn = self
            .gutter
            .paint(surface, region, &self.line_index, &self.snapshot);
        trace!(target: "gutter", lines = drawn.len(), "gutter_painted");
    }

    fn content_changed(&mut self, cx: &mut Context<Self>) {
        self.line_index = LineIndex::build(&self.content);
        self.gutter.mark_dirty();
        self.scroll_to_cursor = true;
        cx.emit(EditorEvent::ContentChanged(self.content.to_string()));
        cx.notify();
    }

    fn selection_changed(&mut self, cx: &mut Context<Self>) {
        self.gutter.mark_dirty();
        self.scroll_to_cursor = true;
        cx.notify();
    }

    fn on_mouse_down(
        &mut self,
        event: &MouseDownEvent,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        self.is_selecting = true;
        self.focus_handle.focus(window);

        if event.modifiers.shift {
            self.select_to(self.index_for_mouse_position(event.position), cx);
        } else {
            self.move_to(self.index_for_mouse_position(event.position), cx)
        }
    }

    fn on_mouse_up(&mut self, _: &MouseUpEvent, _window: &mut Window, _: &mut Context<Self>) {
        self.is_selecting = false;
    }

    fn on_mouse_move(&mut self, event: &MouseMoveEvent, _: &mut Window, cx: &mut Context<Self>) {
        if self.is_selecting {
            self.select_to(self.index_for_mouse_position(event.position), cx);
        }
    }

    fn index_for_mouse_position(&self, position: Point<Pixels>) -> usize {
        if self.content.is_empty() {
            return 0;
        }

        let Some(layout) = self.last_layout.as_ref() else {
            return self.content.len();
        };
        let Some(first) = layout.rows.first() else {
            return 0;
        };

        let relative_y = position.y - layout.bounds.top();
        if relative_y < first.y {
            return 0;
        }

        let Some(row) = layout
            .rows
            .iter()
            .find(|row| relative_y < row.y + row.height)
        else {
            return self.content.len();
        };

        let Some(shaped) = row.shaped.as_ref() else {
            return row.range.start;
        };
        let local = point(
            (position.x - layout.bounds.left() - px(TEXT_INSET)).max(px(0.)),
            relative_y - row.y,
        );
        let index = match shaped.index_for_position(local, self.line_height) {
            Ok(index) | Err(index) => index,
        };
        (row.range.start + index).min(row.text_end)
    }

    fn move_to(&mut self, offset: usize, cx: &mut Context<Self>) {
        self.selected_range = offset..offset;
        self.selection_changed(cx)
    }

    fn select_to(&mut self, offset: usize, cx: &mut Context<Self>) {
        if self.selection_reversed {
            self.selected_range.start = offset
        } else {
            self.selected_range.end = offset
        };
        if self.selected_range.end < self.selected_range.start {
            self.selection_reversed = !self.selection_reversed;
            self.selected_range = self.selected_range.end..self.selected_range.start;
        }
        self.selection_changed(cx)
    }

    fn select_all(&mut self, cx: &mut Context<Self>) {
        self.move_to(0, cx);
        self.select_to(self.content.len(), cx)
    }

    fn cursor_offset(&self) -> usize {
        if self.selection_reversed {
            self.selected_range.start
        } else {
            self.selected_range.end
        }
    }

    fn previous_boundary(&self, offset: usize) -> usize {
        self.content
            .grapheme_indices(true)
            .rev()
            .find_map(|(idx, _)| (idx < offset).then_some(idx))
            .unwrap_or(0)
    }

    fn next_boundary(&self, offset: usize) -> usize {
        self.content
            .grapheme_indices(true)
            .find_map(|(idx, _)| (idx > offset).then_some(idx))
            .unwrap_or(self.content.len())
    }

    fn floor_char_boundary(&self, mut offset: usize) -> usize {
        offset = offset.min(self.content.len());
        while !self.content.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Offset on line `target` at the same byte column as `cursor`, clamped to
    /// the line's text.
    fn offset_on_line(&self, cursor: usize, target: usize) -> usize {
        let current = self.line_index.line_at_offset(cursor);
        let column = cursor - self.line_index.lines()[current].start;
        let Some(line) = self.line_index.line(target) else {
            return cursor;
        };
        let end = self.line_index.content_end(target, &self.content);
        self.floor_char_boundary((line.start + column).min(end))
    }

    fn vertical_target(&self, down: bool) -> usize {
        let cursor = self.cursor_offset();
        let current = self.line_index.line_at_offset(cursor);
        if down {
            if current + 1 < self.line_index.line_count() {
                self.offset_on_line(cursor, current + 1)
            } else {
                self.content.len()
            }
        } else if current > 0 {
            self.offset_on_line(cursor, current - 1)
        } else {
            0
        }
    }

    fn on_backspace(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.selected_range.is_empty() {
            self.select_to(self.previous_boundary(self.cursor_offset()), cx)
        }
        self.replace_text_in_range(None, "", window, cx)
    }

    fn on_delete(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.selected_range.is_empty() {
            self.select_to(self.next_boundary(self.cursor_offset()), cx)
        }
        self.replace_text_in_range(None, "", window, cx)
    }

    fn on_left(&mut self, cx: &mut Context<Self>) {
        if self.selected_range.is_empty() {
            self.move_to(self.previous_boundary(self.cursor_offset()), cx);
        } else {
            self.move_to(self.selected_range.start, cx)
        }
    }

    fn on_right(&mut self, cx: &mut Context<Self>) {
        if self.selected_range.is_empty() {
            self.move_to(self.next_boundary(self.selected_range.end), cx);
        } else {
            self.move_to(self.selected_range.end, cx)
        }
    }

    fn move_or_select(&mut self, offset: usize, extend: bool, cx: &mut Context<Self>) {
        if extend {
            self.select_to(offset, cx);
        } else {
            self.move_to(offset, cx);
        }
    }

    fn on_key_down(&mut self, event: &KeyDownEvent, window: &mut Window, cx: &mut Context<Self>) {
        let keystroke = &event.keystroke;
        let shift = keystroke.modifiers.shift;
        let platform = keystroke.modifiers.platform;

        if keystroke.key == "enter" {
            self.replace_text_in_range(None, "\n", window, cx);
            return;
        }

        if keystroke.key_char.is_some() && !platform {
            return;
        }

        match keystroke.key.as_str() {
            "backspace" if !platform => self.on_backspace(window, cx),
            "delete" => self.on_delete(window, cx),
            "left" | "arrowleft" => {
                if shift {
                    self.select_to(self.previous_boundary(self.cursor_offset()), cx);
                } else {
                    self.on_left(cx);
                }
            }
            "right" | "arrowright" => {
                if shift {
                    self.select_to(self.next_boundary(self.cursor_offset()), cx);
                } else {
                    self.on_right(cx);
                }
            }
            "up" | "arrowup" => {
                let target = self.vertical_target(false);
                self.move_or_select(target, shift, cx);
            }
            "down" | "arrowdown" => {
                let target = self.vertical_target(true);
                self.move_or_select(target, shift, cx);
            }
            "home" => {
                let line = self.line_index.line_at_offset(self.cursor_offset());
                let start = self.line_index.lines()[line].start;
                self.move_or_select(start, shift, cx);
            }
            "end" => {
                let line = self.line_index.line_at_offset(self.cursor_offset());
                let end = self.line_index.content_end(line, &self.content);
                self.move_or_select(end, shift, cx);
            }
            "a" if platform => self.select_all(cx),
            "c" if platform => {
                if !self.selected_range.is_empty() {
                    cx.write_to_clipboard(ClipboardItem::new_string(
                        self.content[self.selected_range.clone()].to_string(),
                    ));
                }
            }
            "x" if platform => {
                if !self.selected_range.is_empty() {
                    cx.write_to_clipboard(ClipboardItem::new_string(
                        self.content[self.selected_range.clone()].to_string(),
                    ));
                    self.replace_text_in_range(None, "", window, cx);
                }
            }
            "v" if platform => {
                if let Some(text) = cx.read_from_clipboard().and_then(|item| item.text()) {
                    self.replace_text_in_range(None, &text, window, cx);
                }
            }
            _ => {}
        }
    }

    fn offset_from_utf16(&self, offset: usize) -> usize {
        let mut utf8_offset = 0;
        let mut utf16_count = 0;

        for ch in self.content.chars() {
            if utf16_count >= offset {
                break;
            }
            utf16_count += ch.len_utf16();
            utf8_offset += ch.len_utf8();
        }

        utf8_offset
    }

    fn offset_to_utf16(&self, offset: usize) -> usize {
        let mut utf16_offset = 0;
        let mut utf8_count = 0;

        for ch in self.content.chars() {
            if utf8_count >= offset {
                break;
            }
            utf8_count += ch.len_utf8();
            utf16_offset += ch.len_utf16();
        }

        utf16_offset
    }

    fn range_to_utf16(&self, range: &Range<usize>) -> Range<usize> {
        self.offset_to_utf16(range.start)..self.offset_to_utf16(range.end)
    }

    fn range_from_utf16(&self, range_utf16: &Range<usize>) -> Range<usize> {
        self.offset_from_utf16(range_utf16.start)..self.offset_from_utf16(range_utf16.end)
    }

    /// Window-space position of `offset`, if it has been laid out.
    fn position_for_offset(&self, offset: usize) -> Option<Point<Pixels>> {
        let layout = self.last_layout.as_ref()?;
        let row = layout.rows.get(self.line_index.line_at_offset(offset))?;
        let local = offset.min(row.text_end) - row.range.start;
        let within = row
            .shaped
            .as_ref()
            .and_then(|shaped| shaped.position_for_index(local, self.line_height))
            .unwrap_or_default();
        Some(point(
            layout.bounds.left() + px(TEXT_INSET) + within.x,
            layout.bounds.top() + row.y + within.y,
        ))
    }
}

impl WrapHost for NoteEditor {
    fn configure_container(&mut self, config: ContainerConfig) {
        self.container = config;
        if !config.horizontal_scroll {
            let offset = self.scroll_handle.offset();
            self.scroll_handle.set_offset(point(px(0.), offset.y));
        }
    }

    fn force_layout(&mut self) {
        self.last_layout = None;
        self.snapshot = LayoutSnapshot::default();
    }

    fn invalidate_gutter(&mut self) {
        self.gutter.mark_dirty();
    }
}

impl EntityInputHandler for NoteEditor {
    fn text_for_range(
        &mut self,
        range_utf16: Range<usize>,
        actual_range: &mut Option<Range<usize>>,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<String> {
        let range = self.range_from_utf16(&range_utf16);
        actual_range.replace(self.range_to_utf16(&range));
        Some(self.content[range].to_string())
    }

    fn selected_text_range(
        &mut self,
        _ignore_disabled_input: bool,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<UTF16Selection> {
        Some(UTF16Selection {
            range: self.range_to_utf16(&self.selected_range),
            reversed: self.selection_reversed,
        })
    }

    fn marked_text_range(
        &self,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<Range<usize>> {
        self.marked_range
            .as_ref()
            .map(|range| self.range_to_utf16(range))
    }

    fn unmark_text(&mut self, _window: &mut Window, _cx: &mut Context<Self>) {
        self.marked_range = None;
    }

    fn replace_text_in_range(
        &mut self,
        range_utf16: Option<Range<usize>>,
        new_text: &str,
        _: &mut Window,
        cx: &mut Context<Self>,
    ) {
        let range = range_utf16
            .as_ref()
            .map(|range_utf16| self.range_from_utf16(range_utf16))
            .or(self.marked_range.clone())
            .unwrap_or(self.selected_range.clone());

        self.content =
            (self.content[0..range.start].to_owned() + new_text + &self.content[range.end..])
                .into();
        self.selected_range = range.start + new_text.len()..range.start + new_text.len();
        self.selection_reversed = false;
        self.marked_range.take();

        self.content_changed(cx);
    }

    fn replace_and_mark_text_in_range(
        &mut self,
        range_utf16: Option<Range<usize>>,
        new_text: &str,
        new_selected_range_utf16: Option<Range<usize>>,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        let range = range_utf16
            .as_ref()
            .map(|range_utf16| self.range_from_utf16(range_utf16))
            .or(self.marked_range.clone())
            .unwrap_or(self.selected_range.clone());

        self.content =
            (self.content[0..range.start].to_owned() + new_text + &self.content[range.end..])
                .into();
        self.marked_range = Some(range.start..range.start + new_text.len());
        self.selected_range = new_selected_range_utf16
            .as_ref()
            .map(|range_utf16| self.range_from_utf16(range_utf16))
            .map(|new_range| new_range.start + range.start..new_range.end + range.start)
            .unwrap_or_else(|| range.start + new_text.len()..range.start + new_text.len());

        self.content_changed(cx);
    }

    fn bounds_for_range(
        &mut self,
        range_utf16: Range<usize>,
        _bounds: Bounds<Pixels>,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<Bounds<Pixels>> {
        let range = self.range_from_utf16(&range_utf16);
        let start = self.position_for_offset(range.start)?;
        let end = self.position_for_offset(range.end)?;
        let bottom = if end.y > start.y { end.y } else { start.y };
        Some(Bounds::from_corners(
            start,
            point(end.x.max(start.x), bottom + self.line_height),
        ))
    }

    fn character_index_for_point(
        &mut self,
        point: Point<Pixels>,
        _window: &mut Window,
        _cx: &mut Context<Self>,
    ) -> Option<usize> {
        self.last_layout.as_ref()?;
        let utf8_index = self.index_for_mouse_position(point);
        Some(self.offset_to_utf16(utf8_index))
    }
}

struct EditorView {
    editor: Entity<NoteEditor>,
}

struct PrepaintState {
    rows: Vec<LineRow>,
    cursor: Option<PaintQuad>,
    selection: Vec<PaintQuad>,
    snapshot: LayoutSnapshot,
}

impl IntoElement for EditorView {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

fn text_runs(
    line: Range<usize>,
    font: &Font,
    color: Hsla,
    marked: Option<&Range<usize>>,
) -> Vec<TextRun> {
    let run = TextRun {
        len: line.len(),
        font: font.clone(),
        color,
        background_color: None,
        underline: None,
        strikethrough: None,
    };

    let Some(marked) = marked.filter(|m| m.start < line.end && m.end > line.start) else {
        return vec![run];
    };

    let marked_start = marked.start.max(line.start) - line.start;
    let marked_end = marked.end.min(line.end) - line.start;

    vec![
        TextRun {
            len: marked_start,
            ..run.clone()
        },
        TextRun {
            len: marked_end - marked_start,
            underline: Some(UnderlineStyle {
                color: Some(run.color),
                thickness: px(1.0),
                wavy: false,
            }),
            ..run.clone()
        },
        TextRun {
            len: line.len() - marked_end,
            ..run.clone()
        },
    ]
    .into_iter()
    .filter(|run| run.len > 0)
    .collect()
}

struct ShapeParams<'a> {
    content: &'a str,
    index: &'a LineIndex,
    font: &'a Font,
    font_size: Pixels,
    line_height: Pixels,
    wrap_width: Option<Pixels>,
    marked: Option<&'a Range<usize>>,
}

fn shape_rows(params: ShapeParams<'_>, window: &mut Window) -> Vec<LineRow> {
    let color: Hsla = rgb(TEXT_COLOR).into();
    let mut rows = Vec::with_capacity(params.index.line_count());
    let mut y = px(TEXT_INSET);

    for (i, range) in params.index.lines().iter().enumerate() {
        let text_end = params.index.content_end(i, params.content);
        let text = &params.content[range.start..text_end];
        let runs = text_runs(range.start..text_end, params.font, color, params.marked);
        let shaped = window
            .text_system()
            .shape_text(
                SharedString::from(text.to_string()),
                params.font_size,
                &runs,
                params.wrap_width,
                None,
            )
            .ok()
            .and_then(|lines| lines.into_iter().next());
        let height = shaped
            .as_ref()
            .map(|line| line.size(params.line_height).height)
            .unwrap_or(params.line_height)
            .max(params.line_height);

        rows.push(LineRow {
            range: range.clone(),
            text_end,
            shaped,
            y,
            height,
        });
        y += height;
    }
    rows
}

fn widest_row(rows: &[LineRow], line_height: Pixels) -> Pixels {
    rows.iter()
        .filter_map(|row| row.shaped.as_ref())
        .map(|line| line.size(line_height).width)
        .fold(px(0.), |widest, width| if width > widest { width } else { widest })
}

fn wrap_width_for(container: ContainerConfig, width: Option<Pixels>) -> Option<Pixels> {
    match container.width {
        ContainerWidth::TracksViewport => {
            width.map(|width| (width - px(2. * TEXT_INSET)).max(px(1.)))
        }
        ContainerWidth::Unbounded => None,
    }
}

fn selection_quads(
    row: &LineRow,
    bounds: Bounds<Pixels>,
    selected: &Range<usize>,
    line_height: Pixels,
) -> Vec<PaintQuad> {
    if selected.is_empty() || selected.end <= row.range.start || selected.start > row.text_end {
        return Vec::new();
    }
    let Some(shaped) = row.shaped.as_ref() else {
        return Vec::new();
    };

    let start = selected.start.max(row.range.start).min(row.text_end) - row.range.start;
    let end = selected.end.min(row.text_end) - row.range.start;
    if start >= end {
        return Vec::new();
    }

    let origin = point(bounds.left() + px(TEXT_INSET), bounds.top() + row.y);
    let right = bounds.right() - px(TEXT_INSET);
    let color = rgba(0x3311ff30);
    let (Some(from), Some(to)) = (
        shaped.position_for_index(start, line_height),
        shaped.position_for_index(end, line_height),
    ) else {
        return Vec::new();
    };

    let quad = |left: Pixels, top: Pixels, right: Pixels| {
        fill(
            Bounds::from_corners(
                point(left, origin.y + top),
                point(right, origin.y + top + line_height),
            ),
            color,
        )
    };

    if from.y == to.y {
        return vec![quad(origin.x + from.x, from.y, origin.x + to.x)];
    }

    let mut quads = vec![quad(origin.x + from.x, from.y, right)];
    let mut top = from.y + line_height;
    while top < to.y {
        quads.push(quad(origin.x, top, right));
        top += line_height;
    }
    quads.push(quad(origin.x, to.y, origin.x + to.x));
    quads
}

impl Element for EditorView {
    type RequestLayoutState = ();
    type PrepaintState = PrepaintState;

    fn id(&self) -> Option<ElementId> {
        None
    }

    fn request_layout(
        &mut self,
        _id: Option<&GlobalElementId>,
        window: &mut Window,
        cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let editor = self.editor.read(cx);
        let content = editor.content.clone();
        let index = editor.line_index.clone();
        let font = editor.font.clone();
        let font_size = editor.font_size;
        let line_height = editor.line_height;
        let container = editor.container;

        let mut style = Style::default();
        match container.width {
            ContainerWidth::TracksViewport => {
                style.size.width = relative(1.).into();
            }
            ContainerWidth::Unbounded => {
                style.min_size.width = relative(1.).into();
            }
        }
        style.min_size.height = relative(1.).into();

        let layout_id = window.request_measured_layout(
            style,
            move |known: Size<Option<Pixels>>, available: Size<AvailableSpace>, window, _cx| {
                let available_width = match available.width {
                    AvailableSpace::Definite(width) => Some(width),
                    _ => None,
                };
                let width = known.width.or(available_width);
                let rows = shape_rows(
                    ShapeParams {
                        content: &content,
                        index: &index,
                        font: &font,
                        font_size,
                        line_height,
                        wrap_width: wrap_width_for(container, width),
                        marked: None,
                    },
                    window,
                );
                let height = rows
                    .last()
                    .map(|row| row.y + row.height)
                    .unwrap_or(line_height)
                    + px(TEXT_INSET);
                let content_width = widest_row(&rows, line_height) + px(2. * TEXT_INSET + 2.);
                let width = match (container.size_to_fit_longest_line, width) {
                    (true, Some(width)) if width > content_width => width,
                    (true, _) => content_width,
                    (false, Some(width)) => width,
                    (false, None) => content_width,
                };
                size(width, height)
            },
        );
        (layout_id, ())
    }

    fn prepaint(
        &mut self,
        _id: Option<&GlobalElementId>,
        bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        window: &mut Window,
        cx: &mut App,
    ) -> Self::PrepaintState {
        let editor = self.editor.read(cx);
        let content = editor.content.clone();
        let index = editor.line_index.clone();
        let selected_range = editor.selected_range.clone();
        let cursor = editor.cursor_offset();
        let marked = editor.marked_range.clone();
        let font = editor.font.clone();
        let font_size = editor.font_size;
        let line_height = editor.line_height;
        let container = editor.container;
        let scroll_handle = editor.scroll_handle.clone();
        let scroll_to_cursor = editor.scroll_to_cursor;

        let rows = shape_rows(
            ShapeParams {
                content: &content,
                index: &index,
                font: &font,
                font_size,
                line_height,
                wrap_width: wrap_width_for(container, Some(bounds.size.width)),
                marked: marked.as_ref(),
            },
            window,
        );

        let selection = rows
            .iter()
            .flat_map(|row| selection_quads(row, bounds, &selected_range, line_height))
            .collect();

        let mut cursor_top = None;
        let cursor_quad = if selected_range.is_empty() {
            rows.get(index.line_at_offset(cursor)).map(|row| {
                let local = cursor.min(row.text_end) - row.range.start;
                let within = row
                    .shaped
                    .as_ref()
                    .and_then(|shaped| shaped.position_for_index(local, line_height))
                    .unwrap_or_default();
                cursor_top = Some(row.y + within.y);
                fill(
                    Bounds::new(
                        point(
                            bounds.left() + px(TEXT_INSET) + within.x,
                            bounds.top() + row.y + within.y,
                        ),
                        size(px(2.), line_height),
                    ),
                    gpui::blue(),
                )
            })
        } else {
            None
        };

        let offset = scroll_handle.offset();
        let viewport_height = scroll_handle.bounds().size.height;

        if scroll_to_cursor {
            self.editor
                .update(cx, |editor, _cx| editor.scroll_to_cursor = false);
            if let Some(top) = cursor_top {
                let visible_top = -offset.y;
                let target = if top < visible_top {
                    Some(top - px(TEXT_INSET))
                } else if top + line_height > visible_top + viewport_height {
                    Some(top + line_height + px(TEXT_INSET) - viewport_height)
                } else {
                    None
                };
                if let Some(target) = target {
                    scroll_handle.set_offset(point(offset.x, -target.max(px(0.))));
                    window.refresh();
                }
            }
        }

        let snapshot = LayoutSnapshot {
            boxes: rows
                .iter()
                .map(|row| {
                    (
                        row.range.clone(),
                        LineBox {
                            y: row.y.0,
                            height: row.height.0,
                        },
                    )
                })
                .collect(),
            scroll_offset: -offset.y.0,
            viewport_height: viewport_height.0,
            line_height: line_height.0,
            content_inset: 0.0,
        };

        PrepaintState {
            rows,
            cursor: cursor_quad,
            selection,
            snapshot,
        }
    }

    fn paint(
        &mut self,
        _id: Option<&GlobalElementId>,
        bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        prepaint: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    ) {
        let editor = self.editor.read(cx);
        let focus_handle = editor.focus_handle.clone();
        let line_height = editor.line_height;
        window.handle_input(
            &focus_handle,
            ElementInputHandler::new(bounds, self.editor.clone()),
            cx,
        );

        window.paint_quad(fill(bounds, rgb(BACKGROUND)));

        for selection in prepaint.selection.drain(..) {
            window.paint_quad(selection);
        }

        for row in &prepaint.rows {
            if let Some(shaped) = row.shaped.as_ref() {
                let origin = point(bounds.left() + px(TEXT_INSET), bounds.top() + row.y);
                if let Err(e) = shaped.paint(origin, line_height, window, cx) {
                    trace!(target: "editor", error = %e, "line_paint_failed");
                }
            }
        }

        if focus_handle.is_focused(window) {
            if let Some(cursor) = prepaint.cursor.take() {
                window.paint_quad(cursor);
            }
        }

        let rows = std::mem::take(&mut prepaint.rows);
        let snapshot = std::mem::take(&mut prepaint.snapshot);

        self.editor.update(cx, |editor, _cx| {
            editor.last_layout = Some(EditorLayout { rows, bounds });
            editor.snapshot = snapshot;
        });
    }
}

impl Focusable for NoteEditor {
    fn focus_handle(&self, _cx: &App) -> FocusHandle {
        self.focus_handle.clone()
    }
}

impl Render for NoteEditor {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let wrapped = self.container.width == ContainerWidth::TracksViewport;

        div()
            .flex()
            .when(wrapped, |this| this.w_full())
            .cursor(CursorStyle::IBeam)
            .track_focus(&self.focus_handle)
            .on_mouse_down(MouseButton::Left, cx.listener(Self::on_mouse_down))
            .on_mouse_up(MouseButton::Left, cx.listener(Self::on_mouse_up))
            .on_mouse_move(cx.listener(Self::on_mouse_move))
            .on_key_down(cx.listener(Self::on_key_down))
            .child(EditorView {
                editor: cx.entity().clone(),
            })
    }
}
