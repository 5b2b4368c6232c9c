use std::ops::Range;

use super::LineIndex;

/// Boxes shorter than this are treated as empty lines and get the font's line
/// height instead, so the numeral still has a place to sit.
pub const DEGENERATE_LINE_HEIGHT: f32 = 5.0;

/// Vertical extent of one logical line in the editor's content coordinates
/// (before scrolling).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineBox {
    pub y: f32,
    pub height: f32,
}

/// What the gutter needs to know about the host text view's current layout.
pub trait TextLayout {
    /// Character range currently on screen, or `None` if layout has not run.
    fn visible_character_range(&self) -> Option<Range<usize>>;

    /// Layout box for a line range exactly as produced by [`LineIndex`].
    fn line_box(&self, line: &Range<usize>) -> Option<LineBox>;

    /// Vertical scroll distance, positive when scrolled down.
    fn scroll_offset(&self) -> f32;

    fn line_height(&self) -> f32;

    /// Distance between the top of the scrolled content and the first line.
    fn content_inset(&self) -> f32 {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleLine {
    /// 1-based.
    pub number: usize,
    /// Top edge in gutter coordinates.
    pub y: f32,
    pub height: f32,
}

/// Zero-based indices of the lines that intersect `viewport`.
///
/// Lines are half-open, so a line starting exactly at `viewport.end` is not
/// visible. A zero-length line can only be the trailing one; it counts as
/// visible once the viewport reaches the end of the document.
pub fn visible_line_indices(index: &LineIndex, viewport: &Range<usize>) -> Vec<usize> {
    let lines = index.lines();
    let first = lines.partition_point(|line| !line.is_empty() && line.end <= viewport.start);

    let mut visible = Vec::new();
    for (i, line) in lines.iter().enumerate().skip(first) {
        if index.is_trailing_synthetic(i) {
            if viewport.end >= index.text_len() {
                visible.push(i);
            }
            continue;
        }
        if line.start >= viewport.end {
            break;
        }
        if !viewport.is_empty() && viewport.start < line.end {
            visible.push(i);
        }
    }
    visible
}

/// Visible lines with their positions projected into gutter coordinates.
///
/// Returns `None` when the host has no layout yet; callers skip the numerals
/// for that frame.
pub fn map_visible_lines(index: &LineIndex, layout: &dyn TextLayout) -> Option<Vec<VisibleLine>> {
    let viewport = layout.visible_character_range()?;
    let line_height = layout.line_height();
    let origin = layout.content_inset() - layout.scroll_offset();
    let lines = index.lines();

    let mut mapped: Vec<VisibleLine> = Vec::new();
    for i in visible_line_indices(index, &viewport) {
        let (y, height) = match layout.line_box(&lines[i]) {
            Some(line_box) => {
                let height = if line_box.height < DEGENERATE_LINE_HEIGHT {
                    line_height
                } else {
                    line_box.height
                };
                (origin + line_box.y, height)
            }
            None => {
                let y = match mapped.last() {
                    Some(previous) => previous.y + previous.height,
                    None => origin + top_of_unlaid_line(lines, i, layout, line_height),
                };
                (y, line_height)
            }
        };
        mapped.push(VisibleLine {
            number: i + 1,
            y,
            height,
        });
    }
    Some(mapped)
}

/// Content-space top of a line the host did not lay out: directly below the
/// line above it, falling back to a uniform-height estimate.
fn top_of_unlaid_line(
    lines: &[Range<usize>],
    index: usize,
    layout: &dyn TextLayout,
    line_height: f32,
) -> f32 {
    if index == 0 {
        return 0.0;
    }
    match layout.line_box(&lines[index - 1]) {
        Some(above) => above.y + above.height.max(line_height),
        None => index as f32 * line_height,
    }
}

/// Layout facts the editor records every frame, one box per logical line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutSnapshot {
    pub boxes: Vec<(Range<usize>, LineBox)>,
    pub scroll_offset: f32,
    pub viewport_height: f32,
    pub line_height: f32,
    pub content_inset: f32,
}

impl LayoutSnapshot {
    fn visible_boxes(&self) -> impl Iterator<Item = &(Range<usize>, LineBox)> {
        let top = self.scroll_offset;
        let bottom = self.scroll_offset + self.viewport_height;
        self.boxes.iter().filter(move |(_, line_box)| {
            let line_top = self.content_inset + line_box.y;
            let line_bottom = line_top + line_box.height.max(self.line_height);
            line_top < bottom && line_bottom > top
        })
    }
}

impl TextLayout for LayoutSnapshot {
    fn visible_character_range(&self) -> Option<Range<usize>> {
        let last_end = self.boxes.last()?.0.end;
        let mut visible = self.visible_boxes();
        let Some((first, _)) = visible.next() else {
            let below = self
                .boxes
                .iter()
                .find(|(_, line_box)| self.content_inset + line_box.y >= self.scroll_offset)
                .map(|(range, _)| range.start)
                .unwrap_or(last_end);
            return Some(below..below);
        };
        let end = visible
            .last()
            .map(|(range, _)| range.end)
            .unwrap_or(first.end);
        Some(first.start..end)
    }

    fn line_box(&self, line: &Range<usize>) -> Option<LineBox> {
        let position = self
            .boxes
            .binary_search_by(|(range, _)| {
                range
                    .start
                    .cmp(&line.start)
                    .then(range.end.cmp(&line.end))
            })
            .ok()?;
        Some(self.boxes[position].1)
    }

    fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn content_inset(&self) -> f32 {
        self.content_inset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: f32 = 20.0;

    fn uniform_snapshot(text: &str, scroll: f32, viewport_height: f32) -> LayoutSnapshot {
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
                            y: i as f32 * LINE,
                            height: LINE,
                        },
                    )
                })
                .collect(),
            scroll_offset: scroll,
            viewport_height,
            line_height: LINE,
            content_inset: 0.0,
        }
    }

    fn intersects(line: &Range<usize>, viewport: &Range<usize>) -> bool {
        !line.is_empty() && !viewport.is_empty() && line.start < viewport.end && viewport.start < line.end
    }

    #[test]
    fn visible_lines_follow_half_open_intersection() {
        let text = "one\ntwo\nthree\nfour\n";
        let index = LineIndex::build(text);
        for start in 0..=text.len() {
            for end in start..=text.len() {
                let viewport = start..end;
                let visible = visible_line_indices(&index, &viewport);
                for (i, line) in index.lines().iter().enumerate() {
                    let expected = if line.is_empty() {
                        end >= text.len()
                    } else {
                        intersects(line, &viewport)
                    };
                    assert_eq!(
                        visible.contains(&i),
                        expected,
                        "line {i} {line:?} vs viewport {viewport:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn line_starting_at_viewport_end_is_hidden() {
        let index = LineIndex::build("ab\ncd\nef");
        assert_eq!(visible_line_indices(&index, &(0..3)), vec![0]);
        assert_eq!(visible_line_indices(&index, &(2..4)), vec![0, 1]);
    }

    #[test]
    fn trailing_line_needs_viewport_at_document_end() {
        let index = LineIndex::build("a\nb\n");
        assert_eq!(visible_line_indices(&index, &(0..3)), vec![0, 1]);
        assert_eq!(visible_line_indices(&index, &(0..4)), vec![0, 1, 2]);
        assert_eq!(visible_line_indices(&index, &(4..4)), vec![2]);
    }

    #[test]
    fn empty_document_shows_line_one() {
        let index = LineIndex::build("");
        assert_eq!(visible_line_indices(&index, &(0..0)), vec![0]);
    }

    #[test]
    fn snapshot_derives_visible_range_from_scroll_window() {
        let text = "l1\nl2\nl3\nl4\nl5\n";
        let snapshot = uniform_snapshot(text, 2.0 * LINE, 2.0 * LINE);
        assert_eq!(snapshot.visible_character_range(), Some(6..12));

        let everything = uniform_snapshot(text, 0.0, 10.0 * LINE);
        assert_eq!(everything.visible_character_range(), Some(0..text.len()));
    }

    #[test]
    fn snapshot_without_boxes_has_no_layout() {
        let snapshot = LayoutSnapshot::default();
        assert_eq!(snapshot.visible_character_range(), None);
        assert!(map_visible_lines(&LineIndex::build("x"), &snapshot).is_none());
    }

    #[test]
    fn mapped_positions_account_for_scroll() {
        let text = "l1\nl2\nl3\nl4";
        let index = LineIndex::build(text);
        let snapshot = uniform_snapshot(text, LINE, 2.0 * LINE);
        let lines = map_visible_lines(&index, &snapshot).unwrap();
        assert_eq!(
            lines,
            vec![
                VisibleLine { number: 2, y: 0.0, height: LINE },
                VisibleLine { number: 3, y: LINE, height: LINE },
            ]
        );
    }

    #[test]
    fn degenerate_boxes_get_font_line_height() {
        let text = "a\n\nb";
        let index = LineIndex::build(text);
        let mut snapshot = uniform_snapshot(text, 0.0, 100.0);
        snapshot.boxes[1].1.height = 0.5;
        let lines = map_visible_lines(&index, &snapshot).unwrap();
        assert_eq!(lines[1].height, LINE);
    }

    #[test]
    fn trailing_line_without_box_stacks_under_previous() {
        let text = "a\nb\n";
        let index = LineIndex::build(text);
        let mut snapshot = uniform_snapshot(text, 0.0, 100.0);
        snapshot.boxes.pop();
        let lines = map_visible_lines(&index, &snapshot).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].number, 3);
        assert_eq!(lines[2].y, 2.0 * LINE);
    }

    #[test]
    fn wrapped_lines_keep_their_full_height() {
        let text = "long wrapped line\nshort";
        let index = LineIndex::build(text);
        let mut snapshot = uniform_snapshot(text, 0.0, 200.0);
        snapshot.boxes[0].1.height = 3.0 * LINE;
        snapshot.boxes[1].1.y = 3.0 * LINE;
        let lines = map_visible_lines(&index, &snapshot).unwrap();
        assert_eq!(lines[1].y, 3.0 * LINE);
    }

    #[test]
    fn content_inset_shifts_positions() {
        let text = "x\ny";
        let index = LineIndex::build(text);
        let mut snapshot = uniform_snapshot(text, 0.0, 100.0);
        snapshot.content_inset = 8.0;
        let lines = map_visible_lines(&index, &snapshot).unwrap();
        assert_eq!(lines[0].y, 8.0);
        assert_eq!(lines[1].y, 8.0 + LINE);
    }
}
