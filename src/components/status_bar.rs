use chrono::{DateTime, Local, TimeZone};
use gpui::{FontWeight, MouseButton, MouseDownEvent, div, prelude::*, px, rgb};
use unicode_segmentation::UnicodeSegmentation;

use crate::components::NoteApp;

pub const APP_NAME: &str = "ScribblePad";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStats {
    pub words: usize,
    /// User-perceived characters (extended grapheme clusters).
    pub characters: usize,
}

impl TextStats {
    pub fn of(content: &str) -> Self {
        Self {
            words: content.split_whitespace().count(),
            characters: content.graphemes(true).count(),
        }
    }
}

fn to_zone<Tz: TimeZone>(timestamp: u64, zone: &Tz) -> Option<DateTime<Tz>> {
    let secs = i64::try_from(timestamp).ok()?;
    zone.timestamp_opt(secs, 0).single()
}

/// Medium date, short time: `Mar 14, 2025 at 3:07 PM`.
pub fn format_timestamp_in<Tz: TimeZone>(timestamp: u64, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    to_zone(timestamp, zone)
        .map(|time| time.format("%b %-d, %Y at %-I:%M %p").to_string())
        .unwrap_or_default()
}

/// Short date for sidebar rows: `3/14/25`.
pub fn format_short_date_in<Tz: TimeZone>(timestamp: u64, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    to_zone(timestamp, zone)
        .map(|time| time.format("%-m/%-d/%y").to_string())
        .unwrap_or_default()
}

pub fn format_timestamp(timestamp: u64) -> String {
    format_timestamp_in(timestamp, &Local)
}

pub fn format_short_date(timestamp: u64) -> String {
    format_short_date_in(timestamp, &Local)
}

impl NoteApp {
    pub(super) fn render_status_bar(&self, cx: &mut Context<Self>) -> impl IntoElement {
        let note = self.notes.active_note();
        let word_wrap = self.wrap_switch.mode().is_wrapped();
        let secondary = rgb(0x808080);

        let mut right = div().flex().items_center().gap_4();

        if let Some(note) = note {
            let stats = TextStats::of(&note.content);
            right = right
                .child(div().text_color(secondary).child(format!("{} words", stats.words)))
                .child(
                    div()
                        .text_color(secondary)
                        .child(format!("{} characters", stats.characters)),
                )
                .child(div().w(px(1.0)).h(px(12.0)).bg(rgb(0xd0d0d0)));
        }

        right = right.child(
            div()
                .id("word-wrap-toggle")
                .flex()
                .items_center()
                .gap_1()
                .cursor_pointer()
                .on_mouse_down(
                    MouseButton::Left,
                    cx.listener(|view, _: &MouseDownEvent, window, cx| {
                        view.toggle_word_wrap(window, cx);
                    }),
                )
                .child(div().text_color(secondary).child("Word wrap:"))
                .child(
                    div()
                        .w(px(26.0))
                        .h(px(14.0))
                        .rounded_full()
                        .flex()
                        .items_center()
                        .px_0p5()
                        .bg(if word_wrap { rgb(0x4287f5) } else { rgb(0xc8c8c8) })
                        .when(word_wrap, |toggle| toggle.justify_end())
                        .child(div().size(px(10.0)).rounded_full().bg(rgb(0xffffff))),
                ),
        );

        if let Some(note) = note {
            right = right
                .child(div().w(px(1.0)).h(px(12.0)).bg(rgb(0xd0d0d0)))
                .child(
                    div()
                        .text_color(secondary)
                        .child(format!("Created: {}", format_timestamp(note.created_at))),
                )
                .child(
                    div()
                        .text_color(secondary)
                        .child(format!("Modified: {}", format_timestamp(note.modified_at))),
                );
        }

        div()
            .flex()
            .justify_between()
            .items_center()
            .w_full()
            .px_3()
            .py_1()
            .text_xs()
            .bg(rgb(0xececec))
            .border_t_1()
            .border_color(rgb(0xd0d0d0))
            .child(
                div()
                    .flex()
                    .items_center()
                    .gap_2()
                    .child(
                        div()
                            .id("sidebar-toggle")
                            .px_1()
                            .rounded_md()
                            .cursor_pointer()
                            .text_color(secondary)
                            .hover(|s| s.bg(rgb(0xdddddd)))
                            .when(self.sidebar_visible, |toggle| toggle.bg(rgb(0xe0e0e0)))
                            .on_mouse_down(
                                MouseButton::Left,
                                cx.listener(|view, _: &MouseDownEvent, _window, cx| {
                                    view.toggle_sidebar(cx);
                                }),
                            )
                            .child("☰"),
                    )
                    .child(div().font_weight(FontWeight::BOLD).child(APP_NAME))
                    .child(
                        div()
                            .text_color(secondary)
                            .child(format!("v{}", env!("CARGO_PKG_VERSION"))),
                    ),
            )
            .child(right)
    }
}
