use gpui::{
    App, Entity, FocusHandle, Focusable, FontWeight, MouseButton, MouseDownEvent, Pixels, Render,
    Size, Subscription, Window, actions, div, prelude::*, px, rgb,
};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::components::line_number_gutter::LineNumberGutter;
use crate::components::note_editor::{EditorEvent, NoteEditor};
use crate::components::note_list::NoteList;
use crate::components::status_bar::{APP_NAME, format_short_date};
use crate::config::EditorConfig;
use crate::gutter::{ContainerWidth, GUTTER_WIDTH, WordWrapSwitch, WrapMode};
use crate::models::{Note, NoteRepository};
use crate::session::{Session, WindowSize};

actions!(
    scribblepad,
    [NewNote, DeleteNote, ToggleWordWrap, ToggleSidebar, Quit]
);

const SIDEBAR_WIDTH: f32 = 220.0;

pub struct NoteApp {
    repo: Rc<dyn NoteRepository>,
    pub(super) notes: NoteList,
    pub(super) wrap_switch: WordWrapSwitch,
    editor: Entity<NoteEditor>,
    session: Session,
    session_path: PathBuf,
    window_size: Option<Size<Pixels>>,
    pub(super) sidebar_visible: bool,
    focus_handle: FocusHandle,
    _subscriptions: Vec<Subscription>,
}

/// Loads the note list, creating a first note when the store is empty.
fn initial_notes(repo: &dyn NoteRepository, session: &Session) -> NoteList {
    let notes = repo.list().unwrap_or_else(|e| {
        error!(target: "app", error = %e, "list_notes_failed");
        Vec::new()
    });
    info!(target: "app", count = notes.len(), "notes_loaded");

    let mut list = NoteList::new(notes);
    if list.is_empty() {
        match repo.create() {
            Ok(note) => {
                info!(target: "app", id = %note.id, "created_first_note");
                list.insert_front(note);
            }
            Err(e) => error!(target: "app", error = %e, "create_first_note_failed"),
        }
        return list;
    }

    let restored = session.active_note.is_some_and(|id| list.select(id));
    if !restored {
        list.select_first();
    }
    list
}

/// Selects `id` and refreshes its cached copy from the store. Returns the
/// note to show, or `None` if it is unknown or already showing.
fn select_note(repo: &dyn NoteRepository, list: &mut NoteList, id: Uuid) -> Option<Note> {
    if list.active_id() == Some(id) {
        return None;
    }
    if !list.select(id) {
        warn!(target: "app", id = %id, "select_unknown_note");
        return None;
    }
    match repo.get(id) {
        Ok(fresh) => {
            list.replace(fresh);
        }
        Err(e) => warn!(target: "app", id = %id, error = %e, "reload_note_failed"),
    }
    list.active_note().cloned()
}

/// Records an edit and writes it through. Returns whether the store accepted it.
fn save_edit(repo: &dyn NoteRepository, note: &mut Note, content: String) -> bool {
    note.set_content(content);
    match repo.update(note) {
        Ok(()) => true,
        Err(e) => {
            error!(target: "app", id = %note.id, error = %e, "save_note_failed");
            false
        }
    }
}

/// Stores the wrap mode the switch landed on as the note's flag.
fn save_word_wrap(repo: &dyn NoteRepository, note: &mut Note, mode: WrapMode) -> bool {
    note.word_wrap = mode.is_wrapped();
    note.touch();
    match repo.update(note) {
        Ok(()) => true,
        Err(e) => {
            error!(target: "app", id = %note.id, error = %e, "save_word_wrap_failed");
            false
        }
    }
}

fn window_title(notes: &NoteList) -> String {
    notes
        .active_note()
        .map(|note| note.title().to_string())
        .unwrap_or_else(|| APP_NAME.to_string())
}

impl NoteApp {
    pub fn new(
        repo: Rc<dyn NoteRepository>,
        session: Session,
        session_path: PathBuf,
        editor_config: &EditorConfig,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let notes = initial_notes(repo.as_ref(), &session);
        let mode = notes
            .active_note()
            .map(|note| WrapMode::from_flag(note.word_wrap))
            .unwrap_or_default();
        let wrap_switch = WordWrapSwitch::new(mode);

        let editor = cx.new(|cx| {
            let mut editor = NoteEditor::new(editor_config, cx);
            editor
                .gutter_mut()
                .geometry_mut()
                .restore(&session.gutter);
            wrap_switch.apply(&mut editor);
            if let Some(note) = notes.active_note() {
                editor.set_content(note.content.clone(), cx);
            }
            editor
        });
        editor.read(cx).focus(window);

        // Closing the window only hides the app; Quit is the way out.
        window.on_window_should_close(cx, |_window, cx| {
            debug!(target: "app", "window_close_hides");
            cx.hide();
            false
        });

        let subscriptions = vec![
            cx.subscribe(&editor, Self::on_editor_event),
            cx.on_app_quit(|this, cx| {
                this.save_session(cx);
                async {}
            }),
        ];

        Self {
            repo,
            notes,
            wrap_switch,
            editor,
            session,
            session_path,
            window_size: None,
            sidebar_visible: true,
            focus_handle: cx.focus_handle(),
            _subscriptions: subscriptions,
        }
    }

    pub fn add_note(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let note = match self.repo.create() {
            Ok(note) => note,
            Err(e) => {
                error!(target: "app", error = %e, "create_note_failed");
                return;
            }
        };
        info!(target: "app", id = %note.id, "note_added");

        self.notes.insert_front(note.clone());
        self.show_note(&note, cx);
        self.editor.read(cx).focus(window);
        cx.notify();
    }

    pub fn delete_active_note(&mut self, cx: &mut Context<Self>) {
        if let Some(id) = self.notes.active_id() {
            self.delete_note(id, cx);
        }
    }

    pub fn delete_note(&mut self, id: Uuid, cx: &mut Context<Self>) {
        let was_active = self.notes.active_id() == Some(id);
        if let Err(e) = self.repo.delete(id) {
            error!(target: "app", id = %id, error = %e, "delete_note_failed");
            return;
        }
        info!(target: "app", id = %id, "note_deleted");

        self.notes.remove(id);
        if was_active {
            match self.notes.active_note().cloned() {
                Some(next) => self.show_note(&next, cx),
                None => {
                    self.editor
                        .update(cx, |editor, cx| editor.set_content("", cx));
                }
            }
        }
        self.save_session(cx);
        cx.notify();
    }

    /// Selects `id`, reloading it from the store so the editor shows the
    /// persisted copy.
    pub fn set_active_note(&mut self, id: Uuid, cx: &mut Context<Self>) {
        let Some(note) = select_note(self.repo.as_ref(), &mut self.notes, id) else {
            return;
        };
        debug!(target: "app", id = %id, "note_selected");
        self.show_note(&note, cx);
        self.save_session(cx);
        cx.notify();
    }

    fn show_note(&mut self, note: &Note, cx: &mut Context<Self>) {
        let content = note.content.clone();
        let word_wrap = note.word_wrap;
        let switch = &mut self.wrap_switch;
        self.editor.update(cx, |editor, cx| {
            editor.set_content(content, cx);
            switch.sync_with_note(word_wrap, editor);
            cx.notify();
        });
    }

    fn on_editor_event(
        &mut self,
        _editor: Entity<NoteEditor>,
        event: &EditorEvent,
        cx: &mut Context<Self>,
    ) {
        match event {
            EditorEvent::ContentChanged(content) => {
                let Some(note) = self.notes.active_note_mut() else {
                    return;
                };
                save_edit(self.repo.as_ref(), note, content.clone());
                cx.notify();
            }
        }
    }

    pub(super) fn toggle_word_wrap(&mut self, _window: &mut Window, cx: &mut Context<Self>) {
        let Some(note) = self.notes.active_note_mut() else {
            return;
        };

        let switch = &mut self.wrap_switch;
        let mode = self.editor.update(cx, |editor, cx| {
            let mode = switch.toggle(editor);
            cx.notify();
            mode
        });

        save_word_wrap(self.repo.as_ref(), note, mode);
        cx.notify();
    }

    pub(super) fn toggle_sidebar(&mut self, cx: &mut Context<Self>) {
        self.sidebar_visible = !self.sidebar_visible;
        debug!(target: "app", visible = self.sidebar_visible, "sidebar_toggled");
        cx.notify();
    }

    fn save_session(&mut self, cx: &App) {
        self.session.active_note = self.notes.active_id();
        self.session.gutter = self.editor.read(cx).gutter().geometry().saved_state();
        if let Some(size) = self.window_size {
            self.session.window = Some(WindowSize {
                width: size.width.0,
                height: size.height.0,
            });
        }
        if let Err(e) = self.session.save(&self.session_path) {
            warn!(target: "session", error = %e, "session_save_failed");
        }
    }

    fn render_sidebar(&self, cx: &mut Context<Self>) -> impl IntoElement {
        let active_note_id = self.notes.active_id();
        let has_selection = active_note_id.is_some();

        let header_button = |id: &'static str, label: &'static str| {
            div()
                .id(id)
                .size(px(24.0))
                .flex()
                .justify_center()
                .items_center()
                .rounded_md()
                .cursor_pointer()
                .text_color(rgb(0x505050))
                .hover(|s| s.bg(rgb(0xdddddd)))
                .child(label)
        };

        div()
            .flex()
            .flex_col()
            .flex_none()
            .w(px(SIDEBAR_WIDTH))
            .h_full()
            .bg(rgb(0xf0f0f0))
            .border_r_1()
            .border_color(rgb(0xe0e0e0))
            .child(
                div()
                    .flex()
                    .justify_between()
                    .items_center()
                    .px_3()
                    .py_2()
                    .child(div().font_weight(FontWeight::BOLD).child("Notes"))
                    .child(
                        div()
                            .flex()
                            .gap_1()
                            .when(has_selection, |buttons| {
                                buttons.child(header_button("delete-note", "🗑").on_mouse_down(
                                    MouseButton::Left,
                                    cx.listener(|view, _: &MouseDownEvent, _window, cx| {
                                        view.delete_active_note(cx);
                                    }),
                                ))
                            })
                            .child(header_button("add-note", "+").on_mouse_down(
                                MouseButton::Left,
                                cx.listener(|view, _: &MouseDownEvent, window, cx| {
                                    view.add_note(window, cx);
                                }),
                            )),
                    ),
            )
            .child(
                div()
                    .id("note-list")
                    .flex()
                    .flex_col()
                    .flex_grow()
                    .overflow_y_scroll()
                    .px_2()
                    .children(self.notes.notes().iter().map(|note| {
                        let is_active = active_note_id == Some(note.id);
                        let note_id = note.id;

                        div()
                            .id(gpui::ElementId::Name(note.id.to_string().into()))
                            .flex()
                            .flex_col()
                            .px_2()
                            .py_1()
                            .rounded_md()
                            .cursor_pointer()
                            .when(is_active, |row| row.bg(rgb(0xdddddd)))
                            .on_mouse_down(
                                MouseButton::Left,
                                cx.listener(move |view, _: &MouseDownEvent, _window, cx| {
                                    view.set_active_note(note_id, cx);
                                }),
                            )
                            .child(
                                div()
                                    .truncate()
                                    .font_weight(if is_active {
                                        FontWeight::BOLD
                                    } else {
                                        FontWeight::NORMAL
                                    })
                                    .child(note.title().to_string()),
                            )
                            .child(
                                div()
                                    .text_xs()
                                    .text_color(rgb(0x808080))
                                    .child(format_short_date(note.modified_at)),
                            )
                    })),
            )
    }

    fn render_detail(&self, cx: &mut Context<Self>) -> impl IntoElement {
        if self.notes.active_note().is_none() {
            return div()
                .flex()
                .flex_grow()
                .justify_center()
                .items_center()
                .text_color(rgb(0x808080))
                .child("No Note Selected");
        }

        let wrapped = self.wrap_switch.config().width == ContainerWidth::TracksViewport;
        let scroll_handle = self.editor.read(cx).scroll_handle().clone();

        div()
            .relative()
            .flex_grow()
            .h_full()
            .overflow_hidden()
            .child(
                div()
                    .id("editor-scroll")
                    .absolute()
                    .top_0()
                    .bottom_0()
                    .right_0()
                    .left(px(GUTTER_WIDTH))
                    .when(wrapped, |scroll| scroll.overflow_y_scroll())
                    .when(!wrapped, |scroll| scroll.overflow_scroll())
                    .track_scroll(&scroll_handle)
                    .child(self.editor.clone()),
            )
            // Painted last so it sees the editor's layout for this frame.
            .child(
                div()
                    .absolute()
                    .top_0()
                    .bottom_0()
                    .left_0()
                    .w(px(GUTTER_WIDTH))
                    .child(LineNumberGutter::new(self.editor.clone())),
            )
    }
}

impl Focusable for NoteApp {
    fn focus_handle(&self, _cx: &App) -> FocusHandle {
        self.focus_handle.clone()
    }
}

impl Render for NoteApp {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.window_size = Some(window.viewport_size());
        window.set_window_title(&window_title(&self.notes));

        div()
            .flex()
            .flex_col()
            .size_full()
            .bg(rgb(0xf5f5f5))
            .track_focus(&self.focus_handle)
            .on_action(cx.listener(|view, _: &NewNote, window, cx| view.add_note(window, cx)))
            .on_action(cx.listener(|view, _: &DeleteNote, _window, cx| {
                view.delete_active_note(cx)
            }))
            .on_action(cx.listener(|view, _: &ToggleWordWrap, window, cx| {
                view.toggle_word_wrap(window, cx)
            }))
            .on_action(cx.listener(|view, _: &ToggleSidebar, _window, cx| {
                view.toggle_sidebar(cx)
            }))
            .child(
                div()
                    .flex()
                    .flex_grow()
                    .min_h_0()
                    .when(self.sidebar_visible, |body| body.child(self.render_sidebar(cx)))
                    .child(self.render_detail(cx)),
            )
            .child(self.render_status_bar(cx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Database;

    fn repo() -> Database {
        Database::in_memory().unwrap()
    }

    #[test]
    fn empty_store_gets_a_first_note() {
        let db = repo();
        let list = initial_notes(&db.notes, &Session::default());
        assert_eq!(list.notes().len(), 1);
        assert!(list.active_note().is_some());
        assert_eq!(db.notes.list().unwrap().len(), 1);
    }

    #[test]
    fn session_selection_is_restored() {
        let db = repo();
        let older = db.notes.create().unwrap();
        let _newer = db.notes.create().unwrap();
        let session = Session {
            active_note: Some(older.id),
            ..Session::default()
        };
        let list = initial_notes(&db.notes, &session);
        assert_eq!(list.active_id(), Some(older.id));
    }

    #[test]
    fn stale_session_selection_falls_back_to_first() {
        let db = repo();
        db.notes.create().unwrap();
        let session = Session {
            active_note: Some(Uuid::new_v4()),
            ..Session::default()
        };
        let list = initial_notes(&db.notes, &session);
        assert_eq!(list.active_id(), Some(list.notes()[0].id));
    }

    #[derive(Default)]
    struct CountingHost {
        reconfigured: usize,
    }

    impl crate::gutter::WrapHost for CountingHost {
        fn configure_container(&mut self, _config: crate::gutter::ContainerConfig) {
            self.reconfigured += 1;
        }

        fn force_layout(&mut self) {}

        fn invalidate_gutter(&mut self) {}
    }

    /// A stored note last modified long ago.
    fn stale_note(db: &Database) -> Note {
        let mut note = db.notes.create().unwrap();
        note.modified_at = 1;
        db.notes.update(&note).unwrap();
        note
    }

    #[test]
    fn edit_updates_content_and_modified_time_and_saves() {
        let db = repo();
        let mut note = stale_note(&db);
        assert!(save_edit(&db.notes, &mut note, "Groceries\n- eggs".into()));
        assert_eq!(note.content, "Groceries\n- eggs");
        assert!(note.modified_at > 1);

        let stored = db.notes.get(note.id).unwrap();
        assert_eq!(stored.content, "Groceries\n- eggs");
        assert_eq!(stored.modified_at, note.modified_at);
        assert_eq!(stored.created_at, note.created_at);
    }

    #[test]
    fn wrap_toggle_flips_flag_touches_and_saves() {
        let db = repo();
        let mut note = stale_note(&db);
        assert!(note.word_wrap);

        let mut host = CountingHost::default();
        let mut switch = WordWrapSwitch::new(WrapMode::from_flag(note.word_wrap));
        let mode = switch.toggle(&mut host);
        assert!(save_word_wrap(&db.notes, &mut note, mode));
        assert!(!note.word_wrap);
        assert!(note.modified_at > 1);

        let stored = db.notes.get(note.id).unwrap();
        assert!(!stored.word_wrap);
        assert_eq!(stored.modified_at, note.modified_at);
    }

    #[test]
    fn selecting_note_with_other_wrap_flag_resyncs_switch() {
        let db = repo();
        let wrapped = db.notes.create().unwrap();
        let mut unwrapped = db.notes.create().unwrap();
        unwrapped.word_wrap = false;
        db.notes.update(&unwrapped).unwrap();

        let mut list = NoteList::new(db.notes.list().unwrap());
        assert!(list.select(wrapped.id));
        let mut switch = WordWrapSwitch::new(WrapMode::Wrapped);
        let mut host = CountingHost::default();

        let shown = select_note(&db.notes, &mut list, unwrapped.id).unwrap();
        assert!(!shown.word_wrap);
        assert!(switch.sync_with_note(shown.word_wrap, &mut host));
        assert_eq!(switch.mode(), WrapMode::Unwrapped);
        assert_eq!(host.reconfigured, 1);

        // Same flag again: nothing to redo.
        assert!(!switch.sync_with_note(shown.word_wrap, &mut host));
        assert_eq!(host.reconfigured, 1);
    }

    #[test]
    fn selecting_active_note_keeps_it_in_place() {
        let db = repo();
        let note = db.notes.create().unwrap();
        let mut list = NoteList::new(db.notes.list().unwrap());
        assert!(list.select(note.id));
        list.active_note_mut().unwrap().content = "unsaved draft".into();

        assert!(select_note(&db.notes, &mut list, note.id).is_none());
        assert_eq!(list.active_note().unwrap().content, "unsaved draft");
    }

    #[test]
    fn selecting_unknown_note_changes_nothing() {
        let db = repo();
        let note = db.notes.create().unwrap();
        let mut list = NoteList::new(db.notes.list().unwrap());
        assert!(list.select(note.id));

        assert!(select_note(&db.notes, &mut list, Uuid::new_v4()).is_none());
        assert_eq!(list.active_id(), Some(note.id));
    }

    #[test]
    fn window_title_follows_active_note() {
        let db = repo();
        let mut note = db.notes.create().unwrap();
        note.set_content("\nTrip plan\nday one".into());
        db.notes.update(&note).unwrap();

        let mut list = NoteList::new(Vec::new());
        assert_eq!(window_title(&list), APP_NAME);

        list.insert_front(note);
        assert_eq!(window_title(&list), "Trip plan");
    }
}
