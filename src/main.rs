use anyhow::Result;
use gpui::{
    App, Application, Bounds, KeyBinding, Menu, MenuItem, TitlebarOptions, WindowBounds,
    WindowOptions, prelude::*, px, size,
};
use std::rc::Rc;
use std::sync::Once;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod components;
mod config;
mod error;
mod gutter;
mod models;
mod session;
mod util;

use components::{DeleteNote, NewNote, NoteApp, Quit, ToggleSidebar, ToggleWordWrap};
use config::{Config, WindowConfig};
use models::{Database, NoteRepository};
use session::Session;

const LOG_FILE: &str = "scribblepad.log";

fn configure_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let log_dir = util::log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Ok(Some(guard)),
        // A subscriber is already installed; dropping the guard shuts the writer down.
        Err(_) => Ok(None),
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn open_store(config: &Config) -> Rc<dyn NoteRepository> {
    let path = config.database_path();
    let db = Database::new(&path).or_else(|e| {
        error!(target: "store", path = %path.display(), error = %e, "open_failed_using_memory");
        Database::in_memory()
    });
    match db {
        Ok(db) => Rc::new(db.notes),
        Err(e) => {
            error!(target: "store", error = %e, "in_memory_store_failed");
            eprintln!("ScribblePad could not open a note store: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    let config = config::load_from(None).unwrap_or_default();
    let _log_guard = match configure_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("logging disabled: {e}");
            None
        }
    };
    install_panic_hook();
    info!(target: "app", version = env!("CARGO_PKG_VERSION"), "starting");

    let repo = open_store(&config);
    let session_path = session::default_path();
    let session = Session::load(&session_path);

    Application::new().run(move |cx: &mut App| {
        cx.on_action(|_: &Quit, cx| cx.quit());
        // The window hides on close; the dock icon brings it back.
        cx.on_reopen(|cx| cx.activate(true));
        cx.bind_keys([
            KeyBinding::new("cmd-n", NewNote, None),
            KeyBinding::new("cmd-backspace", DeleteNote, None),
            KeyBinding::new("alt-z", ToggleWordWrap, None),
            KeyBinding::new("cmd-[", ToggleSidebar, None),
            KeyBinding::new("cmd-q", Quit, None),
        ]);
        cx.set_menus(vec![
            Menu {
                name: "ScribblePad".into(),
                items: vec![MenuItem::action("Quit ScribblePad", Quit)],
            },
            Menu {
                name: "Notes".into(),
                items: vec![
                    MenuItem::action("New Note", NewNote),
                    MenuItem::action("Delete Note", DeleteNote),
                    MenuItem::separator(),
                    MenuItem::action("Toggle Word Wrap", ToggleWordWrap),
                    MenuItem::action("Toggle Sidebar", ToggleSidebar),
                ],
            },
        ]);

        let (width, height) = session
            .window
            .map(|window| (window.width, window.height))
            .unwrap_or((config.window.width, config.window.height));
        let window_size = size(
            px(width.max(WindowConfig::MIN_WIDTH)),
            px(height.max(WindowConfig::MIN_HEIGHT)),
        );
        let bounds = Bounds::centered(None, window_size, cx);

        let editor_config = config.editor.clone();
        let opened = cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                titlebar: Some(TitlebarOptions {
                    title: Some("ScribblePad".into()),
                    ..Default::default()
                }),
                window_min_size: Some(size(
                    px(WindowConfig::MIN_WIDTH),
                    px(WindowConfig::MIN_HEIGHT),
                )),
                ..Default::default()
            },
            move |window, cx| {
                cx.new(|cx| {
                    NoteApp::new(repo, session, session_path, &editor_config, window, cx)
                })
            },
        );
        if let Err(e) = opened {
            error!(target: "app", error = %e, "open_window_failed");
            cx.quit();
            return;
        }

        cx.activate(true);
    });
}
