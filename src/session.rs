//! UI state carried across restarts.
//!
//! The file may also hold a gutter width written by an older build. It is
//! read so the file round-trips, but only ever handed to
//! [`GutterGeometry::restore`](crate::gutter::GutterGeometry::restore), which
//! discards it.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::gutter::ruler::SavedGutterState;
use crate::util::data_dir;

pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub active_note: Option<Uuid>,
    #[serde(default)]
    pub window: Option<WindowSize>,
    #[serde(default)]
    pub gutter: SavedGutterState,
}

pub fn default_path() -> PathBuf {
    data_dir().join(SESSION_FILE)
}

impl Session {
    /// Missing or unreadable files give an empty session.
    pub fn load(path: &Path) -> Self {
        let Ok(raw) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&raw) {
            Ok(session) => {
                debug!(target: "session", path = %path.display(), "session_restored");
                session
            }
            Err(e) => {
                warn!(target: "session", path = %path.display(), error = %e, "session_unreadable");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        debug!(target: "session", path = %path.display(), "session_saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gutter::GUTTER_WIDTH;
    use crate::gutter::ruler::GutterGeometry;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join(SESSION_FILE);
        let session = Session {
            active_note: Some(Uuid::new_v4()),
            window: Some(WindowSize {
                width: 900.0,
                height: 600.0,
            }),
            gutter: SavedGutterState { width: Some(40.0) },
        };
        session.save(&path).unwrap();
        assert_eq!(Session::load(&path), session);
    }

    #[test]
    fn garbage_file_gives_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Session::load(&path), Session::default());
    }

    #[test]
    fn restored_gutter_width_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);
        std::fs::write(&path, r#"{"gutter":{"width":72.5}}"#).unwrap();

        let session = Session::load(&path);
        assert_eq!(session.gutter.width, Some(72.5));

        let mut geometry = GutterGeometry::new();
        geometry.restore(&session.gutter);
        assert_eq!(geometry.width(), GUTTER_WIDTH);
    }
}
