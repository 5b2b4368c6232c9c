use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "ScribblePad", "ScribblePad")
}

fn home_fallback() -> PathBuf {
    let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home_dir.join(".scribblepad")
}

/// Where the note store, session file and logs live.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(home_fallback)
}

pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .or_else(|| dirs::config_dir().map(|dir| dir.join("scribblepad")))
        .unwrap_or_else(home_fallback)
}

pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}
