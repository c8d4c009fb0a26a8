use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where the tracing log goes; the terminal itself belongs to the TUI.
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("hark");
            Some(state_dir.join("hark.log"))
        } else {
            ProjectDirs::from("", "", "hark")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("hark.log"))
        }
    }
}
