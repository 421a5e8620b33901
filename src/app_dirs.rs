use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_NAME: &str = "typomaster";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Result history lives under `$HOME/.local/state/typomaster`.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME);
            Some(state_dir.join("results.db"))
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().join("results.db"))
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|pd| pd.config_dir().join("config.json"))
    }
}
