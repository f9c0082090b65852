//! Path helpers for Mnemos
//!
//! Config and session state follow the XDG base directory layout.

use std::path::PathBuf;

const APP_DIR: &str = "mnemos";

/// Config file path
///
/// Priority:
/// 1. $MNEMOS_CONFIG (explicit override)
/// 2. $XDG_CONFIG_HOME/mnemos/config.toml (or the platform equivalent)
/// 3. ./mnemos.toml when no config directory can be resolved
pub fn config_file() -> PathBuf {
    if let Ok(path) = std::env::var("MNEMOS_CONFIG") {
        return PathBuf::from(path);
    }

    match dirs::config_dir() {
        Some(dir) => dir.join(APP_DIR).join("config.toml"),
        None => PathBuf::from("mnemos.toml"),
    }
}

/// Directory holding the signed-in session
///
/// Priority:
/// 1. $MNEMOS_STATE_DIR (explicit override, used by tests)
/// 2. $XDG_STATE_HOME/mnemos
/// 3. ~/.local/state/mnemos
pub fn state_dir() -> PathBuf {
    if let Ok(path) = std::env::var("MNEMOS_STATE_DIR") {
        return PathBuf::from(path);
    }

    if let Some(dir) = dirs::state_dir() {
        return dir.join(APP_DIR);
    }

    match dirs::home_dir() {
        Some(home) => home.join(".local/state").join(APP_DIR),
        None => std::env::temp_dir().join(APP_DIR),
    }
}

/// Session file path
pub fn session_file() -> PathBuf {
    state_dir().join("session.json")
}
