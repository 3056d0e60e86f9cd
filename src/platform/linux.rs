// Linux paths
// Config: $XDG_CONFIG_HOME/tabstate or ~/.config/tabstate
// Data:   $XDG_DATA_HOME/tabstate or ~/.local/share/tabstate

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "tabstate";

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Resolves an XDG base directory, falling back to `default` under `$HOME`.
fn xdg_dir(var: &str, default: &[&str]) -> PathBuf {
    match env::var(var) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join(APP_DIR),
        _ => default
            .iter()
            .fold(home_dir(), |path, part| path.join(part))
            .join(APP_DIR),
    }
}

pub fn get_config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", &[".config"])
}

pub fn get_data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", &[".local", "share"])
}
