// Platform abstraction
// Provides the per-OS directories where settings and tab-state files live.
//
// Uses `cfg(target_os)` to select the platform implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `~/.config/tabstate` (or `$XDG_CONFIG_HOME/tabstate`)
/// - **macOS**: `~/Library/Application Support/TabState`
/// - **Windows**: `%APPDATA%/TabState`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific data directory.
///
/// - **Linux**: `~/.local/share/tabstate` (or `$XDG_DATA_HOME/tabstate`)
/// - **macOS**: `~/Library/Application Support/TabState/Data`
/// - **Windows**: `%LOCALAPPDATA%/TabState`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}
