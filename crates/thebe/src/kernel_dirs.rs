/*
 * kernel_dirs.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::env;
use std::path::PathBuf;

/// Returns the path where Jupyter kernels should be/are installed.
pub fn jupyter_kernel_path() -> Option<PathBuf> {
    jupyter_dir().map(|dir| dir.join("kernels"))
}

/// Returns the root Jupyter directory; uses the `JUPYTER_PATH` environment
/// variable if set, the platform data directory if not.
fn jupyter_dir() -> Option<PathBuf> {
    if let Ok(envpath) = env::var("JUPYTER_PATH") {
        // `JUPYTER_PATH` may hold several directories; the first one wins
        let first = env::split_paths(&envpath).next()?;
        return Some(first);
    }
    jupyter_data_dir()
}

#[cfg(not(target_os = "macos"))]
fn jupyter_data_dir() -> Option<PathBuf> {
    // On Linux this is `$XDG_DATA_HOME/jupyter`, on Windows `%APPDATA%\jupyter`
    dirs::data_dir().map(|dir| dir.join("jupyter"))
}

#[cfg(target_os = "macos")]
fn jupyter_data_dir() -> Option<PathBuf> {
    // Jupyter does not use `~/Library/Application Support` on macOS
    dirs::home_dir().map(|dir| dir.join("Library").join("Jupyter"))
}
