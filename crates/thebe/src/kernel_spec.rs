/*
 * kernel_spec.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::kernel_dirs;

/// From the Jupyter documentation for [Kernel Specs](https://jupyter-client.readthedocs.io/en/stable/kernels.html#kernel-specs).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct KernelSpec {
    /// List of command line arguments to be used to start the kernel
    pub argv: Vec<String>,

    /// The kernel name as it should be displayed in the UI
    pub display_name: String,

    /// The kernel's language
    pub language: String,

    /// How the frontend should interrupt the kernel. We always want interrupt
    /// requests on the Control channel rather than signals.
    pub interrupt_mode: String,

    /// Environment variables to set for the kernel
    pub env: serde_json::Map<String, serde_json::Value>,
}

impl KernelSpec {
    pub fn new(argv: Vec<String>, display_name: String, language: String) -> Self {
        Self {
            argv,
            display_name,
            language,
            interrupt_mode: String::from("message"),
            env: serde_json::Map::new(),
        }
    }

    /// Installs the kernel spec in the user's Jupyter kernel directory, in a
    /// subfolder named `folder`.
    pub fn install(&self, folder: &str) -> anyhow::Result<()> {
        let Some(kernel_dir) = kernel_dirs::jupyter_kernel_path() else {
            return Err(anyhow::anyhow!("No Jupyter installation directory found."));
        };
        self.install_to(&kernel_dir.join(folder))
    }

    /// Writes `kernel.json` into `path`, creating the folder if needed.
    pub fn install_to(&self, path: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(path)?;
        let dest = path.join("kernel.json");

        let contents = serde_json::to_string_pretty(self)?;
        log::trace!("Installing kernelspec JSON to {dest:?}: {contents}");

        let mut file = File::create(dest)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }
}
