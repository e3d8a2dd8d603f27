/*
 * lib.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

pub mod connection_file;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod execution;
pub mod fixtures;
pub mod kernel;
pub mod kernel_dirs;
pub mod kernel_spec;
pub mod language;
pub mod session;
pub mod socket;
pub mod wire;

pub use error::Error;
pub type Result<T> = std::result::Result<T, error::Error>;
