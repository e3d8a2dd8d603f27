//
// lib.rs
//
// Copyright (C) 2022 Posit Software, PBC. All rights reserved.
//
//

pub mod result;
pub mod spawn;
pub mod unwrap;

pub use crate::result::ResultExt;
pub use crate::result::ResultOrLog;

/// Panics in debug builds, logs an error in release builds.
///
/// Use for conditions that indicate a bug in the kernel but that a running
/// session can survive.
#[macro_export]
macro_rules! debug_panic {
    ($($arg:tt)+) => {
        if cfg!(debug_assertions) {
            panic!($($arg)+);
        } else {
            log::error!($($arg)+);
        }
    };
}
