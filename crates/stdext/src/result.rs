//
// result.rs
//
// Copyright (C) 2023 Posit Software, PBC. All rights reserved.
//
//

use std::fmt::Debug;

pub trait ResultExt<T, E> {
    /// Calls the provided closure with the contained error (if [`Err`]).
    ///
    /// Consumes the Result, unlike `inspect_err()` which propagates it and
    /// still requires you to handle the Result in some way.
    fn on_err<F: FnOnce(E)>(self, f: F);
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn on_err<F: FnOnce(E)>(self, f: F) {
        if let Err(e) = self {
            f(e);
        }
    }
}

/// Logs and discards the error of a fallible operation whose failure must
/// not interrupt the caller, typically a send to a peer thread.
pub trait ResultOrLog<T, E> {
    fn or_log_warning(self, prefix: &str);
    fn or_log_error(self, prefix: &str);
}

impl<T, E: Debug> ResultOrLog<T, E> for Result<T, E> {
    fn or_log_warning(self, prefix: &str) {
        if let Err(err) = self {
            log::warn!("{prefix}: {err:?}");
        }
    }

    fn or_log_error(self, prefix: &str) {
        if let Err(err) = self {
            log::error!("{prefix}: {err:?}");
        }
    }
}
