/*
 * publisher.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use stdext::result::ResultOrLog;
use stdext::spawn;

use crate::display::registry::DisplayHandle;
use crate::wire::display_data::Rendering;

/// Runs background computations, each on its own thread, and pushes their
/// result as an update of a display when they complete. Completion order is
/// independent of any running execution.
#[derive(Clone, Default)]
pub struct UpdatePublisher {
    outstanding: Arc<AtomicUsize>,
}

impl UpdatePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the new content of `handle` in the background
    pub fn spawn<F>(&self, handle: DisplayHandle, computation: F)
    where
        F: FnOnce() -> Rendering + Send + 'static,
    {
        let outstanding = self.outstanding.clone();
        outstanding.fetch_add(1, Ordering::SeqCst);

        let name = format!("display-update-{}", handle.display_id());
        spawn!(name, move || {
            match catch_unwind(AssertUnwindSafe(computation)) {
                Ok(rendering) => handle
                    .update(rendering)
                    .or_log_warning("Could not publish display update"),
                Err(_) => log::error!(
                    "Background computation for display '{}' panicked",
                    handle.display_id()
                ),
            }
            outstanding.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Number of computations still running
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}
