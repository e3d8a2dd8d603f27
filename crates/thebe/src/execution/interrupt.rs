/*
 * interrupt.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;
use std::sync::Mutex;

use stdext::debug_panic;

use crate::execution::cancellation::CancellationToken;
use crate::wire::header::JupyterHeader;

/// The execution currently running on the worker
#[derive(Clone, Debug)]
pub struct ActiveExecution {
    /// Header of the `execute_request` being run
    pub header: JupyterHeader,

    /// Cancelled to interrupt the execution
    pub token: CancellationToken,
}

/// Shared slot between the worker, which installs the running execution, and
/// the Control thread, which cancels it. Interrupting never waits on the
/// worker.
#[derive(Clone, Default)]
pub struct InterruptController {
    active: Arc<Mutex<Option<ActiveExecution>>>,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, header: JupyterHeader, token: CancellationToken) {
        let mut active = self.active.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(previous) = active.as_ref() {
            debug_panic!(
                "Execution '{}' started while '{}' is still active",
                header.msg_id,
                previous.header.msg_id
            );
        }
        *active = Some(ActiveExecution { header, token });
    }

    pub fn finish(&self) {
        let mut active = self.active.lock().unwrap_or_else(|err| err.into_inner());
        *active = None;
    }

    /// Cancels the running execution, if any. Returns whether there was one.
    pub fn interrupt(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(|err| err.into_inner());
        match active.as_ref() {
            Some(execution) => {
                log::info!("Interrupting execution '{}'", execution.header.msg_id);
                execution.token.cancel();
                true
            },
            None => {
                log::trace!("Interrupt requested while idle");
                false
            },
        }
    }

    /// The running execution, if any
    pub fn active(&self) -> Option<ActiveExecution> {
        self.active
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_cancels_active_execution() {
        let controller = InterruptController::new();
        assert!(!controller.interrupt());

        let header = JupyterHeader::create(
            String::from("execute_request"),
            String::from("session"),
            String::from("user"),
        );
        let token = CancellationToken::new();
        controller.begin(header.clone(), token.clone());
        assert_eq!(controller.active().unwrap().header, header);

        assert!(controller.interrupt());
        assert!(token.is_cancelled());

        controller.finish();
        assert!(controller.active().is_none());
        assert!(!controller.interrupt());
    }
}
