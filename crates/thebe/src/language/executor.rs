/*
 * executor.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use crate::display::Renderer;
use crate::execution::context::ExecutionContext;
use crate::wire::display_data::Rendering;
use crate::wire::exception::Exception;
use crate::wire::execute_request::ExecuteRequest;
use crate::wire::payload::Payload;

/// What a successful execution produced
#[derive(Debug, Clone, Default)]
pub struct ExecuteResponse {
    /// The value of the code, if it has one worth displaying
    pub result: Option<Rendering>,

    /// Actions for the frontend, attached to the `execute_reply`
    pub payload: Vec<Payload>,
}

/// How an execution ended
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    Completed(ExecuteResponse),

    /// The code raised an error. Published on IOPub and returned in an error
    /// reply; the kernel keeps serving.
    Failed(Exception),

    /// The code stopped early because of an interrupt
    Interrupted,
}

/// The language interpreter. Runs on the execution worker thread, one request
/// at a time, in the order the requests arrived.
pub trait Executor: Send {
    /// Runs the code of `req`.
    ///
    /// Output goes through `context`, which also gives access to input
    /// requests and to the cancellation token. Long-running code should check
    /// `context.is_cancelled()` and return `ExecuteOutcome::Interrupted`.
    ///
    /// `Err(Error::Interrupted)` is treated as an interrupt, and
    /// `Err(Error::StdinNotAllowed)` as a failure of the code. Any other
    /// error, like a panic, is a fault that stops the worker.
    fn execute(
        &mut self,
        req: &ExecuteRequest,
        context: &ExecutionContext,
    ) -> crate::Result<ExecuteOutcome>;

    /// Called once before the first execution with the renderer the executor
    /// can use to publish displays and deferred updates at any time.
    fn register_renderer(&mut self, renderer: Renderer);
}
