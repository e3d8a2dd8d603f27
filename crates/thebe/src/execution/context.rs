/*
 * context.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use crossbeam::channel::bounded;
use crossbeam::channel::Sender;
use crossbeam::select;

use crate::display::registry::DisplayHandle;
use crate::display::registry::DisplayRegistry;
use crate::error::Error;
use crate::execution::cancellation::CancellationToken;
use crate::socket::iopub::IOPubMessage;
use crate::wire::display_data::Rendering;
use crate::wire::header::JupyterHeader;
use crate::wire::input_request::InputRequest;
use crate::wire::input_request::ShellInputRequest;
use crate::wire::originator::Originator;
use crate::wire::stream::Stream;
use crate::wire::stream::StreamOutput;

/// What an executor can do while running a request: emit output, publish
/// displays, ask the user for input, and observe interrupts.
pub struct ExecutionContext {
    originator: Originator,
    execution_count: u32,
    allow_stdin: bool,
    cancellation: CancellationToken,
    iopub_tx: Sender<IOPubMessage>,
    stdin_tx: Sender<ShellInputRequest>,
    registry: DisplayRegistry,
}

impl ExecutionContext {
    pub(crate) fn new(
        originator: Originator,
        execution_count: u32,
        allow_stdin: bool,
        cancellation: CancellationToken,
        iopub_tx: Sender<IOPubMessage>,
        stdin_tx: Sender<ShellInputRequest>,
        registry: DisplayRegistry,
    ) -> Self {
        Self {
            originator,
            execution_count,
            allow_stdin,
            cancellation,
            iopub_tx,
            stdin_tx,
            registry,
        }
    }

    /// The execution count of this request. For silent requests, the count of
    /// the last visible one.
    pub fn execution_count(&self) -> u32 {
        self.execution_count
    }

    /// Header of the `execute_request` being run
    pub fn header(&self) -> &JupyterHeader {
        &self.originator.header
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Writes to stdout or stderr. Consecutive writes are coalesced.
    pub fn stream(&self, name: Stream, text: &str) -> crate::Result<()> {
        let output = StreamOutput {
            name,
            text: String::from(text),
        };
        self.iopub_tx
            .send(IOPubMessage::Stream(Some(self.header().clone()), output))?;
        Ok(())
    }

    /// Publishes a new display attached to this request
    pub fn display(&self, rendering: Rendering) -> crate::Result<DisplayHandle> {
        self.registry.publish(rendering, Some(self.header().clone()))
    }

    pub fn registry(&self) -> &DisplayRegistry {
        &self.registry
    }

    /// Prompts the client that sent the request for input and blocks until
    /// it replies.
    ///
    /// Fails with `Error::StdinNotAllowed` if the request was sent with
    /// `allow_stdin: false`, and with `Error::Interrupted` if the execution is
    /// interrupted while waiting.
    pub fn read_input(&self, prompt: &str, password: bool) -> crate::Result<String> {
        if !self.allow_stdin {
            return Err(Error::StdinNotAllowed);
        }
        self.cancellation.check()?;

        let (reply_tx, reply_rx) = bounded(1);
        let request = ShellInputRequest {
            originator: self.originator.clone(),
            request: InputRequest {
                prompt: String::from(prompt),
                password,
            },
            reply_tx,
            cancellation: self.cancellation.clone(),
        };
        if let Err(err) = self.stdin_tx.send(request) {
            return Err(Error::SendError(format!("{err:?}")));
        }

        select! {
            recv(reply_rx) -> reply => match reply {
                Ok(Ok(reply)) => Ok(reply.value),
                Ok(Err(err)) => Err(err),
                Err(err) => Err(Error::from(err)),
            },
            recv(self.cancellation.receiver()) -> _ => Err(Error::Interrupted),
        }
    }
}
