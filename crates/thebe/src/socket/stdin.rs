/*
 * stdin.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use crossbeam::channel::Receiver;
use crossbeam::select;
use log::info;
use log::trace;
use log::warn;

use crate::error::Error;
use crate::execution::cancellation::CancellationToken;
use crate::socket::socket::Socket;
use crate::wire::input_reply::InputReply;
use crate::wire::input_request::ShellInputRequest;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::Message;

/// How often to check for interrupts while waiting for an input reply
const POLL_INTERVAL_MS: i64 = 10;

pub struct Stdin {
    /// The Stdin socket
    socket: Socket,

    /// Input requests from running executions
    request_rx: Receiver<ShellInputRequest>,

    /// Cancelled when the kernel shuts down
    shutdown: CancellationToken,
}

impl Stdin {
    pub fn new(
        socket: Socket,
        request_rx: Receiver<ShellInputRequest>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            socket,
            request_rx,
            shutdown,
        }
    }

    /// Listens for input requests from executions. For each one:
    ///
    /// 1. Send an `input_request` to the client that sent the execute request.
    /// 2. Wait for its `input_reply`, or for the execution to be interrupted.
    /// 3. Deliver the reply (or `Error::Interrupted`) to the execution.
    pub fn listen(&self) {
        loop {
            let req = select! {
                recv(self.request_rx) -> req => match req {
                    Ok(req) => req,
                    Err(_) => return,
                },
                recv(self.shutdown.receiver()) -> _ => return,
            };

            let result = match self.process_request(&req) {
                Err(Error::Disconnected(name)) => {
                    info!("The '{name}' transport disconnected; Stdin exiting");
                    let _ = req.reply_tx.send(Err(Error::Disconnected(name)));
                    return;
                },
                result => result,
            };

            // The execution may have given up on the reply already
            if req.reply_tx.send(result).is_err() {
                trace!("Input reply no longer awaited");
            }
        }
    }

    fn process_request(&self, req: &ShellInputRequest) -> crate::Result<InputReply> {
        // Replies that arrived after their request was interrupted must not be
        // mistaken for the reply to this request
        self.discard_stale_replies()?;

        let msg = JupyterMessage::create_with_identity(
            req.originator.clone(),
            req.request.clone(),
            &self.socket.session,
        );
        msg.send(&self.socket)?;
        trace!("Sent input request to frontend, waiting for input reply...");

        loop {
            if req.cancellation.is_cancelled() || self.shutdown.is_cancelled() {
                info!("Input request interrupted");
                return Err(Error::Interrupted);
            }

            if !self.socket.poll_incoming(POLL_INTERVAL_MS)? {
                continue;
            }

            // Input replies carry an empty parent header by convention, so
            // there's nothing to correlate them with beyond their type
            match Message::read_from_socket(&self.socket) {
                Ok(Message::InputReply(reply)) => {
                    trace!("Received input reply from frontend: {:?}", reply);
                    return Ok(reply.content);
                },
                Ok(message) => {
                    warn!("Received unexpected message on stdin socket: {:?}", message);
                },
                Err(Error::Disconnected(name)) => return Err(Error::Disconnected(name)),
                Err(err) => warn!("Could not read message from stdin socket: {err}"),
            }
        }
    }

    fn discard_stale_replies(&self) -> crate::Result<()> {
        while self.socket.has_incoming_data()? {
            match Message::read_from_socket(&self.socket) {
                Ok(message) => warn!("Discarding stale message on stdin socket: {message:?}"),
                Err(Error::Disconnected(name)) => return Err(Error::Disconnected(name)),
                Err(err) => warn!("Could not read message from stdin socket: {err}"),
            }
        }
        Ok(())
    }
}
