/*
 * shell.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;
use futures::executor::block_on;
use log::debug;
use log::info;
use log::trace;
use log::warn;
use stdext::result::ResultOrLog;

use crate::dispatch::Channel;
use crate::dispatch::Dispatch;
use crate::dispatch::DispatchContext;
use crate::dispatch::Handler;
use crate::dispatch::HandlerChain;
use crate::error::Error;
use crate::execution::cancellation::CancellationToken;
use crate::execution::queue::ExecutionQueue;
use crate::execution::worker::ShellReply;
use crate::language::shell_handler::ShellHandler;
use crate::socket::iopub::IOPubMessage;
use crate::socket::socket::Socket;
use crate::wire::exception::Exception;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::Message;
use crate::wire::jupyter_message::ProtocolMessage;
use crate::wire::kernel_info_reply::KernelInfoReplyFull;
use crate::wire::status::ExecutionState;

/// How long to wait for a request before checking for replies from the worker
const POLL_INTERVAL_MS: i64 = 10;

/// Wrapper for the Shell socket; receives requests for execution, etc. from the
/// frontend and handles them or queues them for the execution worker.
///
/// The Shell thread is the only one writing to the Shell socket. Replies
/// produced by the worker come back through `reply_rx`.
pub struct Shell {
    /// The Shell socket
    socket: Socket,

    /// Sends messages to the IOPub socket (owned by another thread)
    iopub_tx: Sender<IOPubMessage>,

    /// Execute replies from the worker, to be sent on the socket
    reply_rx: Receiver<ShellReply>,

    /// Shared with the worker and the `ShellRouter`; emptied on stop-on-error
    queue: ExecutionQueue,

    /// Extensions first, then the `ShellRouter`
    handlers: HandlerChain,

    /// Cancelled when the kernel shuts down
    shutdown: CancellationToken,
}

impl Shell {
    pub fn new(
        socket: Socket,
        iopub_tx: Sender<IOPubMessage>,
        reply_rx: Receiver<ShellReply>,
        queue: ExecutionQueue,
        handlers: HandlerChain,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            socket,
            iopub_tx,
            reply_rx,
            queue,
            handlers,
            shutdown,
        }
    }

    /// Main loop for the Shell thread; to be invoked by the kernel.
    pub fn listen(&mut self) {
        loop {
            self.send_replies();

            if self.shutdown.is_cancelled() {
                return;
            }

            match self.socket.poll_incoming(POLL_INTERVAL_MS) {
                Ok(true) => {},
                Ok(false) => continue,
                Err(Error::Disconnected(name)) => {
                    info!("The '{name}' transport disconnected; Shell exiting");
                    return;
                },
                Err(err) => {
                    warn!("Could not poll shell socket: {err}");
                    continue;
                },
            }

            if let Some(message) = self.read_message() {
                self.dispatch(message);
            }
        }
    }

    /// Reads the next message from the socket. Returns `None` for messages
    /// that can't be handled, and on disconnection.
    fn read_message(&self) -> Option<Message> {
        match Message::read_from_socket(&self.socket) {
            Ok(m) => Some(m),
            Err(Error::Disconnected(_)) => None,
            Err(err @ Error::UnknownMessageType(_)) => {
                debug!("Dropping shell message: {err}");
                None
            },
            Err(err) => {
                warn!("Could not read message from shell socket: {err}");
                None
            },
        }
    }

    fn dispatch(&mut self, message: Message) {
        let context = DispatchContext {
            channel: Channel::Shell,
            socket: &self.socket,
            iopub_tx: &self.iopub_tx,
        };

        // Failures while handling requests are delivered to the client as
        // error replies, so the only errors likely here are "can't deliver to
        // client"
        if let Err(err) = self.handlers.dispatch(message, &context) {
            log::error!("Could not handle shell message: {err}");
        }
    }

    fn send_replies(&mut self) {
        while let Ok(reply) = self.reply_rx.try_recv() {
            match reply {
                ShellReply::Reply(reply) => self.send_reply(reply),
                ShellReply::Abort { reply, done } => {
                    self.abort_pending();
                    self.send_reply(reply);
                    done.send(()).or_log_warning("Could not resume execution worker");
                },
            }
        }
    }

    fn send_reply(&self, reply: Message) {
        reply
            .send(&self.socket)
            .or_log_warning("Could not send execute reply");
    }

    /// Drops every execute request received before the reply that is about
    /// to go out: those already queued and those still waiting on the
    /// socket. Other requests found on the socket are served as usual.
    fn abort_pending(&mut self) {
        let mut discarded = self.queue.discard_pending();

        loop {
            match self.socket.poll_incoming(0) {
                Ok(true) => {},
                Ok(false) => break,
                Err(err) => {
                    warn!("Could not poll shell socket: {err}");
                    break;
                },
            }
            match self.read_message() {
                Some(Message::ExecuteRequest(req)) => {
                    trace!("Discarding execute request '{}'", req.header.msg_id);
                    discarded += 1;
                },
                Some(message) => self.dispatch(message),
                None => {},
            }
        }

        if discarded > 0 {
            info!("Discarded {discarded} pending execute request(s) after error");
        }
    }
}

/// Core routing table for Shell requests. Execute requests are queued for the
/// worker; the others are answered right away by the language's
/// `ShellHandler`.
pub struct ShellRouter {
    shell_handler: Box<dyn ShellHandler>,
    queue: ExecutionQueue,
}

impl ShellRouter {
    pub fn new(shell_handler: Box<dyn ShellHandler>, queue: ExecutionQueue) -> Self {
        Self {
            shell_handler,
            queue,
        }
    }
}

impl Handler for ShellRouter {
    fn handle(&mut self, msg: Message, context: &DispatchContext) -> crate::Result<Dispatch> {
        let shell_handler = &mut self.shell_handler;
        match msg {
            Message::KernelInfoRequest(req) => handle_request(req, context, |msg| {
                block_on(shell_handler.handle_info_request(msg)).map(KernelInfoReplyFull::from)
            })?,
            Message::IsCompleteRequest(req) => handle_request(req, context, |msg| {
                block_on(shell_handler.handle_is_complete_request(msg))
            })?,
            Message::CompleteRequest(req) => handle_request(req, context, |msg| {
                block_on(shell_handler.handle_complete_request(msg))
            })?,
            Message::InspectRequest(req) => handle_request(req, context, |msg| {
                block_on(shell_handler.handle_inspect_request(msg))
            })?,
            Message::ExecuteRequest(req) => {
                info!("Received execute request: {:?}", req.content);
                self.queue.push(req)?;
            },
            _ => {
                trace!("Shell does not handle '{}' messages", msg.message_type());
                return Ok(Dispatch::Declined(msg));
            },
        }
        Ok(Dispatch::Handled)
    }
}

/// Wrapper for request handlers; emits busy, invokes the handler, replies,
/// then emits idle. Most frontends expect all shell messages to be wrapped in
/// this pair of statuses.
fn handle_request<Req, Rep, F>(
    req: JupyterMessage<Req>,
    context: &DispatchContext,
    handler: F,
) -> crate::Result<()>
where
    Req: ProtocolMessage,
    Rep: ProtocolMessage,
    F: FnOnce(&Req) -> crate::Result<Rep>,
{
    context
        .iopub_tx
        .send(IOPubMessage::status(req.header.clone(), ExecutionState::Busy))?;

    info!("Received shell request: {req:?}");

    let result = match handler(&req.content) {
        Ok(reply) => req.send_reply(reply, context.socket),
        Err(err) => {
            let error = Exception::internal_error(format!("{err}"));
            req.send_error::<Rep>(error, context.socket)
        },
    };

    // Return to idle even if the request failed, since many frontends won't
    // submit additional messages until the kernel is marked idle
    context
        .iopub_tx
        .send(IOPubMessage::status(req.header.clone(), ExecutionState::Idle))?;

    result
}
