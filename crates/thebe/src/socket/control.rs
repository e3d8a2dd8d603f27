/*
 * control.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;
use std::sync::Mutex;

use crossbeam::channel::Sender;
use futures::executor::block_on;
use log::error;
use log::info;
use log::trace;
use log::warn;

use crate::dispatch::Channel;
use crate::dispatch::Dispatch;
use crate::dispatch::DispatchContext;
use crate::dispatch::Handler;
use crate::dispatch::HandlerChain;
use crate::error::Error;
use crate::execution::cancellation::CancellationToken;
use crate::execution::interrupt::InterruptController;
use crate::kernel::KernelEvent;
use crate::language::control_handler::ControlHandler;
use crate::socket::iopub::IOPubMessage;
use crate::socket::socket::Socket;
use crate::wire::exception::Exception;
use crate::wire::interrupt_reply::InterruptReply;
use crate::wire::jupyter_message::Message;
use crate::wire::jupyter_message::Status;
use crate::wire::shutdown_reply::ShutdownReply;

/// How long to wait for a request before checking for shutdown
const POLL_INTERVAL_MS: i64 = 50;

/// Wrapper for the Control socket. Runs on its own thread so that interrupts
/// and shutdowns are served while code is executing.
pub struct Control {
    socket: Socket,
    iopub_tx: Sender<IOPubMessage>,

    /// Extensions first, then the `ControlRouter`
    handlers: HandlerChain,

    /// Cancelled when the kernel shuts down
    shutdown: CancellationToken,
}

impl Control {
    pub fn new(
        socket: Socket,
        iopub_tx: Sender<IOPubMessage>,
        handlers: HandlerChain,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            socket,
            iopub_tx,
            handlers,
            shutdown,
        }
    }

    /// Main loop for the Control thread; to be invoked by the kernel.
    pub fn listen(&mut self) {
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }

            match self.socket.poll_incoming(POLL_INTERVAL_MS) {
                Ok(true) => {},
                Ok(false) => continue,
                Err(Error::Disconnected(name)) => {
                    info!("The '{name}' transport disconnected; Control exiting");
                    return;
                },
                Err(err) => {
                    warn!("Could not poll control socket: {err}");
                    continue;
                },
            }

            trace!("Reading control message");
            let message = match Message::read_from_socket(&self.socket) {
                Ok(m) => m,
                Err(Error::Disconnected(_)) => return,
                Err(err) => {
                    warn!("Could not read message from control socket: {}", err);
                    continue;
                },
            };

            let context = DispatchContext {
                channel: Channel::Control,
                socket: &self.socket,
                iopub_tx: &self.iopub_tx,
            };
            if let Err(err) = self.handlers.dispatch(message, &context) {
                error!("Could not handle control message: {err}");
            }
        }
    }
}

/// Core routing table for Control requests
pub struct ControlRouter {
    handler: Arc<Mutex<dyn ControlHandler>>,
    interrupts: InterruptController,
    events_tx: Sender<KernelEvent>,
    shutdown: CancellationToken,
}

impl ControlRouter {
    pub fn new(
        handler: Arc<Mutex<dyn ControlHandler>>,
        interrupts: InterruptController,
        events_tx: Sender<KernelEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            handler,
            interrupts,
            events_tx,
            shutdown,
        }
    }
}

impl Handler for ControlRouter {
    fn handle(&mut self, msg: Message, context: &DispatchContext) -> crate::Result<Dispatch> {
        match msg {
            Message::InterruptRequest(req) => {
                info!("Received interrupt request, asking kernel to stop: {:?}", req);

                // Cancel first: this wakes an execution waiting for input
                // and never blocks on the worker
                self.interrupts.interrupt();

                let handler = self.handler.lock().unwrap_or_else(|err| err.into_inner());
                if let Err(err) = block_on(handler.handle_interrupt_request()) {
                    error!("Failed to handle interrupt request: {:?}", err);
                }

                // Always acknowledged, even when nothing was running
                req.send_reply(InterruptReply { status: Status::Ok }, context.socket)?;
            },
            Message::ShutdownRequest(req) => {
                info!("Received shutdown request, shutting down kernel: {:?}", req);

                let handler = self.handler.lock().unwrap_or_else(|err| err.into_inner());
                let result = match block_on(handler.handle_shutdown_request(&req.content)) {
                    Ok(reply) => req.send_reply(reply, context.socket),
                    Err(err) => {
                        warn!("Failed to handle shutdown request: {:?}", err);
                        let error = Exception::internal_error(format!("{err}"));
                        req.send_error::<ShutdownReply>(error, context.socket)
                    },
                };

                self.interrupts.interrupt();
                if let Err(err) = self.events_tx.send(KernelEvent::Shutdown {
                    restart: req.content.restart,
                }) {
                    warn!("Could not notify kernel of shutdown: {err:?}");
                }
                self.shutdown.cancel();

                result?;
            },
            _ => {
                trace!("Control does not handle '{}' messages", msg.message_type());
                return Ok(Dispatch::Declined(msg));
            },
        }
        Ok(Dispatch::Handled)
    }
}
