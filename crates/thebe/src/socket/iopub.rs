/*
 * iopub.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::time::Duration;

use crossbeam::channel::tick;
use crossbeam::channel::Receiver;
use crossbeam::select;
use log::info;
use log::trace;
use log::warn;

use crate::error::Error;
use crate::execution::cancellation::CancellationToken;
use crate::socket::socket::Socket;
use crate::wire::display_data::DisplayData;
use crate::wire::execute_error::ExecuteError;
use crate::wire::execute_input::ExecuteInput;
use crate::wire::execute_result::ExecuteResult;
use crate::wire::header::JupyterHeader;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::ProtocolMessage;
use crate::wire::status::ExecutionState;
use crate::wire::status::KernelStatus;
use crate::wire::stream::Stream;
use crate::wire::stream::StreamOutput;
use crate::wire::update_display_data::UpdateDisplayData;

/// How long to wait for a frontend to subscribe to an XPUB socket
const SUBSCRIPTION_TIMEOUT_MS: i64 = 10_000;

pub struct IOPub {
    /// The underlying IOPub socket
    socket: Socket,

    /// A channel that receives IOPub messages from other threads
    receiver: Receiver<IOPubMessage>,

    /// Cancelled when the kernel shuts down
    shutdown: CancellationToken,

    /// A buffer for the active stdout/stderr stream to batch stream messages
    /// that we send to the frontend, since this can be extremely high traffic.
    buffer: StreamBuffer,
}

/// Enumeration of all messages that can be delivered from the IOPub PUB/SUB
/// socket. These messages generally are created on other threads and then sent
/// via a channel to the IOPub thread.
///
/// Each message names its parent explicitly: executions, shell requests and
/// background display updates run concurrently, so there is no single
/// "current" request to attach output to.
#[derive(Debug)]
pub enum IOPubMessage {
    Status(JupyterHeader, KernelStatus),
    ExecuteResult(JupyterHeader, ExecuteResult),
    ExecuteError(JupyterHeader, ExecuteError),
    ExecuteInput(JupyterHeader, ExecuteInput),
    Stream(Option<JupyterHeader>, StreamOutput),
    DisplayData(Option<JupyterHeader>, DisplayData),
    UpdateDisplayData(Option<JupyterHeader>, UpdateDisplayData),
}

impl IOPubMessage {
    pub fn status(parent: JupyterHeader, state: ExecutionState) -> Self {
        IOPubMessage::Status(parent, KernelStatus {
            execution_state: state,
        })
    }
}

impl IOPub {
    /// Create a new IOPub socket wrapper.
    ///
    /// * `socket` - The socket that will deliver IOPub messages to
    ///   subscribed clients.
    /// * `receiver` - The receiver channel that will receive IOPub
    ///   messages from other threads.
    /// * `shutdown` - Cancelled when the kernel shuts down.
    pub fn new(socket: Socket, receiver: Receiver<IOPubMessage>, shutdown: CancellationToken) -> Self {
        Self {
            socket,
            receiver,
            shutdown,
            buffer: StreamBuffer::new(Stream::Stdout),
        }
    }

    /// Listen for IOPub messages from other threads. Returns when the kernel
    /// shuts down or the transport disconnects.
    pub fn listen(&mut self) {
        // Messages sent on an XPUB socket before anyone subscribes are dropped,
        // so hold everything back in the channel until a subscription arrives
        if self.socket.awaits_subscription() {
            self.await_subscription();
        }

        // Begin by emitting the starting state
        self.emit_state(ExecutionState::Starting);

        // Flush the active stream (either stdout or stderr) at regular
        // intervals
        let flush_interval = tick(StreamBuffer::interval());

        loop {
            select! {
                recv(self.receiver) -> message => {
                    let Ok(message) = message else {
                        // All senders are gone
                        self.flush_stream();
                        return;
                    };
                    match self.process_message(message) {
                        Ok(()) => {},
                        Err(Error::Disconnected(name)) => {
                            info!("The '{name}' transport disconnected; IOPub exiting");
                            return;
                        },
                        Err(error) => warn!("Error delivering iopub message: {error:?}"),
                    }
                },
                recv(flush_interval) -> _ => self.flush_stream(),
                recv(self.shutdown.receiver()) -> _ => {
                    // Deliver what has been queued so far, then stop
                    while let Ok(message) = self.receiver.try_recv() {
                        if let Err(error) = self.process_message(message) {
                            warn!("Error delivering iopub message: {error:?}");
                            break;
                        }
                    }
                    self.flush_stream();
                    return;
                },
            }
        }
    }

    fn await_subscription(&self) {
        info!("Waiting on IOPub subscription confirmation");
        match self.socket.poll_incoming(SUBSCRIPTION_TIMEOUT_MS) {
            Ok(true) => match self.socket.recv_multipart() {
                // Subscription frames start with 1, unsubscriptions with 0
                Ok(frames) if frames.first().and_then(|f| f.first()) == Some(&1) => {
                    info!("Received IOPub subscription confirmation");
                },
                Ok(frames) => warn!("Unexpected message on IOPub socket: {frames:?}"),
                Err(err) => warn!("Could not read IOPub subscription: {err}"),
            },
            Ok(false) => {
                warn!("No IOPub subscription after {SUBSCRIPTION_TIMEOUT_MS}ms; early messages may be lost")
            },
            Err(err) => warn!("Could not poll IOPub socket: {err}"),
        }
    }

    /// Process an IOPub message from another thread.
    fn process_message(&mut self, message: IOPubMessage) -> Result<(), Error> {
        // Anything other than stream output flushes the buffered stream first,
        // so output emitted before e.g. an error is delivered before it
        match &message {
            IOPubMessage::Stream(..) => {},
            _ => self.flush_stream(),
        };

        match message {
            IOPubMessage::Status(parent, msg) => {
                trace!(
                    "Entering kernel state {:?} for '{}'",
                    msg.execution_state,
                    parent.msg_type
                );
                self.send_message(Some(parent), msg)
            },
            IOPubMessage::ExecuteResult(parent, msg) => self.send_message(Some(parent), msg),
            IOPubMessage::ExecuteError(parent, msg) => self.send_message(Some(parent), msg),
            IOPubMessage::ExecuteInput(parent, msg) => self.send_message(Some(parent), msg),
            IOPubMessage::Stream(parent, msg) => self.process_stream_message(parent, msg),
            IOPubMessage::DisplayData(parent, msg) => self.send_message(parent, msg),
            IOPubMessage::UpdateDisplayData(parent, msg) => self.send_message(parent, msg),
        }
    }

    fn send_message<T: ProtocolMessage>(
        &self,
        parent: Option<JupyterHeader>,
        content: T,
    ) -> Result<(), Error> {
        let msg = JupyterMessage::<T>::create(content, parent, &self.socket.session);
        msg.send(&self.socket)
    }

    /// Flushes the active stream, sending along the message if the buffer
    /// wasn't empty. Handles its own errors since we often call this before
    /// sending some other message and we don't want to prevent that from going
    /// through.
    fn flush_stream(&mut self) {
        let Some((parent, message)) = self.buffer.flush() else {
            return;
        };

        let name = message.name;
        if let Err(error) = self.send_message(parent, message) {
            warn!("Error delivering iopub 'stream' message over '{name:?}': {error:?}");
        }
    }

    /// Appends a `Stream` message to the stream buffer. The buffer is flushed
    /// on the next tick unless something flushes it before then.
    ///
    /// Output for a different stream or a different parent flushes the
    /// existing buffer first.
    fn process_stream_message(
        &mut self,
        parent: Option<JupyterHeader>,
        message: StreamOutput,
    ) -> Result<(), Error> {
        if message.name != self.buffer.name || parent != self.buffer.parent {
            self.flush_stream();
            self.buffer.name = message.name;
            self.buffer.parent = parent;
        }

        self.buffer.push(&message.text);
        Ok(())
    }

    /// Emits the given kernel state to the client, without a parent.
    fn emit_state(&self, state: ExecutionState) {
        trace!("Entering kernel state: {:?}", state);
        let status = KernelStatus {
            execution_state: state,
        };
        if let Err(err) = self.send_message(None, status) {
            warn!("Could not emit kernel's state. {}", err)
        }
    }
}

struct StreamBuffer {
    name: Stream,
    parent: Option<JupyterHeader>,
    buffer: String,
}

impl StreamBuffer {
    fn new(name: Stream) -> Self {
        StreamBuffer {
            name,
            parent: None,
            buffer: String::new(),
        }
    }

    fn push(&mut self, message: &str) {
        self.buffer.push_str(message);
    }

    fn flush(&mut self) -> Option<(Option<JupyterHeader>, StreamOutput)> {
        if self.buffer.is_empty() {
            return None;
        }

        let result = StreamOutput {
            name: self.name,
            text: std::mem::take(&mut self.buffer),
        };

        Some((self.parent.clone(), result))
    }

    fn interval() -> Duration {
        Duration::from_millis(80)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_buffer_coalesces() {
        let mut buffer = StreamBuffer::new(Stream::Stdout);
        assert!(buffer.flush().is_none());

        buffer.push("hello ");
        buffer.push("world");
        let (parent, output) = buffer.flush().unwrap();
        assert!(parent.is_none());
        assert_eq!(output.name, Stream::Stdout);
        assert_eq!(output.text, "hello world");

        assert!(buffer.flush().is_none());
    }
}
