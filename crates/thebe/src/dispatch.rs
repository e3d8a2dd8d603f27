/*
 * dispatch.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use crossbeam::channel::Sender;
use log::trace;

use crate::socket::iopub::IOPubMessage;
use crate::socket::socket::Socket;
use crate::wire::jupyter_message::Message;

/// The five Jupyter channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Shell,
    Control,
    IOPub,
    Stdin,
    Heartbeat,
}

/// Result of offering a message to a handler
#[derive(Debug)]
pub enum Dispatch {
    Handled,

    /// Not for this handler; the message is handed back so the next handler
    /// can have it
    Declined(Message),
}

/// What a handler gets besides the message: where it came from, the socket to
/// reply on, and the way to IOPub.
pub struct DispatchContext<'a> {
    pub channel: Channel,
    pub socket: &'a Socket,
    pub iopub_tx: &'a Sender<IOPubMessage>,
}

/// Handles inbound messages on the thread serving a channel.
pub trait Handler: Send {
    /// Either handles `msg` (replying through `context.socket` if needed) or
    /// declines it. Errors are logged by the caller; the channel keeps
    /// serving.
    fn handle(&mut self, msg: Message, context: &DispatchContext) -> crate::Result<Dispatch>;
}

/// Handlers tried in registration order; the first one that doesn't decline
/// wins. Messages declined by every handler are discarded.
#[derive(Default)]
pub struct HandlerChain {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn with(mut self, handler: Box<dyn Handler>) -> Self {
        self.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Offers `msg` to each handler in turn
    pub fn dispatch(&mut self, msg: Message, context: &DispatchContext) -> crate::Result<()> {
        if let Dispatch::Declined(msg) = self.handle(msg, context)? {
            trace!(
                "Discarding '{}' message on {:?}: no handler",
                msg.message_type(),
                context.channel
            );
        }
        Ok(())
    }
}

impl Handler for HandlerChain {
    fn handle(&mut self, msg: Message, context: &DispatchContext) -> crate::Result<Dispatch> {
        let mut msg = msg;
        for handler in self.handlers.iter_mut() {
            match handler.handle(msg, context)? {
                Dispatch::Handled => return Ok(Dispatch::Handled),
                Dispatch::Declined(declined) => msg = declined,
            }
        }
        Ok(Dispatch::Declined(msg))
    }
}

/// Handles messages of one type on one channel with a closure
pub struct FnHandler<F> {
    channel: Channel,
    msg_type: String,
    action: F,
}

impl<F> FnHandler<F>
where
    F: FnMut(Message, &DispatchContext) -> crate::Result<()> + Send,
{
    pub fn new(channel: Channel, msg_type: &str, action: F) -> Self {
        Self {
            channel,
            msg_type: String::from(msg_type),
            action,
        }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: FnMut(Message, &DispatchContext) -> crate::Result<()> + Send,
{
    fn handle(&mut self, msg: Message, context: &DispatchContext) -> crate::Result<Dispatch> {
        if context.channel != self.channel || msg.message_type() != self.msg_type {
            return Ok(Dispatch::Declined(msg));
        }
        (self.action)(msg, context)?;
        Ok(Dispatch::Handled)
    }
}
