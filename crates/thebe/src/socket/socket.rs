/*
 * socket.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use crate::session::Session;
use crate::socket::transport::Transport;

/// Represents a socket that sends and receives messages that are optionally
/// signed with a SHA-256 HMAC.
pub struct Socket {
    /// The Jupyter session information associated with the socket, including
    /// the session ID and HMAC signing key
    pub session: Session,

    /// The name of the socket; used only to give context to debugging/trace
    /// messages
    pub name: String,

    /// The transport over which signed messages are sent and received
    transport: Box<dyn Transport>,
}

impl Socket {
    pub fn new(session: Session, transport: Box<dyn Transport>) -> Self {
        Self {
            session,
            name: String::from(transport.name()),
            transport,
        }
    }

    /// Receive a multi-part message from the socket.
    ///
    /// **Note**: This will block until a message is delivered on the socket.
    pub fn recv_multipart(&self) -> crate::Result<Vec<Vec<u8>>> {
        self.transport.recv_multipart()
    }

    /// Send a multi-part message on the socket.
    pub fn send_multipart(&self, data: &[Vec<u8>]) -> crate::Result<()> {
        self.transport.send_multipart(data)
    }

    pub fn poll_incoming(&self, timeout_ms: i64) -> crate::Result<bool> {
        self.transport.poll_incoming(timeout_ms)
    }

    pub fn has_incoming_data(&self) -> crate::Result<bool> {
        self.poll_incoming(0)
    }

    pub fn awaits_subscription(&self) -> bool {
        self.transport.awaits_subscription()
    }

    pub fn port(&self) -> crate::Result<Option<u16>> {
        self.transport.port()
    }
}
