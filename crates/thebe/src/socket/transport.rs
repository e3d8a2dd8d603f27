/*
 * transport.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use log::trace;

use crate::error::Error;

/// A bidirectional channel of multipart byte messages. Each of the five
/// kernel channels owns one transport, and only the thread serving that
/// channel ever touches it.
pub trait Transport: Send {
    /// The name of the channel; used only to give context to log messages
    fn name(&self) -> &str;

    /// Send a multi-part message.
    fn send_multipart(&self, parts: &[Vec<u8>]) -> crate::Result<()>;

    /// Receive a multi-part message.
    ///
    /// **Note**: This will block until a message is delivered.
    fn recv_multipart(&self) -> crate::Result<Vec<Vec<u8>>>;

    /// Wait up to `timeout_ms` milliseconds for an incoming message. Returns
    /// `true` if one is ready to be received.
    fn poll_incoming(&self, timeout_ms: i64) -> crate::Result<bool>;

    /// Whether the transport drops outgoing messages until a peer has
    /// subscribed (XPUB).
    fn awaits_subscription(&self) -> bool {
        false
    }

    /// The port the transport is bound to, if it is a network transport.
    fn port(&self) -> crate::Result<Option<u16>> {
        Ok(None)
    }
}

/// A ZeroMQ socket used as a transport
pub struct ZmqTransport {
    name: String,
    kind: zmq::SocketType,
    socket: zmq::Socket,
}

impl ZmqTransport {
    /// Create a ZeroMQ socket and bind it (ROUTER, XPUB, REP) or connect it
    /// (DEALER, SUB, REQ) to `endpoint`, depending on its type.
    pub fn new(
        ctx: &zmq::Context,
        name: String,
        kind: zmq::SocketType,
        identity: Option<&[u8]>,
        endpoint: String,
    ) -> Result<Self, Error> {
        let socket = match ctx.socket(kind) {
            Ok(s) => s,
            Err(err) => return Err(Error::CreateSocketFailed(name, err)),
        };

        // IOPub is high traffic; raise the high water mark so slow
        // subscribers don't cause drops. Must happen before `bind()`.
        if kind == zmq::XPUB {
            if let Err(err) = socket.set_sndhwm(100000) {
                return Err(Error::CreateSocketFailed(name, err));
            }
        }

        if let Some(identity) = identity {
            if let Err(err) = socket.set_identity(identity) {
                return Err(Error::CreateSocketFailed(name, err));
            }
        }

        // The kernel side binds, the frontend side connects
        match kind {
            zmq::SocketType::ROUTER | zmq::SocketType::XPUB | zmq::SocketType::REP => {
                trace!("Binding to ZeroMQ '{}' socket at {}", name, endpoint);
                if let Err(err) = socket.bind(&endpoint) {
                    return Err(Error::SocketBindError(name, endpoint, err));
                }
            },
            zmq::SocketType::DEALER | zmq::SocketType::SUB | zmq::SocketType::REQ => {
                trace!("Connecting to ZeroMQ '{}' socket at {}", name, endpoint);
                if let Err(err) = socket.connect(&endpoint) {
                    return Err(Error::SocketConnectError(name, endpoint, err));
                }
            },
            _ => return Err(Error::UnsupportedSocketType(kind)),
        }

        // In debug builds, make unroutable messages on ROUTER sockets an
        // error instead of a silent drop
        #[cfg(debug_assertions)]
        {
            if kind == zmq::ROUTER {
                if let Err(err) = socket.set_router_mandatory(true) {
                    return Err(Error::SocketBindError(name, endpoint, err));
                }
            }
        }

        // Frontends subscribe to every topic
        if kind == zmq::SUB {
            if let Err(err) = socket.set_subscribe(b"") {
                return Err(Error::ZmqError(name, err));
            }
        }

        Ok(Self { name, kind, socket })
    }
}

impl Transport for ZmqTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_multipart(&self, parts: &[Vec<u8>]) -> crate::Result<()> {
        match self.socket.send_multipart(parts, 0) {
            Ok(()) => Ok(()),
            Err(err) => Err(Error::ZmqError(self.name.clone(), err)),
        }
    }

    fn recv_multipart(&self) -> crate::Result<Vec<Vec<u8>>> {
        match self.socket.recv_multipart(0) {
            Ok(data) => Ok(data),
            Err(zmq::Error::ETERM) => Err(Error::Disconnected(self.name.clone())),
            Err(err) => Err(Error::ZmqError(self.name.clone(), err)),
        }
    }

    fn poll_incoming(&self, timeout_ms: i64) -> crate::Result<bool> {
        match self.socket.poll(zmq::PollEvents::POLLIN, timeout_ms) {
            Ok(n) => Ok(n != 0),
            Err(zmq::Error::ETERM) => Err(Error::Disconnected(self.name.clone())),
            Err(err) => Err(Error::ZmqError(self.name.clone(), err)),
        }
    }

    fn awaits_subscription(&self) -> bool {
        self.kind == zmq::XPUB
    }

    fn port(&self) -> crate::Result<Option<u16>> {
        port_from_socket(&self.name, &self.socket).map(Some)
    }
}

/// Extracts the port a socket ended up bound to. Needed when binding to
/// port `0`, which lets the OS pick a free port.
fn port_from_socket(name: &str, socket: &zmq::Socket) -> crate::Result<u16> {
    let address = match socket.get_last_endpoint() {
        Ok(address) => address,
        Err(err) => {
            return Err(crate::anyhow!(
                "Can't access last endpoint of '{name}' socket due to {err:?}"
            ));
        },
    };

    let address = match address {
        Ok(address) => address,
        Err(_) => {
            return Err(crate::anyhow!(
                "Can't access last endpoint of '{name}' socket."
            ));
        },
    };

    // We've got the full address but we only want the port at the very end
    let Some(loc) = address.rfind(':') else {
        return Err(crate::anyhow!(
            "Failed to find port in the '{name}' socket address."
        ));
    };

    let port = &address[(loc + 1)..];

    match port.parse::<u16>() {
        Ok(port) => Ok(port),
        Err(err) => Err(crate::anyhow!(
            "Can't parse port '{port}' into a `u16` due to {err:?}"
        )),
    }
}
