/*
 * heartbeat.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use log::debug;
use log::trace;
use log::warn;
use stdext::ResultExt;

use crate::error::Error;
use crate::execution::cancellation::CancellationToken;
use crate::socket::socket::Socket;

/// Structure used for heartbeat messages
pub struct Heartbeat {
    socket: Socket,
    shutdown: CancellationToken,
}

impl Heartbeat {
    /// Create a new heartbeat handler from the given heartbeat socket
    pub fn new(socket: Socket, shutdown: CancellationToken) -> Self {
        Self { socket, shutdown }
    }

    /// Listen for heartbeats and echo them back unchanged. Returns when the
    /// kernel shuts down or the transport disconnects.
    pub fn listen(&self) {
        debug!("Listening for heartbeats");
        while !self.shutdown.is_cancelled() {
            match self.socket.poll_incoming(100) {
                Ok(true) => {},
                Ok(false) => continue,
                Err(Error::Disconnected(_)) => return,
                Err(err) => {
                    warn!("Error polling heartbeat socket: {err}");

                    // Avoid flooding the logs when polling isn't working
                    std::thread::sleep(std::time::Duration::from_secs(1));
                    continue;
                },
            }

            let msg = match self.socket.recv_multipart() {
                Ok(msg) => msg,
                Err(Error::Disconnected(_)) => return,
                Err(err) => {
                    warn!("Error receiving heartbeat: {err}");
                    continue;
                },
            };
            trace!("Heartbeat message: {:?}", msg);

            // Echo the message right back!
            self.socket
                .send_multipart(&msg)
                .on_err(|err| warn!("Error replying to heartbeat: {err}"));
        }
    }
}
