/*
 * memory.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Mutex;
use std::time::Duration;

use crossbeam::channel::unbounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::RecvTimeoutError;
use crossbeam::channel::Sender;

use crate::error::Error;
use crate::socket::transport::Transport;

type Frames = Vec<Vec<u8>>;

/// An in-process transport made of a pair of crossbeam channels. Used to run
/// a kernel and a frontend in the same process without network sockets.
///
/// Dropping one end disconnects the other, which makes the thread serving it
/// exit.
pub struct MemoryTransport {
    name: String,
    tx: Sender<Frames>,
    rx: Receiver<Frames>,

    /// A message taken off the channel by `poll_incoming()` and not yet
    /// received
    peeked: Mutex<Option<Frames>>,
}

impl MemoryTransport {
    /// Creates two connected ends. What one end sends, the other receives.
    pub fn pair(name: &str) -> (Self, Self) {
        let (a_tx, b_rx) = unbounded();
        let (b_tx, a_rx) = unbounded();
        (Self::new(name, a_tx, a_rx), Self::new(name, b_tx, b_rx))
    }

    fn new(name: &str, tx: Sender<Frames>, rx: Receiver<Frames>) -> Self {
        Self {
            name: String::from(name),
            tx,
            rx,
            peeked: Mutex::new(None),
        }
    }

    fn disconnected(&self) -> Error {
        Error::Disconnected(self.name.clone())
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_multipart(&self, parts: &[Vec<u8>]) -> crate::Result<()> {
        self.tx.send(parts.to_vec()).map_err(|_| self.disconnected())
    }

    fn recv_multipart(&self) -> crate::Result<Frames> {
        let peeked = self
            .peeked
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .take();
        if let Some(frames) = peeked {
            return Ok(frames);
        }
        self.rx.recv().map_err(|_| self.disconnected())
    }

    fn poll_incoming(&self, timeout_ms: i64) -> crate::Result<bool> {
        let mut peeked = self.peeked.lock().unwrap_or_else(|err| err.into_inner());
        if peeked.is_some() {
            return Ok(true);
        }

        // Negative timeouts wait forever, as with `zmq_poll()`
        let received = if timeout_ms < 0 {
            self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            self.rx
                .recv_timeout(Duration::from_millis(timeout_ms as u64))
        };

        match received {
            Ok(frames) => {
                *peeked = Some(frames);
                Ok(true)
            },
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(self.disconnected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_memory_transport_pair() {
        let (kernel, frontend) = MemoryTransport::pair("Shell");

        frontend.send_multipart(&[b"a".to_vec(), b"b".to_vec()]).unwrap();
        assert!(kernel.poll_incoming(100).unwrap());

        // Polling again does not consume the message
        assert!(kernel.poll_incoming(0).unwrap());
        assert_eq!(kernel.recv_multipart().unwrap(), vec![
            b"a".to_vec(),
            b"b".to_vec()
        ]);
        assert!(!kernel.poll_incoming(0).unwrap());

        drop(frontend);
        assert_matches!(kernel.poll_incoming(0), Err(Error::Disconnected(_)));
        assert_matches!(kernel.send_multipart(&[]), Err(Error::Disconnected(_)));
    }
}
