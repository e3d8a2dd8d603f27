/*
 * cancellation.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use crossbeam::channel::bounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;

use crate::error::Error;

/// A one-shot cancellation signal shared between threads.
///
/// Can be checked cooperatively with `is_cancelled()`, or waited on inside a
/// `crossbeam::select!` through `receiver()`: cancelling drops the only
/// sender, so every clone of the receiver wakes up with a disconnection.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                sender: Mutex::new(Some(sender)),
                receiver,
            }),
        }
    }

    /// Cancels the token. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .take();
        drop(sender);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// A receiver that never yields a value and disconnects once the token
    /// is cancelled.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.receiver
    }

    /// Returns `Error::Interrupted` once the token is cancelled. Meant for
    /// `?` at suspension points.
    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            return Err(Error::Interrupted);
        }
        Ok(())
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use crossbeam::select;

    use super::*;

    #[test]
    fn test_cancel_wakes_select() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());

        let remote = token.clone();
        let handle = std::thread::spawn(move || {
            select! {
                recv(remote.receiver()) -> _ => true,
                default(Duration::from_secs(5)) => false,
            }
        });

        token.cancel();
        assert!(handle.join().unwrap());
        assert!(token.is_cancelled());
        assert_matches!(token.check(), Err(Error::Interrupted));

        // Cancelling twice is harmless
        token.cancel();
        assert!(token.is_cancelled());
    }
}
