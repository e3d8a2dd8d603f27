/*
 * queue.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use crossbeam::channel::unbounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;

use crate::wire::execute_request::ExecuteRequest;
use crate::wire::jupyter_message::JupyterMessage;

/// FIFO of execute requests waiting for the worker. The Shell thread pushes,
/// the worker is the only consumer.
#[derive(Clone)]
pub struct ExecutionQueue {
    tx: Sender<JupyterMessage<ExecuteRequest>>,
    rx: Receiver<JupyterMessage<ExecuteRequest>>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, request: JupyterMessage<ExecuteRequest>) -> crate::Result<()> {
        log::trace!("Queueing execute request '{}'", request.header.msg_id);
        self.tx.send(request)?;
        Ok(())
    }

    pub fn receiver(&self) -> &Receiver<JupyterMessage<ExecuteRequest>> {
        &self.rx
    }

    /// Number of requests waiting; excludes the one running
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Drops every request still waiting. Returns how many were dropped.
    pub fn discard_pending(&self) -> usize {
        let mut discarded = 0;
        while let Ok(request) = self.rx.try_recv() {
            log::trace!("Discarding execute request '{}'", request.header.msg_id);
            discarded += 1;
        }
        discarded
    }
}

impl Default for ExecutionQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn request(session: &Session, code: &str) -> JupyterMessage<ExecuteRequest> {
        JupyterMessage::create(ExecuteRequest::new(code), None, session)
    }

    #[test]
    fn test_queue_is_fifo() {
        let session = Session::create("").unwrap();
        let queue = ExecutionQueue::new();
        queue.push(request(&session, "a")).unwrap();
        queue.push(request(&session, "b")).unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.receiver().recv().unwrap().content.code, "a");
        assert_eq!(queue.receiver().recv().unwrap().content.code, "b");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_discard_pending() {
        let session = Session::create("").unwrap();
        let queue = ExecutionQueue::new();
        assert_eq!(queue.discard_pending(), 0);

        for code in ["a", "b", "c"] {
            queue.push(request(&session, code)).unwrap();
        }
        assert_eq!(queue.discard_pending(), 3);
        assert!(queue.is_empty());

        // Requests pushed afterwards are kept
        queue.push(request(&session, "d")).unwrap();
        assert_eq!(queue.receiver().recv().unwrap().content.code, "d");
    }
}
