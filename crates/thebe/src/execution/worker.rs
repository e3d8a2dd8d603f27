/*
 * worker.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;

use crossbeam::channel::bounded;
use crossbeam::channel::Sender;
use crossbeam::select;
use log::error;
use log::info;
use log::trace;
use stdext::result::ResultOrLog;

use crate::display::registry::DisplayRegistry;
use crate::error::Error;
use crate::execution::cancellation::CancellationToken;
use crate::execution::context::ExecutionContext;
use crate::execution::interrupt::InterruptController;
use crate::execution::queue::ExecutionQueue;
use crate::kernel::KernelEvent;
use crate::language::executor::ExecuteOutcome;
use crate::language::executor::Executor;
use crate::session::Session;
use crate::socket::iopub::IOPubMessage;
use crate::wire::exception::Exception;
use crate::wire::execute_error::ExecuteError;
use crate::wire::execute_input::ExecuteInput;
use crate::wire::execute_reply::ExecuteReply;
use crate::wire::execute_reply_exception::ExecuteReplyException;
use crate::wire::execute_request::ExecuteRequest;
use crate::wire::execute_result::ExecuteResult;
use crate::wire::input_request::ShellInputRequest;
use crate::wire::jupyter_message::empty_metadata;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::Message;
use crate::wire::jupyter_message::Status;
use crate::wire::originator::Originator;
use crate::wire::status::ExecutionState;

/// An execute reply for the Shell thread, which owns the Shell socket
#[derive(Debug)]
pub enum ShellReply {
    Reply(Message),

    /// Reply to a request that failed or was interrupted with
    /// `stop_on_error`. Before sending it, the Shell thread drops every
    /// execute request it has received so far, queued or still unread, then
    /// signals `done`. The worker takes no new request until then.
    Abort { reply: Message, done: Sender<()> },
}

/// Channels and shared state the worker needs besides the executor
pub struct WorkerChannels {
    pub session: Session,
    pub iopub_tx: Sender<IOPubMessage>,
    pub reply_tx: Sender<ShellReply>,

    pub stdin_tx: Sender<ShellInputRequest>,
    pub events_tx: Sender<KernelEvent>,
    pub registry: DisplayRegistry,
    pub interrupts: InterruptController,
    pub shutdown: CancellationToken,
}

/// Runs execute requests one at a time, in the order they were queued
pub struct Worker {
    executor: Box<dyn Executor>,
    queue: ExecutionQueue,
    channels: WorkerChannels,

    /// Number of visible executions so far; only the worker touches it
    execution_count: u32,
}

impl Worker {
    pub fn new(executor: Box<dyn Executor>, queue: ExecutionQueue, channels: WorkerChannels) -> Self {
        Self {
            executor,
            queue,
            channels,
            execution_count: 0,
        }
    }

    /// Main loop of the worker thread. Returns on shutdown, or after a fault,
    /// which is reported to the kernel as a `KernelEvent::Fault`.
    pub fn listen(mut self) {
        loop {
            let request = select! {
                recv(self.queue.receiver()) -> request => match request {
                    Ok(request) => request,
                    Err(_) => return,
                },
                recv(self.channels.shutdown.receiver()) -> _ => return,
            };

            if let Err(err) = self.execute(request) {
                error!("Execution worker stopped: {err}");
                let message = match err {
                    Error::WorkerFault(message) => message,
                    err => format!("{err}"),
                };
                self.channels
                    .events_tx
                    .send(KernelEvent::Fault(message))
                    .or_log_error("Could not report worker fault");
                return;
            }
        }
    }

    fn execute(&mut self, req: JupyterMessage<ExecuteRequest>) -> crate::Result<()> {
        let header = req.header.clone();
        let silent = req.content.silent;

        // Counted before any output, whether or not the code succeeds
        if !silent {
            self.execution_count += 1;
        }
        let execution_count = self.execution_count;
        info!(
            "Executing request '{}' (execution count {execution_count})",
            header.msg_id
        );

        // Installed before the request is announced, so an interrupt sent as
        // soon as the client sees `execute_input` finds it
        let token = CancellationToken::new();
        self.channels.interrupts.begin(header.clone(), token.clone());

        self.send_iopub(IOPubMessage::status(header.clone(), ExecutionState::Busy))?;

        if !silent {
            self.send_iopub(IOPubMessage::ExecuteInput(header.clone(), ExecuteInput {
                code: req.content.code.clone(),
                execution_count,
            }))?;
        }

        let context = ExecutionContext::new(
            Originator::from(&req),
            execution_count,
            req.content.allow_stdin,
            token.clone(),
            self.channels.iopub_tx.clone(),
            self.channels.stdin_tx.clone(),
            self.channels.registry.clone(),
        );

        let result = if token.is_cancelled() {
            trace!("Request '{}' interrupted before it started", header.msg_id);
            Ok(Err(Error::Interrupted))
        } else {
            let executor = &mut self.executor;
            catch_unwind(AssertUnwindSafe(|| executor.execute(&req.content, &context)))
        };
        self.channels.interrupts.finish();

        let outcome = match result {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(Error::Interrupted)) => Ok(ExecuteOutcome::Interrupted),
            Ok(Err(Error::StdinNotAllowed)) => Ok(ExecuteOutcome::Failed(Exception::new(
                "StdinNotAllowed",
                format!("{}", Error::StdinNotAllowed),
            ))),
            Ok(Err(err)) => Err(format!("{err}")),
            Err(panic) => Err(panic_message(panic)),
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(fault) => {
                // Still answer the request so the client isn't left waiting
                let exception = Exception::internal_error(fault.clone());
                let session = &self.channels.session;
                let reply = error_reply(&req, session, exception, execution_count);
                self.channels.reply_tx.send(ShellReply::Reply(reply))?;
                self.send_iopub(IOPubMessage::status(header, ExecutionState::Idle))?;
                return Err(Error::WorkerFault(fault));
            },
        };

        // Code that fails because it was interrupted counts as interrupted
        let outcome = match outcome {
            ExecuteOutcome::Failed(exception) if token.is_cancelled() => {
                trace!("Execution failed after interrupt: {exception:?}");
                ExecuteOutcome::Interrupted
            },
            outcome => outcome,
        };

        let succeeded = matches!(outcome, ExecuteOutcome::Completed(_));
        let session = &self.channels.session;
        let reply = match outcome {
            ExecuteOutcome::Completed(response) => {
                if let Some(result) = response.result {
                    if !silent {
                        self.send_iopub(IOPubMessage::ExecuteResult(
                            header.clone(),
                            ExecuteResult::new(result, execution_count),
                        ))?;
                    }
                }
                let reply = ExecuteReply {
                    status: Status::Ok,
                    execution_count,
                    user_expressions: empty_metadata(),
                    payload: response.payload,
                };
                Message::ExecuteReply(req.create_reply(reply, session))
            },
            ExecuteOutcome::Failed(exception) => {
                self.send_iopub(IOPubMessage::ExecuteError(header.clone(), ExecuteError {
                    exception: exception.clone(),
                }))?;
                error_reply(&req, session, exception, execution_count)
            },
            ExecuteOutcome::Interrupted => {
                info!("Execution {execution_count} was interrupted");
                let reply = ExecuteReply {
                    status: Status::Abort,
                    execution_count,
                    user_expressions: empty_metadata(),
                    payload: vec![],
                };
                Message::ExecuteReply(req.create_reply(reply, session))
            },
        };

        let aborting = req.content.stop_on_error && !succeeded;
        self.send_reply(reply, aborting)?;
        self.send_iopub(IOPubMessage::status(header, ExecutionState::Idle))?;
        Ok(())
    }

    /// Hands the reply to the Shell thread. With stop-on-error, waits until
    /// the Shell thread has dropped the requests sent before the reply.
    fn send_reply(&self, reply: Message, aborting: bool) -> crate::Result<()> {
        if !aborting {
            self.channels.reply_tx.send(ShellReply::Reply(reply))?;
            return Ok(());
        }

        let (done_tx, done_rx) = bounded(1);
        self.channels.reply_tx.send(ShellReply::Abort {
            reply,
            done: done_tx,
        })?;

        select! {
            recv(done_rx) -> done => {
                if done.is_err() && !self.channels.shutdown.is_cancelled() {
                    return Err(Error::Disconnected(String::from("Shell")));
                }
            },
            recv(self.channels.shutdown.receiver()) -> _ => {
                trace!("Shutdown while discarding pending requests");
            },
        }
        Ok(())
    }

    fn send_iopub(&self, message: IOPubMessage) -> crate::Result<()> {
        self.channels.iopub_tx.send(message)?;
        Ok(())
    }
}

fn error_reply(
    req: &JupyterMessage<ExecuteRequest>,
    session: &Session,
    exception: Exception,
    execution_count: u32,
) -> Message {
    let reply = ExecuteReplyException {
        status: Status::Error,
        execution_count,
        exception,
    };
    Message::ExecuteReplyException(req.create_reply(reply, session))
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return format!("Executor panicked: {message}");
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return format!("Executor panicked: {message}");
    }
    String::from("Executor panicked")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use crossbeam::channel::unbounded;
    use crossbeam::channel::Receiver;

    use super::*;
    use crate::display::Renderer;
    use crate::language::executor::ExecuteResponse;
    use crate::wire::status::KernelStatus;

    /// Fails on `fail`, completes anything else
    struct Recorder {
        ran: Arc<AtomicBool>,
    }

    impl Executor for Recorder {
        fn execute(
            &mut self,
            req: &ExecuteRequest,
            _context: &ExecutionContext,
        ) -> crate::Result<ExecuteOutcome> {
            self.ran.store(true, Ordering::SeqCst);
            if req.code == "fail" {
                return Ok(ExecuteOutcome::Failed(Exception::new("Error", "failed")));
            }
            Ok(ExecuteOutcome::Completed(ExecuteResponse::default()))
        }

        fn register_renderer(&mut self, _renderer: Renderer) {}
    }

    struct Harness {
        session: Session,
        queue: ExecutionQueue,
        interrupts: InterruptController,
        shutdown: CancellationToken,
        iopub_rx: Receiver<IOPubMessage>,
        reply_rx: Receiver<ShellReply>,
        ran: Arc<AtomicBool>,
    }

    impl Harness {
        /// With `rendezvous`, every IOPub message blocks the worker until
        /// the test receives it
        fn start(rendezvous: bool) -> Self {
            let session = Session::create("").unwrap();
            let (iopub_tx, iopub_rx) = if rendezvous { bounded(0) } else { unbounded() };
            let (reply_tx, reply_rx) = unbounded();
            let (stdin_tx, _stdin_rx) = unbounded();
            let (events_tx, _events_rx) = unbounded();
            let queue = ExecutionQueue::new();
            let interrupts = InterruptController::new();
            let shutdown = CancellationToken::new();
            let ran = Arc::new(AtomicBool::new(false));

            let worker = Worker::new(
                Box::new(Recorder { ran: ran.clone() }),
                queue.clone(),
                WorkerChannels {
                    session: session.clone(),
                    iopub_tx: iopub_tx.clone(),
                    reply_tx,
                    stdin_tx,
                    events_tx,
                    registry: DisplayRegistry::new(iopub_tx),
                    interrupts: interrupts.clone(),
                    shutdown: shutdown.clone(),
                },
            );
            std::thread::spawn(move || worker.listen());

            Self {
                session,
                queue,
                interrupts,
                shutdown,
                iopub_rx,
                reply_rx,
                ran,
            }
        }

        fn push(&self, code: &str) {
            let req = JupyterMessage::create(ExecuteRequest::new(code), None, &self.session);
            self.queue.push(req).unwrap();
        }

        fn recv_state(&self) -> ExecutionState {
            assert_matches!(
                self.iopub_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
                IOPubMessage::Status(_, KernelStatus { execution_state }) => execution_state
            )
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.shutdown.cancel();
        }
    }

    #[test]
    fn test_interrupt_as_soon_as_announced() {
        let harness = Harness::start(true);
        harness.push("1 + 1");

        assert_eq!(harness.recv_state(), ExecutionState::Busy);

        // The request is interruptible as soon as it is announced
        assert!(harness.interrupts.interrupt());

        assert_matches!(
            harness.iopub_rx.recv().unwrap(),
            IOPubMessage::ExecuteInput(_, input) => assert_eq!(input.code, "1 + 1")
        );

        let (reply, done) = assert_matches!(
            harness.reply_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ShellReply::Abort { reply, done } => (reply, done)
        );
        assert_matches!(reply, Message::ExecuteReply(reply) => {
            assert_eq!(reply.content.status, Status::Abort);
        });
        done.send(()).unwrap();

        assert_eq!(harness.recv_state(), ExecutionState::Idle);

        // Interrupted before it started, so the code never ran
        assert!(!harness.ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_on_error_waits_for_shell() {
        let harness = Harness::start(false);
        harness.push("fail");
        harness.push("next");

        let done = assert_matches!(
            harness.reply_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ShellReply::Abort { reply: Message::ExecuteReplyException(_), done } => done
        );

        // Nothing else starts until the Shell thread is done discarding
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(harness.queue.len(), 1);

        assert_eq!(harness.queue.discard_pending(), 1);
        done.send(()).unwrap();

        assert!(harness
            .reply_rx
            .recv_timeout(Duration::from_millis(200))
            .is_err());
    }

    #[test]
    fn test_success_does_not_wait_for_shell() {
        let harness = Harness::start(false);
        harness.push("a");
        harness.push("b");

        for _ in 0..2 {
            assert_matches!(
                harness.reply_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
                ShellReply::Reply(Message::ExecuteReply(reply)) => {
                    assert_eq!(reply.content.status, Status::Ok);
                }
            );
        }
    }
}
