/*
 * client.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use assert_matches::assert_matches;
use crossbeam::channel::unbounded;
use crossbeam::channel::Sender;
use serde_json::Value;
use thebe::connection_file::ConnectionFile;
use thebe::dispatch::Channel;
use thebe::dispatch::FnHandler;
use thebe::error::Error;
use thebe::fixtures::dummy_frontend::parent_id_of;
use thebe::fixtures::dummy_frontend::DummyFrontend;
use thebe::kernel;
use thebe::kernel::Kernel;
use thebe::kernel::KernelHandlers;
use thebe::session::Session;
use thebe::wire::complete_reply::CompleteReply;
use thebe::wire::complete_request::CompleteRequest;
use thebe::wire::execute_request::ExecuteRequest;
use thebe::wire::inspect_request::InspectRequest;
use thebe::wire::interrupt_request::InterruptRequest;
use thebe::wire::is_complete_reply::IsComplete;
use thebe::wire::is_complete_reply::IsCompleteReply;
use thebe::wire::is_complete_request::IsCompleteRequest;
use thebe::wire::jupyter_message::Message;
use thebe::wire::jupyter_message::Status;
use thebe::wire::kernel_info_request::KernelInfoRequest;
use thebe::wire::shutdown_request::ShutdownRequest;
use thebe::wire::status::ExecutionState;
use thebe::wire::wire_message::sign;
use thebe::wire::wire_message::MSG_DELIM;

mod control;
mod executor;
mod shell;

fn handlers(gate: crossbeam::channel::Receiver<()>) -> KernelHandlers {
    KernelHandlers::new(
        Box::new(executor::TestExecutor::new(gate)),
        Box::new(shell::Shell {}),
        Arc::new(Mutex::new(control::Control {})),
    )
}

/// Starts a kernel over in-memory transports. Returns the sender that opens
/// the executor's gate.
fn start_kernel_with(
    configure: impl FnOnce(KernelHandlers) -> KernelHandlers,
) -> (Kernel, DummyFrontend, Sender<()>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let (gate_tx, gate_rx) = unbounded();
    let key = DummyFrontend::random_key();
    let (frontend, transports) = DummyFrontend::in_memory(&key);
    let session = Session::create(&key).unwrap();

    let kernel = kernel::start("test", session, transports, configure(handlers(gate_rx)));
    frontend.complete_initialization();

    (kernel, frontend, gate_tx)
}

fn start_kernel() -> (Kernel, DummyFrontend, Sender<()>) {
    start_kernel_with(|handlers| handlers)
}

fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let start = Instant::now();
    while !condition() {
        if start.elapsed() > Duration::from_secs(5) {
            panic!("Timeout while waiting for {what}");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn execute_request(code: &str, stop_on_error: bool) -> ExecuteRequest {
    ExecuteRequest {
        stop_on_error,
        ..ExecuteRequest::new(code)
    }
}

#[test]
fn test_kernel_info() {
    let (_kernel, frontend, _gate) = start_kernel();

    let id = frontend.send_shell(KernelInfoRequest {});
    assert_matches!(frontend.recv_shell(), Message::KernelInfoReply(reply) => {
        assert_eq!(reply.content.language_info.name, "Test");
        assert_eq!(reply.content.protocol_version, "5.3");
        assert_eq!(reply.parent_header.unwrap().msg_id, id);
    });
    frontend.recv_iopub_busy();
    frontend.recv_iopub_idle();
    frontend.assert_no_incoming();
}

#[test]
fn test_shell_requests() {
    let (_kernel, frontend, _gate) = start_kernel();

    frontend.send_shell(IsCompleteRequest {
        code: String::from("1 + \\"),
    });
    assert_matches!(frontend.recv_shell(), Message::IsCompleteReply(reply) => {
        assert_eq!(reply.content.status, IsComplete::Incomplete);
    });
    frontend.recv_iopub_busy();
    frontend.recv_iopub_idle();

    frontend.send_shell(CompleteRequest {
        code: String::from("foo"),
        cursor_pos: 3,
    });
    assert_matches!(frontend.recv_shell(), Message::CompleteReply(reply) => {
        assert_eq!(reply.content.matches, vec![String::from("foo!")]);
        assert_eq!(reply.content.cursor_end, 3);
    });
    frontend.recv_iopub_busy();
    frontend.recv_iopub_idle();

    // A failing handler produces an error reply, still bracketed by busy/idle
    frontend.send_shell(InspectRequest {
        code: String::from("foo"),
        cursor_pos: 0,
        detail_level: 0,
    });
    let reply = frontend.recv_shell();
    assert_eq!(reply.message_type(), "inspect_reply");
    frontend.recv_iopub_busy();
    frontend.recv_iopub_idle();

    frontend.assert_no_incoming();
}

#[test]
fn test_execute_in_order() {
    let (_kernel, frontend, _gate) = start_kernel();

    let ids: Vec<String> = ["1", "2", "3"]
        .iter()
        .map(|code| frontend.send_execute_request(code))
        .collect();

    for (i, id) in ids.iter().enumerate() {
        let count = frontend.recv_shell_execute_reply();
        assert_eq!(count, i as u32 + 1);

        let messages = frontend.recv_iopub_until_idle(id);
        assert_eq!(messages.len(), 4);
        assert_matches!(&messages[0], Message::Status(data) => {
            assert_eq!(data.content.execution_state, ExecutionState::Busy);
        });
        assert_matches!(&messages[1], Message::ExecuteInput(data) => {
            assert_eq!(data.content.execution_count, count);
        });
        assert_matches!(&messages[2], Message::ExecuteResult(data) => {
            assert_eq!(data.content.execution_count, count);
            assert_eq!(data.content.data["text/plain"], Value::from((i + 1).to_string()));
        });
    }

    frontend.assert_no_incoming();
}

#[test]
fn test_execute_stream_output() {
    let (_kernel, frontend, _gate) = start_kernel();

    frontend.send_execute_request("print hello");
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();
    assert_eq!(frontend.recv_iopub_stream_stdout(), "hello");
    frontend.recv_shell_execute_reply();
    frontend.recv_iopub_idle();

    frontend.assert_no_incoming();
}

#[test]
fn test_execute_error() {
    let (_kernel, frontend, _gate) = start_kernel();

    frontend.send_execute_request("fail");
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();
    assert_eq!(frontend.recv_iopub_execute_error(), "failed");
    assert_eq!(frontend.recv_shell_execute_reply_exception(), 1);
    frontend.recv_iopub_idle();

    frontend.assert_no_incoming();
}

#[test]
fn test_stop_on_error_discards_queue() {
    let (kernel, frontend, gate) = start_kernel();

    let a = frontend.send_shell(execute_request("gate fail", true));
    frontend.send_execute_request("b");
    frontend.send_execute_request("c");

    // `a` is running, `b` and `c` are queued behind it
    wait_for("queued requests", || kernel.pending_executions() == 2);
    gate.send(()).unwrap();

    let reply = frontend.recv_shell();
    assert_matches!(reply, Message::ExecuteReplyException(data) => {
        assert_eq!(data.parent_header.unwrap().msg_id, a);
        assert_eq!(data.content.execution_count, 1);
    });
    frontend.recv_iopub_until_idle(&a);
    assert_eq!(kernel.pending_executions(), 0);

    // Requests sent after the error reply are not affected
    let d = frontend.send_execute_request("d");
    let reply = frontend.recv_shell();
    assert_matches!(reply, Message::ExecuteReply(data) => {
        assert_eq!(data.parent_header.unwrap().msg_id, d);
        assert_eq!(data.content.execution_count, 2);
    });
    let messages = frontend.recv_iopub_until_idle(&d);
    assert_matches!(&messages[1], Message::ExecuteInput(data) => {
        assert_eq!(data.content.code, "d");
        assert_eq!(data.content.execution_count, 2);
    });

    frontend.assert_no_incoming();
}

#[test]
fn test_stop_on_error_discards_unread_requests() {
    let (_kernel, frontend, _gate) = start_kernel();

    for round in 0..20 {
        // Sent back to back, so `b` and `c` may not even be read when `a`
        // fails
        let a = frontend.send_execute_request("fail");
        frontend.send_execute_request("b");
        frontend.send_execute_request("c");

        assert_matches!(frontend.recv_shell(), Message::ExecuteReplyException(data) => {
            assert_eq!(data.parent_header.unwrap().msg_id, a);
            assert_eq!(data.content.execution_count, 2 * round + 1);
        });
        frontend.recv_iopub_until_idle(&a);

        let d = frontend.send_execute_request("d");
        assert_matches!(frontend.recv_shell(), Message::ExecuteReply(data) => {
            assert_eq!(data.parent_header.unwrap().msg_id, d);
            assert_eq!(data.content.execution_count, 2 * round + 2);
        });
        frontend.recv_iopub_until_idle(&d);

        frontend.assert_no_incoming();
    }
}

#[test]
fn test_stop_on_error_discards_requests_behind_slow_request() {
    let (_kernel, frontend, _gate) = start_kernel_with(|mut handlers| {
        handlers.shell_extensions.push(Box::new(FnHandler::new(
            Channel::Shell,
            "complete_request",
            |msg, context| {
                let Message::CompleteRequest(req) = msg else {
                    return Ok(());
                };
                std::thread::sleep(Duration::from_millis(300));
                let reply = CompleteReply {
                    status: Status::Ok,
                    matches: vec![],
                    cursor_start: 0,
                    cursor_end: 0,
                    metadata: serde_json::json!({}),
                };
                req.send_reply(reply, context.socket)
            },
        )));
        handlers
    });

    let a = frontend.send_execute_request("fail");
    let complete = frontend.send_shell(CompleteRequest {
        code: String::from("foo"),
        cursor_pos: 3,
    });
    frontend.send_execute_request("b");
    frontend.send_execute_request("c");

    // The completion is still served; its reply may come first
    for _ in 0..2 {
        match frontend.recv_shell() {
            Message::ExecuteReplyException(data) => {
                assert_eq!(data.parent_header.unwrap().msg_id, a);
            },
            Message::CompleteReply(data) => {
                assert_eq!(data.parent_header.unwrap().msg_id, complete);
            },
            msg => panic!("Unexpected shell message: {msg:?}"),
        }
    }
    frontend.recv_iopub_until_idle(&a);

    let d = frontend.send_execute_request("d");
    assert_matches!(frontend.recv_shell(), Message::ExecuteReply(data) => {
        assert_eq!(data.parent_header.unwrap().msg_id, d);
        assert_eq!(data.content.execution_count, 2);
    });
    frontend.recv_iopub_until_idle(&d);

    frontend.assert_no_incoming();
}

#[test]
fn test_no_stop_on_error_keeps_queue() {
    let (kernel, frontend, gate) = start_kernel();

    let a = frontend.send_shell(execute_request("gate fail", false));
    let b = frontend.send_execute_request("b");

    wait_for("queued request", || kernel.pending_executions() == 1);
    gate.send(()).unwrap();

    assert_eq!(frontend.recv_shell_execute_reply_exception(), 1);
    assert_eq!(frontend.recv_shell_execute_reply(), 2);
    frontend.recv_iopub_until_idle(&a);
    frontend.recv_iopub_until_idle(&b);

    frontend.assert_no_incoming();
}

#[test]
fn test_silent_execution_keeps_count() {
    let (_kernel, frontend, _gate) = start_kernel();

    let first = frontend.send_execute_request("1");
    assert_eq!(frontend.recv_shell_execute_reply(), 1);
    frontend.recv_iopub_until_idle(&first);

    let silent = frontend.send_shell(ExecuteRequest {
        silent: true,
        store_history: false,
        ..ExecuteRequest::new("quiet")
    });
    assert_eq!(frontend.recv_shell_execute_reply(), 1);

    // No input and no result are published for silent requests
    let messages = frontend.recv_iopub_until_idle(&silent);
    assert_eq!(messages.len(), 2);

    let second = frontend.send_execute_request("2");
    assert_eq!(frontend.recv_shell_execute_reply(), 2);
    frontend.recv_iopub_until_idle(&second);

    frontend.assert_no_incoming();
}

#[test]
fn test_shell_requests_during_execution() {
    let (_kernel, frontend, gate) = start_kernel();

    let id = frontend.send_execute_request("gate 1");

    // Answered while the execution is still blocked
    frontend.send_shell(KernelInfoRequest {});
    assert_matches!(frontend.recv_shell(), Message::KernelInfoReply(_));

    gate.send(()).unwrap();
    assert_eq!(frontend.recv_shell_execute_reply(), 1);

    let mut states = Vec::new();
    while states.len() < 4 {
        if let Message::Status(data) = frontend.recv_iopub() {
            states.push(data);
        }
    }
    let execution: Vec<_> = states
        .iter()
        .filter(|data| data.parent_header.as_ref().unwrap().msg_id == id)
        .map(|data| data.content.execution_state)
        .collect();
    assert_eq!(execution, vec![ExecutionState::Busy, ExecutionState::Idle]);
}

#[test]
fn test_interrupt_during_input() {
    let (_kernel, frontend, _gate) = start_kernel();

    let id = frontend.send_execute_request("input");
    let request = frontend.recv_stdin_input_request();
    assert_eq!(request.prompt, "? ");

    frontend.send_control(InterruptRequest {});
    assert_matches!(frontend.recv_control(), Message::InterruptReply(data) => {
        assert_eq!(data.content.status, Status::Ok);
    });
    assert_eq!(frontend.recv_shell_execute_reply_abort(), 1);
    frontend.recv_iopub_until_idle(&id);

    // A reply that arrives after the interrupt is not given to the next prompt
    frontend.send_stdin_input_reply("late");

    let id = frontend.send_execute_request("input");
    frontend.recv_stdin_input_request();
    frontend.send_stdin_input_reply("fresh");
    assert_eq!(frontend.recv_shell_execute_reply(), 2);

    let messages = frontend.recv_iopub_until_idle(&id);
    assert_matches!(&messages[2], Message::ExecuteResult(data) => {
        assert_eq!(data.content.data["text/plain"], Value::from("fresh"));
    });

    frontend.assert_no_incoming();
}

#[test]
fn test_interrupt_running_execution() {
    let (_kernel, frontend, _gate) = start_kernel();

    let id = frontend.send_execute_request("spin");
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();

    frontend.send_control(InterruptRequest {});
    assert_matches!(frontend.recv_control(), Message::InterruptReply(_));
    assert_eq!(frontend.recv_shell_execute_reply_abort(), 1);
    frontend.recv_iopub_until_idle(&id);

    // Interrupting an idle kernel is acknowledged and has no other effect
    frontend.send_control(InterruptRequest {});
    assert_matches!(frontend.recv_control(), Message::InterruptReply(_));

    let id = frontend.send_execute_request("next");
    assert_eq!(frontend.recv_shell_execute_reply(), 2);
    frontend.recv_iopub_until_idle(&id);

    frontend.assert_no_incoming();
}

#[test]
fn test_input_not_allowed() {
    let (_kernel, frontend, _gate) = start_kernel();

    frontend.send_shell(ExecuteRequest {
        allow_stdin: false,
        ..ExecuteRequest::new("input")
    });
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();
    frontend.recv_iopub_execute_error();
    assert_eq!(frontend.recv_shell_execute_reply_exception(), 1);
    frontend.recv_iopub_idle();

    frontend.assert_no_incoming();
}

#[test]
fn test_display_update() {
    let (kernel, frontend, _gate) = start_kernel();

    let run_display = || {
        let id = frontend.send_execute_request("display");
        frontend.recv_shell_execute_reply();
        frontend.recv_iopub_until_idle(&id)
    };

    let messages = run_display();
    let display_id = assert_matches!(&messages[2], Message::DisplayData(data) => {
        assert_eq!(data.content.data["text/plain"], Value::from("first"));
        data.content.transient.display_id.clone().unwrap()
    });
    for (msg, text) in messages[3..5].iter().zip(["second", "third"]) {
        assert_matches!(msg, Message::UpdateDisplayData(data) => {
            assert_eq!(data.content.data["text/plain"], Value::from(text));
            assert_eq!(data.content.transient.display_id, Some(display_id.clone()));
        });
    }
    assert!(kernel.registry().get(&display_id).is_some());

    // A fresh publish allocates a fresh id
    let messages = run_display();
    assert_matches!(&messages[2], Message::DisplayData(data) => {
        assert_ne!(data.content.transient.display_id, Some(display_id.clone()));
    });
    assert_eq!(kernel.registry().len(), 2);

    frontend.assert_no_incoming();
}

#[test]
fn test_deferred_display_updates() {
    let (_kernel, frontend, _gate) = start_kernel();
    let n = 20;

    let id = frontend.send_execute_request(&format!("defer {n}"));
    frontend.recv_shell_execute_reply();

    let mut pending: HashMap<String, String> = HashMap::new();
    let mut updated: HashMap<String, String> = HashMap::new();

    for msg in frontend.recv_iopub_until_idle(&id) {
        match msg {
            Message::DisplayData(data) => {
                let text = data.content.data["text/plain"].as_str().unwrap();
                let display_id = data.content.transient.display_id.unwrap();
                pending.insert(display_id, text.replace("pending", "done"));
            },
            Message::UpdateDisplayData(data) => {
                let text = data.content.data["text/plain"].as_str().unwrap();
                updated.insert(data.content.transient.display_id.unwrap(), String::from(text));
            },
            _ => {},
        }
    }
    assert_eq!(pending.len(), n);

    // Updates may arrive after the execution is over; they keep its parent
    while updated.len() < n {
        let msg = frontend.recv_iopub();
        assert_eq!(parent_id_of(&msg), Some(id.as_str()));
        assert_matches!(msg, Message::UpdateDisplayData(data) => {
            let text = data.content.data["text/plain"].as_str().unwrap();
            updated.insert(data.content.transient.display_id.unwrap(), String::from(text));
        });
    }

    assert_eq!(pending, updated);
    frontend.assert_no_incoming();
}

#[test]
fn test_background_updates_during_foreground_output() {
    let (_kernel, frontend, _gate) = start_kernel();
    let n = 10;

    let a = frontend.send_execute_request(&format!("defer {n}"));
    let b = frontend.send_execute_request("ticks 20");
    assert_eq!(frontend.recv_shell_execute_reply(), 1);
    assert_eq!(frontend.recv_shell_execute_reply(), 2);

    // Read until `b` is idle and every deferred update has arrived
    let mut messages = Vec::new();
    let mut foreground_done = false;
    let mut updates = 0;
    while !foreground_done || updates < n {
        let msg = frontend.recv_iopub();
        match &msg {
            Message::UpdateDisplayData(_) => updates += 1,
            Message::Status(data)
                if parent_id_of(&msg) == Some(b.as_str()) &&
                    data.content.execution_state == ExecutionState::Idle =>
            {
                foreground_done = true
            },
            _ => {},
        }
        messages.push(msg);
    }

    // Each display is shown before it is updated, under the request that
    // created it
    let mut shown: HashMap<String, usize> = HashMap::new();
    for (i, msg) in messages.iter().enumerate() {
        match msg {
            Message::DisplayData(data) => {
                assert_eq!(parent_id_of(msg), Some(a.as_str()));
                shown.insert(data.content.transient.display_id.clone().unwrap(), i);
            },
            Message::UpdateDisplayData(data) => {
                assert_eq!(parent_id_of(msg), Some(a.as_str()));
                let display_id = data.content.transient.display_id.clone().unwrap();
                assert!(shown.get(&display_id).is_some_and(|at| *at < i));
            },
            _ => {},
        }
    }
    assert_eq!(shown.len(), n);

    // The foreground sequence is intact, whatever got in between
    let foreground: Vec<&Message> = messages
        .iter()
        .filter(|msg| parent_id_of(msg) == Some(b.as_str()))
        .collect();
    assert_matches!(foreground[0], Message::Status(data) => {
        assert_eq!(data.content.execution_state, ExecutionState::Busy);
    });
    assert_matches!(foreground[1], Message::ExecuteInput(data) => {
        assert_eq!(data.content.execution_count, 2);
    });
    assert_matches!(foreground[foreground.len() - 1], Message::Status(data) => {
        assert_eq!(data.content.execution_state, ExecutionState::Idle);
    });

    let mut stdout = String::new();
    for msg in &foreground[2..foreground.len() - 1] {
        assert_matches!(msg, Message::Stream(data) => stdout.push_str(&data.content.text));
    }
    let expected: String = (0..20).map(|i| format!("tick {i}\n")).collect();
    assert_eq!(stdout, expected);

    frontend.assert_no_incoming();
}

#[test]
fn test_shell_extension_takes_precedence() {
    let (_kernel, frontend, _gate) = start_kernel_with(|mut handlers| {
        handlers.shell_extensions.push(Box::new(FnHandler::new(
            Channel::Shell,
            "is_complete_request",
            |msg, context| {
                let Message::IsCompleteRequest(req) = msg else {
                    return Ok(());
                };
                let reply = IsCompleteReply {
                    status: IsComplete::Invalid,
                    indent: String::from(""),
                };
                req.send_reply(reply, context.socket)
            },
        )));
        handlers
    });

    frontend.send_shell(IsCompleteRequest {
        code: String::from("1"),
    });
    assert_matches!(frontend.recv_shell(), Message::IsCompleteReply(reply) => {
        assert_eq!(reply.content.status, IsComplete::Invalid);
    });

    // Other requests still reach the built-in routing
    frontend.send_shell(KernelInfoRequest {});
    assert_matches!(frontend.recv_shell(), Message::KernelInfoReply(_));
    frontend.recv_iopub_busy();
    frontend.recv_iopub_idle();

    frontend.assert_no_incoming();
}

#[test]
fn test_heartbeat() {
    let (_kernel, frontend, _gate) = start_kernel();

    frontend.send_heartbeat(b"ping");
    assert_eq!(frontend.recv_heartbeat(), vec![b"ping".to_vec()]);
}

#[test]
fn test_shutdown() {
    let (kernel, frontend, _gate) = start_kernel();

    frontend.send_control(ShutdownRequest { restart: true });
    assert_matches!(frontend.recv_control(), Message::ShutdownReply(data) => {
        assert_eq!(data.content.status, Status::Ok);
        assert!(data.content.restart);
    });

    assert_matches!(kernel.wait(), Ok(()));
}

#[test]
fn test_worker_fault() {
    let (kernel, frontend, _gate) = start_kernel();

    frontend.send_execute_request("panic");
    assert_matches!(frontend.recv_shell(), Message::ExecuteReplyException(data) => {
        assert_eq!(data.content.exception.ename, "InternalError");
        assert!(data.content.exception.evalue.contains("executor exploded"));
    });

    assert_matches!(kernel.wait(), Err(Error::WorkerFault(message)) => {
        assert!(message.contains("executor exploded"));
    });
}

#[test]
fn test_tampered_messages_are_dropped() {
    let (_kernel, frontend, _gate) = start_kernel();

    fn signature_at(frames: &[Vec<u8>]) -> usize {
        frames
            .iter()
            .position(|frame| frame.as_slice() == MSG_DELIM)
            .unwrap() +
            1
    }

    // Wrong signature
    frontend.send_shell_altered(ExecuteRequest::new("1"), |frames| {
        let at = signature_at(frames);
        frames[at] = hex::encode([0u8; 32]).into_bytes();
    });

    // No signature
    frontend.send_shell_altered(ExecuteRequest::new("1"), |frames| {
        let at = signature_at(frames);
        frames[at] = Vec::new();
    });

    // Content changed after signing
    frontend.send_shell_altered(ExecuteRequest::new("1"), |frames| {
        let at = signature_at(frames);
        let mut content: Value = serde_json::from_slice(&frames[at + 4]).unwrap();
        content["code"] = Value::from("2");
        frames[at + 4] = serde_json::to_vec(&content).unwrap();
    });

    // Signed with another key
    let other = Session::create(&DummyFrontend::random_key()).unwrap();
    frontend.send_shell_altered(KernelInfoRequest {}, |frames| {
        let at = signature_at(frames);
        frames[at] = sign(&frames[at + 1..at + 5], &other.hmac).into_bytes();
    });

    // None of the above was answered or executed
    let id = frontend.send_execute_request("ok");
    assert_matches!(frontend.recv_shell(), Message::ExecuteReply(data) => {
        assert_eq!(data.parent_header.unwrap().msg_id, id);
        assert_eq!(data.content.execution_count, 1);
    });
    let messages = frontend.recv_iopub_until_idle(&id);
    assert_matches!(&messages[0], Message::Status(data) => {
        assert_eq!(data.content.execution_state, ExecutionState::Busy);
    });

    frontend.assert_no_incoming();
}

#[test]
fn test_unsigned_session() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (gate_tx, gate_rx) = unbounded();
    let (frontend, transports) = DummyFrontend::in_memory("");
    let session = Session::create("").unwrap();
    let _kernel = kernel::start("unsigned", session, transports, handlers(gate_rx));
    frontend.complete_initialization();

    frontend.send_execute_request("gate 42");
    gate_tx.send(()).unwrap();
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();
    assert_eq!(frontend.recv_iopub_execute_result(), "42");
    frontend.recv_shell_execute_reply();
    frontend.recv_iopub_idle();
}

#[test]
fn test_zmq_kernel() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (_gate_tx, gate_rx) = unbounded();
    let connection_file = ConnectionFile::local(DummyFrontend::random_key());
    let kernel = kernel::connect("zmq", connection_file, handlers(gate_rx)).unwrap();

    let bound = kernel.connection_file().unwrap();
    assert_ne!(bound.shell_port, 0);
    assert_ne!(bound.iopub_port, 0);

    let frontend = DummyFrontend::connect(bound);
    frontend.complete_initialization();

    frontend.send_shell(KernelInfoRequest {});
    assert_matches!(frontend.recv_shell(), Message::KernelInfoReply(_));
    frontend.recv_iopub_busy();
    frontend.recv_iopub_idle();

    frontend.send_execute_request("42");
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();
    assert_eq!(frontend.recv_iopub_execute_result(), "42");
    assert_eq!(frontend.recv_shell_execute_reply(), 1);
    frontend.recv_iopub_idle();

    frontend.send_heartbeat(b"ping");
    assert_eq!(frontend.recv_heartbeat(), vec![b"ping".to_vec()]);

    frontend.send_control(ShutdownRequest { restart: false });
    assert_matches!(frontend.recv_control(), Message::ShutdownReply(_));
    assert_matches!(kernel.wait(), Ok(()));
}
