/*
 * dummy_frontend.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::cell::RefCell;
use std::collections::VecDeque;

use assert_matches::assert_matches;
use serde_json::Value;

use crate::connection_file::ConnectionFile;
use crate::kernel::KernelTransports;
use crate::session::Session;
use crate::socket::memory::MemoryTransport;
use crate::socket::socket::Socket;
use crate::socket::transport::Transport;
use crate::socket::transport::ZmqTransport;
use crate::wire::execute_input::ExecuteInput;
use crate::wire::execute_request::ExecuteRequest;
use crate::wire::input_reply::InputReply;
use crate::wire::input_request::InputRequest;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::Message;
use crate::wire::jupyter_message::ProtocolMessage;
use crate::wire::jupyter_message::Status;
use crate::wire::status::ExecutionState;
use crate::wire::stream::Stream;
use crate::wire::wire_message::WireMessage;

/// How long to wait for the kernel before failing a test
const RECV_TIMEOUT_MS: i64 = 5000;

/// A synthetic frontend for driving a kernel in tests
pub struct DummyFrontend {
    pub control_socket: Socket,
    pub shell_socket: Socket,
    pub iopub_socket: Socket,
    pub stdin_socket: Socket,
    pub heartbeat_socket: Socket,
    session: Session,

    /// IOPub messages received while waiting for another execution's output
    iopub_backlog: RefCell<VecDeque<Message>>,
}

impl DummyFrontend {
    /// A random HMAC key for signing messages
    pub fn random_key() -> String {
        use rand::Rng;
        let key_bytes = rand::thread_rng().gen::<[u8; 16]>();
        hex::encode(key_bytes)
    }

    /// Creates a frontend connected to in-process transports. Returns the
    /// kernel ends of the transports, to be given to `kernel::start()`.
    pub fn in_memory(key: &str) -> (Self, KernelTransports) {
        let session = Session::create(key).unwrap();

        let (shell_kernel, shell) = MemoryTransport::pair("Shell");
        let (control_kernel, control) = MemoryTransport::pair("Control");
        let (iopub_kernel, iopub) = MemoryTransport::pair("IOPub");
        let (stdin_kernel, stdin) = MemoryTransport::pair("Stdin");
        let (heartbeat_kernel, heartbeat) = MemoryTransport::pair("Heartbeat");

        let transports = KernelTransports {
            shell: Box::new(shell_kernel),
            control: Box::new(control_kernel),
            iopub: Box::new(iopub_kernel),
            stdin: Box::new(stdin_kernel),
            heartbeat: Box::new(heartbeat_kernel),
        };

        let frontend = Self::from_transports(
            session,
            Box::new(shell),
            Box::new(control),
            Box::new(iopub),
            Box::new(stdin),
            Box::new(heartbeat),
        );

        (frontend, transports)
    }

    /// Connects to a kernel listening on the ports of `connection_file`
    pub fn connect(connection_file: &ConnectionFile) -> Self {
        use rand::Rng;

        let session = Session::create(connection_file.key.as_str()).unwrap();
        let ctx = zmq::Context::new();

        // Per the Jupyter protocol, Shell and Stdin share a ZeroMQ identity
        let shell_id = rand::thread_rng().gen::<[u8; 16]>();

        let connect = |name: &str, kind: zmq::SocketType, identity: Option<&[u8]>, port: u16| {
            ZmqTransport::new(
                &ctx,
                String::from(name),
                kind,
                identity,
                connection_file.endpoint(port),
            )
            .unwrap()
        };

        let shell = connect("Shell", zmq::DEALER, Some(&shell_id), connection_file.shell_port);
        let control = connect("Control", zmq::DEALER, None, connection_file.control_port);
        let iopub = connect("IOPub", zmq::SUB, None, connection_file.iopub_port);
        let stdin = connect("Stdin", zmq::DEALER, Some(&shell_id), connection_file.stdin_port);
        let heartbeat = connect("Heartbeat", zmq::REQ, None, connection_file.hb_port);

        Self::from_transports(
            session,
            Box::new(shell),
            Box::new(control),
            Box::new(iopub),
            Box::new(stdin),
            Box::new(heartbeat),
        )
    }

    fn from_transports(
        session: Session,
        shell: Box<dyn Transport>,
        control: Box<dyn Transport>,
        iopub: Box<dyn Transport>,
        stdin: Box<dyn Transport>,
        heartbeat: Box<dyn Transport>,
    ) -> Self {
        Self {
            control_socket: Socket::new(session.clone(), control),
            shell_socket: Socket::new(session.clone(), shell),
            iopub_socket: Socket::new(session.clone(), iopub),
            stdin_socket: Socket::new(session.clone(), stdin),
            heartbeat_socket: Socket::new(session.clone(), heartbeat),
            session,
            iopub_backlog: RefCell::new(VecDeque::new()),
        }
    }

    /// Completes initialization of the frontend by consuming the kernel's
    /// `starting` status
    pub fn complete_initialization(&self) {
        let msg = self.recv_iopub();
        assert_matches!(msg, Message::Status(data) => {
            assert_eq!(data.content.execution_state, ExecutionState::Starting);
            assert!(data.parent_header.is_none());
        });
    }

    /// Sends a Jupyter message on the Shell socket; returns the ID of the newly
    /// created message
    pub fn send_shell<T: ProtocolMessage>(&self, msg: T) -> String {
        Self::send(&self.shell_socket, msg, &self.session)
    }

    /// Sends a Jupyter message on the Control socket; returns the ID of the
    /// newly created message
    pub fn send_control<T: ProtocolMessage>(&self, msg: T) -> String {
        Self::send(&self.control_socket, msg, &self.session)
    }

    /// Sends a Jupyter message on the Stdin socket
    pub fn send_stdin<T: ProtocolMessage>(&self, msg: T) {
        Self::send(&self.stdin_socket, msg, &self.session);
    }

    fn send<T: ProtocolMessage>(socket: &Socket, msg: T, session: &Session) -> String {
        let message = JupyterMessage::create(msg, None, session);
        let id = message.header.msg_id.clone();
        message.send(socket).unwrap();
        id
    }

    /// Sends a Jupyter message on the Shell socket, letting `alter` change the
    /// frames after they are signed. Returns the ID of the message.
    pub fn send_shell_altered<T: ProtocolMessage>(
        &self,
        msg: T,
        alter: impl FnOnce(&mut Vec<Vec<u8>>),
    ) -> String {
        let message = JupyterMessage::create(msg, None, &self.session);
        let id = message.header.msg_id.clone();
        let mut frames = WireMessage::try_from(&message)
            .unwrap()
            .to_frames(&self.session.hmac)
            .unwrap();
        alter(&mut frames);
        self.shell_socket.send_multipart(&frames).unwrap();
        id
    }

    /// Sends a visible execute request with the protocol defaults
    pub fn send_execute_request(&self, code: &str) -> String {
        self.send_shell(ExecuteRequest::new(code))
    }

    /// Answers an `input_request`. Like real frontends, the reply has no
    /// parent header.
    pub fn send_stdin_input_reply(&self, value: &str) {
        self.send_stdin(InputReply {
            value: String::from(value),
        })
    }

    pub fn recv(&self, socket: &Socket) -> Message {
        // It's important to wait with a timeout because the kernel thread might
        // have panicked, preventing it from sending the expected message. The
        // tests would then hang indefinitely.
        if socket.poll_incoming(RECV_TIMEOUT_MS).unwrap() {
            return Message::read_from_socket(socket).unwrap();
        }

        panic!("Timeout while expecting message on socket {}", socket.name);
    }

    /// Receives a Jupyter message from the Shell socket
    pub fn recv_shell(&self) -> Message {
        self.recv(&self.shell_socket)
    }

    /// Receives a Jupyter message from the Control socket
    pub fn recv_control(&self) -> Message {
        self.recv(&self.control_socket)
    }

    /// Receives a Jupyter message from the IOPub socket
    pub fn recv_iopub(&self) -> Message {
        if let Some(msg) = self.iopub_backlog.borrow_mut().pop_front() {
            return msg;
        }
        self.recv(&self.iopub_socket)
    }

    /// Receives a Jupyter message from the Stdin socket
    pub fn recv_stdin(&self) -> Message {
        self.recv(&self.stdin_socket)
    }

    /// Receives IOPub messages produced for the request `parent_id`, up to and
    /// including its `idle` status. Messages for other requests are kept for
    /// later `recv_iopub()` calls.
    pub fn recv_iopub_until_idle(&self, parent_id: &str) -> Vec<Message> {
        let mut messages = Vec::new();
        let mut others = VecDeque::new();

        loop {
            let msg = self.recv_iopub();
            if parent_id_of(&msg) != Some(parent_id) {
                others.push_back(msg);
                continue;
            }

            let done = matches!(
                &msg,
                Message::Status(data) if data.content.execution_state == ExecutionState::Idle
            );
            messages.push(msg);
            if done {
                break;
            }
        }

        let mut backlog = self.iopub_backlog.borrow_mut();
        while let Some(msg) = others.pop_back() {
            backlog.push_front(msg);
        }

        messages
    }

    /// Receive from Shell and assert `ExecuteReply` message.
    /// Returns `execution_count`.
    pub fn recv_shell_execute_reply(&self) -> u32 {
        let msg = self.recv_shell();

        assert_matches!(msg, Message::ExecuteReply(data) => {
            assert_eq!(data.content.status, Status::Ok);
            data.content.execution_count
        })
    }

    /// Receive from Shell and assert `ExecuteReplyException` message.
    /// Returns `execution_count`.
    pub fn recv_shell_execute_reply_exception(&self) -> u32 {
        let msg = self.recv_shell();

        assert_matches!(msg, Message::ExecuteReplyException(data) => {
            assert_eq!(data.content.status, Status::Error);
            data.content.execution_count
        })
    }

    /// Receive from Shell and assert an aborted `ExecuteReply` message.
    /// Returns `execution_count`.
    pub fn recv_shell_execute_reply_abort(&self) -> u32 {
        let msg = self.recv_shell();

        assert_matches!(msg, Message::ExecuteReply(data) => {
            assert_eq!(data.content.status, Status::Abort);
            data.content.execution_count
        })
    }

    /// Receive from IOPub and assert Busy message
    pub fn recv_iopub_busy(&self) {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::Status(data) => {
            assert_eq!(data.content.execution_state, ExecutionState::Busy);
        });
    }

    /// Receive from IOPub and assert Idle message
    pub fn recv_iopub_idle(&self) {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::Status(data) => {
            assert_eq!(data.content.execution_state, ExecutionState::Idle);
        });
    }

    /// Receive from IOPub and assert ExecuteInput message
    pub fn recv_iopub_execute_input(&self) -> ExecuteInput {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::ExecuteInput(data) => {
            data.content
        })
    }

    /// Receive from IOPub and assert ExecuteResult message. Returns compulsory
    /// `plain/text` result.
    pub fn recv_iopub_execute_result(&self) -> String {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::ExecuteResult(data) => {
            assert_matches!(data.content.data["text/plain"], Value::String(ref string) => {
                string.clone()
            })
        })
    }

    pub fn recv_iopub_stream_stdout(&self) -> String {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::Stream(data) => {
            assert_eq!(data.content.name, Stream::Stdout);
            data.content.text
        })
    }

    pub fn recv_iopub_stream_stderr(&self) -> String {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::Stream(data) => {
            assert_eq!(data.content.name, Stream::Stderr);
            data.content.text
        })
    }

    /// Receive from IOPub and assert ExecuteError message. Returns compulsory
    /// `evalue` field.
    pub fn recv_iopub_execute_error(&self) -> String {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::ExecuteError(data) => {
            data.content.exception.evalue
        })
    }

    /// Receive from Stdin and assert `InputRequest` message
    pub fn recv_stdin_input_request(&self) -> InputRequest {
        let msg = self.recv_stdin();

        assert_matches!(msg, Message::InputRequest(data) => {
            data.content
        })
    }

    /// Receives a (raw) message from the heartbeat socket
    pub fn recv_heartbeat(&self) -> Vec<Vec<u8>> {
        if self.heartbeat_socket.poll_incoming(RECV_TIMEOUT_MS).unwrap() {
            return self.heartbeat_socket.recv_multipart().unwrap();
        }
        panic!("Timeout while expecting heartbeat echo");
    }

    /// Sends a (raw) message to the heartbeat socket
    pub fn send_heartbeat(&self, data: &[u8]) {
        self.heartbeat_socket
            .send_multipart(&[data.to_vec()])
            .unwrap();
    }

    /// Asserts that no socket has incoming data
    pub fn assert_no_incoming(&self) {
        let mut has_incoming = false;

        if !self.iopub_backlog.borrow().is_empty() {
            has_incoming = true;
            println!("IOPub has unread messages:");
            for msg in self.iopub_backlog.borrow().iter() {
                dbg!(msg);
            }
        }
        if self.iopub_socket.has_incoming_data().unwrap() {
            has_incoming = true;
            Self::flush_incoming("IOPub", &self.iopub_socket);
        }
        if self.shell_socket.has_incoming_data().unwrap() {
            has_incoming = true;
            Self::flush_incoming("Shell", &self.shell_socket);
        }
        if self.control_socket.has_incoming_data().unwrap() {
            has_incoming = true;
            Self::flush_incoming("Control", &self.control_socket);
        }
        if self.stdin_socket.has_incoming_data().unwrap() {
            has_incoming = true;
            Self::flush_incoming("StdIn", &self.stdin_socket);
        }

        if has_incoming {
            panic!("Sockets must be empty on exit (see details above)");
        }
    }

    fn flush_incoming(name: &str, socket: &Socket) {
        println!("{name} has incoming data:");

        while socket.has_incoming_data().unwrap() {
            dbg!(WireMessage::read_from_socket(socket).unwrap());
            println!("---");
        }
    }
}

/// The `msg_id` of the request a message was produced for
pub fn parent_id_of(msg: &Message) -> Option<&str> {
    msg.parent_header().map(|header| header.msg_id.as_str())
}
