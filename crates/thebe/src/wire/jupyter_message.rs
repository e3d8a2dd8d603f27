/*
 * jupyter_message.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::session::Session;
use crate::socket::socket::Socket;
use crate::wire::complete_reply::CompleteReply;
use crate::wire::complete_request::CompleteRequest;
use crate::wire::display_data::DisplayData;
use crate::wire::error_reply::ErrorReply;
use crate::wire::exception::Exception;
use crate::wire::execute_error::ExecuteError;
use crate::wire::execute_input::ExecuteInput;
use crate::wire::execute_reply::ExecuteReply;
use crate::wire::execute_reply_exception::ExecuteReplyException;
use crate::wire::execute_request::ExecuteRequest;
use crate::wire::execute_result::ExecuteResult;
use crate::wire::header::JupyterHeader;
use crate::wire::input_reply::InputReply;
use crate::wire::input_request::InputRequest;
use crate::wire::inspect_reply::InspectReply;
use crate::wire::inspect_request::InspectRequest;
use crate::wire::interrupt_reply::InterruptReply;
use crate::wire::interrupt_request::InterruptRequest;
use crate::wire::is_complete_reply::IsCompleteReply;
use crate::wire::is_complete_request::IsCompleteRequest;
use crate::wire::kernel_info_reply::KernelInfoReplyFull;
use crate::wire::kernel_info_request::KernelInfoRequest;
use crate::wire::originator::Originator;
use crate::wire::shutdown_reply::ShutdownReply;
use crate::wire::shutdown_request::ShutdownRequest;
use crate::wire::status::KernelStatus;
use crate::wire::stream::StreamOutput;
use crate::wire::update_display_data::UpdateDisplayData;
use crate::wire::wire_message::WireMessage;

/// Represents a Jupyter message
#[derive(Debug, Clone)]
pub struct JupyterMessage<T> {
    /// The ZeroMQ identities (for ROUTER sockets)
    pub zmq_identities: Vec<Vec<u8>>,

    /// The header for this message
    pub header: JupyterHeader,

    /// The header of the message from which this message originated. Optional;
    /// not all messages have a parent.
    pub parent_header: Option<JupyterHeader>,

    /// Additional metadata; an empty object unless the sender supplied one
    pub metadata: Value,

    /// The body (payload) of the message
    pub content: T,
}

/// Trait used to extract the wire message type from a Jupyter message
pub trait MessageType {
    fn message_type() -> String;
}

/// Convenience trait for grouping traits that must be present on all Jupyter
/// protocol messages
pub trait ProtocolMessage: MessageType + Serialize + std::fmt::Debug + Clone {}
impl<T> ProtocolMessage for T where T: MessageType + Serialize + std::fmt::Debug + Clone {}

/// List of all known/implemented messages
#[derive(Debug)]
pub enum Message {
    // Shell
    KernelInfoReply(JupyterMessage<KernelInfoReplyFull>),
    KernelInfoRequest(JupyterMessage<KernelInfoRequest>),
    CompleteReply(JupyterMessage<CompleteReply>),
    CompleteRequest(JupyterMessage<CompleteRequest>),
    ExecuteReply(JupyterMessage<ExecuteReply>),
    ExecuteReplyException(JupyterMessage<ExecuteReplyException>),
    ExecuteRequest(JupyterMessage<ExecuteRequest>),
    InspectReply(JupyterMessage<InspectReply>),
    InspectRequest(JupyterMessage<InspectRequest>),
    IsCompleteReply(JupyterMessage<IsCompleteReply>),
    IsCompleteRequest(JupyterMessage<IsCompleteRequest>),
    // Stdin
    InputReply(JupyterMessage<InputReply>),
    InputRequest(JupyterMessage<InputRequest>),
    // Control
    InterruptReply(JupyterMessage<InterruptReply>),
    InterruptRequest(JupyterMessage<InterruptRequest>),
    ShutdownReply(JupyterMessage<ShutdownReply>),
    ShutdownRequest(JupyterMessage<ShutdownRequest>),
    // IOPub
    Status(JupyterMessage<KernelStatus>),
    ExecuteResult(JupyterMessage<ExecuteResult>),
    ExecuteError(JupyterMessage<ExecuteError>),
    ExecuteInput(JupyterMessage<ExecuteInput>),
    Stream(JupyterMessage<StreamOutput>),
    DisplayData(JupyterMessage<DisplayData>),
    UpdateDisplayData(JupyterMessage<UpdateDisplayData>),
}

/// Represents status returned from kernel inside messages.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Error,
    Abort,
}

impl Message {
    /// The wire message type, e.g. `"execute_request"`
    pub fn message_type(&self) -> String {
        self.header().msg_type.clone()
    }

    pub fn header(&self) -> &JupyterHeader {
        match self {
            Message::KernelInfoReply(msg) => &msg.header,
            Message::KernelInfoRequest(msg) => &msg.header,
            Message::CompleteReply(msg) => &msg.header,
            Message::CompleteRequest(msg) => &msg.header,
            Message::ExecuteReply(msg) => &msg.header,
            Message::ExecuteReplyException(msg) => &msg.header,
            Message::ExecuteRequest(msg) => &msg.header,
            Message::InspectReply(msg) => &msg.header,
            Message::InspectRequest(msg) => &msg.header,
            Message::IsCompleteReply(msg) => &msg.header,
            Message::IsCompleteRequest(msg) => &msg.header,
            Message::InputReply(msg) => &msg.header,
            Message::InputRequest(msg) => &msg.header,
            Message::InterruptReply(msg) => &msg.header,
            Message::InterruptRequest(msg) => &msg.header,
            Message::ShutdownReply(msg) => &msg.header,
            Message::ShutdownRequest(msg) => &msg.header,
            Message::Status(msg) => &msg.header,
            Message::ExecuteResult(msg) => &msg.header,
            Message::ExecuteError(msg) => &msg.header,
            Message::ExecuteInput(msg) => &msg.header,
            Message::Stream(msg) => &msg.header,
            Message::DisplayData(msg) => &msg.header,
            Message::UpdateDisplayData(msg) => &msg.header,
        }
    }

    /// The header of the request this message answers or was produced for
    pub fn parent_header(&self) -> Option<&JupyterHeader> {
        match self {
            Message::KernelInfoReply(msg) => msg.parent_header.as_ref(),
            Message::KernelInfoRequest(msg) => msg.parent_header.as_ref(),
            Message::CompleteReply(msg) => msg.parent_header.as_ref(),
            Message::CompleteRequest(msg) => msg.parent_header.as_ref(),
            Message::ExecuteReply(msg) => msg.parent_header.as_ref(),
            Message::ExecuteReplyException(msg) => msg.parent_header.as_ref(),
            Message::ExecuteRequest(msg) => msg.parent_header.as_ref(),
            Message::InspectReply(msg) => msg.parent_header.as_ref(),
            Message::InspectRequest(msg) => msg.parent_header.as_ref(),
            Message::IsCompleteReply(msg) => msg.parent_header.as_ref(),
            Message::IsCompleteRequest(msg) => msg.parent_header.as_ref(),
            Message::InputReply(msg) => msg.parent_header.as_ref(),
            Message::InputRequest(msg) => msg.parent_header.as_ref(),
            Message::InterruptReply(msg) => msg.parent_header.as_ref(),
            Message::InterruptRequest(msg) => msg.parent_header.as_ref(),
            Message::ShutdownReply(msg) => msg.parent_header.as_ref(),
            Message::ShutdownRequest(msg) => msg.parent_header.as_ref(),
            Message::Status(msg) => msg.parent_header.as_ref(),
            Message::ExecuteResult(msg) => msg.parent_header.as_ref(),
            Message::ExecuteError(msg) => msg.parent_header.as_ref(),
            Message::ExecuteInput(msg) => msg.parent_header.as_ref(),
            Message::Stream(msg) => msg.parent_header.as_ref(),
            Message::DisplayData(msg) => msg.parent_header.as_ref(),
            Message::UpdateDisplayData(msg) => msg.parent_header.as_ref(),
        }
    }

    pub fn read_from_socket(socket: &Socket) -> Result<Self, Error> {
        let msg = WireMessage::read_from_socket(socket)?;
        Message::try_from(&msg)
    }

    pub fn send(&self, socket: &Socket) -> Result<(), Error> {
        let msg = WireMessage::try_from(self)?;
        msg.send(socket)?;
        Ok(())
    }
}

/// Conversion from a `Message` to a `WireMessage`; used to send messages over a
/// socket
impl TryFrom<&Message> for WireMessage {
    type Error = crate::error::Error;

    fn try_from(msg: &Message) -> Result<Self, Error> {
        match msg {
            Message::KernelInfoReply(msg) => WireMessage::try_from(msg),
            Message::KernelInfoRequest(msg) => WireMessage::try_from(msg),
            Message::CompleteReply(msg) => WireMessage::try_from(msg),
            Message::CompleteRequest(msg) => WireMessage::try_from(msg),
            Message::ExecuteReply(msg) => WireMessage::try_from(msg),
            Message::ExecuteReplyException(msg) => WireMessage::try_from(msg),
            Message::ExecuteRequest(msg) => WireMessage::try_from(msg),
            Message::InspectReply(msg) => WireMessage::try_from(msg),
            Message::InspectRequest(msg) => WireMessage::try_from(msg),
            Message::IsCompleteReply(msg) => WireMessage::try_from(msg),
            Message::IsCompleteRequest(msg) => WireMessage::try_from(msg),
            Message::InputReply(msg) => WireMessage::try_from(msg),
            Message::InputRequest(msg) => WireMessage::try_from(msg),
            Message::InterruptReply(msg) => WireMessage::try_from(msg),
            Message::InterruptRequest(msg) => WireMessage::try_from(msg),
            Message::ShutdownReply(msg) => WireMessage::try_from(msg),
            Message::ShutdownRequest(msg) => WireMessage::try_from(msg),
            Message::Status(msg) => WireMessage::try_from(msg),
            Message::ExecuteResult(msg) => WireMessage::try_from(msg),
            Message::ExecuteError(msg) => WireMessage::try_from(msg),
            Message::ExecuteInput(msg) => WireMessage::try_from(msg),
            Message::Stream(msg) => WireMessage::try_from(msg),
            Message::DisplayData(msg) => WireMessage::try_from(msg),
            Message::UpdateDisplayData(msg) => WireMessage::try_from(msg),
        }
    }
}

impl TryFrom<&WireMessage> for Message {
    type Error = crate::error::Error;

    /// Converts from a wire message to a Jupyter message by examining the message
    /// type and attempting to coerce the content into the appropriate
    /// structure.
    fn try_from(msg: &WireMessage) -> Result<Self, Error> {
        let kind = msg.header.msg_type.clone();

        if kind == KernelInfoRequest::message_type() {
            return Ok(Message::KernelInfoRequest(JupyterMessage::try_from(msg)?));
        }
        if kind == KernelInfoReplyFull::message_type() {
            return Ok(Message::KernelInfoReply(JupyterMessage::try_from(msg)?));
        }
        if kind == IsCompleteRequest::message_type() {
            return Ok(Message::IsCompleteRequest(JupyterMessage::try_from(msg)?));
        }
        if kind == IsCompleteReply::message_type() {
            return Ok(Message::IsCompleteReply(JupyterMessage::try_from(msg)?));
        }
        if kind == InspectRequest::message_type() {
            return Ok(Message::InspectRequest(JupyterMessage::try_from(msg)?));
        }
        if kind == InspectReply::message_type() {
            return Ok(Message::InspectReply(JupyterMessage::try_from(msg)?));
        }
        if kind == ExecuteReplyException::message_type() {
            if let Ok(data) = JupyterMessage::try_from(msg) {
                return Ok(Message::ExecuteReplyException(data));
            }
            // Not an error reply; fall through to `ExecuteReply`, which shares
            // the message type
        }
        if kind == ExecuteReply::message_type() {
            return Ok(Message::ExecuteReply(JupyterMessage::try_from(msg)?));
        }
        if kind == ExecuteRequest::message_type() {
            return Ok(Message::ExecuteRequest(JupyterMessage::try_from(msg)?));
        }
        if kind == ExecuteResult::message_type() {
            return Ok(Message::ExecuteResult(JupyterMessage::try_from(msg)?));
        }
        if kind == ExecuteError::message_type() {
            return Ok(Message::ExecuteError(JupyterMessage::try_from(msg)?));
        }
        if kind == ExecuteInput::message_type() {
            return Ok(Message::ExecuteInput(JupyterMessage::try_from(msg)?));
        }
        if kind == CompleteRequest::message_type() {
            return Ok(Message::CompleteRequest(JupyterMessage::try_from(msg)?));
        }
        if kind == CompleteReply::message_type() {
            return Ok(Message::CompleteReply(JupyterMessage::try_from(msg)?));
        }
        if kind == DisplayData::message_type() {
            return Ok(Message::DisplayData(JupyterMessage::try_from(msg)?));
        }
        if kind == UpdateDisplayData::message_type() {
            return Ok(Message::UpdateDisplayData(JupyterMessage::try_from(msg)?));
        }
        if kind == ShutdownRequest::message_type() {
            return Ok(Message::ShutdownRequest(JupyterMessage::try_from(msg)?));
        }
        if kind == ShutdownReply::message_type() {
            return Ok(Message::ShutdownReply(JupyterMessage::try_from(msg)?));
        }
        if kind == KernelStatus::message_type() {
            return Ok(Message::Status(JupyterMessage::try_from(msg)?));
        }
        if kind == InterruptRequest::message_type() {
            return Ok(Message::InterruptRequest(JupyterMessage::try_from(msg)?));
        }
        if kind == InterruptReply::message_type() {
            return Ok(Message::InterruptReply(JupyterMessage::try_from(msg)?));
        }
        if kind == InputReply::message_type() {
            return Ok(Message::InputReply(JupyterMessage::try_from(msg)?));
        }
        if kind == InputRequest::message_type() {
            return Ok(Message::InputRequest(JupyterMessage::try_from(msg)?));
        }
        if kind == StreamOutput::message_type() {
            return Ok(Message::Stream(JupyterMessage::try_from(msg)?));
        }
        return Err(Error::UnknownMessageType(kind));
    }
}

impl<T> JupyterMessage<T>
where
    T: ProtocolMessage,
{
    /// Sends this Jupyter message to the designated socket.
    pub fn send(self, socket: &Socket) -> Result<(), Error> {
        let msg = WireMessage::try_from(&self)?;
        msg.send(socket)?;
        Ok(())
    }

    /// Create a new Jupyter message, optionally as a child (reply) to an
    /// existing message.
    pub fn create(
        content: T,
        parent: Option<JupyterHeader>,
        session: &Session,
    ) -> JupyterMessage<T> {
        JupyterMessage::<T> {
            zmq_identities: Vec::new(),
            header: JupyterHeader::create(
                T::message_type(),
                session.session_id.clone(),
                session.username.clone(),
            ),
            parent_header: parent,
            metadata: empty_metadata(),
            content,
        }
    }

    /// Create a new Jupyter message addressed to a specific ZeroMQ peer.
    pub fn create_with_identity(
        originator: Originator,
        content: T,
        session: &Session,
    ) -> JupyterMessage<T> {
        JupyterMessage::<T> {
            zmq_identities: originator.zmq_identities,
            header: JupyterHeader::create(
                T::message_type(),
                session.session_id.clone(),
                session.username.clone(),
            ),
            parent_header: Some(originator.header),
            metadata: empty_metadata(),
            content,
        }
    }

    /// Sends a reply to the message; convenience method combining creating the
    /// reply and sending it.
    pub fn send_reply<R: ProtocolMessage>(&self, content: R, socket: &Socket) -> crate::Result<()> {
        let reply = self.create_reply(content, &socket.session);
        reply.send(socket)
    }

    /// Sends an error reply to the message.
    pub fn send_error<R: ProtocolMessage>(
        &self,
        exception: Exception,
        socket: &Socket,
    ) -> crate::Result<()> {
        let reply = self.error_reply::<R>(exception, &socket.session);
        reply.send(socket)
    }

    /// Create a reply to this message with the given content.
    pub fn create_reply<R: ProtocolMessage>(
        &self,
        content: R,
        session: &Session,
    ) -> JupyterMessage<R> {
        // The reply uses the kernel session (given as an argument), not the
        // client session recorded in the request header
        JupyterMessage::<R> {
            zmq_identities: self.zmq_identities.clone(),
            header: JupyterHeader::create(
                R::message_type(),
                session.session_id.clone(),
                session.username.clone(),
            ),
            parent_header: Some(self.header.clone()),
            metadata: empty_metadata(),
            content,
        }
    }

    /// Creates an error reply to this message; used on ROUTER/DEALER sockets to
    /// indicate that an error occurred while processing a Request message.
    ///
    /// Error replies are special cases; they use the message type of a
    /// successful reply, but their content is an Exception instead.
    pub fn error_reply<R: ProtocolMessage>(
        &self,
        exception: Exception,
        session: &Session,
    ) -> JupyterMessage<ErrorReply> {
        JupyterMessage::<ErrorReply> {
            zmq_identities: self.zmq_identities.clone(),
            header: JupyterHeader::create(
                R::message_type(),
                session.session_id.clone(),
                session.username.clone(),
            ),
            parent_header: Some(self.header.clone()),
            metadata: empty_metadata(),
            content: ErrorReply {
                status: Status::Error,
                exception,
            },
        }
    }
}

pub(crate) fn empty_metadata() -> Value {
    Value::Object(serde_json::Map::new())
}
