/*
 * error.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::fmt;

use crate::wire::jupyter_message::Message;

/// Type representing all errors that can occur inside the Thebe implementation.
#[derive(Debug)]
pub enum Error {
    MissingDelimiter,
    InsufficientParts(usize, usize),
    InvalidHmac(Vec<u8>, hex::FromHexError),
    BadSignature(Vec<u8>, hmac::digest::MacError),
    Utf8Error(String, Vec<u8>, std::str::Utf8Error),
    JsonParseError(String, String, serde_json::Error),
    InvalidPart(String, serde_json::Value, serde_json::Error),
    InvalidMessage(String, serde_json::Value, serde_json::Error),
    CannotSerialize(serde_json::Error),
    UnknownMessageType(String),
    UnsupportedMessage(Message, String),
    HmacKeyInvalid(String, hmac::digest::InvalidLength),
    CreateSocketFailed(String, zmq::Error),
    SocketBindError(String, String, zmq::Error),
    SocketConnectError(String, String, zmq::Error),
    UnsupportedSocketType(zmq::SocketType),
    ZmqError(String, zmq::Error),
    Disconnected(String),
    SendError(String),
    ReceiveError(String),
    Interrupted,
    StdinNotAllowed,
    WorkerFault(String),
    Anyhow(anyhow::Error),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingDelimiter => {
                write!(
                    f,
                    "ZeroMQ message did not include expected <IDS|MSG> delimiter"
                )
            },
            Error::InsufficientParts(found, expected) => {
                write!(
                    f,
                    "ZeroMQ message did not contain sufficient parts (found {found}, expected {expected})"
                )
            },
            Error::InvalidHmac(data, err) => {
                write!(
                    f,
                    "ZeroMQ message HMAC signature {data:?} is not a valid hexadecimal value: {err}"
                )
            },
            Error::BadSignature(sig, err) => {
                write!(f, "ZeroMQ message HMAC signature {sig:?} is incorrect: {err}")
            },
            Error::Utf8Error(part, data, err) => {
                write!(
                    f,
                    "Message part '{part}' was not valid UTF-8: {err} (raw: {data:?})"
                )
            },
            Error::JsonParseError(part, str, err) => {
                write!(f, "Message part '{part}' is invalid JSON: {err} (raw: {str})")
            },
            Error::InvalidPart(part, json, err) => {
                write!(
                    f,
                    "Message part '{part}' does not match schema: {err} (raw: {json})"
                )
            },
            Error::InvalidMessage(kind, json, err) => {
                write!(f, "Invalid '{kind}' message: {err} (raw: {json})")
            },
            Error::CannotSerialize(err) => {
                write!(f, "Cannot serialize message: {err}")
            },
            Error::UnknownMessageType(kind) => {
                write!(f, "Unknown message type '{kind}'")
            },
            Error::UnsupportedMessage(msg, socket) => {
                write!(f, "Unsupported message received on '{socket}': {msg:?}")
            },
            Error::HmacKeyInvalid(str, err) => {
                write!(
                    f,
                    "The HMAC supplied signing key '{}' ({} bytes) cannot be used: {}",
                    str,
                    str.len(),
                    err
                )
            },
            Error::CreateSocketFailed(name, err) => {
                write!(f, "Could not create ZeroMQ socket '{name}': {err}")
            },
            Error::SocketBindError(name, endpoint, err) => {
                write!(
                    f,
                    "Could not bind to ZeroMQ socket '{name}' at '{endpoint}': {err}"
                )
            },
            Error::SocketConnectError(name, endpoint, err) => {
                write!(
                    f,
                    "Could not connect to ZeroMQ socket '{name}' at '{endpoint}': {err}"
                )
            },
            Error::UnsupportedSocketType(kind) => {
                write!(f, "Unsupported ZeroMQ socket type: {kind:?}")
            },
            Error::ZmqError(name, err) => {
                write!(f, "ZeroMQ error on '{name}' socket: {err}")
            },
            Error::Disconnected(name) => {
                write!(f, "The '{name}' transport is disconnected")
            },
            Error::SendError(msg) => {
                write!(f, "Could not send message: {msg}")
            },
            Error::ReceiveError(msg) => {
                write!(f, "Could not receive message: {msg}")
            },
            Error::Interrupted => {
                write!(f, "Execution was interrupted")
            },
            Error::StdinNotAllowed => {
                write!(f, "The frontend does not accept input requests")
            },
            Error::WorkerFault(msg) => {
                write!(f, "The execution worker failed: {msg}")
            },
            Error::Anyhow(err) => {
                write!(f, "{err:?}")
            },
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Self::Anyhow(error)
    }
}

impl<T: fmt::Debug> From<crossbeam::channel::SendError<T>> for Error {
    fn from(err: crossbeam::channel::SendError<T>) -> Self {
        Self::SendError(format!("{err:?}"))
    }
}

impl From<crossbeam::channel::RecvError> for Error {
    fn from(err: crossbeam::channel::RecvError) -> Self {
        Self::ReceiveError(format!("{err:?}"))
    }
}

impl Error {
    /// Whether this error was produced while authenticating or decoding an
    /// inbound frame. Such frames are dropped before dispatch.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Error::MissingDelimiter |
                Error::InsufficientParts(..) |
                Error::InvalidHmac(..) |
                Error::BadSignature(..) |
                Error::Utf8Error(..) |
                Error::JsonParseError(..) |
                Error::InvalidPart(..) |
                Error::InvalidMessage(..) |
                Error::UnknownMessageType(..)
        )
    }
}

#[macro_export]
macro_rules! anyhow {
    ($($rest: expr),*) => {{
        let error = anyhow::anyhow!($($rest, )*);
        $crate::error::Error::Anyhow(error)
    }}
}
