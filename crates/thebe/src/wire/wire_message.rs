/*
 * wire_message.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use hmac::Hmac;
use hmac::Mac;
use log::trace;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::value::Value;
use sha2::Sha256;

use crate::error::Error;
use crate::socket::socket::Socket;
use crate::wire::header::JupyterHeader;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::ProtocolMessage;

/// This delimiter separates the ZeroMQ socket identities (IDS) from the message
/// body payload (MSG).
pub const MSG_DELIM: &[u8] = b"<IDS|MSG>";

/// Represents an untyped Jupyter message delivered over the wire. A WireMessage
/// can represent any kind of Jupyter message; typically its header will be
/// examined and it will be converted into a typed JupyterMessage.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireMessage {
    /// The ZeroMQ identities. These store the peer identity for messages
    /// delivered request-reply style over ROUTER sockets (like the shell)
    pub zmq_identities: Vec<Vec<u8>>,

    /// The header for this message
    pub header: JupyterHeader,

    /// The header of the message from which this message originated, if any.
    /// If none, it's serialized as an empty dict as required by the Jupyter
    /// protocol.
    #[serde(serialize_with = "serialize_none_as_empty_dict")]
    pub parent_header: Option<JupyterHeader>,

    /// Additional metadata, if any
    pub metadata: Value,

    /// The body (payload) of the message
    pub content: Value,

    /// Extra binary buffers trailing the content. Not covered by the
    /// signature.
    #[serde(skip)]
    pub buffers: Vec<Vec<u8>>,
}

impl WireMessage {
    /// Read a WireMessage from a socket, verifying its signature with the
    /// socket's session key.
    pub fn read_from_socket(socket: &Socket) -> Result<WireMessage, Error> {
        let bufs = socket.recv_multipart()?;
        Self::from_buffers(bufs, &socket.session.hmac)
    }

    /// Return the Jupyter type of the message.
    pub fn message_type(&self) -> String {
        self.header.msg_type.clone()
    }

    /// Parse a Jupyter message from an array of buffers (from a ZeroMQ message)
    pub fn from_buffers(
        mut bufs: Vec<Vec<u8>>,
        hmac_key: &Option<Hmac<Sha256>>,
    ) -> Result<WireMessage, Error> {
        // Find the position of the <IDS|MSG> delimiter in the message, which
        // separates the socket identities (IDS) from the body of the message
        // (MSG).
        let pos = match bufs.iter().position(|buf| &buf[..] == MSG_DELIM) {
            Some(p) => p,
            None => return Err(Error::MissingDelimiter),
        };

        // Split off everything after the delimiter, then drop the delimiter
        // itself. What remains in `bufs` are the identities.
        let mut parts: Vec<_> = bufs.drain(pos + 1..).collect();
        bufs.pop();

        // Signature, header, parent header, metadata, content
        if parts.len() < 5 {
            return Err(Error::InsufficientParts(parts.len(), 5));
        }

        WireMessage::validate_hmac(&parts, hmac_key)?;

        let buffers: Vec<Vec<u8>> = parts.drain(5..).collect();

        // Parse the message header
        let header_val = WireMessage::parse_buffer(String::from("header"), &parts[1])?;
        let header: JupyterHeader = match serde_json::from_value(header_val.clone()) {
            Ok(h) => h,
            Err(err) => return Err(Error::InvalidPart(String::from("header"), header_val, err)),
        };

        // Parse the parent header. An empty dict (or an empty frame) means the
        // message has no parent.
        let parent_val = match parts[2].len() {
            0 => Value::Object(serde_json::Map::new()),
            _ => WireMessage::parse_buffer(String::from("parent header"), &parts[2])?,
        };
        let parent: Option<JupyterHeader> = match &parent_val {
            Value::Object(map) if map.is_empty() => None,
            _ => match serde_json::from_value(parent_val.clone()) {
                Ok(h) => Some(h),
                Err(err) => {
                    return Err(Error::InvalidPart(
                        String::from("parent header"),
                        parent_val,
                        err,
                    ))
                },
            },
        };

        Ok(Self {
            zmq_identities: bufs,
            header,
            parent_header: parent,
            metadata: WireMessage::parse_buffer(String::from("metadata"), &parts[3])?,
            content: WireMessage::parse_buffer(String::from("content"), &parts[4])?,
            buffers,
        })
    }

    /// Validates the message's HMAC signature. `parts` starts at the
    /// signature; only the four frames following it are signed.
    fn validate_hmac(parts: &[Vec<u8>], hmac_key: &Option<Hmac<Sha256>>) -> Result<(), Error> {
        // An empty connection key means signatures are neither produced nor
        // checked
        let key = match hmac_key {
            Some(k) => k,
            None => return Ok(()),
        };

        let data = &parts[0];

        // Decode the hexadecimal representation of the signature
        let decoded = match hex::decode(data) {
            Ok(decoded_bytes) => decoded_bytes,
            Err(error) => return Err(Error::InvalidHmac(data.to_vec(), error)),
        };

        let mut validator = key.clone();
        for part in &parts[1..5] {
            validator.update(part);
        }

        // `verify_slice` compares in constant time
        if let Err(err) = validator.verify_slice(&decoded) {
            return Err(Error::BadSignature(decoded, err));
        }

        Ok(())
    }

    /// Parse raw buffer data from a single part of a multipart ZeroMQ message
    /// into a JSON value.
    fn parse_buffer(desc: String, buf: &[u8]) -> Result<serde_json::Value, Error> {
        // Convert the raw byte sequence from the ZeroMQ message into UTF-8
        let str = match std::str::from_utf8(buf) {
            Ok(s) => s,
            Err(err) => return Err(Error::Utf8Error(desc, buf.to_vec(), err)),
        };

        // Parse the UTF-8 string as JSON
        let val: serde_json::Value = match serde_json::from_str(str) {
            Ok(v) => v,
            Err(err) => return Err(Error::JsonParseError(desc, String::from(str), err)),
        };

        Ok(val)
    }

    /// Send this message to the given socket.
    pub fn send(&self, socket: &Socket) -> Result<(), Error> {
        match &self.parent_header {
            Some(parent) => {
                trace!(
                    "Sending '{}' message (reply to '{}') via {} socket",
                    self.msg_type(),
                    parent.msg_type,
                    socket.name
                );
            },
            None => {
                trace!(
                    "Sending '{}' message via {} socket",
                    self.msg_type(),
                    socket.name
                );
            },
        }

        let msg = self.to_frames(&socket.session.hmac)?;
        socket.send_multipart(&msg)?;
        Ok(())
    }

    /// Builds the complete multipart frame: identities, delimiter, signature,
    /// the four JSON parts, then any buffers.
    pub fn to_frames(&self, hmac_key: &Option<Hmac<Sha256>>) -> Result<Vec<Vec<u8>>, Error> {
        // Serialize JSON values into byte parts in preparation for transmission
        let mut parts: Vec<Vec<u8>> = match self.to_raw_parts() {
            Ok(v) => v,
            Err(err) => return Err(Error::CannotSerialize(err)),
        };

        let signature = sign(&parts, hmac_key);

        let mut msg: Vec<Vec<u8>> = self.zmq_identities.clone();
        msg.push(MSG_DELIM.to_vec());
        msg.push(signature.into_bytes());
        msg.append(&mut parts);
        msg.extend(self.buffers.iter().cloned());
        Ok(msg)
    }

    /// Returns a vector containing the raw parts of the message
    fn to_raw_parts(&self) -> Result<Vec<Vec<u8>>, serde_json::Error> {
        let mut parts: Vec<Vec<u8>> = Vec::new();
        parts.push(serde_json::to_vec(&self.header)?);

        // Orphan messages carry an empty dict as parent. The `serialize_with`
        // attribute only applies when serializing the whole struct, so handle
        // it here too.
        match &self.parent_header {
            Some(parent) => parts.push(serde_json::to_vec(parent)?),
            None => parts.push(serde_json::to_vec(&serde_json::Map::new())?),
        }

        parts.push(serde_json::to_vec(&self.metadata)?);
        parts.push(serde_json::to_vec(&self.content)?);
        Ok(parts)
    }

    /// Message type for tracing; statuses include their execution state
    fn msg_type(&self) -> String {
        if self.header.msg_type == "status" {
            if let Value::Object(map) = &self.content {
                if let Some(Value::String(execution_state)) = map.get("execution_state") {
                    return format!("status/{execution_state}");
                }
            }
        }
        self.header.msg_type.clone()
    }
}

/// Computes the lowercase hex HMAC-SHA256 signature of the header, parent
/// header, metadata and content parts. Empty when there is no key.
pub fn sign(parts: &[Vec<u8>], hmac_key: &Option<Hmac<Sha256>>) -> String {
    match hmac_key {
        Some(key) => {
            let mut sig = key.clone();
            for part in parts.iter().take(4) {
                sig.update(part);
            }
            hex::encode(sig.finalize().into_bytes().as_slice())
        },
        None => String::new(),
    }
}

// Conversion: WireMessage (untyped) -> JupyterMessage (typed); used on
// messages we receive over the wire to parse into the correct type.
impl<T: ProtocolMessage + DeserializeOwned> TryFrom<&WireMessage> for JupyterMessage<T> {
    type Error = crate::error::Error;
    fn try_from(msg: &WireMessage) -> Result<JupyterMessage<T>, Error> {
        let content = match serde_json::from_value(msg.content.clone()) {
            Ok(val) => val,
            Err(err) => {
                return Err(Error::InvalidMessage(
                    T::message_type(),
                    msg.content.clone(),
                    err,
                ))
            },
        };
        Ok(JupyterMessage {
            zmq_identities: msg.zmq_identities.clone(),
            header: msg.header.clone(),
            parent_header: msg.parent_header.clone(),
            metadata: msg.metadata.clone(),
            content,
        })
    }
}

// Conversion: JupyterMessage (typed) -> WireMessage (untyped); used prior to
// sending messages to get them ready for dispatch.
impl<T: ProtocolMessage> TryFrom<&JupyterMessage<T>> for WireMessage {
    type Error = crate::error::Error;

    /// Convert a typed JupyterMessage into a WireMessage, preserving ZeroMQ
    /// socket identities.
    fn try_from(msg: &JupyterMessage<T>) -> Result<Self, Error> {
        let content = match serde_json::to_value(&msg.content) {
            Ok(val) => val,
            Err(err) => return Err(Error::CannotSerialize(err)),
        };
        Ok(Self {
            zmq_identities: msg.zmq_identities.clone(),
            header: msg.header.clone(),
            parent_header: msg.parent_header.clone(),
            metadata: msg.metadata.clone(),
            content,
            buffers: Vec::new(),
        })
    }
}

fn serialize_none_as_empty_dict<S, T>(option: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: serde::Serialize,
{
    match option {
        Some(value) => value.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}
