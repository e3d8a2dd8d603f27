/*
 * input_request.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use crossbeam::channel::Sender;
use serde::Deserialize;
use serde::Serialize;

use crate::execution::cancellation::CancellationToken;
use crate::wire::input_reply::InputReply;
use crate::wire::jupyter_message::MessageType;
use crate::wire::originator::Originator;

/// Represents a request from the kernel to the frontend to prompt the user for
/// input
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputRequest {
    /// The prompt to display to the user
    pub prompt: String,

    /// Whether the string being requested is a password (and should therefore
    /// be obscured)
    pub password: bool,
}

impl MessageType for InputRequest {
    fn message_type() -> String {
        String::from("input_request")
    }
}

/// An input request originating from a running execution, handed to the
/// StdIn thread.
pub struct ShellInputRequest {
    /// The identity of the Shell client that sent the execute request
    pub originator: Originator,

    /// The input request itself
    pub request: InputRequest,

    /// Where to deliver the frontend's reply
    pub reply_tx: Sender<crate::Result<InputReply>>,

    /// Cancelled when the execution is interrupted; aborts the wait for a
    /// reply
    pub cancellation: CancellationToken,
}
