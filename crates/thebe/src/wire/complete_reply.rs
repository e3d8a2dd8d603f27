/*
 * complete_reply.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::wire::jupyter_message::MessageType;
use crate::wire::jupyter_message::Status;

/// Represents a reply to a completion request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompleteReply {
    /// The status of the request (usually Ok)
    pub status: Status,

    /// The possible matches for the code fragment
    pub matches: Vec<String>,

    /// The start of the range of text that the matches would replace
    pub cursor_start: u32,

    /// The end of the range of text that the matches would replace
    pub cursor_end: u32,

    /// Additional information about the matches
    pub metadata: Value,
}

impl MessageType for CompleteReply {
    fn message_type() -> String {
        String::from("complete_reply")
    }
}
