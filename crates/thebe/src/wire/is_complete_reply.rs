/*
 * is_complete_reply.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::jupyter_message::MessageType;

/// Represents a reply to an is_complete_request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IsCompleteReply {
    /// The status of the code that was tested for completeness
    pub status: IsComplete,

    /// Characters to use for indenting the next line (if incomplete)
    pub indent: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum IsComplete {
    /// The code is complete and can be run
    Complete,

    /// The code is incomplete; more lines are needed
    Incomplete,

    /// The code can never become complete
    Invalid,

    /// The kernel cannot tell
    Unknown,
}

impl MessageType for IsCompleteReply {
    fn message_type() -> String {
        String::from("is_complete_reply")
    }
}
