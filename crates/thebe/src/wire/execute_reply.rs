/*
 * execute_reply.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::wire::jupyter_message::MessageType;
use crate::wire::jupyter_message::Status;
use crate::wire::payload::Payload;

/// Represents a reply from an execute_request message. Used for the `ok` and
/// `abort` statuses; errors are sent as `ExecuteReplyException`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecuteReply {
    /// The status of the request
    pub status: Status,

    /// Monotonically increasing execution counter
    pub execution_count: u32,

    /// Results for user expressions
    #[serde(default)]
    pub user_expressions: Value,

    /// Actions the frontend should take, such as exiting
    #[serde(default)]
    pub payload: Vec<Payload>,
}

impl MessageType for ExecuteReply {
    fn message_type() -> String {
        String::from("execute_reply")
    }
}
