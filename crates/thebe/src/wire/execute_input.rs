/*
 * execute_input.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::jupyter_message::MessageType;

/// Broadcast on IOPub before an execution starts, so that every connected
/// frontend sees the code being run and its execution count.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecuteInput {
    /// The code to be executed
    pub code: String,

    /// The count of executions that will have occurred after this one
    pub execution_count: u32,
}

impl MessageType for ExecuteInput {
    fn message_type() -> String {
        String::from("execute_input")
    }
}
