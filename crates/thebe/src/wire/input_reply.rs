/*
 * input_reply.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::jupyter_message::MessageType;

/// Represents a reply from the frontend to the kernel delivering the response
/// to an `input_request`
///
/// By convention these replies travel with an empty parent header and empty
/// metadata. The kernel never correlates them with the `input_request` through
/// the parent; there is only ever one outstanding request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputReply {
    /// The value the user entered
    pub value: String,
}

impl MessageType for InputReply {
    fn message_type() -> String {
        String::from("input_reply")
    }
}
