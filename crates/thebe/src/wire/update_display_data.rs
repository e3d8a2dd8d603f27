/*
 * update_display_data.rs
 *
 * Copyright (C) 2023 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::wire::display_data::Rendering;
use crate::wire::display_data::Transient;
use crate::wire::jupyter_message::MessageType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpdateDisplayData {
    /// The data giving the MIME key/value pairs to display
    pub data: Map<String, Value>,

    /// Optional additional metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Transient data
    /// Must contain a `display_id` field linked to one in a
    /// corresponding `DisplayData` message.
    pub transient: Transient,
}

impl UpdateDisplayData {
    pub fn new(rendering: Rendering, display_id: String) -> Self {
        Self {
            data: rendering.data,
            metadata: rendering.metadata,
            transient: Transient {
                display_id: Some(display_id),
            },
        }
    }
}

impl MessageType for UpdateDisplayData {
    fn message_type() -> String {
        String::from("update_display_data")
    }
}
