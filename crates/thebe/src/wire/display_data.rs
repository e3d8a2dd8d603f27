/*
 * display_data.rs
 *
 * Copyright (C) 2023 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::wire::jupyter_message::MessageType;

/// A rendering of a value: MIME type to representation, plus metadata.
///
/// This is the part of a display message the language produces; the kernel
/// adds the transient `display_id` when it publishes the rendering.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Rendering {
    /// The data giving the MIME key/value pairs to display
    pub data: Map<String, Value>,

    /// Optional additional metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Rendering {
    /// A rendering with a single `text/plain` representation
    pub fn plain(text: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert(String::from("text/plain"), Value::String(text.into()));
        Self {
            data,
            metadata: Map::new(),
        }
    }

    /// Adds a representation for another MIME type
    pub fn with(mut self, mime_type: &str, value: Value) -> Self {
        self.data.insert(String::from(mime_type), value);
        self
    }
}

/// Data that is not persisted in notebooks
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Transient {
    /// Correlates a `display_data` with its later `update_display_data`
    pub display_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DisplayData {
    /// The data giving the MIME key/value pairs to display
    pub data: Map<String, Value>,

    /// Optional additional metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Optional transient data
    #[serde(default)]
    pub transient: Transient,
}

impl DisplayData {
    pub fn new(rendering: Rendering, display_id: Option<String>) -> Self {
        Self {
            data: rendering.data,
            metadata: rendering.metadata,
            transient: Transient { display_id },
        }
    }
}

impl MessageType for DisplayData {
    fn message_type() -> String {
        String::from("display_data")
    }
}
