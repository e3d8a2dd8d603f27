/*
 * execute_result.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::wire::display_data::Rendering;
use crate::wire::display_data::Transient;
use crate::wire::jupyter_message::MessageType;

/// The value produced by an execution, broadcast on IOPub
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecuteResult {
    /// The data giving the result of the execution
    pub data: Map<String, Value>,

    /// A monotonically increasing execution counter
    pub execution_count: u32,

    /// Optional additional metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Optional transient data
    #[serde(default)]
    pub transient: Transient,
}

impl ExecuteResult {
    pub fn new(rendering: Rendering, execution_count: u32) -> Self {
        Self {
            data: rendering.data,
            execution_count,
            metadata: rendering.metadata,
            transient: Transient::default(),
        }
    }
}

impl MessageType for ExecuteResult {
    fn message_type() -> String {
        String::from("execute_result")
    }
}
