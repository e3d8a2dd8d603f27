/*
 * execute_request.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::wire::jupyter_message::MessageType;

/// Represents a request from the frontend to execute code
///
/// Only `code` is required on the wire. Unknown extension fields sent by
/// frontends are accepted and ignored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecuteRequest {
    /// The code to be executed
    pub code: String,

    /// Whether the code should be executed silently (not shown to the user)
    #[serde(default)]
    pub silent: bool,

    /// Whether the code should be stored in history
    #[serde(default = "default_true")]
    pub store_history: bool,

    /// Mapping of user expressions to be evaluated after code is executed.
    #[serde(default = "default_user_expressions")]
    pub user_expressions: Value,

    /// Whether to allow the kernel to send stdin requests
    #[serde(default = "default_true")]
    pub allow_stdin: bool,

    /// Whether the kernel should discard the execution queue if evaluating the
    /// code results in an error
    #[serde(default = "default_true")]
    pub stop_on_error: bool,
}

impl ExecuteRequest {
    /// A visible request with the protocol defaults
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            silent: false,
            store_history: true,
            user_expressions: default_user_expressions(),
            allow_stdin: true,
            stop_on_error: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_user_expressions() -> Value {
    Value::Object(serde_json::Map::new())
}

impl MessageType for ExecuteRequest {
    fn message_type() -> String {
        String::from("execute_request")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_execute_request_defaults() {
        let req: ExecuteRequest = serde_json::from_value(json!({
            "code": "1 + 1",
            "positron": { "code_location": null }
        }))
        .unwrap();

        assert_eq!(req.code, "1 + 1");
        assert!(!req.silent);
        assert!(req.store_history);
        assert!(req.allow_stdin);
        assert!(req.stop_on_error);
    }

    #[test]
    fn test_execute_request_explicit_flags() {
        let req: ExecuteRequest = serde_json::from_value(json!({
            "code": "",
            "silent": true,
            "store_history": false,
            "user_expressions": {},
            "allow_stdin": false,
            "stop_on_error": false
        }))
        .unwrap();

        assert!(req.silent);
        assert!(!req.allow_stdin);
        assert!(!req.stop_on_error);
    }
}
