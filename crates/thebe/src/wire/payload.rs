/*
 * payload.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

/// Actions attached to an `execute_reply` that the frontend should carry out.
///
/// Serialized with a `source` tag, e.g.
/// `{"source": "ask_exit", "keepkernel": false}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Payload {
    /// The executed code asked the frontend to exit. With `keepkernel`, the
    /// frontend closes without shutting the kernel down.
    AskExit { keepkernel: bool },
}
