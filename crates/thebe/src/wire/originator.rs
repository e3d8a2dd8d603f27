/*
 * originator.rs
 *
 * Copyright (C) 2023 Posit Software, PBC. All rights reserved.
 *
 */

use crate::wire::header::JupyterHeader;
use crate::wire::jupyter_message::JupyterMessage;

/// The peer that sent a request: its ZeroMQ routing identities and the
/// request header. Needed to address an `input_request` to the same client.
#[derive(Debug, Clone)]
pub struct Originator {
    pub zmq_identities: Vec<Vec<u8>>,
    pub header: JupyterHeader,
}

impl<T> From<&JupyterMessage<T>> for Originator {
    fn from(msg: &JupyterMessage<T>) -> Originator {
        Originator {
            zmq_identities: msg.zmq_identities.clone(),
            header: msg.header.clone(),
        }
    }
}
