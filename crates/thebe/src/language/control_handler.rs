/*
 * control_handler.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use async_trait::async_trait;

use crate::wire::interrupt_reply::InterruptReply;
use crate::wire::shutdown_reply::ShutdownReply;
use crate::wire::shutdown_request::ShutdownRequest;

#[async_trait]
pub trait ControlHandler: Send {
    /// Handles a request to shut down the kernel. The kernel stops serving
    /// once the reply is sent.
    ///
    /// Docs: https://jupyter-client.readthedocs.io/en/stable/messaging.html#kernel-shutdown
    async fn handle_shutdown_request(&self, msg: &ShutdownRequest) -> crate::Result<ShutdownReply>;

    /// Handles a request to interrupt the kernel.
    ///
    /// The running execution's cancellation token has already been cancelled
    /// when this is called. Languages whose executor can block outside of
    /// cancellation points use this to force it loose; everyone else can
    /// just reply.
    ///
    /// Docs: https://jupyter-client.readthedocs.io/en/stable/messaging.html#kernel-interrupt
    async fn handle_interrupt_request(&self) -> crate::Result<InterruptReply>;
}
