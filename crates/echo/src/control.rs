/*
 * control.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use async_trait::async_trait;
use thebe::language::control_handler::ControlHandler;
use thebe::wire::interrupt_reply::InterruptReply;
use thebe::wire::jupyter_message::Status;
use thebe::wire::shutdown_reply::ShutdownReply;
use thebe::wire::shutdown_request::ShutdownRequest;

pub struct Control {}

#[async_trait]
impl ControlHandler for Control {
    async fn handle_shutdown_request(&self, msg: &ShutdownRequest) -> thebe::Result<ShutdownReply> {
        log::info!("Echo kernel shutting down (restart: {})", msg.restart);
        Ok(ShutdownReply {
            status: Status::Ok,
            restart: msg.restart,
        })
    }

    async fn handle_interrupt_request(&self) -> thebe::Result<InterruptReply> {
        // Echo code only blocks at cancellation points, so there's nothing
        // to force loose
        Ok(InterruptReply { status: Status::Ok })
    }
}
