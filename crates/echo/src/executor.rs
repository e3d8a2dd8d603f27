/*
 * executor.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::thread;
use std::time::Duration;
use std::time::Instant;

use thebe::display::Renderer;
use thebe::execution::context::ExecutionContext;
use thebe::language::executor::ExecuteOutcome;
use thebe::language::executor::ExecuteResponse;
use thebe::language::executor::Executor;
use thebe::wire::display_data::Rendering;
use thebe::wire::exception::Exception;
use thebe::wire::execute_request::ExecuteRequest;
use thebe::wire::payload::Payload;
use thebe::wire::stream::Stream;

use crate::command::Command;

/// Granularity of interrupt checks while sleeping
const SLEEP_STEP: Duration = Duration::from_millis(10);

#[derive(Default)]
pub struct EchoExecutor {
    renderer: Option<Renderer>,
}

impl EchoExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for EchoExecutor {
    fn execute(
        &mut self,
        req: &ExecuteRequest,
        context: &ExecutionContext,
    ) -> thebe::Result<ExecuteOutcome> {
        let command = match Command::parse(&req.code) {
            Ok(command) => command,
            Err(message) => return Ok(ExecuteOutcome::Failed(echo_error(message))),
        };

        let mut response = ExecuteResponse::default();
        match command {
            Command::Nothing => {},
            Command::Echo(value) => response.result = Some(Rendering::plain(value)),
            Command::Print(text) => context.stream(Stream::Stdout, &format!("{text}\n"))?,
            Command::Eprint(text) => context.stream(Stream::Stderr, &format!("{text}\n"))?,
            Command::Error(message) => return Ok(ExecuteOutcome::Failed(echo_error(message))),
            Command::Input(prompt) => {
                let value = context.read_input(&prompt, false)?;
                response.result = Some(Rendering::plain(value));
            },
            Command::Sleep(duration) => {
                let start = Instant::now();
                while start.elapsed() < duration {
                    if context.is_cancelled() {
                        return Ok(ExecuteOutcome::Interrupted);
                    }
                    thread::sleep(SLEEP_STEP.min(duration));
                }
            },
            Command::Defer(duration, text) => {
                let Some(renderer) = self.renderer.as_ref() else {
                    return Err(thebe::anyhow!("No renderer registered"));
                };
                let handle = renderer.defer(Rendering::plain("..."), move || {
                    thread::sleep(duration);
                    Rendering::plain(text)
                })?;
                log::trace!("Deferred display '{}'", handle.display_id());
            },
            Command::Exit { keep_kernel } => response.payload.push(Payload::AskExit {
                keepkernel: keep_kernel,
            }),
        }

        Ok(ExecuteOutcome::Completed(response))
    }

    fn register_renderer(&mut self, renderer: Renderer) {
        self.renderer = Some(renderer);
    }
}

fn echo_error(message: String) -> Exception {
    Exception::new("EchoError", message)
}
