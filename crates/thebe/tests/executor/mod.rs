/*
 * mod.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::thread;
use std::time::Duration;

use crossbeam::channel::Receiver;
use crossbeam::select;
use thebe::display::Renderer;
use thebe::execution::context::ExecutionContext;
use thebe::language::executor::ExecuteOutcome;
use thebe::language::executor::ExecuteResponse;
use thebe::language::executor::Executor;
use thebe::wire::display_data::Rendering;
use thebe::wire::exception::Exception;
use thebe::wire::execute_request::ExecuteRequest;
use thebe::wire::stream::Stream;

/// A scripted executor. Each request is a command:
///
/// - `gate [command]`: waits for the test to open the gate, then runs the
///   rest of the line
/// - `fail`: raises an error
/// - `print <text>`: writes `text` to stdout
/// - `ticks <n>`: writes `n` lines to stdout, 5ms apart
/// - `input`: prompts for input and returns what was entered
/// - `display`: publishes a display and updates it twice
/// - `defer <n>`: publishes `n` displays computed in the background
/// - `spin`: runs until interrupted
/// - `panic`: panics
///
/// Anything else evaluates to itself.
pub struct TestExecutor {
    gate: Receiver<()>,
    renderer: Option<Renderer>,
}

impl TestExecutor {
    pub fn new(gate: Receiver<()>) -> Self {
        Self {
            gate,
            renderer: None,
        }
    }

    fn run(&self, code: &str, context: &ExecutionContext) -> thebe::Result<ExecuteOutcome> {
        let (command, rest) = match code.split_once(' ') {
            Some((command, rest)) => (command, rest),
            None => (code, ""),
        };

        match command {
            "gate" => {
                select! {
                    recv(self.gate) -> _ => {},
                    recv(context.cancellation().receiver()) -> _ => return Ok(ExecuteOutcome::Interrupted),
                }
                self.run(rest, context)
            },
            "fail" => Ok(ExecuteOutcome::Failed(Exception::new("Error", "failed"))),
            "print" => {
                context.stream(Stream::Stdout, rest)?;
                Ok(completed(None))
            },
            "ticks" => {
                let n: usize = rest.parse().expect("a number of lines");
                for i in 0..n {
                    context.stream(Stream::Stdout, &format!("tick {i}\n"))?;
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(completed(None))
            },
            "input" => {
                let value = context.read_input("? ", false)?;
                Ok(completed(Some(Rendering::plain(value))))
            },
            "display" => {
                let handle = context.display(Rendering::plain("first"))?;
                handle.update(Rendering::plain("second"))?;
                handle.update(Rendering::plain("third"))?;
                Ok(completed(None))
            },
            "defer" => {
                let renderer = self.renderer.as_ref().expect("renderer is registered");
                let n: usize = rest.parse().expect("a number of displays");
                for i in 0..n {
                    renderer.defer(Rendering::plain(format!("pending {i}")), move || {
                        thread::sleep(Duration::from_millis((i as u64 * 7) % 50));
                        Rendering::plain(format!("done {i}"))
                    })?;
                }
                Ok(completed(None))
            },
            "spin" => {
                while !context.is_cancelled() {
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(ExecuteOutcome::Interrupted)
            },
            "panic" => panic!("executor exploded"),
            _ => Ok(completed(Some(Rendering::plain(code)))),
        }
    }
}

fn completed(result: Option<Rendering>) -> ExecuteOutcome {
    ExecuteOutcome::Completed(ExecuteResponse {
        result,
        payload: vec![],
    })
}

impl Executor for TestExecutor {
    fn execute(
        &mut self,
        req: &ExecuteRequest,
        context: &ExecutionContext,
    ) -> thebe::Result<ExecuteOutcome> {
        self.run(&req.code, context)
    }

    fn register_renderer(&mut self, renderer: Renderer) {
        self.renderer = Some(renderer);
    }
}
