/*
 * main.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

mod command;
mod control;
mod executor;
mod shell;

use std::env;
use std::process::exit;
use std::sync::Arc;
use std::sync::Mutex;

use stdext::unwrap;
use thebe::connection_file::ConnectionFile;
use thebe::kernel;
use thebe::kernel::KernelHandlers;
use thebe::kernel_spec::KernelSpec;

use crate::control::Control;
use crate::executor::EchoExecutor;
use crate::shell::Shell;

fn start_kernel(connection_file: ConnectionFile) {
    let handlers = KernelHandlers::new(
        Box::new(EchoExecutor::new()),
        Box::new(Shell {}),
        Arc::new(Mutex::new(Control {})),
    );

    let kernel = unwrap!(kernel::connect("echo", connection_file, handlers), Err(err) => {
        eprintln!("Couldn't connect to frontend: {err}");
        exit(1);
    });

    // Blocks until a client asks us to shut down
    if let Err(err) = kernel.wait() {
        log::error!("Echo kernel stopped: {err}");
        exit(1);
    }
}

fn install_kernel_spec() {
    match env::current_exe() {
        Ok(exe_path) => {
            let spec = KernelSpec::new(
                vec![
                    String::from(exe_path.to_string_lossy()),
                    String::from("--connection_file"),
                    String::from("{connection_file}"),
                ],
                String::from("Thebe Echo"),
                String::from("Echo"),
            );
            if let Err(err) = spec.install("thebe-echo") {
                eprintln!("Failed to install Jupyter kernelspec. {}", err);
            } else {
                println!("Successfully installed Jupyter kernelspec.")
            }
        },
        Err(err) => {
            eprintln!("Failed to determine path to Thebe Echo. {}", err);
        },
    }
}

fn main() {
    // Initialize logging system; the env_logger lets you configure logging with
    // the RUST_LOG env var
    env_logger::init();

    // Get an iterator over all the command-line arguments
    let mut argv = std::env::args();

    // Skip the first "argument" as it's the path/name to this executable
    argv.next();

    // Process remaining arguments
    match argv.next() {
        Some(arg) => match arg.as_str() {
            "--connection_file" => {
                let Some(file) = argv.next() else {
                    eprintln!(
                        "A connection file must be specified with the --connection_file argument."
                    );
                    exit(1);
                };
                let connection_file = unwrap!(ConnectionFile::from_file(&file), Err(err) => {
                    eprintln!("Couldn't read connection file '{file}': {err}");
                    exit(1);
                });
                start_kernel(connection_file);
            },
            "--version" => {
                println!("Thebe Echo {}", env!("CARGO_PKG_VERSION"));
            },
            "--install" => {
                install_kernel_spec();
            },
            other => {
                eprintln!("Argument '{}' unknown", other);
                exit(1);
            },
        },
        None => {
            println!("Usage: echo --connection_file /path/to/file");
        },
    }
}
