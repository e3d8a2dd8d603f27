/*
 * kernel.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;
use std::sync::Mutex;

use crossbeam::channel::unbounded;
use crossbeam::channel::Receiver;
use stdext::spawn;

use crate::connection_file::ConnectionFile;
use crate::dispatch::Handler;
use crate::dispatch::HandlerChain;
use crate::display::publisher::UpdatePublisher;
use crate::display::registry::DisplayRegistry;
use crate::display::Renderer;
use crate::error::Error;
use crate::execution::cancellation::CancellationToken;
use crate::execution::interrupt::InterruptController;
use crate::execution::queue::ExecutionQueue;
use crate::execution::worker::Worker;
use crate::execution::worker::WorkerChannels;
use crate::language::control_handler::ControlHandler;
use crate::language::executor::Executor;
use crate::language::shell_handler::ShellHandler;
use crate::session::Session;
use crate::socket::control::Control;
use crate::socket::control::ControlRouter;
use crate::socket::heartbeat::Heartbeat;
use crate::socket::iopub::IOPub;
use crate::socket::shell::Shell;
use crate::socket::shell::ShellRouter;
use crate::socket::socket::Socket;
use crate::socket::stdin::Stdin;
use crate::socket::transport::Transport;
use crate::socket::transport::ZmqTransport;

/// Things that end a kernel session, reported by `Kernel::wait()`
#[derive(Debug)]
pub enum KernelEvent {
    /// A client asked the kernel to shut down
    Shutdown { restart: bool },

    /// The executor failed or panicked; the worker has stopped
    Fault(String),
}

/// One transport per channel
pub struct KernelTransports {
    pub shell: Box<dyn Transport>,
    pub control: Box<dyn Transport>,
    pub iopub: Box<dyn Transport>,
    pub stdin: Box<dyn Transport>,
    pub heartbeat: Box<dyn Transport>,
}

/// The language side of the kernel
pub struct KernelHandlers {
    pub executor: Box<dyn Executor>,
    pub shell_handler: Box<dyn ShellHandler>,
    pub control_handler: Arc<Mutex<dyn ControlHandler>>,

    /// Consulted in order before the built-in Shell routing
    pub shell_extensions: Vec<Box<dyn Handler>>,

    /// Consulted in order before the built-in Control routing
    pub control_extensions: Vec<Box<dyn Handler>>,
}

impl KernelHandlers {
    pub fn new(
        executor: Box<dyn Executor>,
        shell_handler: Box<dyn ShellHandler>,
        control_handler: Arc<Mutex<dyn ControlHandler>>,
    ) -> Self {
        Self {
            executor,
            shell_handler,
            control_handler,
            shell_extensions: Vec::new(),
            control_extensions: Vec::new(),
        }
    }
}

/// A running kernel session. Each session has its own execution counter,
/// queue and display registry.
///
/// Dropping the kernel stops its threads.
pub struct Kernel {
    session: Session,
    connection_file: Option<ConnectionFile>,
    queue: ExecutionQueue,
    registry: DisplayRegistry,
    events_rx: Receiver<KernelEvent>,
    shutdown: CancellationToken,
}

impl Kernel {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The connection information with the ports actually bound, for kernels
    /// started with `connect()`
    pub fn connection_file(&self) -> Option<&ConnectionFile> {
        self.connection_file.as_ref()
    }

    /// Number of execute requests waiting behind the running one
    pub fn pending_executions(&self) -> usize {
        self.queue.len()
    }

    pub fn registry(&self) -> &DisplayRegistry {
        &self.registry
    }

    /// Blocks until the session ends. Returns `Ok` after a shutdown request
    /// and `Error::WorkerFault` if the executor failed.
    pub fn wait(&self) -> crate::Result<()> {
        match self.events_rx.recv() {
            Ok(KernelEvent::Shutdown { restart }) => {
                log::info!("Kernel shut down (restart: {restart})");
                Ok(())
            },
            Ok(KernelEvent::Fault(message)) => Err(Error::WorkerFault(message)),
            Err(_) => Err(Error::Disconnected(String::from("kernel"))),
        }
    }

    /// Stops all kernel threads without waiting for a shutdown request
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts a kernel over the given transports. `name` prefixes the names of
/// the kernel threads.
pub fn start(
    name: &str,
    session: Session,
    transports: KernelTransports,
    handlers: KernelHandlers,
) -> Kernel {
    let shutdown = CancellationToken::new();

    // IOPub is fed by every other thread and owned by its own
    let (iopub_tx, iopub_rx) = unbounded();
    let (reply_tx, reply_rx) = unbounded();
    let (stdin_tx, stdin_rx) = unbounded();
    let (events_tx, events_rx) = unbounded();

    let interrupts = InterruptController::new();
    let registry = DisplayRegistry::new(iopub_tx.clone());
    let queue = ExecutionQueue::new();

    let mut executor = handlers.executor;
    executor.register_renderer(Renderer::new(
        registry.clone(),
        UpdatePublisher::new(),
        interrupts.clone(),
    ));

    let iopub_socket = Socket::new(session.clone(), transports.iopub);
    let iopub_shutdown = shutdown.clone();
    spawn!(format!("{name}-iopub"), move || {
        let mut iopub = IOPub::new(iopub_socket, iopub_rx, iopub_shutdown);
        iopub.listen();
    });

    let mut shell_handlers = HandlerChain::new();
    for extension in handlers.shell_extensions {
        shell_handlers.push(extension);
    }
    shell_handlers.push(Box::new(ShellRouter::new(
        handlers.shell_handler,
        queue.clone(),
    )));
    let shell_socket = Socket::new(session.clone(), transports.shell);
    let shell_iopub_tx = iopub_tx.clone();
    let shell_queue = queue.clone();
    let shell_shutdown = shutdown.clone();
    spawn!(format!("{name}-shell"), move || {
        let mut shell = Shell::new(
            shell_socket,
            shell_iopub_tx,
            reply_rx,
            shell_queue,
            shell_handlers,
            shell_shutdown,
        );
        shell.listen();
    });

    let mut control_handlers = HandlerChain::new();
    for extension in handlers.control_extensions {
        control_handlers.push(extension);
    }
    control_handlers.push(Box::new(ControlRouter::new(
        handlers.control_handler,
        interrupts.clone(),
        events_tx.clone(),
        shutdown.clone(),
    )));
    let control_socket = Socket::new(session.clone(), transports.control);
    let control_iopub_tx = iopub_tx.clone();
    let control_shutdown = shutdown.clone();
    spawn!(format!("{name}-control"), move || {
        let mut control = Control::new(
            control_socket,
            control_iopub_tx,
            control_handlers,
            control_shutdown,
        );
        control.listen();
    });

    let stdin_socket = Socket::new(session.clone(), transports.stdin);
    let stdin_shutdown = shutdown.clone();
    spawn!(format!("{name}-stdin"), move || {
        let stdin = Stdin::new(stdin_socket, stdin_rx, stdin_shutdown);
        stdin.listen();
    });

    let heartbeat_socket = Socket::new(session.clone(), transports.heartbeat);
    let heartbeat_shutdown = shutdown.clone();
    spawn!(format!("{name}-heartbeat"), move || {
        let heartbeat = Heartbeat::new(heartbeat_socket, heartbeat_shutdown);
        heartbeat.listen();
    });

    let worker = Worker::new(executor, queue.clone(), WorkerChannels {
        session: session.clone(),
        iopub_tx,
        reply_tx,
        stdin_tx,
        events_tx,
        registry: registry.clone(),
        interrupts,
        shutdown: shutdown.clone(),
    });
    spawn!(format!("{name}-worker"), move || worker.listen());

    Kernel {
        session,
        connection_file: None,
        queue,
        registry,
        events_rx,
        shutdown,
    }
}

/// Binds ZeroMQ sockets as described by `connection_file` and starts a kernel
/// on them. Ports given as `0` are picked by the OS; see
/// `Kernel::connection_file()` for the ones bound.
pub fn connect(
    name: &str,
    connection_file: ConnectionFile,
    handlers: KernelHandlers,
) -> crate::Result<Kernel> {
    let ctx = zmq::Context::new();
    let session = Session::create(connection_file.key.as_str())?;

    let bind = |channel: &str, kind: zmq::SocketType, port: u16| -> crate::Result<ZmqTransport> {
        ZmqTransport::new(
            &ctx,
            String::from(channel),
            kind,
            None,
            connection_file.endpoint(port),
        )
    };

    let shell = bind("Shell", zmq::ROUTER, connection_file.shell_port)?;
    let control = bind("Control", zmq::ROUTER, connection_file.control_port)?;
    let iopub = bind("IOPub", zmq::XPUB, connection_file.iopub_port)?;
    let stdin = bind("Stdin", zmq::ROUTER, connection_file.stdin_port)?;
    let heartbeat = bind("Heartbeat", zmq::REP, connection_file.hb_port)?;

    let mut bound = connection_file.clone();
    bound.shell_port = port_finalize(&shell, connection_file.shell_port)?;
    bound.control_port = port_finalize(&control, connection_file.control_port)?;
    bound.iopub_port = port_finalize(&iopub, connection_file.iopub_port)?;
    bound.stdin_port = port_finalize(&stdin, connection_file.stdin_port)?;
    bound.hb_port = port_finalize(&heartbeat, connection_file.hb_port)?;
    log::info!("Kernel bound to {}", bound.endpoint(bound.shell_port));

    let transports = KernelTransports {
        shell: Box::new(shell),
        control: Box::new(control),
        iopub: Box::new(iopub),
        stdin: Box::new(stdin),
        heartbeat: Box::new(heartbeat),
    };

    let mut kernel = start(name, session, transports, handlers);
    kernel.connection_file = Some(bound);
    Ok(kernel)
}

fn port_finalize(transport: &ZmqTransport, port: u16) -> crate::Result<u16> {
    if port != 0 {
        // Client provided the port, just use that
        return Ok(port);
    }
    match transport.port()? {
        Some(port) => Ok(port),
        None => Err(crate::anyhow!(
            "Can't find the port of the '{}' socket",
            transport.name()
        )),
    }
}
