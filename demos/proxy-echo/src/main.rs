//! Non-blocking TCP echo proxy driven entirely by `cotask::Scheduler`.
//!
//! One task per accepted connection, plus one long-lived task for the
//! listening socket. Readiness comes from [`reactor::MioReactor`]; the
//! event loop below is the same `wake_expired_tasks` / `poll_until` /
//! `process_runnable_tasks` cycle documented on `cotask::Scheduler`, with
//! one addition: connection tasks can't reach the scheduler to spawn new
//! tasks for themselves (`TaskCtx` deliberately doesn't expose it), so the
//! listener hands off accepted sockets through a shared queue that the
//! loop drains each cycle instead.

use std::cell::RefCell;
use std::io::{self, ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::rc::Rc;

use mio::net::{TcpListener, TcpStream};
use mio::Interest;

use cotask::{Scheduler, TaskId, TaskOutcome, TaskState};

mod reactor;
use reactor::MioReactor;

type AcceptQueue = Rc<RefCell<Vec<TcpStream>>>;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt::init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9000".to_string())
        .parse()
        .expect("usage: proxy-echo [listen-addr]");

    let mut scheduler = Scheduler::new();
    let mio = Rc::new(RefCell::new(MioReactor::new()?));
    let accept_queue: AcceptQueue = Rc::new(RefCell::new(Vec::new()));

    let listener_id = spawn_listener(&mut scheduler, &mio, &accept_queue, addr)?;
    scheduler.wakeup(listener_id, TaskState::WOKEN_INIT);
    scheduler.process_runnable_tasks();

    tracing::info!(%addr, "proxy-echo listening");

    loop {
        for stream in accept_queue.borrow_mut().drain(..).collect::<Vec<_>>() {
            if let Err(err) = spawn_connection(&mut scheduler, &mio, stream) {
                tracing::warn!(?err, "failed to spawn connection task");
            }
        }

        let deadline = scheduler.wake_expired_tasks();
        let woken = mio.borrow_mut().poll_until(deadline);
        for (id, reason) in woken {
            scheduler.wakeup(id, reason);
        }
        scheduler.process_runnable_tasks();
    }
}

/// Registers the listening socket on first run, then drains `accept()`
/// until it would block, handing each connection to `accept_queue`. Never
/// asks to be deleted: a listener only goes away with the process.
fn spawn_listener(
    scheduler: &mut Scheduler,
    mio: &Rc<RefCell<MioReactor>>,
    accept_queue: &AcceptQueue,
    addr: SocketAddr,
) -> io::Result<TaskId> {
    let mut socket = TcpListener::bind(addr)?;
    let mio = mio.clone();
    let accept_queue = accept_queue.clone();
    let mut registered = false;

    scheduler.new_task(Box::new(()), move |ctx| {
        if !registered {
            if let Err(err) = mio.borrow_mut().register(&mut socket, Interest::READABLE, ctx.id()) {
                tracing::error!(?err, "failed to register listener");
                return TaskOutcome::Continue;
            }
            registered = true;
        }

        loop {
            match socket.accept() {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "accepted connection");
                    accept_queue.borrow_mut().push(stream);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!(?err, "accept failed");
                    break;
                }
            }
        }
        TaskOutcome::Continue
    })
    .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))
}

/// Registers `stream` on first run, then echoes whatever it reads back
/// until the peer closes the connection or a read fails outright.
fn spawn_connection(
    scheduler: &mut Scheduler,
    mio: &Rc<RefCell<MioReactor>>,
    mut stream: TcpStream,
) -> io::Result<()> {
    let mio_handle = mio.clone();
    let mut registered = false;
    let mut buf = vec![0u8; 4096];

    let id = scheduler
        .new_task(Box::new(()), move |ctx| {
            if !registered {
                if let Err(err) =
                    mio_handle
                        .borrow_mut()
                        .register(&mut stream, Interest::READABLE, ctx.id())
                {
                    tracing::warn!(?err, "failed to register connection");
                    return TaskOutcome::Delete;
                }
                registered = true;
            }

            loop {
                match stream.read(&mut buf) {
                    Ok(0) => {
                        let _ = mio_handle.borrow_mut().deregister(&mut stream, ctx.id());
                        return TaskOutcome::Delete;
                    }
                    Ok(n) => {
                        // Demo-grade: a short write here is dropped rather
                        // than buffered and retried, since an echo proxy
                        // has no downstream caller depending on delivery.
                        if let Err(err) = stream.write_all(&buf[..n]) {
                            if err.kind() != ErrorKind::WouldBlock {
                                let _ = mio_handle.borrow_mut().deregister(&mut stream, ctx.id());
                                return TaskOutcome::Delete;
                            }
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => {
                        tracing::debug!(?err, "connection read failed");
                        let _ = mio_handle.borrow_mut().deregister(&mut stream, ctx.id());
                        return TaskOutcome::Delete;
                    }
                }
            }
            TaskOutcome::Continue
        })
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;

    scheduler.wakeup(id, TaskState::WOKEN_INIT);
    Ok(())
}
