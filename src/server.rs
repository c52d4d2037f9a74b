//! Server lifecycle: bind, serve, drain, stop
//!
//! ```text
//! Created --bind()--> Listening --signal--> Draining --drained / grace elapsed--> Stopped
//! ```
//!
//! Serving runs on its own task, speaking HTTP/1.1 and h2c on one listener.
//! HTTP/1 clients that stall while sending a request head are disconnected
//! after [`DEFAULT_HEADER_READ_TIMEOUT`]. The caller of [`ListeningServer::run_until`]
//! only waits for the stop signal and then drives the drain. Once draining
//! starts no connection is accepted; calls already in flight get the whole
//! grace period, after which their contexts are cancelled and they are
//! abandoned.

use std::{
    future::Future,
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::{conn::auto, graceful::GracefulShutdown},
    service::TowerToHyperService,
};
use thiserror::Error;
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);
/// Time an HTTP/1 client gets to send a complete request head.
pub const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    Created,
    Listening,
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight call finished inside the grace period.
    Graceful,
    /// The grace period elapsed; `abandoned` calls were still running.
    Forced { abandoned: usize },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("listener stopped unexpectedly: {0}")]
    Listener(String),
    #[error("server failed to shut down: {0}")]
    Shutdown(String),
}

/// Tracks requests inside the server and hands each one a cancellation
/// token that fires when the grace period runs out.
#[derive(Clone, Default)]
struct InFlight {
    count: Arc<AtomicUsize>,
    abort: CancellationToken,
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InFlight {
    fn enter(&self) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(&self.count))
    }

    fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

async fn track_in_flight(
    State(in_flight): State<InFlight>,
    mut request: Request,
    next: Next,
) -> Response {
    let _guard = in_flight.enter();
    request
        .extensions_mut()
        .insert(in_flight.abort.child_token());
    next.run(request).await
}

/// A server that has not been bound yet.
pub struct Server {
    addr: String,
    app: Router,
    grace_period: Duration,
    header_read_timeout: Duration,
    state: watch::Sender<ServerState>,
}

impl Server {
    pub fn new(addr: impl Into<String>, app: Router) -> Self {
        let (state, _) = watch::channel(ServerState::Created);
        Self {
            addr: addr.into(),
            app,
            grace_period: DEFAULT_GRACE_PERIOD,
            header_read_timeout: DEFAULT_HEADER_READ_TIMEOUT,
            state,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_header_read_timeout(mut self, header_read_timeout: Duration) -> Self {
        self.header_read_timeout = header_read_timeout;
        self
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Binds the listener and starts serving on a background task.
    ///
    /// A bind failure leaves nothing running; no connection is accepted.
    pub async fn bind(self) -> Result<ListeningServer, ServerError> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: self.addr.clone(),
            source,
        })?;

        let in_flight = InFlight::default();
        let app = self
            .app
            .layer(middleware::from_fn_with_state(in_flight.clone(), track_in_flight));

        let stop = CancellationToken::new();
        let task = tokio::spawn(serve(
            listener,
            app,
            self.header_read_timeout,
            stop.clone(),
        ));

        advance(&self.state, ServerState::Listening);
        info!(addr = %local_addr, "server listening");

        Ok(ListeningServer {
            local_addr,
            grace_period: self.grace_period,
            state: self.state,
            stop,
            in_flight,
            task,
        })
    }
}

/// A bound server accepting connections.
pub struct ListeningServer {
    local_addr: SocketAddr,
    grace_period: Duration,
    state: watch::Sender<ServerState>,
    stop: CancellationToken,
    in_flight: InFlight,
    task: JoinHandle<io::Result<()>>,
}

impl ListeningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Serves until `signal` resolves, then drains and stops.
    ///
    /// Returns an error when the listener ends on its own before `signal`, or
    /// when the server fails while draining. Running out of grace period is
    /// not an error; it is reported as [`ShutdownOutcome::Forced`].
    pub async fn run_until<F>(mut self, signal: F) -> Result<ShutdownOutcome, ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            () = signal => {}
            joined = &mut self.task => {
                advance(&self.state, ServerState::Stopped);
                let reason = match joined {
                    Ok(Ok(())) => "serve loop exited".to_string(),
                    Ok(Err(err)) => err.to_string(),
                    Err(err) => err.to_string(),
                };
                error!(addr = %self.local_addr, error = %reason, "listener failed");
                return Err(ServerError::Listener(reason));
            }
        }

        advance(&self.state, ServerState::Draining);
        info!(
            addr = %self.local_addr,
            in_flight = self.in_flight.current(),
            grace_period_ms = self.grace_period.as_millis(),
            "shutting down server"
        );
        self.stop.cancel();

        let outcome = match tokio::time::timeout(self.grace_period, &mut self.task).await {
            Ok(Ok(Ok(()))) => ShutdownOutcome::Graceful,
            Ok(Ok(Err(err))) => {
                advance(&self.state, ServerState::Stopped);
                return Err(ServerError::Shutdown(err.to_string()));
            }
            Ok(Err(err)) => {
                advance(&self.state, ServerState::Stopped);
                return Err(ServerError::Shutdown(err.to_string()));
            }
            Err(_) => {
                let abandoned = self.in_flight.current();
                self.in_flight.abort.cancel();
                self.task.abort();
                warn!(
                    addr = %self.local_addr,
                    abandoned_calls = abandoned,
                    grace_period_ms = self.grace_period.as_millis(),
                    "grace period elapsed, abandoning in-flight calls"
                );
                ShutdownOutcome::Forced { abandoned }
            }
        };

        advance(&self.state, ServerState::Stopped);
        info!(addr = %self.local_addr, "server stopped");
        Ok(outcome)
    }
}

/// Accept loop serving HTTP/1.1 and h2c on the same listener.
///
/// Returns once `stop` fires and every accepted connection has closed, or
/// with the error of a listener that can no longer accept.
async fn serve(
    listener: TcpListener,
    app: Router,
    header_read_timeout: Duration,
    stop: CancellationToken,
) -> io::Result<()> {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(header_read_timeout);
    let graceful = GracefulShutdown::new();

    loop {
        let (stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) if is_connection_error(&err) => {
                    debug!(error = %err, "accept failed");
                    continue;
                }
                Err(err) => return Err(err),
            },
            () = stop.cancelled() => break,
        };

        let service = TowerToHyperService::new(app.clone());
        let connection = builder
            .serve_connection(TokioIo::new(stream), service)
            .into_owned();
        let connection = graceful.watch(connection);
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                debug!(remote_addr = %remote_addr, error = %err, "connection closed with error");
            }
        });
    }

    drop(listener);
    graceful.shutdown().await;
    Ok(())
}

fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

fn advance(state: &watch::Sender<ServerState>, next: ServerState) {
    state.send_if_modified(|current| {
        if next > *current {
            *current = next;
            true
        } else {
            false
        }
    });
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C off Unix).
///
/// If the handlers cannot be installed the error is logged and the future
/// resolves at once, so the server shuts down instead of running unstoppable.
pub async fn shutdown_signal() {
    if let Err(err) = wait_for_os_signal().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

async fn wait_for_os_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
