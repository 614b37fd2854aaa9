//! Fixed-response HTTP target for scanner tests.
//!
//! Every request, whatever its method or path, gets `200 OK`,
//! `Content-Type: text/html` and the body `Example`. The listener is bound
//! synchronously in [`MockServer::start`] so bind errors reach the caller; the
//! accept loop then runs on a dedicated worker thread with its own
//! current-thread tokio runtime until [`MockServer::stop`] signals it.

use std::future::IntoFuture;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::error::{HarnessError, Result};

pub const RESPONSE_BODY: &str = "Example";
pub const RESPONSE_CONTENT_TYPE: &str = "text/html";

/// How long open connections may keep the worker alive after a stop request.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Listener, shutdown signal and worker thread of one running server.
/// Torn down together by [`MockServer::stop`].
struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<std::io::Result<()>>,
}

enum ServerState {
    Stopped,
    Running(RunningServer),
}

pub struct MockServer {
    host: IpAddr,
    state: ServerState,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    /// Server that binds on all IPv4 interfaces.
    pub fn new() -> Self {
        Self::with_host(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    pub fn with_host(host: IpAddr) -> Self {
        Self {
            host,
            state: ServerState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ServerState::Running(_))
    }

    /// Bound address while running. Reports the real port when started on 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            ServerState::Running(running) => Some(running.addr),
            ServerState::Stopped => None,
        }
    }

    /// Bind `port` and start serving in the background.
    ///
    /// Returns once the listener is bound and the worker thread is launched.
    ///
    /// # Errors
    ///
    /// [`HarnessError::StartWhileRunning`] if this instance is already serving,
    /// [`HarnessError::Bind`] if the port is unavailable. A failed start leaves
    /// the server stopped.
    #[instrument(skip(self))]
    pub fn start(&mut self, port: u16) -> Result<SocketAddr> {
        if let ServerState::Running(running) = &self.state {
            return Err(HarnessError::StartWhileRunning {
                port: running.addr.port(),
            });
        }

        let addr = SocketAddr::new(self.host, port);
        let bind_err = |source: std::io::Error| HarnessError::Bind { addr, source };
        let listener = TcpListener::bind(addr).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let addr = listener.local_addr().map_err(bind_err)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| HarnessError::Runtime { source })?;
        let (shutdown, signal) = oneshot::channel();
        let worker = thread::Builder::new()
            .name(format!("mock-server-{}", addr.port()))
            .spawn(move || runtime.block_on(serve(listener, signal)))
            .map_err(|source| HarnessError::Runtime { source })?;

        info!(%addr, "mock server started");
        self.state = ServerState::Running(RunningServer {
            addr,
            shutdown,
            worker,
        });
        Ok(addr)
    }

    /// Stop serving and wait for the worker to exit.
    ///
    /// In-flight connections get [`SHUTDOWN_GRACE`] to finish and are dropped
    /// after that, so a stalled client cannot hold the worker. The port is
    /// released by the time this returns. A no-op when stopped.
    ///
    /// # Errors
    ///
    /// [`HarnessError::WorkerPanicked`] if the worker thread panicked. The
    /// server is stopped either way.
    pub fn stop(&mut self) -> Result<()> {
        let ServerState::Running(running) = std::mem::replace(&mut self.state, ServerState::Stopped)
        else {
            debug!("mock server not running");
            return Ok(());
        };

        info!(addr = %running.addr, "stopping mock server");
        // Err means the worker already returned and dropped the receiver.
        let _ = running.shutdown.send(());

        match running.worker.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(err = %e, "mock server exited with error");
                Ok(())
            }
            Err(_) => Err(HarnessError::WorkerPanicked),
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(err = %e, "failed to stop mock server on drop");
        }
    }
}

async fn serve(listener: TcpListener, signal: oneshot::Receiver<()>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::from_std(listener)?;
    let (draining, drain_started) = oneshot::channel::<()>();
    let server = axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            let _ = signal.await;
            let _ = draining.send(());
        })
        .into_future();
    let mut server = std::pin::pin!(server);

    tokio::select! {
        result = &mut server => result,
        _ = grace_expired(drain_started) => {
            warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "dropping connections still open after stop");
            Ok(())
        }
    }
}

/// Resolves [`SHUTDOWN_GRACE`] after the drain starts. Never resolves if the
/// server ends first and drops the sender without draining.
async fn grace_expired(drain_started: oneshot::Receiver<()>) {
    if drain_started.await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(SHUTDOWN_GRACE).await;
}

fn router() -> Router {
    Router::new().fallback(example)
}

async fn example() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, RESPONSE_CONTENT_TYPE)],
        RESPONSE_BODY,
    )
}
