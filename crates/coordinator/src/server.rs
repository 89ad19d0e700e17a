//! Embeddable server.
//!
//! Test suites start the mock in-process, point clients at
//! [`MockServer::port`], provision it through [`MockServer::manager`] and
//! stop it when done:
//!
//! ```text
//! MockServer::start(addr, manager) ──► bound listener + serving task
//!        │
//!        ├── port() / local_addr()
//!        ├── manager()
//!        └── stop() ──► graceful shutdown, task joined
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::info;

use crate::handlers::{build_router, AppState};
use crate::manager::NodeSetManager;

/// A running mock. Dropping it also triggers graceful shutdown.
pub struct MockServer {
    manager: Arc<NodeSetManager>,
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

impl MockServer {
    /// Binds `addr` (port 0 picks a free port) and starts serving `manager`.
    pub async fn start(addr: SocketAddr, manager: Arc<NodeSetManager>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let app = build_router(Arc::new(AppState::new(Arc::clone(&manager))));

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        info!(addr = %local_addr, "NodeSet mock listening");
        Ok(Self {
            manager,
            local_addr,
            shutdown,
            task,
        })
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn manager(&self) -> &Arc<NodeSetManager> {
        &self.manager
    }

    /// Stops accepting connections, lets in-flight requests finish and
    /// waits for the serving task.
    pub async fn stop(self) -> io::Result<()> {
        let _ = self.shutdown.send(());
        join(self.task.await)?;
        info!(addr = %self.local_addr, "NodeSet mock stopped");
        Ok(())
    }

    /// Serves until `signal` resolves, then stops. Returns early if the
    /// server fails on its own.
    pub async fn run_until<F>(mut self, signal: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = signal => {}
            result = &mut self.task => return join(result),
        }
        self.stop().await
    }
}

fn join(result: Result<io::Result<()>, JoinError>) -> io::Result<()> {
    result.map_err(io::Error::other)?
}
