//! Socket command server for editing Writer documents.
//!
//! ```text
//! client ── TCP, one JSON line each way ── Server
//!                                             │ mpsc (command, oneshot)
//!                                             ▼
//!                                          worker ── Executor ── Office
//! ```
//!
//! Connections are served concurrently, but every command goes through the
//! single worker task, which owns the backend and the open documents.
//!
//! # Example
//!
//! ```rust,no_run
//! use writer_bridge::{Bridge, BridgeConfig};
//! use writer_office::MemoryOffice;
//!
//! # async fn example() -> std::io::Result<()> {
//! let config = BridgeConfig::default();
//! let bridge = Bridge::start(MemoryOffice::new(), &config).await?;
//! println!("listening on {}", bridge.local_addr()?);
//! bridge.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::task::JoinHandle;
use writer_office::Office;

pub mod client;
pub mod config;
pub mod executor;
pub mod handles;
pub mod listing;
pub mod logging;
pub mod paths;
pub mod server;
pub mod worker;

pub use client::{Client, ClientError};
pub use config::{Backend, BridgeConfig, ConfigError};
pub use executor::Executor;
pub use paths::PathResolver;
pub use server::{Limits, Server};
pub use worker::WorkerHandle;

/// A bound server plus its worker.
pub struct Bridge {
    server: Server,
    worker: JoinHandle<()>,
    grace: Duration,
}

impl Bridge {
    /// Bind the listening socket and start the worker around `office`.
    pub async fn start<O: Office + 'static>(office: O, config: &BridgeConfig) -> io::Result<Self> {
        let executor = Executor::new(
            office,
            PathResolver::new(&config.document_root),
            config.default_position,
        );
        let (handle, worker) =
            worker::spawn(executor, config.queue_depth, config.command_timeout());
        let limits = Limits {
            read_timeout: config.read_timeout(),
            max_request_bytes: config.max_request_bytes,
        };
        let server = match Server::bind(config.listen, handle, limits).await {
            Ok(server) => server,
            Err(err) => {
                worker.abort();
                return Err(err);
            }
        };
        Ok(Self {
            server,
            worker,
            grace: config.command_timeout(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.server.local_addr()
    }

    /// Serve until `shutdown` resolves, then let the worker close the open
    /// documents.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.server.run_until(shutdown).await;
        match tokio::time::timeout(self.grace, self.worker).await {
            Ok(Ok(())) => tracing::info!("bridge stopped"),
            Ok(Err(err)) => tracing::error!(error = %err, "command worker failed"),
            Err(_) => tracing::warn!("in-flight commands did not finish before shutdown"),
        }
    }
}
