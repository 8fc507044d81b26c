//! TCP command server.
//!
//! Protocol, one request per connection:
//!
//! 1. the client sends one JSON request, ended by a newline or by the end of
//!    a complete JSON value;
//! 2. the server answers with one JSON line and closes the connection.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};
use writer_protocol::{parse_request, Command, ErrorKind, Failure, Response};

use crate::executor::pong;
use crate::worker::WorkerHandle;

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub read_timeout: Duration,
    pub max_request_bytes: usize,
}

pub struct Server {
    listener: TcpListener,
    worker: WorkerHandle,
    limits: Limits,
}

impl Server {
    pub async fn bind(addr: SocketAddr, worker: WorkerHandle, limits: Limits) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            worker,
            limits,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves. Each connection gets its
    /// own task; commands still queue through the single worker.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested; no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let worker = self.worker.clone();
                        let limits = self.limits;
                        let span = tracing::info_span!("connection", %peer);
                        tokio::spawn(handle_connection(stream, worker, limits).instrument(span));
                    }
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                },
            }
        }
    }
}

fn malformed(message: impl Into<String>) -> Failure {
    Failure::new(ErrorKind::MalformedRequest, message)
}

/// Read until a newline, a complete JSON value, or end of stream.
async fn read_request(stream: &mut TcpStream, limits: Limits) -> Result<Vec<u8>, Failure> {
    let deadline = Instant::now() + limits.read_timeout;
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = match tokio::time::timeout_at(deadline, stream.read(&mut chunk)).await {
            Ok(Ok(n)) => n,
            Ok(Err(err)) => return Err(malformed(format!("failed to read request: {err}"))),
            Err(_) => {
                return Err(malformed(format!(
                    "no complete request within {}s",
                    limits.read_timeout.as_secs_f64()
                )))
            }
        };
        if n == 0 {
            break;
        }

        let start = buf.len();
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf[start..].iter().position(|b| *b == b'\n') {
            buf.truncate(start + pos);
            break;
        }
        if buf.len() > limits.max_request_bytes {
            return Err(malformed(format!(
                "request exceeds {} bytes",
                limits.max_request_bytes
            )));
        }
        if serde_json::from_slice::<serde::de::IgnoredAny>(&buf).is_ok() {
            break;
        }
    }

    if buf.len() > limits.max_request_bytes {
        return Err(malformed(format!(
            "request exceeds {} bytes",
            limits.max_request_bytes
        )));
    }
    if buf.iter().all(u8::is_ascii_whitespace) {
        return Err(malformed("empty request"));
    }
    Ok(buf)
}

async fn respond(stream: &mut TcpStream, response: &Response) -> io::Result<()> {
    let mut line = serde_json::to_vec(response).unwrap_or_else(|err| {
        format!(
            r#"{{"success":false,"error":{{"kind":"InternalAutomationError","message":"cannot encode response: {err}"}}}}"#
        )
        .into_bytes()
    });
    line.push(b'\n');
    stream.write_all(&line).await?;
    stream.flush().await?;
    stream.shutdown().await
}

async fn handle_connection(mut stream: TcpStream, worker: WorkerHandle, limits: Limits) {
    let response = match read_request(&mut stream, limits).await.and_then(|b| parse_request(&b)) {
        Ok(Command::Ping(_)) => match serde_json::to_value(pong()) {
            Ok(value) => Response::ok(value),
            Err(err) => Response::failure(Failure::new(ErrorKind::InternalAutomationError, err.to_string())),
        },
        Ok(command) => worker.submit(command).await,
        Err(failure) => {
            debug!(kind = %failure.kind, message = %failure.message, "rejected request");
            Response::failure(failure)
        }
    };

    if let Err(err) = respond(&mut stream, &response).await {
        warn!(error = %err, "failed to write response");
    }
}
