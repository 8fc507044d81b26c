//! The single task that owns the executor.
//!
//! Connection tasks send `(command, reply)` jobs over a bounded channel; the
//! worker runs them one at a time, each under the command timeout.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use writer_office::Office;
use writer_protocol::{Command, ErrorKind, Failure, Response};

use crate::executor::Executor;

struct Job {
    command: Command,
    reply: oneshot::Sender<Response>,
}

/// Sending side of the worker queue. Cheap to clone.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Job>,
}

impl WorkerHandle {
    /// Queue a command and wait for its response.
    pub async fn submit(&self, command: Command) -> Response {
        let (reply, rx) = oneshot::channel();
        let operation = command.operation();
        if self.tx.send(Job { command, reply }).await.is_err() {
            return Response::failure(Failure::new(
                ErrorKind::BackendUnavailable,
                "command worker has stopped",
            ));
        }
        rx.await.unwrap_or_else(|_| {
            Response::failure(Failure::new(
                ErrorKind::InternalAutomationError,
                format!("{operation}: command worker dropped the request"),
            ))
        })
    }
}

/// Start the worker. It runs until every [`WorkerHandle`] is dropped, then
/// closes the open documents.
pub fn spawn<O>(executor: Executor<O>, queue_depth: usize, timeout: Duration) -> (WorkerHandle, JoinHandle<()>)
where
    O: Office + 'static,
{
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let task = tokio::spawn(run(executor, rx, timeout));
    (WorkerHandle { tx }, task)
}

async fn run<O: Office + 'static>(mut executor: Executor<O>, mut rx: mpsc::Receiver<Job>, timeout: Duration) {
    info!(backend = executor.office().name(), ?timeout, "command worker started");

    while let Some(job) = rx.recv().await {
        let operation = job.command.operation();
        let result = match tokio::time::timeout(timeout, executor.execute(job.command)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation = %operation, ?timeout, "command timed out; resetting the backend");
                if tokio::time::timeout(timeout, executor.reset()).await.is_err() {
                    error!("backend reset timed out");
                }
                Err(Failure::new(
                    ErrorKind::BackendTimeout,
                    format!("{operation} did not finish within {}s", timeout.as_secs_f64()),
                ))
            }
        };
        if job.reply.send(Response::from_result(result)).is_err() {
            warn!(operation = %operation, "client went away before the response");
        }
    }

    info!("command worker stopping");
    if tokio::time::timeout(timeout, executor.shutdown()).await.is_err() {
        error!("closing documents timed out");
    }
}
