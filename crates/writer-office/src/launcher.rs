//! LibreOffice session: the soffice process (when we started it) plus the
//! bootstrapped URP connection.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use libreoffice_urp::{Bootstrap, UrpConnection};
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio::time::sleep;

use crate::error::{OfficeError, Result};

/// How to reach (or start) LibreOffice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeConfig {
    pub soffice_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Start soffice when nothing listens on `host:port`.
    pub launch: bool,
    pub connect_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub extra_args: Vec<String>,
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            soffice_path: PathBuf::from("soffice"),
            host: "localhost".to_string(),
            port: 2002,
            launch: true,
            connect_attempts: 20,
            initial_backoff_ms: 250,
            max_backoff_ms: 2000,
            extra_args: Vec::new(),
        }
    }
}

impl OfficeConfig {
    /// Command-line arguments for a headless soffice listening for URP.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--headless",
            "--invisible",
            "--nocrashreport",
            "--nodefault",
            "--nologo",
            "--nofirststartwizard",
            "--norestore",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(format!(
            "--accept=socket,host={},port={};urp;StarOffice.ComponentContext",
            self.host, self.port
        ));
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Delay before each connection attempt after a launch.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        let max = self.max_backoff_ms.max(self.initial_backoff_ms);
        let mut next = self.initial_backoff_ms;
        (0..self.connect_attempts).map(move |_| {
            let current = next;
            next = next.saturating_mul(2).min(max);
            Duration::from_millis(current)
        })
    }
}

pub struct Session {
    pub conn: UrpConnection,
    pub office: Bootstrap,
    /// The soffice process, if this session started it.
    child: Option<Child>,
}

impl Session {
    /// Connect to a listening LibreOffice, launching one if allowed.
    pub async fn establish(config: &OfficeConfig) -> Result<Self> {
        match Self::connect(config).await {
            Ok(session) => return Ok(session),
            Err(e) if !config.launch => {
                return Err(OfficeError::Unavailable(format!(
                    "nothing usable on {}:{} ({e})",
                    config.host, config.port
                )))
            }
            Err(e) => {
                tracing::info!(host = %config.host, port = config.port, error = %e, "no LibreOffice listening; launching one")
            }
        }

        let mut child = spawn(config)?;
        let mut last_error = None;
        for (attempt, delay) in config.backoff().enumerate() {
            sleep(delay).await;
            match Self::connect(config).await {
                Ok(mut session) => {
                    tracing::info!(attempt = attempt + 1, "connected to launched LibreOffice");
                    session.child = Some(child);
                    return Ok(session);
                }
                Err(e) => {
                    tracing::debug!(attempt = attempt + 1, error = %e, "LibreOffice not ready");
                    last_error = Some(e);
                }
            }
        }

        let _ = child.kill().await;
        Err(OfficeError::Unavailable(format!(
            "LibreOffice did not accept connections on {}:{} after {} attempts{}",
            config.host,
            config.port,
            config.connect_attempts,
            last_error.map(|e| format!(": {e}")).unwrap_or_default()
        )))
    }

    async fn connect(config: &OfficeConfig) -> Result<Self> {
        let mut conn = UrpConnection::connect(&config.host, config.port).await?;
        let office = conn.bootstrap().await?;
        Ok(Self {
            conn,
            office,
            child: None,
        })
    }

    pub fn launched(&self) -> bool {
        self.child.is_some()
    }

    pub async fn shutdown(mut self) {
        let _ = self.conn.shutdown().await;
        if let Some(mut child) = self.child.take() {
            tracing::info!("stopping launched LibreOffice");
            let _ = child.kill().await;
        }
    }
}

fn spawn(config: &OfficeConfig) -> Result<Child> {
    let mut cmd = Command::new(&config.soffice_path);
    cmd.args(config.launch_args())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    tracing::info!(program = %config.soffice_path.display(), "starting LibreOffice");
    cmd.spawn().map_err(|source| OfficeError::Spawn {
        program: config.soffice_path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn launch_args_accept_urp_on_the_endpoint() {
        let config = OfficeConfig {
            port: 2099,
            extra_args: vec!["--nolockcheck".into()],
            ..OfficeConfig::default()
        };
        let args = config.launch_args();
        assert_eq!(args[0], "--headless");
        assert!(args.contains(&"--norestore".to_string()));
        assert!(args.contains(
            &"--accept=socket,host=localhost,port=2099;urp;StarOffice.ComponentContext".to_string()
        ));
        assert_eq!(args.last().map(String::as_str), Some("--nolockcheck"));
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let config = OfficeConfig {
            connect_attempts: 5,
            initial_backoff_ms: 250,
            max_backoff_ms: 1000,
            ..OfficeConfig::default()
        };
        let delays: Vec<u64> = config.backoff().map(|d| d.as_millis() as u64).collect();
        assert_eq!(delays, vec![250, 500, 1000, 1000, 1000]);
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let config = OfficeConfig {
            soffice_path: "/nonexistent/soffice-for-tests".into(),
            port: 1,
            connect_attempts: 1,
            initial_backoff_ms: 1,
            ..OfficeConfig::default()
        };
        let err = Session::establish(&config).await.err().unwrap();
        assert!(matches!(err, OfficeError::Spawn { .. }), "{err}");
        assert_eq!(err.kind(), writer_protocol::ErrorKind::BackendUnavailable);
    }

    #[tokio::test]
    async fn no_launch_reports_unavailable() {
        let config = OfficeConfig {
            port: 1,
            launch: false,
            ..OfficeConfig::default()
        };
        let err = Session::establish(&config).await.err().unwrap();
        assert!(matches!(err, OfficeError::Unavailable(_)), "{err}");
    }
}
