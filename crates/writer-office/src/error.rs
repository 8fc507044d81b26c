//! Error types for the document backends.

use std::path::PathBuf;

use thiserror::Error;
use writer_protocol::{ErrorKind, Failure};

#[derive(Debug, Error)]
pub enum OfficeError {
    #[error(transparent)]
    Urp(#[from] libreoffice_urp::UrpError),

    #[error("LibreOffice is unavailable: {0}")]
    Unavailable(String),

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    ShapeMismatch(String),

    #[error("{0}")]
    TextNotFound(String),

    #[error("{0}")]
    Automation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document model error: {0}")]
    Model(#[from] serde_json::Error),
}

impl OfficeError {
    /// The wire category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OfficeError::Urp(e) if e.is_disconnect() => ErrorKind::BackendUnavailable,
            OfficeError::Unavailable(_) | OfficeError::Spawn { .. } => {
                ErrorKind::BackendUnavailable
            }
            OfficeError::NotFound(_) => ErrorKind::DocumentNotFound,
            OfficeError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            OfficeError::ShapeMismatch(_) => ErrorKind::ShapeMismatch,
            OfficeError::TextNotFound(_) => ErrorKind::TextNotFound,
            OfficeError::Urp(_)
            | OfficeError::Automation(_)
            | OfficeError::Io(_)
            | OfficeError::Model(_) => ErrorKind::InternalAutomationError,
        }
    }

    /// Whether the session should be considered dead after this error.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, OfficeError::Urp(e) if e.is_disconnect())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        OfficeError::InvalidArgument(message.into())
    }
}

impl From<OfficeError> for Failure {
    fn from(err: OfficeError) -> Self {
        Failure::new(err.kind(), err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OfficeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use libreoffice_urp::UrpError;

    #[test]
    fn kinds_follow_the_wire_taxonomy() {
        assert_eq!(
            OfficeError::Urp(UrpError::ConnectionClosed).kind(),
            ErrorKind::BackendUnavailable
        );
        assert_eq!(
            OfficeError::NotFound("/tmp/x.odt".into()).kind(),
            ErrorKind::DocumentNotFound
        );
        assert_eq!(
            OfficeError::Urp(UrpError::RemoteException {
                type_name: "com.sun.star.uno.RuntimeException".into(),
                message: "boom".into(),
            })
            .kind(),
            ErrorKind::InternalAutomationError
        );
    }

    #[test]
    fn remote_exceptions_pass_through() {
        let failure = Failure::from(OfficeError::Urp(UrpError::RemoteException {
            type_name: "com.sun.star.lang.IllegalArgumentException".into(),
            message: "no such style".into(),
        }));
        assert_eq!(failure.kind, ErrorKind::InternalAutomationError);
        assert_eq!(
            failure.message,
            "com.sun.star.lang.IllegalArgumentException: no such style"
        );
    }
}
