//! Errors raised while talking URP.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UrpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The remote side raised a UNO exception. `message` is passed on untouched.
    #[error("{type_name}: {message}")]
    RemoteException { type_name: String, message: String },

    #[error("cache miss: {0}")]
    Cache(String),

    #[error("unknown type class {0}")]
    UnknownTypeClass(u8),

    #[error("object {oid} does not implement {interface}")]
    Unsupported { oid: String, interface: String },

    #[error("{0}() returned a null reference")]
    NullReference(&'static str),
}

impl UrpError {
    /// True when the bridge itself is gone and a new connection is needed.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, UrpError::Io(_) | UrpError::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, UrpError>;
