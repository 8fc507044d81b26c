//! Pure Rust implementation of the UNO Remote Protocol (URP), enough of it
//! to drive a LibreOffice instance started with a socket listener:
//!
//! ```text
//! soffice --headless --accept="socket,host=localhost,port=2002;urp;StarOffice.ComponentContext"
//! ```
//!
//! # Layers
//!
//! - [`framing`]: length-prefixed blocks on the byte stream
//! - [`codec`]: binary encoding of UNO values, with the type and OID caches
//!   from [`cache`]
//! - [`message`]: request/reply headers and their per-direction caches
//! - [`connection`]: negotiation, synchronous calls and bootstrap
//!
//! [`methods`] lists the interface methods the writer bridge calls, with
//! their absolute function indices.
//!
//! # Example
//!
//! ```rust,no_run
//! use libreoffice_urp::connection::UrpConnection;
//! use libreoffice_urp::methods::x_component_loader;
//! use libreoffice_urp::UnoValue;
//!
//! # async fn example() -> libreoffice_urp::Result<()> {
//! let mut conn = UrpConnection::connect("localhost", 2002).await?;
//! let office = conn.bootstrap().await?;
//! let doc = conn
//!     .call_object(
//!         &office.desktop,
//!         &x_component_loader::LOAD_COMPONENT_FROM_URL,
//!         &[
//!             "private:factory/swriter".into(),
//!             "_blank".into(),
//!             UnoValue::Long(0),
//!             UnoValue::Sequence(vec![]),
//!         ],
//!     )
//!     .await?;
//! # let _ = doc;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod codec;
pub mod connection;
pub mod error;
pub mod framing;
pub mod message;
pub mod methods;
pub mod types;

pub use connection::{Bootstrap, ObjectRef, UrpConnection};
pub use error::{Result, UrpError};
pub use methods::Method;
pub use types::{property_value, Any, Type, TypeClass, UnoException, UnoValue};
