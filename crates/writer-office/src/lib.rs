//! Document backends for the writer bridge.
//!
//! The bridge talks to documents only through the [`Office`] trait. Two
//! implementations exist:
//!
//! - [`LibreOffice`] drives a headless LibreOffice over URP, launching it on
//!   demand and reconnecting after the connection drops;
//! - [`MemoryOffice`] keeps a [`DocumentModel`] per document and stores it as
//!   JSON, for tests and for development without an office install.
//!
//! ```text
//! executor
//!     └── Office
//!           ├── LibreOffice ── Session ── UrpConnection ── TCP ── soffice
//!           └── MemoryOffice ── DocumentModel ── JSON file
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use writer_office::{LibreOffice, NewParagraph, Office, OfficeConfig};
//! use writer_protocol::{DocType, Metadata};
//!
//! # async fn example() -> writer_office::Result<()> {
//! let mut office = LibreOffice::new(OfficeConfig::default());
//! office.ensure_session().await?;
//!
//! let path = std::path::Path::new("/tmp/report.odt");
//! let doc = office.create(path, DocType::Text, &Metadata::default()).await?;
//! office.append_paragraph(&doc, &NewParagraph::heading("Summary", 1)).await?;
//! office.store(&doc).await?;
//! office.close(&doc).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod launcher;
pub mod libreoffice;
pub mod memory;
pub mod model;
pub mod office;
pub mod picture;
pub mod uno;
pub mod writer;

pub use error::{OfficeError, Result};
pub use launcher::{OfficeConfig, Session};
pub use libreoffice::{LibreOffice, LoDocument};
pub use memory::{MemoryControl, MemoryDoc, MemoryOffice};
pub use model::DocumentModel;
pub use office::{
    BodyStyle, DocumentFacts, ImageSize, NewParagraph, Office, ParagraphStyle, TableFormat,
};
