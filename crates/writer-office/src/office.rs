//! The backend seam between the command executor and a document engine.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use writer_protocol::{Alignment, Color, DocType, Metadata, Position, TableSummary, TextStyle};

use crate::error::Result;

/// Stored properties and contents of a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFacts {
    pub title: String,
    pub subject: String,
    pub author: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub modified_by: String,
    /// RFC 3339.
    pub created: Option<String>,
    pub modified: Option<String>,
    pub text: String,
    pub tables: Vec<TableSummary>,
}

/// A paragraph appended at the end of the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewParagraph {
    pub text: String,
    pub style: Option<String>,
    pub alignment: Option<Alignment>,
}

impl NewParagraph {
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        Self {
            text: text.into(),
            style: Some(format!("Heading {level}")),
            alignment: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFormat {
    /// 1/100 mm.
    pub border_width: Option<u32>,
    pub background_color: Option<Color>,
    /// Bold with a gray background when true, plain with white when false.
    pub header_row: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphStyle {
    pub name: String,
    pub font_name: Option<String>,
    /// Points.
    pub font_size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<Color>,
    pub alignment: Option<Alignment>,
}

/// Character and paragraph attributes applied to the whole body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyStyle {
    pub font_name: Option<String>,
    pub font_size: Option<f32>,
    pub color: Option<Color>,
    pub alignment: Option<Alignment>,
}

/// Image extent in 1/100 mm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// A document engine.
///
/// Implementations hand out document references of type `Doc`; the caller
/// keeps at most one per path and passes it back for every operation. Every
/// method taking `&Self::Doc` may assume the reference came from this
/// backend since the last [`reset`](Office::reset).
#[async_trait]
pub trait Office: Send {
    type Doc: Clone + fmt::Debug + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Connect (launching the engine if needed). Idempotent.
    async fn ensure_session(&mut self) -> Result<()>;

    /// Drop the session and every document reference handed out.
    async fn reset(&mut self);

    async fn create(&mut self, path: &Path, doc_type: DocType, metadata: &Metadata)
        -> Result<Self::Doc>;

    /// Load an existing file; `NotFound` when it is missing.
    async fn load(&mut self, path: &Path) -> Result<Self::Doc>;

    async fn close(&mut self, doc: &Self::Doc) -> Result<()>;

    fn doc_type(&self, doc: &Self::Doc) -> DocType;

    /// Write the document back to the file it was loaded from or created at.
    async fn store(&mut self, doc: &Self::Doc) -> Result<()>;

    /// Write a copy to `target`, in the format its extension implies.
    async fn store_to(&mut self, doc: &Self::Doc, target: &Path) -> Result<()>;

    async fn text(&mut self, doc: &Self::Doc) -> Result<String>;

    async fn facts(&mut self, doc: &Self::Doc) -> Result<DocumentFacts>;

    async fn insert_text(&mut self, doc: &Self::Doc, text: &str, position: Position)
        -> Result<()>;

    async fn append_paragraph(&mut self, doc: &Self::Doc, paragraph: &NewParagraph)
        -> Result<()>;

    /// Append a `rows` x `columns` table filled from `cells` and return its
    /// index among the document's tables.
    async fn add_table(
        &mut self,
        doc: &Self::Doc,
        rows: u32,
        columns: u32,
        cells: &[Vec<String>],
        header_row: bool,
    ) -> Result<usize>;

    async fn format_table(&mut self, doc: &Self::Doc, index: usize, format: &TableFormat)
        -> Result<()>;

    /// Replace every occurrence and return how many there were.
    async fn replace_all(
        &mut self,
        doc: &Self::Doc,
        search: &str,
        replace: &str,
        case_sensitive: bool,
    ) -> Result<usize>;

    /// Style the first occurrence of `target`, or every one when `all`.
    /// Returns the number of ranges styled.
    async fn format_text(
        &mut self,
        doc: &Self::Doc,
        target: &str,
        style: &TextStyle,
        all: bool,
    ) -> Result<usize>;

    /// Remove the `index`th body element; tables count as elements.
    async fn delete_paragraph(&mut self, doc: &Self::Doc, index: usize) -> Result<()>;

    async fn insert_page_break(&mut self, doc: &Self::Doc, position: Position) -> Result<()>;

    async fn insert_image(
        &mut self,
        doc: &Self::Doc,
        image: &Path,
        size: ImageSize,
        position: Position,
    ) -> Result<()>;

    /// Create the paragraph style, or update it when it exists.
    async fn define_paragraph_style(&mut self, doc: &Self::Doc, style: &ParagraphStyle)
        -> Result<()>;

    async fn style_body(&mut self, doc: &Self::Doc, style: &BodyStyle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_use_the_builtin_styles() {
        let p = NewParagraph::heading("Intro", 2);
        assert_eq!(p.style.as_deref(), Some("Heading 2"));
        assert_eq!(p.text, "Intro");
    }
}
