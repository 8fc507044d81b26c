//! [`Office`] implemented over [`DocumentModel`], stored as JSON files.
//!
//! Needs no LibreOffice installation. The bridge uses it with
//! `--backend memory`, and the integration tests drive the full server
//! through it. A [`MemoryControl`] handle can slow every call down or take
//! the backend offline to exercise timeout and outage handling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use writer_protocol::{DocType, Metadata, Position, TextStyle};

use crate::error::{OfficeError, Result};
use crate::model::DocumentModel;
use crate::office::{
    BodyStyle, DocumentFacts, ImageSize, NewParagraph, Office, ParagraphStyle, TableFormat,
};

/// Reference to a document open in a [`MemoryOffice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDoc {
    id: u64,
    doc_type: DocType,
    path: PathBuf,
}

#[derive(Debug, Default)]
struct Control {
    offline: AtomicBool,
    latency_ms: AtomicU64,
    resets: AtomicUsize,
}

/// Shared switches for a running [`MemoryOffice`].
#[derive(Debug, Clone, Default)]
pub struct MemoryControl(Arc<Control>);

impl MemoryControl {
    /// Fail every call with `BackendUnavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.0.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.0.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// How many times the backend was reset.
    pub fn resets(&self) -> usize {
        self.0.resets.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct MemoryOffice {
    open: HashMap<u64, DocumentModel>,
    next_id: u64,
    author: String,
    control: MemoryControl,
}

impl MemoryOffice {
    pub fn new() -> Self {
        Self {
            author: "writer-bridge".to_string(),
            ..Self::default()
        }
    }

    pub fn control(&self) -> MemoryControl {
        self.control.clone()
    }

    async fn enter(&self) -> Result<()> {
        let latency = self.control.0.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.control.0.offline.load(Ordering::SeqCst) {
            return Err(OfficeError::Unavailable("memory backend is offline".into()));
        }
        Ok(())
    }

    async fn model(&mut self, doc: &MemoryDoc) -> Result<&mut DocumentModel> {
        self.enter().await?;
        self.open.get_mut(&doc.id).ok_or_else(|| {
            OfficeError::Automation(format!("stale document reference {}", doc.path.display()))
        })
    }

    fn register(&mut self, path: &Path, model: DocumentModel) -> MemoryDoc {
        self.next_id += 1;
        let doc = MemoryDoc {
            id: self.next_id,
            doc_type: model.doc_type,
            path: path.to_path_buf(),
        };
        self.open.insert(doc.id, model);
        doc
    }
}

async fn write_model(path: &Path, model: &DocumentModel) -> Result<()> {
    let json = serde_json::to_vec_pretty(model)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[async_trait]
impl Office for MemoryOffice {
    type Doc = MemoryDoc;

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_session(&mut self) -> Result<()> {
        self.enter().await
    }

    async fn reset(&mut self) {
        self.open.clear();
        self.control.0.resets.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("memory backend reset");
    }

    async fn create(&mut self, path: &Path, doc_type: DocType, metadata: &Metadata) -> Result<MemoryDoc> {
        self.enter().await?;
        let mut model = DocumentModel::new(doc_type, metadata);
        let now = Utc::now().to_rfc3339();
        model.properties.created = Some(now.clone());
        model.properties.modified = Some(now);
        model.properties.modified_by = self.author.clone();
        write_model(path, &model).await?;
        Ok(self.register(path, model))
    }

    async fn load(&mut self, path: &Path) -> Result<MemoryDoc> {
        self.enter().await?;
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OfficeError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let model: DocumentModel = serde_json::from_slice(&bytes)?;
        Ok(self.register(path, model))
    }

    async fn close(&mut self, doc: &MemoryDoc) -> Result<()> {
        self.enter().await?;
        self.open.remove(&doc.id);
        Ok(())
    }

    fn doc_type(&self, doc: &MemoryDoc) -> DocType {
        doc.doc_type
    }

    async fn store(&mut self, doc: &MemoryDoc) -> Result<()> {
        let author = self.author.clone();
        let model = self.model(doc).await?;
        model.properties.modified = Some(Utc::now().to_rfc3339());
        model.properties.modified_by = author;
        let snapshot = model.clone();
        write_model(&doc.path, &snapshot).await
    }

    async fn store_to(&mut self, doc: &MemoryDoc, target: &Path) -> Result<()> {
        let snapshot = self.model(doc).await?.clone();
        write_model(target, &snapshot).await
    }

    async fn text(&mut self, doc: &MemoryDoc) -> Result<String> {
        Ok(self.model(doc).await?.text())
    }

    async fn facts(&mut self, doc: &MemoryDoc) -> Result<DocumentFacts> {
        let model = self.model(doc).await?;
        let mut facts = model.facts();
        if model.doc_type != DocType::Text {
            facts.text.clear();
            facts.tables.clear();
        }
        Ok(facts)
    }

    async fn insert_text(&mut self, doc: &MemoryDoc, text: &str, position: Position) -> Result<()> {
        self.model(doc).await?.insert_text(text, position);
        Ok(())
    }

    async fn append_paragraph(&mut self, doc: &MemoryDoc, paragraph: &NewParagraph) -> Result<()> {
        self.model(doc).await?.append_paragraph(paragraph);
        Ok(())
    }

    async fn add_table(
        &mut self,
        doc: &MemoryDoc,
        _rows: u32,
        _columns: u32,
        cells: &[Vec<String>],
        header_row: bool,
    ) -> Result<usize> {
        Ok(self.model(doc).await?.add_table(cells.to_vec(), header_row))
    }

    async fn format_table(&mut self, doc: &MemoryDoc, index: usize, format: &TableFormat) -> Result<()> {
        self.model(doc).await?.format_table(index, format)
    }

    async fn replace_all(
        &mut self,
        doc: &MemoryDoc,
        search: &str,
        replace: &str,
        case_sensitive: bool,
    ) -> Result<usize> {
        self.model(doc).await?.replace_all(search, replace, case_sensitive)
    }

    async fn format_text(
        &mut self,
        doc: &MemoryDoc,
        target: &str,
        style: &TextStyle,
        all: bool,
    ) -> Result<usize> {
        Ok(self.model(doc).await?.format_text(target, style, all))
    }

    async fn delete_paragraph(&mut self, doc: &MemoryDoc, index: usize) -> Result<()> {
        self.model(doc).await?.delete_block(index)
    }

    async fn insert_page_break(&mut self, doc: &MemoryDoc, position: Position) -> Result<()> {
        self.model(doc).await?.insert_page_break(position);
        Ok(())
    }

    async fn insert_image(
        &mut self,
        doc: &MemoryDoc,
        image: &Path,
        size: ImageSize,
        position: Position,
    ) -> Result<()> {
        self.model(doc)
            .await?
            .insert_image(image.to_path_buf(), size, position);
        Ok(())
    }

    async fn define_paragraph_style(&mut self, doc: &MemoryDoc, style: &ParagraphStyle) -> Result<()> {
        self.model(doc).await?.define_paragraph_style(style);
        Ok(())
    }

    async fn style_body(&mut self, doc: &MemoryDoc, style: &BodyStyle) -> Result<()> {
        self.model(doc).await?.style_body(style);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metadata() -> Metadata {
        Metadata {
            title: Some("Report".into()),
            keywords: Some("a, b".into()),
            ..Metadata::default()
        }
    }

    #[tokio::test]
    async fn created_documents_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.odt");
        let mut office = MemoryOffice::new();

        let doc = office.create(&path, DocType::Text, &metadata()).await.unwrap();
        office
            .append_paragraph(&doc, &NewParagraph::heading("Intro", 1))
            .await
            .unwrap();
        office.store(&doc).await.unwrap();
        office.close(&doc).await.unwrap();

        let reopened = office.load(&path).await.unwrap();
        let facts = office.facts(&reopened).await.unwrap();
        assert_eq!(facts.title, "Report");
        assert_eq!(facts.keywords, vec!["a", "b"]);
        assert_eq!(facts.text, "Intro");
        assert!(facts.created.is_some());
    }

    #[tokio::test]
    async fn copies_leave_the_source_bound_to_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.odt");
        let target = dir.path().join("b.odt");
        let mut office = MemoryOffice::new();

        let doc = office.create(&source, DocType::Text, &Metadata::default()).await.unwrap();
        office.insert_text(&doc, "copied", Position::End).await.unwrap();
        office.store_to(&doc, &target).await.unwrap();
        office.insert_text(&doc, " later", Position::End).await.unwrap();
        office.store(&doc).await.unwrap();

        let copy = office.load(&target).await.unwrap();
        assert_eq!(office.text(&copy).await.unwrap(), "copied");
        let original = office.load(&source).await.unwrap();
        assert_eq!(office.text(&original).await.unwrap(), "copied later");
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let mut office = MemoryOffice::new();
        let err = office.load(Path::new("/nonexistent/x.odt")).await.unwrap_err();
        assert!(matches!(err, OfficeError::NotFound(_)), "{err}");
    }

    #[tokio::test]
    async fn offline_backend_is_unavailable_and_reset_drops_references() {
        let dir = tempfile::tempdir().unwrap();
        let mut office = MemoryOffice::new();
        let control = office.control();
        let doc = office
            .create(&dir.path().join("x.odt"), DocType::Text, &Metadata::default())
            .await
            .unwrap();

        control.set_offline(true);
        let err = office.ensure_session().await.unwrap_err();
        assert_eq!(err.kind(), writer_protocol::ErrorKind::BackendUnavailable);

        control.set_offline(false);
        office.reset().await;
        assert_eq!(control.resets(), 1);
        let err = office.text(&doc).await.unwrap_err();
        assert!(matches!(err, OfficeError::Automation(_)), "{err}");
    }
}
