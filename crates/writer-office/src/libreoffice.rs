//! [`Office`] backed by a LibreOffice process over URP.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use libreoffice_urp::methods::x_component_loader;
use libreoffice_urp::{property_value, ObjectRef, Type, UnoValue};
use writer_protocol::{DocType, Metadata, Position, TextStyle};

use crate::error::{OfficeError, Result};
use crate::launcher::{OfficeConfig, Session};
use crate::office::{
    BodyStyle, DocumentFacts, ImageSize, NewParagraph, Office, ParagraphStyle, TableFormat,
};
use crate::uno;
use crate::writer::Writer;

/// A document loaded in LibreOffice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoDocument {
    pub component: ObjectRef,
    pub doc_type: DocType,
    pub path: PathBuf,
}

pub struct LibreOffice {
    config: OfficeConfig,
    session: Option<Session>,
}

impl LibreOffice {
    pub fn new(config: OfficeConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &OfficeConfig {
        &self.config
    }

    fn session(&mut self) -> Result<&mut Session> {
        self.session
            .as_mut()
            .ok_or_else(|| OfficeError::Unavailable("no LibreOffice session".into()))
    }

    fn writer<'a>(&'a mut self, doc: &'a LoDocument) -> Result<Writer<'a>> {
        let session = self.session()?;
        Ok(Writer::new(&mut session.conn, &doc.component))
    }

    /// Forget a session whose connection died so the next command reconnects.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_disconnect() {
                tracing::warn!(error = %e, "lost the LibreOffice connection");
                self.session = None;
            }
        }
        result
    }

    async fn load_url(&mut self, url: &str) -> Result<ObjectRef> {
        let session = self.session()?;
        let desktop = session.office.desktop.clone();
        let hidden = property_value("Hidden", UnoValue::Bool(true), Type::boolean());
        let component = session
            .conn
            .call_object(
                &desktop,
                &x_component_loader::LOAD_COMPONENT_FROM_URL,
                &[
                    UnoValue::from(url),
                    UnoValue::from("_blank"),
                    UnoValue::Long(0),
                    UnoValue::Sequence(vec![hidden]),
                ],
            )
            .await?;
        Ok(component)
    }

    async fn create_inner(
        &mut self,
        path: &Path,
        doc_type: DocType,
        metadata: &Metadata,
    ) -> Result<LoDocument> {
        let component = self.load_url(uno::factory_url(doc_type)).await?;
        let doc = LoDocument {
            component,
            doc_type,
            path: path.to_path_buf(),
        };
        let mut writer = self.writer(&doc)?;
        writer.set_metadata(metadata).await?;
        writer.store_as(path, doc_type).await?;
        tracing::info!(path = %path.display(), %doc_type, "created document");
        Ok(doc)
    }

    async fn load_inner(&mut self, path: &Path) -> Result<LoDocument> {
        let component = self.load_url(&uno::file_url(path)).await.map_err(|e| match e {
            // loadComponentFromURL answers an unreadable file with a null reference.
            OfficeError::Urp(libreoffice_urp::UrpError::NullReference(_)) => {
                OfficeError::Automation(format!("LibreOffice could not load {}", path.display()))
            }
            other => other,
        })?;
        let doc_type = {
            let session = self.session()?;
            Writer::new(&mut session.conn, &component).detect_type().await?
        };
        tracing::info!(path = %path.display(), %doc_type, "loaded document");
        Ok(LoDocument {
            component,
            doc_type,
            path: path.to_path_buf(),
        })
    }
}

#[async_trait]
impl Office for LibreOffice {
    type Doc = LoDocument;

    fn name(&self) -> &'static str {
        "libreoffice"
    }

    async fn ensure_session(&mut self) -> Result<()> {
        if self.session.is_none() {
            self.session = Some(Session::establish(&self.config).await?);
        }
        Ok(())
    }

    async fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown().await;
        }
    }

    async fn create(&mut self, path: &Path, doc_type: DocType, metadata: &Metadata) -> Result<LoDocument> {
        let result = self.create_inner(path, doc_type, metadata).await;
        self.settle(result)
    }

    async fn load(&mut self, path: &Path) -> Result<LoDocument> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(OfficeError::NotFound(path.to_path_buf()));
        }
        let result = self.load_inner(path).await;
        self.settle(result)
    }

    async fn close(&mut self, doc: &LoDocument) -> Result<()> {
        let result = match self.writer(doc) {
            Ok(writer) => writer.close().await,
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    fn doc_type(&self, doc: &LoDocument) -> DocType {
        doc.doc_type
    }

    async fn store(&mut self, doc: &LoDocument) -> Result<()> {
        let result = self.writer(doc)?.store().await;
        self.settle(result)
    }

    async fn store_to(&mut self, doc: &LoDocument, target: &Path) -> Result<()> {
        let result = self.writer(doc)?.store_to(target, doc.doc_type).await;
        self.settle(result)
    }

    async fn text(&mut self, doc: &LoDocument) -> Result<String> {
        let result = self.writer(doc)?.text().await;
        self.settle(result)
    }

    async fn facts(&mut self, doc: &LoDocument) -> Result<DocumentFacts> {
        let result = self.writer(doc)?.facts(doc.doc_type).await;
        self.settle(result)
    }

    async fn insert_text(&mut self, doc: &LoDocument, text: &str, position: Position) -> Result<()> {
        let result = self.writer(doc)?.insert_text(text, position).await;
        self.settle(result)
    }

    async fn append_paragraph(&mut self, doc: &LoDocument, paragraph: &NewParagraph) -> Result<()> {
        let result = self.writer(doc)?.append_paragraph(paragraph).await;
        self.settle(result)
    }

    async fn add_table(
        &mut self,
        doc: &LoDocument,
        rows: u32,
        columns: u32,
        cells: &[Vec<String>],
        header_row: bool,
    ) -> Result<usize> {
        let result = self
            .writer(doc)?
            .add_table(rows, columns, cells, header_row)
            .await;
        self.settle(result)
    }

    async fn format_table(&mut self, doc: &LoDocument, index: usize, format: &TableFormat) -> Result<()> {
        let result = self.writer(doc)?.format_table(index, format).await;
        self.settle(result)
    }

    async fn replace_all(
        &mut self,
        doc: &LoDocument,
        search: &str,
        replace: &str,
        case_sensitive: bool,
    ) -> Result<usize> {
        let result = self
            .writer(doc)?
            .replace_all(search, replace, case_sensitive)
            .await;
        self.settle(result)
    }

    async fn format_text(
        &mut self,
        doc: &LoDocument,
        target: &str,
        style: &TextStyle,
        all: bool,
    ) -> Result<usize> {
        let result = self.writer(doc)?.format_text(target, style, all).await;
        self.settle(result)
    }

    async fn delete_paragraph(&mut self, doc: &LoDocument, index: usize) -> Result<()> {
        let result = self.writer(doc)?.delete_paragraph(index).await;
        self.settle(result)
    }

    async fn insert_page_break(&mut self, doc: &LoDocument, position: Position) -> Result<()> {
        let result = self.writer(doc)?.insert_page_break(position).await;
        self.settle(result)
    }

    async fn insert_image(
        &mut self,
        doc: &LoDocument,
        image: &Path,
        size: ImageSize,
        position: Position,
    ) -> Result<()> {
        let result = self.writer(doc)?.insert_image(image, size, position).await;
        self.settle(result)
    }

    async fn define_paragraph_style(&mut self, doc: &LoDocument, style: &ParagraphStyle) -> Result<()> {
        let result = self.writer(doc)?.define_paragraph_style(style).await;
        self.settle(result)
    }

    async fn style_body(&mut self, doc: &LoDocument, style: &BodyStyle) -> Result<()> {
        let result = self.writer(doc)?.style_body(style).await;
        self.settle(result)
    }
}
