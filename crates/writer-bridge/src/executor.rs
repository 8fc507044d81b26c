//! Runs decoded commands against an [`Office`] backend.
//!
//! The executor owns the backend and the handle table. It is driven by the
//! worker task only, one command at a time.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use writer_office::{
    picture, BodyStyle, NewParagraph, Office, ParagraphStyle, TableFormat,
};
use writer_protocol::{
    text_statistics, AddTableArgs, Command, Copied, Counted, Created, DocType, DocumentInfo,
    Edited, ErrorKind, Failure, Metadata, Operation, Opened, Pong, Position, TableAdded,
};

use crate::handles::{DocumentHandle, HandleTable};
use crate::listing;
use crate::paths::PathResolver;

/// Heading levels map onto the built-in `Heading 1` .. `Heading 10` styles.
pub const MAX_HEADING_LEVEL: u8 = 10;

/// The `ping` payload. Answered without the backend.
pub fn pong() -> Pong {
    Pong {
        message: "pong".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn payload<T: Serialize>(value: &T) -> Result<Value, Failure> {
    serde_json::to_value(value).map_err(|e| {
        Failure::new(
            ErrorKind::InternalAutomationError,
            format!("cannot encode result: {e}"),
        )
    })
}

fn invalid(op: Operation, field: &str, message: impl std::fmt::Display) -> Failure {
    Failure::new(
        ErrorKind::InvalidArgument,
        format!("{op}: invalid argument `{field}`: {message}"),
    )
}

fn require_non_empty(op: Operation, field: &str, value: &str) -> Result<(), Failure> {
    if value.is_empty() {
        return Err(invalid(op, field, "must not be empty"));
    }
    Ok(())
}

/// The table cells to write: the given grid, checked against the stated
/// shape, or an empty grid of that shape.
pub fn table_cells(args: &AddTableArgs) -> Result<Vec<Vec<String>>, Failure> {
    let op = Operation::AddTable;
    if args.rows == 0 {
        return Err(invalid(op, "rows", "must be at least 1"));
    }
    if args.columns == 0 {
        return Err(invalid(op, "columns", "must be at least 1"));
    }
    let (rows, columns) = (args.rows as usize, args.columns as usize);
    let Some(grid) = args.grid() else {
        return Ok(vec![vec![String::new(); columns]; rows]);
    };
    if grid.len() != rows {
        return Err(Failure::new(
            ErrorKind::ShapeMismatch,
            format!("data has {} rows but the table has {rows}", grid.len()),
        ));
    }
    if let Some((i, row)) = grid.iter().enumerate().find(|(_, row)| row.len() != columns) {
        return Err(Failure::new(
            ErrorKind::ShapeMismatch,
            format!("data row {i} has {} cells but the table has {columns} columns", row.len()),
        ));
    }
    Ok(grid)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

pub struct Executor<O: Office> {
    office: O,
    handles: HandleTable<O::Doc>,
    paths: PathResolver,
    default_position: Position,
}

impl<O: Office> Executor<O> {
    pub fn new(office: O, paths: PathResolver, default_position: Position) -> Self {
        Self {
            office,
            handles: HandleTable::new(),
            paths,
            default_position,
        }
    }

    pub fn office(&self) -> &O {
        &self.office
    }

    pub fn handles(&self) -> &HandleTable<O::Doc> {
        &self.handles
    }

    /// Run one command. Failures come back as the wire record; nothing
    /// here panics on bad input.
    pub async fn execute(&mut self, command: Command) -> Result<Value, Failure> {
        let op = command.operation();
        info!(operation = %op, path = command.path().unwrap_or(""), "executing");

        let result = self.dispatch(command).await;
        if let Err(failure) = &result {
            if failure.kind == ErrorKind::BackendUnavailable && !self.handles.is_empty() {
                warn!(operation = %op, "backend unavailable; forgetting open documents");
                self.handles.clear();
            }
            debug!(operation = %op, kind = %failure.kind, message = %failure.message, "command failed");
        }
        result
    }

    /// Drop the backend session and every handle. The next command starts
    /// from the files on disk.
    pub async fn reset(&mut self) {
        self.handles.clear();
        self.office.reset().await;
    }

    /// Close every open document and release the backend.
    pub async fn shutdown(&mut self) {
        for handle in self.handles.drain() {
            if let Err(err) = self.office.close(&handle.doc).await {
                warn!(path = %handle.path.display(), error = %err, "failed to close document");
            }
        }
        self.office.reset().await;
    }

    fn position(&self, requested: Option<Position>) -> Position {
        requested.unwrap_or(self.default_position)
    }

    /// The handle for `path`, loading the file if needed. With `create`, a
    /// missing file becomes a new document; the flag reports whether that
    /// happened.
    async fn document(
        &mut self,
        path: &Path,
        create: Option<(DocType, &Metadata)>,
    ) -> Result<(DocumentHandle<O::Doc>, bool), Failure> {
        if let Some(handle) = self.handles.get(path) {
            return Ok((handle.clone(), false));
        }

        self.office.ensure_session().await?;
        let exists = tokio::fs::try_exists(path).await.map_err(|e| {
            Failure::new(
                ErrorKind::InternalAutomationError,
                format!("cannot check {}: {e}", path.display()),
            )
        })?;
        let (doc, created) = match create {
            Some((doc_type, metadata)) if !exists => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        Failure::new(
                            ErrorKind::InvalidArgument,
                            format!("cannot create {}: {e}", parent.display()),
                        )
                    })?;
                }
                (self.office.create(path, doc_type, metadata).await?, true)
            }
            _ if !exists => {
                return Err(Failure::new(
                    ErrorKind::DocumentNotFound,
                    format!("document not found: {}", path.display()),
                ))
            }
            _ => (self.office.load(path).await?, false),
        };

        debug!(path = %path.display(), created, backend = self.office.name(), "document opened");
        let handle = self.handles.insert(path.to_path_buf(), doc);
        if created {
            self.handles.mark_saved(path);
        }
        Ok((handle, created))
    }

    /// An existing text document.
    async fn text_document(&mut self, op: Operation, raw: &str) -> Result<DocumentHandle<O::Doc>, Failure> {
        let path = self.paths.resolve(raw)?;
        let (handle, _) = self.document(&path, None).await?;
        let doc_type = self.office.doc_type(&handle.doc);
        if doc_type != DocType::Text {
            return Err(Failure::new(
                ErrorKind::InvalidArgument,
                format!("{op} needs a text document, {} is a {doc_type} document", path.display()),
            ));
        }
        Ok(handle)
    }

    async fn save(&mut self, handle: &DocumentHandle<O::Doc>) -> Result<(), Failure> {
        self.office.store(&handle.doc).await?;
        self.handles.mark_saved(&handle.path);
        Ok(())
    }

    async fn saved(&mut self, handle: &DocumentHandle<O::Doc>, message: String) -> Result<Value, Failure> {
        self.save(handle).await?;
        payload(&Edited {
            path: display(&handle.path),
            message,
        })
    }

    async fn counted(&mut self, handle: &DocumentHandle<O::Doc>, count: usize) -> Result<Value, Failure> {
        if count > 0 {
            self.save(handle).await?;
        }
        payload(&Counted {
            path: display(&handle.path),
            count,
        })
    }

    async fn dispatch(&mut self, command: Command) -> Result<Value, Failure> {
        let op = command.operation();
        match command {
            Command::Ping(_) => payload(&pong()),

            Command::Create(args) => {
                let path = self.paths.resolve(&args.path)?;
                let doc_type = args.doc_type.unwrap_or_else(|| DocType::infer(&path));
                let metadata = args.metadata.unwrap_or_default();
                let (handle, created) = self.document(&path, Some((doc_type, &metadata))).await?;
                payload(&Created {
                    path: display(&path),
                    handle: handle.id,
                    doc_type: self.office.doc_type(&handle.doc),
                    created,
                })
            }

            Command::Open(args) => {
                let handle = self.text_document(op, &args.path).await?;
                let text = self.office.text(&handle.doc).await?;
                payload(&Opened {
                    path: display(&handle.path),
                    handle: handle.id,
                    doc_type: DocType::Text,
                    text,
                })
            }

            Command::List(args) => {
                let dir = match args.directory.as_deref() {
                    Some(raw) => self.paths.resolve(raw)?,
                    None => self.paths.root().to_path_buf(),
                };
                payload(&listing::list_documents(&dir).await?)
            }

            Command::GetProperties(args) => {
                let path = self.paths.resolve(&args.path)?;
                let (handle, _) = self.document(&path, None).await?;
                let facts = self.office.facts(&handle.doc).await?;
                let (word_count, character_count, paragraph_count) = text_statistics(&facts.text);
                payload(&DocumentInfo {
                    path: display(&path),
                    doc_type: self.office.doc_type(&handle.doc),
                    title: facts.title,
                    subject: facts.subject,
                    author: facts.author,
                    description: facts.description,
                    keywords: facts.keywords,
                    modified_by: facts.modified_by,
                    created: facts.created,
                    modified: facts.modified,
                    word_count,
                    character_count,
                    paragraph_count,
                    text: facts.text,
                    tables: facts.tables,
                })
            }

            Command::AddText(args) => {
                require_non_empty(op, "text", &args.text)?;
                let handle = self.text_document(op, &args.path).await?;
                let position = self.position(args.position);
                self.office.insert_text(&handle.doc, &args.text, position).await?;
                self.saved(&handle, format!("text added at the {}", position_name(position))).await
            }

            Command::AddHeading(args) => {
                if !(1..=MAX_HEADING_LEVEL).contains(&args.level) {
                    return Err(invalid(
                        op,
                        "level",
                        format!("must be between 1 and {MAX_HEADING_LEVEL}, got {}", args.level),
                    ));
                }
                let handle = self.text_document(op, &args.path).await?;
                self.office
                    .append_paragraph(&handle.doc, &NewParagraph::heading(args.text, args.level))
                    .await?;
                self.saved(&handle, format!("level {} heading added", args.level)).await
            }

            Command::AddParagraph(args) => {
                let handle = self.text_document(op, &args.path).await?;
                let paragraph = NewParagraph {
                    text: args.text,
                    style: args.style,
                    alignment: args.alignment,
                };
                self.office.append_paragraph(&handle.doc, &paragraph).await?;
                self.saved(&handle, "paragraph added".to_string()).await
            }

            Command::AddTable(args) => {
                let cells = table_cells(&args)?;
                let handle = self.text_document(op, &args.path).await?;
                let table_index = self
                    .office
                    .add_table(&handle.doc, args.rows, args.columns, &cells, args.header_row)
                    .await?;
                self.save(&handle).await?;
                payload(&TableAdded {
                    path: display(&handle.path),
                    table_index,
                    rows: args.rows,
                    columns: args.columns,
                })
            }

            Command::FormatTable(args) => {
                let handle = self.text_document(op, &args.path).await?;
                let format = TableFormat {
                    border_width: args.border_width,
                    background_color: args.background_color,
                    header_row: args.header_row,
                };
                self.office.format_table(&handle.doc, args.table_index, &format).await?;
                self.saved(&handle, format!("table {} formatted", args.table_index)).await
            }

            Command::SearchReplace(args) => {
                require_non_empty(op, "search", &args.search)?;
                let handle = self.text_document(op, &args.path).await?;
                let count = self
                    .office
                    .replace_all(&handle.doc, &args.search, &args.replace, args.case_sensitive)
                    .await?;
                self.counted(&handle, count).await
            }

            Command::DeleteText(args) => {
                require_non_empty(op, "text", &args.text)?;
                let handle = self.text_document(op, &args.path).await?;
                let count = self
                    .office
                    .replace_all(&handle.doc, &args.text, "", args.case_sensitive)
                    .await?;
                self.counted(&handle, count).await
            }

            Command::DeleteParagraph(args) => {
                let handle = self.text_document(op, &args.path).await?;
                self.office.delete_paragraph(&handle.doc, args.index).await?;
                self.saved(&handle, format!("paragraph {} deleted", args.index)).await
            }

            Command::InsertPageBreak(args) => {
                let handle = self.text_document(op, &args.path).await?;
                let position = self.position(args.position);
                self.office.insert_page_break(&handle.doc, position).await?;
                self.saved(&handle, format!("page break inserted at the {}", position_name(position)))
                    .await
            }

            Command::InsertImage(args) => {
                let image = self.paths.resolve(&args.image_path)?;
                if !tokio::fs::metadata(&image).await.map(|m| m.is_file()).unwrap_or(false) {
                    return Err(invalid(
                        op,
                        "image_path",
                        format!("image not found: {}", image.display()),
                    ));
                }
                let size = picture::size_for(&image, args.width, args.height)?;
                let handle = self.text_document(op, &args.path).await?;
                let position = self.position(args.position);
                self.office.insert_image(&handle.doc, &image, size, position).await?;
                self.saved(&handle, format!("image {} inserted", image.display())).await
            }

            Command::FormatText(args) => {
                require_non_empty(op, "text", &args.text)?;
                if args.style.is_empty() {
                    return Err(Failure::new(
                        ErrorKind::InvalidArgument,
                        format!("{op}: no style attribute given"),
                    ));
                }
                let handle = self.text_document(op, &args.path).await?;
                let count = self
                    .office
                    .format_text(&handle.doc, &args.text, &args.style, args.all)
                    .await?;
                if count == 0 {
                    return Err(Failure::new(
                        ErrorKind::TextNotFound,
                        format!("text {:?} not found in {}", args.text, handle.path.display()),
                    ));
                }
                self.counted(&handle, count).await
            }

            Command::CopyDocument(args) => {
                let source = self.paths.resolve(&args.path)?;
                let target = self.paths.resolve(&args.target)?;
                if source == target {
                    return Err(invalid(op, "target", "must differ from the source path"));
                }
                let (handle, _) = self.document(&source, None).await?;
                self.release(&target).await;
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        invalid(op, "target", format!("cannot create {}: {e}", parent.display()))
                    })?;
                }
                self.office.store_to(&handle.doc, &target).await?;
                payload(&Copied {
                    source: display(&source),
                    target: display(&target),
                })
            }

            Command::CreateCustomStyle(args) => {
                require_non_empty(op, "name", args.name.trim())?;
                let handle = self.text_document(op, &args.path).await?;
                let style = ParagraphStyle {
                    name: args.name,
                    font_name: args.font_name,
                    font_size: args.font_size,
                    bold: args.bold,
                    italic: args.italic,
                    underline: args.underline,
                    color: args.color,
                    alignment: args.alignment,
                };
                self.office.define_paragraph_style(&handle.doc, &style).await?;
                self.saved(&handle, format!("paragraph style {:?} defined", style.name)).await
            }

            Command::ApplyDocumentStyle(args) => {
                let handle = self.text_document(op, &args.path).await?;
                let style = BodyStyle {
                    font_name: args.font_name,
                    font_size: args.font_size,
                    color: args.color,
                    alignment: args.alignment,
                };
                self.office.style_body(&handle.doc, &style).await?;
                self.saved(&handle, "document style applied".to_string()).await
            }
        }
    }

    /// Close and forget the handle on `path`, if any, so the next access
    /// reads the file afresh.
    async fn release(&mut self, path: &Path) {
        if let Some(handle) = self.handles.remove(path) {
            if let Err(err) = self.office.close(&handle.doc).await {
                warn!(path = %path.display(), error = %err, "failed to close replaced document");
            }
        }
    }

    /// Test helper: the handle id for `path`, if one is open.
    pub fn handle_id(&self, path: &Path) -> Option<u64> {
        self.handles.get(path).map(|h| h.id)
    }

    /// Resolve a request path the way commands do.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, Failure> {
        self.paths.resolve(raw)
    }
}

fn position_name(position: Position) -> &'static str {
    match position {
        Position::Start => "start",
        Position::End => "end",
    }
}
