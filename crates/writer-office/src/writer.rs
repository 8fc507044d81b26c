//! Text document operations over a live URP connection.

use std::path::Path;

use libreoffice_urp::methods::names::*;
use libreoffice_urp::methods::*;
use libreoffice_urp::{property_value, ObjectRef, Type, UnoValue, UrpConnection, UrpError};
use writer_protocol::{DocType, Metadata, Position, TableSummary, TextStyle};

use crate::error::{OfficeError, Result};
use crate::office::{BodyStyle, DocumentFacts, ImageSize, NewParagraph, ParagraphStyle, TableFormat};
use crate::uno::{self, font_slant, font_underline, font_weight, service, value, BorderLine2};

/// `MediaDescriptor` entries for storing to `path`.
pub(crate) fn store_args(path: &Path, doc_type: DocType) -> UnoValue {
    let mut props = Vec::with_capacity(2);
    if let Some(filter) = uno::export_filter(path, doc_type) {
        props.push(property_value("FilterName", UnoValue::from(filter), Type::string()));
    }
    props.push(property_value("Overwrite", UnoValue::Bool(true), Type::boolean()));
    UnoValue::Sequence(props)
}

/// A document inside an open session.
pub struct Writer<'a> {
    conn: &'a mut UrpConnection,
    doc: &'a ObjectRef,
}

impl<'a> Writer<'a> {
    pub fn new(conn: &'a mut UrpConnection, doc: &'a ObjectRef) -> Self {
        Self { conn, doc }
    }

    async fn qi(&mut self, target: &ObjectRef, interface: &str) -> Result<ObjectRef> {
        Ok(self.conn.require(target, interface).await?)
    }

    async fn doc_qi(&mut self, interface: &str) -> Result<ObjectRef> {
        let doc = self.doc;
        self.qi(doc, interface).await
    }

    /// Set several properties through one `XPropertySet`.
    async fn set_properties(&mut self, target: &ObjectRef, props: &[(&str, UnoValue)]) -> Result<()> {
        if props.is_empty() {
            return Ok(());
        }
        let ps = self.qi(target, X_PROPERTY_SET).await?;
        for (name, v) in props {
            self.conn
                .call(
                    &ps,
                    &x_property_set::SET_PROPERTY_VALUE,
                    &[UnoValue::from(*name), v.clone()],
                )
                .await?;
        }
        Ok(())
    }

    async fn count(&mut self, container: &ObjectRef) -> Result<usize> {
        let n = self.conn.call(container, &x_index_access::GET_COUNT, &[]).await?;
        reply_count(&n, "getCount")
    }

    async fn item(&mut self, container: &ObjectRef, index: usize, interface: &str) -> Result<ObjectRef> {
        let found = self
            .conn
            .call_object(container, &x_index_access::GET_BY_INDEX, &[UnoValue::Long(index as i32)])
            .await?;
        self.qi(&found, interface).await
    }

    // ========================================================================
    // Body access
    // ========================================================================

    async fn body(&mut self) -> Result<ObjectRef> {
        let td = self.doc_qi(X_TEXT_DOCUMENT).await?;
        Ok(self.conn.call_object(&td, &x_text_document::GET_TEXT, &[]).await?)
    }

    async fn edge(&mut self, body: &ObjectRef, position: Position) -> Result<ObjectRef> {
        let method = match position {
            Position::Start => &x_text_range::GET_START,
            Position::End => &x_text_range::GET_END,
        };
        Ok(self.conn.call_object(body, method, &[]).await?)
    }

    async fn paragraph_break(&mut self, body: &ObjectRef, at: &ObjectRef) -> Result<()> {
        self.conn
            .call(
                body,
                &x_text::INSERT_CONTROL_CHARACTER,
                &[
                    UnoValue::Interface(at.oid.clone()),
                    UnoValue::Short(uno::PARAGRAPH_BREAK),
                    UnoValue::Bool(false),
                ],
            )
            .await?;
        Ok(())
    }

    /// A paragraph cursor collapsed at the end of the body.
    async fn cursor_at_end(&mut self, body: &ObjectRef) -> Result<ObjectRef> {
        let cursor = self.conn.call_object(body, &x_text::CREATE_TEXT_CURSOR, &[]).await?;
        let cursor = self.qi(&cursor, X_PARAGRAPH_CURSOR).await?;
        self.conn
            .call(&cursor, &x_text_cursor::GOTO_END, &[UnoValue::Bool(false)])
            .await?;
        Ok(cursor)
    }

    pub async fn text(&mut self) -> Result<String> {
        let body = self.body().await?;
        let s = self.conn.call(&body, &x_text_range::GET_STRING, &[]).await?;
        Ok(s.as_str().unwrap_or_default().to_owned())
    }

    pub async fn insert_text(&mut self, text: &str, position: Position) -> Result<()> {
        let body = self.body().await?;
        let at = self.edge(&body, position).await?;
        self.conn
            .call(
                &body,
                &x_text::INSERT_STRING,
                &[UnoValue::Interface(at.oid), UnoValue::from(text), UnoValue::Bool(false)],
            )
            .await?;
        Ok(())
    }

    pub async fn append_paragraph(&mut self, paragraph: &NewParagraph) -> Result<()> {
        let body = self.body().await?;

        // Start a new paragraph unless the last one is still empty.
        let cursor = self.cursor_at_end(&body).await?;
        self.conn
            .call(
                &cursor,
                &x_paragraph_cursor::GOTO_START_OF_PARAGRAPH,
                &[UnoValue::Bool(true)],
            )
            .await?;
        let last = self.conn.call(&cursor, &x_text_range::GET_STRING, &[]).await?;
        if !last.as_str().unwrap_or_default().is_empty() {
            let end = self.edge(&body, Position::End).await?;
            self.paragraph_break(&body, &end).await?;
        }

        let end = self.edge(&body, Position::End).await?;
        self.conn
            .call(
                &body,
                &x_text::INSERT_STRING,
                &[
                    UnoValue::Interface(end.oid),
                    UnoValue::from(paragraph.text.as_str()),
                    UnoValue::Bool(false),
                ],
            )
            .await?;

        let mut props = Vec::new();
        if let Some(style) = &paragraph.style {
            props.push(("ParaStyleName", value::string(style)));
        }
        if let Some(alignment) = paragraph.alignment {
            props.push((
                "ParaAdjust",
                value::enumeration(uno::enum_type::PARAGRAPH_ADJUST, uno::paragraph_adjust(alignment)),
            ));
        }
        if !props.is_empty() {
            let cursor = self.cursor_at_end(&body).await?;
            self.set_properties(&cursor, &props).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Tables
    // ========================================================================

    async fn tables(&mut self) -> Result<ObjectRef> {
        let supplier = self.doc_qi(X_TEXT_TABLES_SUPPLIER).await?;
        let tables = self
            .conn
            .call_object(&supplier, &x_text_tables_supplier::GET_TEXT_TABLES, &[])
            .await?;
        self.qi(&tables, X_INDEX_ACCESS).await
    }

    async fn table(&mut self, index: usize) -> Result<ObjectRef> {
        let tables = self.tables().await?;
        let count = self.count(&tables).await?;
        if index >= count {
            return Err(OfficeError::invalid(format!(
                "table index {index} is out of range (document has {count} tables)"
            )));
        }
        self.item(&tables, index, X_TEXT_TABLE).await
    }

    async fn cell_text(&mut self, range: &ObjectRef, column: usize, row: usize) -> Result<ObjectRef> {
        let cell = self
            .conn
            .call_object(
                range,
                &x_cell_range::GET_CELL_BY_POSITION,
                &[UnoValue::Long(column as i32), UnoValue::Long(row as i32)],
            )
            .await?;
        self.qi(&cell, X_TEXT).await
    }

    /// Set the weight of everything in a cell.
    async fn embolden_cell(&mut self, cell: &ObjectRef, bold: bool) -> Result<()> {
        let cursor = self.conn.call_object(cell, &x_text::CREATE_TEXT_CURSOR, &[]).await?;
        self.conn
            .call(&cursor, &x_text_cursor::GOTO_START, &[UnoValue::Bool(false)])
            .await?;
        self.conn
            .call(&cursor, &x_text_cursor::GOTO_END, &[UnoValue::Bool(true)])
            .await?;
        let weight = if bold { font_weight::BOLD } else { font_weight::NORMAL };
        self.set_properties(&cursor, &[("CharWeight", value::float(weight))])
            .await
    }

    pub async fn add_table(
        &mut self,
        rows: u32,
        columns: u32,
        cells: &[Vec<String>],
        header_row: bool,
    ) -> Result<usize> {
        let factory = self.doc_qi(X_MULTI_SERVICE_FACTORY).await?;
        let created = self
            .conn
            .call_object(&factory, &x_multi_service_factory::CREATE_INSTANCE, &[UnoValue::from(service::TEXT_TABLE)])
            .await?;
        let table = self.qi(&created, X_TEXT_TABLE).await?;
        self.conn
            .call(
                &table,
                &x_text_table::INITIALIZE,
                &[UnoValue::Long(rows as i32), UnoValue::Long(columns as i32)],
            )
            .await?;

        let body = self.body().await?;
        let end = self.edge(&body, Position::End).await?;
        let content = self.qi(&table, X_TEXT_CONTENT).await?;
        self.conn
            .call(
                &body,
                &x_text::INSERT_TEXT_CONTENT,
                &[
                    UnoValue::Interface(end.oid),
                    UnoValue::Interface(content.oid),
                    UnoValue::Bool(false),
                ],
            )
            .await?;

        let range = self.qi(&table, X_CELL_RANGE).await?;
        for (r, row) in cells.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                let cell = self.cell_text(&range, c, r).await?;
                if !text.is_empty() {
                    self.conn
                        .call(&cell, &x_text_range::SET_STRING, &[UnoValue::from(text.as_str())])
                        .await?;
                }
                if r == 0 && header_row {
                    self.embolden_cell(&cell, true).await?;
                }
            }
        }

        let tables = self.tables().await?;
        let count = self.count(&tables).await?;
        Ok(count.saturating_sub(1))
    }

    pub async fn format_table(&mut self, index: usize, format: &TableFormat) -> Result<()> {
        let table = self.table(index).await?;

        let mut props = Vec::new();
        if let Some(width) = format.border_width {
            props.push(("TableBorder2", value::border(BorderLine2::solid(width as i32))));
        }
        if let Some(color) = format.background_color {
            props.push(("BackColor", value::long(color.0 as i32)));
        }
        self.set_properties(&table, &props).await?;

        if let Some(header) = format.header_row {
            let rows = self.conn.call_object(&table, &x_text_table::GET_ROWS, &[]).await?;
            let first = self.item(&rows, 0, X_PROPERTY_SET).await?;
            let background = if header { uno::HEADER_GRAY } else { uno::WHITE };
            self.set_properties(&first, &[("BackColor", value::long(background))])
                .await?;

            let columns = self.conn.call_object(&table, &x_text_table::GET_COLUMNS, &[]).await?;
            let count = self.count(&columns).await?;
            let range = self.qi(&table, X_CELL_RANGE).await?;
            for c in 0..count {
                let cell = self.cell_text(&range, c, 0).await?;
                self.embolden_cell(&cell, header).await?;
            }
        }
        Ok(())
    }

    /// Row and column counts plus cell texts of every table, in document order.
    pub async fn table_summaries(&mut self) -> Result<Vec<TableSummary>> {
        let tables = self.tables().await?;
        let count = self.count(&tables).await?;
        let mut summaries = Vec::with_capacity(count);
        for i in 0..count {
            let table = self.item(&tables, i, X_TEXT_TABLE).await?;
            let rows = self.conn.call_object(&table, &x_text_table::GET_ROWS, &[]).await?;
            let rows = self.count(&rows).await?;
            let columns = self.conn.call_object(&table, &x_text_table::GET_COLUMNS, &[]).await?;
            let columns = self.count(&columns).await?;
            let range = self.qi(&table, X_CELL_RANGE).await?;

            let mut cells = Vec::with_capacity(rows);
            for r in 0..rows {
                let mut row = Vec::with_capacity(columns);
                for c in 0..columns {
                    row.push(self.cell_string(&range, c, r).await?);
                }
                cells.push(row);
            }
            summaries.push(TableSummary { rows, columns, cells });
        }
        Ok(summaries)
    }

    /// Text of a cell; merged-away positions read as empty.
    async fn cell_string(&mut self, range: &ObjectRef, column: usize, row: usize) -> Result<String> {
        match self.cell_text(range, column, row).await {
            Ok(cell) => {
                let s = self.conn.call(&cell, &x_text_range::GET_STRING, &[]).await?;
                Ok(s.as_str().unwrap_or_default().to_owned())
            }
            Err(OfficeError::Urp(UrpError::RemoteException { .. })) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// A descriptor for a literal search, typed as `XSearchDescriptor`.
    async fn search_descriptor(
        &mut self,
        replaceable: &ObjectRef,
        search: &str,
        replace: Option<&str>,
        case_sensitive: bool,
    ) -> Result<ObjectRef> {
        let desc = self
            .conn
            .call_object(replaceable, &x_replaceable::CREATE_REPLACE_DESCRIPTOR, &[])
            .await?;
        self.conn
            .call(&desc, &x_search_descriptor::SET_SEARCH_STRING, &[UnoValue::from(search)])
            .await?;
        if let Some(replace) = replace {
            self.conn
                .call(&desc, &x_replace_descriptor::SET_REPLACE_STRING, &[UnoValue::from(replace)])
                .await?;
        }
        for (name, flag) in [("SearchCaseSensitive", case_sensitive), ("SearchRegularExpression", false)] {
            self.conn
                .call(
                    &desc,
                    &x_property_set::SET_PROPERTY_VALUE,
                    &[UnoValue::from(name), value::boolean(flag)],
                )
                .await?;
        }
        self.qi(&desc, X_SEARCH_DESCRIPTOR).await
    }

    pub async fn replace_all(&mut self, search: &str, replace: &str, case_sensitive: bool) -> Result<usize> {
        let replaceable = self.doc_qi(X_REPLACEABLE).await?;
        let desc = self
            .search_descriptor(&replaceable, search, Some(replace), case_sensitive)
            .await?;
        let replaced = self
            .conn
            .call(&replaceable, &x_replaceable::REPLACE_ALL, &[UnoValue::Interface(desc.oid)])
            .await?;
        reply_count(&replaced, "replaceAll")
    }

    pub async fn format_text(&mut self, target: &str, style: &TextStyle, all: bool) -> Result<usize> {
        let replaceable = self.doc_qi(X_REPLACEABLE).await?;
        let desc = self.search_descriptor(&replaceable, target, None, true).await?;
        let props = char_properties(style);

        let mut ranges = Vec::new();
        if all {
            let found = self
                .conn
                .call_object(&replaceable, &x_replaceable::FIND_ALL, &[UnoValue::Interface(desc.oid)])
                .await?;
            for i in 0..self.count(&found).await? {
                ranges.push(self.item(&found, i, X_PROPERTY_SET).await?);
            }
        } else {
            let found = self
                .conn
                .call(&replaceable, &x_replaceable::FIND_FIRST, &[UnoValue::Interface(desc.oid)])
                .await?;
            if let Some(oid) = found.oid() {
                let range = ObjectRef::new(oid, X_INTERFACE);
                ranges.push(self.qi(&range, X_PROPERTY_SET).await?);
            }
        }

        for range in &ranges {
            self.set_properties(range, &props).await?;
        }
        Ok(ranges.len())
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub async fn delete_paragraph(&mut self, index: usize) -> Result<()> {
        let body = self.body().await?;
        let access = self.qi(&body, X_ENUMERATION_ACCESS).await?;
        let elements = self
            .conn
            .call_object(&access, &x_enumeration_access::CREATE_ENUMERATION, &[])
            .await?;

        let mut seen = 0;
        loop {
            let more = self.conn.call(&elements, &x_enumeration::HAS_MORE_ELEMENTS, &[]).await?;
            if more.as_bool() != Some(true) {
                break;
            }
            let element = self.conn.call(&elements, &x_enumeration::NEXT_ELEMENT, &[]).await?;
            if seen == index {
                let oid = element.oid().ok_or(UrpError::NullReference("nextElement"))?;
                let content = self.qi(&ObjectRef::new(oid, X_INTERFACE), X_TEXT_CONTENT).await?;
                self.conn
                    .call(&body, &x_text::REMOVE_TEXT_CONTENT, &[UnoValue::Interface(content.oid)])
                    .await?;
                return Ok(());
            }
            seen += 1;
        }
        Err(OfficeError::invalid(format!(
            "paragraph index {index} is out of range (document has {seen} paragraphs)"
        )))
    }

    pub async fn insert_page_break(&mut self, position: Position) -> Result<()> {
        let body = self.body().await?;
        let at = self.edge(&body, position).await?;
        self.paragraph_break(&body, &at).await?;

        let cursor = match position {
            Position::End => self.cursor_at_end(&body).await?,
            Position::Start => {
                // The old first paragraph is now the second one.
                let cursor = self.conn.call_object(&body, &x_text::CREATE_TEXT_CURSOR, &[]).await?;
                let cursor = self.qi(&cursor, X_PARAGRAPH_CURSOR).await?;
                self.conn
                    .call(&cursor, &x_text_cursor::GOTO_START, &[UnoValue::Bool(false)])
                    .await?;
                self.conn
                    .call(&cursor, &x_paragraph_cursor::GOTO_NEXT_PARAGRAPH, &[UnoValue::Bool(false)])
                    .await?;
                cursor
            }
        };
        self.set_properties(
            &cursor,
            &[("BreakType", value::enumeration(uno::enum_type::BREAK_TYPE, uno::PAGE_BEFORE))],
        )
        .await
    }

    pub async fn insert_image(&mut self, image: &Path, size: ImageSize, position: Position) -> Result<()> {
        let factory = self.doc_qi(X_MULTI_SERVICE_FACTORY).await?;
        let graphic = self
            .conn
            .call_object(
                &factory,
                &x_multi_service_factory::CREATE_INSTANCE,
                &[UnoValue::from(service::TEXT_GRAPHIC_OBJECT)],
            )
            .await?;
        self.set_properties(
            &graphic,
            &[
                ("AnchorType", value::enumeration(uno::enum_type::ANCHOR_TYPE, uno::AS_CHARACTER)),
                ("GraphicURL", value::string(&uno::file_url(image))),
                ("Size", value::size(size.width as i32, size.height as i32)),
            ],
        )
        .await?;

        let content = self.qi(&graphic, X_TEXT_CONTENT).await?;
        let body = self.body().await?;
        let at = self.edge(&body, position).await?;
        self.conn
            .call(
                &body,
                &x_text::INSERT_TEXT_CONTENT,
                &[
                    UnoValue::Interface(at.oid),
                    UnoValue::Interface(content.oid),
                    UnoValue::Bool(false),
                ],
            )
            .await?;
        Ok(())
    }

    // ========================================================================
    // Styles
    // ========================================================================

    pub async fn define_paragraph_style(&mut self, style: &ParagraphStyle) -> Result<()> {
        let supplier = self.doc_qi(X_STYLE_FAMILIES_SUPPLIER).await?;
        let families = self
            .conn
            .call_object(&supplier, &x_style_families_supplier::GET_STYLE_FAMILIES, &[])
            .await?;
        let family = self
            .conn
            .call_object(&families, &x_name_access::GET_BY_NAME, &[UnoValue::from("ParagraphStyles")])
            .await?;
        let family = self.qi(&family, X_NAME_CONTAINER).await?;

        let name = UnoValue::from(style.name.as_str());
        let exists = self
            .conn
            .call(&family, &x_name_access::HAS_BY_NAME, &[name.clone()])
            .await?
            .as_bool()
            .unwrap_or(false);

        let target = if exists {
            self.conn
                .call_object(&family, &x_name_access::GET_BY_NAME, &[name])
                .await?
        } else {
            let factory = self.doc_qi(X_MULTI_SERVICE_FACTORY).await?;
            let created = self
                .conn
                .call_object(
                    &factory,
                    &x_multi_service_factory::CREATE_INSTANCE,
                    &[UnoValue::from(service::PARAGRAPH_STYLE)],
                )
                .await?;
            let created = self.qi(&created, X_STYLE).await?;
            self.conn
                .call(
                    &family,
                    &x_name_container::INSERT_BY_NAME,
                    &[name, value::interface(X_STYLE, &created.oid)],
                )
                .await?;
            tracing::debug!(style = %style.name, "created paragraph style");
            created
        };

        let text_style = TextStyle {
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
            color: style.color,
            font: style.font_name.clone(),
            size: style.font_size,
        };
        let mut props = char_properties(&text_style);
        if let Some(alignment) = style.alignment {
            props.push((
                "ParaAdjust",
                value::enumeration(uno::enum_type::PARAGRAPH_ADJUST, uno::paragraph_adjust(alignment)),
            ));
        }
        self.set_properties(&target, &props).await
    }

    pub async fn style_body(&mut self, style: &BodyStyle) -> Result<()> {
        let body = self.body().await?;
        let cursor = self.conn.call_object(&body, &x_text::CREATE_TEXT_CURSOR, &[]).await?;
        self.conn
            .call(&cursor, &x_text_cursor::GOTO_START, &[UnoValue::Bool(false)])
            .await?;
        self.conn
            .call(&cursor, &x_text_cursor::GOTO_END, &[UnoValue::Bool(true)])
            .await?;

        let mut props = char_properties(&TextStyle {
            color: style.color,
            font: style.font_name.clone(),
            size: style.font_size,
            ..TextStyle::default()
        });
        if let Some(alignment) = style.alignment {
            props.push((
                "ParaAdjust",
                value::enumeration(uno::enum_type::PARAGRAPH_ADJUST, uno::paragraph_adjust(alignment)),
            ));
        }
        self.set_properties(&cursor, &props).await
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    async fn document_properties(&mut self) -> Result<ObjectRef> {
        let supplier = self.doc_qi(X_DOCUMENT_PROPERTIES_SUPPLIER).await?;
        Ok(self
            .conn
            .call_object(&supplier, &x_document_properties_supplier::GET_DOCUMENT_PROPERTIES, &[])
            .await?)
    }

    pub async fn set_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        let props = self.document_properties().await?;
        let fields = [
            (&x_document_properties::SET_TITLE, &metadata.title),
            (&x_document_properties::SET_SUBJECT, &metadata.subject),
            (&x_document_properties::SET_AUTHOR, &metadata.author),
            (&x_document_properties::SET_DESCRIPTION, &metadata.description),
        ];
        for (method, field) in fields {
            if let Some(text) = field {
                self.conn.call(&props, method, &[UnoValue::from(text.as_str())]).await?;
            }
        }
        if metadata.keywords.is_some() {
            let keywords = metadata
                .keyword_list()
                .into_iter()
                .map(UnoValue::from)
                .collect();
            self.conn
                .call(&props, &x_document_properties::SET_KEYWORDS, &[UnoValue::Sequence(keywords)])
                .await?;
        }
        Ok(())
    }

    /// Document properties, plus body text and tables for text documents.
    pub async fn facts(&mut self, doc_type: DocType) -> Result<DocumentFacts> {
        let props = self.document_properties().await?;
        let read = |v: UnoValue| v.as_str().unwrap_or_default().to_owned();
        let title = read(self.conn.call(&props, &x_document_properties::GET_TITLE, &[]).await?);
        let subject = read(self.conn.call(&props, &x_document_properties::GET_SUBJECT, &[]).await?);
        let author = read(self.conn.call(&props, &x_document_properties::GET_AUTHOR, &[]).await?);
        let description = read(
            self.conn
                .call(&props, &x_document_properties::GET_DESCRIPTION, &[])
                .await?,
        );
        let modified_by = read(
            self.conn
                .call(&props, &x_document_properties::GET_MODIFIED_BY, &[])
                .await?,
        );
        let keywords = self
            .conn
            .call(&props, &x_document_properties::GET_KEYWORDS, &[])
            .await?
            .items()
            .unwrap_or_default()
            .iter()
            .filter_map(|k| k.as_str().map(str::to_owned))
            .collect();
        let created = self
            .conn
            .call(&props, &x_document_properties::GET_CREATION_DATE, &[])
            .await?;
        let modified = self
            .conn
            .call(&props, &x_document_properties::GET_MODIFICATION_DATE, &[])
            .await?;

        let mut facts = DocumentFacts {
            title,
            subject,
            author,
            description,
            keywords,
            modified_by,
            created: uno::date_time_rfc3339(&created),
            modified: uno::date_time_rfc3339(&modified),
            ..DocumentFacts::default()
        };
        if doc_type == DocType::Text {
            facts.text = self.text().await?;
            facts.tables = self.table_summaries().await?;
        }
        Ok(facts)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Which kind of document this is, by the services it supports.
    pub async fn detect_type(&mut self) -> Result<DocType> {
        let info = self.doc_qi(X_SERVICE_INFO).await?;
        for (name, doc_type) in [
            (service::TEXT_DOCUMENT, DocType::Text),
            (service::SPREADSHEET_DOCUMENT, DocType::Calc),
            (service::PRESENTATION_DOCUMENT, DocType::Impress),
        ] {
            let supported = self
                .conn
                .call(&info, &x_service_info::SUPPORTS_SERVICE, &[UnoValue::from(name)])
                .await?;
            if supported.as_bool() == Some(true) {
                return Ok(doc_type);
            }
        }
        // Drawings and imported PDFs; none of the text operations apply.
        Ok(DocType::Impress)
    }

    pub async fn store(&mut self) -> Result<()> {
        let storable = self.doc_qi(X_STORABLE).await?;
        self.conn.call(&storable, &x_storable::STORE, &[]).await?;
        Ok(())
    }

    /// Bind the document to `path` and write it there.
    pub async fn store_as(&mut self, path: &Path, doc_type: DocType) -> Result<()> {
        let storable = self.doc_qi(X_STORABLE).await?;
        self.conn
            .call(
                &storable,
                &x_storable::STORE_AS_URL,
                &[UnoValue::from(uno::file_url(path)), store_args(path, doc_type)],
            )
            .await?;
        Ok(())
    }

    /// Write a copy to `path`; the document stays bound to its own file.
    pub async fn store_to(&mut self, path: &Path, doc_type: DocType) -> Result<()> {
        let storable = self.doc_qi(X_STORABLE).await?;
        self.conn
            .call(
                &storable,
                &x_storable::STORE_TO_URL,
                &[UnoValue::from(uno::file_url(path)), store_args(path, doc_type)],
            )
            .await?;
        tracing::info!(target = %path.display(), "stored copy");
        Ok(())
    }

    /// Close without saving. A veto from LibreOffice is logged, not returned.
    pub async fn close(self) -> Result<()> {
        if let Some(closeable) = self.conn.query_interface(self.doc, X_CLOSEABLE).await? {
            if let Err(e) = self
                .conn
                .call(&closeable, &x_closeable::CLOSE, &[UnoValue::Bool(true)])
                .await
            {
                if e.is_disconnect() {
                    return Err(e.into());
                }
                tracing::warn!(error = %e, "document refused to close");
            }
        }
        Ok(())
    }
}

/// A count returned by `method`. Anything but a non-negative integer is an
/// automation failure.
fn reply_count(reply: &UnoValue, method: &str) -> Result<usize> {
    reply
        .as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| OfficeError::Automation(format!("{method} returned {reply:?}, expected a count")))
}

/// `CharXxx` properties for the attributes set in `style`.
fn char_properties(style: &TextStyle) -> Vec<(&'static str, UnoValue)> {
    let mut props = Vec::new();
    if let Some(bold) = style.bold {
        let weight = if bold { font_weight::BOLD } else { font_weight::NORMAL };
        props.push(("CharWeight", value::float(weight)));
    }
    if let Some(italic) = style.italic {
        let slant = if italic { font_slant::ITALIC } else { font_slant::NONE };
        props.push(("CharPosture", value::enumeration(uno::enum_type::FONT_SLANT, slant)));
    }
    if let Some(underline) = style.underline {
        let kind = if underline { font_underline::SINGLE } else { font_underline::NONE };
        props.push(("CharUnderline", value::short(kind)));
    }
    if let Some(color) = style.color {
        props.push(("CharColor", value::long(color.0 as i32)));
    }
    if let Some(font) = &style.font {
        props.push(("CharFontName", value::string(font)));
    }
    if let Some(size) = style.size {
        props.push(("CharHeight", value::float(size)));
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use writer_protocol::Color;

    #[test]
    fn char_properties_cover_only_what_is_set() {
        let style = TextStyle {
            bold: Some(true),
            color: Some(Color(0xFF0000)),
            ..TextStyle::default()
        };
        let props = char_properties(&style);
        let names: Vec<&str> = props.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["CharWeight", "CharColor"]);
        assert_eq!(props[0].1, value::float(font_weight::BOLD));
        assert_eq!(props[1].1, value::long(0xFF0000));
    }

    #[test]
    fn unsetting_attributes_sends_the_neutral_value() {
        let style = TextStyle {
            italic: Some(false),
            underline: Some(false),
            ..TextStyle::default()
        };
        let props = char_properties(&style);
        assert_eq!(
            props[0].1,
            value::enumeration(uno::enum_type::FONT_SLANT, font_slant::NONE)
        );
        assert_eq!(props[1].1, value::short(font_underline::NONE));
    }

    #[test]
    fn counts_must_be_integers() {
        assert_eq!(reply_count(&UnoValue::Long(3), "replaceAll").unwrap(), 3);
        let err = reply_count(&UnoValue::Void, "replaceAll").unwrap_err();
        assert!(matches!(err, OfficeError::Automation(_)), "{err}");
        assert!(err.to_string().contains("replaceAll"), "{err}");
        assert!(reply_count(&UnoValue::Long(-1), "getCount").is_err());
    }

    #[test]
    fn store_args_name_the_filter_when_known() {
        let args = store_args(Path::new("/tmp/out.docx"), DocType::Text);
        let items = args.items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].members().unwrap()[0], UnoValue::from("FilterName"));
        assert_eq!(items[1].members().unwrap()[0], UnoValue::from("Overwrite"));

        let native = store_args(Path::new("/tmp/out"), DocType::Text);
        assert_eq!(native.items().unwrap().len(), 1);
    }
}
