//! A self-contained text document model.
//!
//! The in-memory backend keeps one [`DocumentModel`] per open document and
//! persists it as JSON. Its body mirrors a Writer body: a sequence of
//! paragraphs and tables that always ends with a paragraph.

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use writer_protocol::{Alignment, Color, DocType, Metadata, Position, TableSummary, TextStyle};

use crate::error::{OfficeError, Result};
use crate::office::{BodyStyle, DocumentFacts, ImageSize, NewParagraph, ParagraphStyle, TableFormat};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    pub title: String,
    pub subject: String,
    pub author: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub modified_by: String,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// A range that received character formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formatted {
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub source: PathBuf,
    pub size: ImageSize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub page_break_before: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formatted: Vec<Formatted>,
}

impl Paragraph {
    fn with_text(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.text.is_empty() && self.images.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub cells: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    /// Whether the first row is styled as a header.
    #[serde(default)]
    pub header_row: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formatted: Vec<Formatted>,
}

impl Table {
    fn summary(&self) -> TableSummary {
        TableSummary {
            rows: self.cells.len(),
            columns: self.cells.first().map_or(0, Vec::len),
            cells: self.cells.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub doc_type: DocType,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub body: Vec<Block>,
    #[serde(default)]
    pub paragraph_styles: BTreeMap<String, ParagraphStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_style: Option<BodyStyle>,
}

impl DocumentModel {
    /// An empty document: a single blank paragraph.
    pub fn new(doc_type: DocType, metadata: &Metadata) -> Self {
        Self {
            doc_type,
            properties: Properties {
                title: metadata.title.clone().unwrap_or_default(),
                subject: metadata.subject.clone().unwrap_or_default(),
                author: metadata.author.clone().unwrap_or_default(),
                description: metadata.description.clone().unwrap_or_default(),
                keywords: metadata.keyword_list(),
                ..Properties::default()
            },
            body: vec![Block::Paragraph(Paragraph::default())],
            paragraph_styles: BTreeMap::new(),
            body_style: None,
        }
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.body.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        })
    }

    fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.body.iter_mut().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        })
    }

    fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        })
    }

    /// Paragraph texts joined by newlines; tables are reported separately.
    pub fn text(&self) -> String {
        self.paragraphs()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn facts(&self) -> DocumentFacts {
        let p = &self.properties;
        DocumentFacts {
            title: p.title.clone(),
            subject: p.subject.clone(),
            author: p.author.clone(),
            description: p.description.clone(),
            keywords: p.keywords.clone(),
            modified_by: p.modified_by.clone(),
            created: p.created.clone(),
            modified: p.modified.clone(),
            text: self.text(),
            tables: self.tables().map(Table::summary).collect(),
        }
    }

    /// The paragraph at the start or end of the body, inserting a blank one
    /// when a table sits there.
    fn edge_paragraph(&mut self, position: Position) -> &mut Paragraph {
        let index = match position {
            Position::Start => {
                if !matches!(self.body.first(), Some(Block::Paragraph(_))) {
                    self.body.insert(0, Block::Paragraph(Paragraph::default()));
                }
                0
            }
            Position::End => {
                if !matches!(self.body.last(), Some(Block::Paragraph(_))) {
                    self.body.push(Block::Paragraph(Paragraph::default()));
                }
                self.body.len() - 1
            }
        };
        match &mut self.body[index] {
            Block::Paragraph(p) => p,
            Block::Table(_) => unreachable!("edge block is a paragraph"),
        }
    }

    /// Insert text at the very start or end. Newlines start new paragraphs.
    pub fn insert_text(&mut self, text: &str, position: Position) {
        let mut lines: Vec<&str> = text.split('\n').collect();
        match position {
            Position::End => {
                let first = lines.remove(0);
                self.edge_paragraph(Position::End).text.push_str(first);
                for line in lines {
                    self.body.push(Block::Paragraph(Paragraph::with_text(line)));
                }
            }
            Position::Start => {
                let last = lines.pop().unwrap_or_default();
                self.edge_paragraph(Position::Start).text.insert_str(0, last);
                for (i, line) in lines.into_iter().enumerate() {
                    self.body.insert(i, Block::Paragraph(Paragraph::with_text(line)));
                }
            }
        }
    }

    /// Append a paragraph, reusing a blank trailing one.
    pub fn append_paragraph(&mut self, paragraph: &NewParagraph) {
        let reuse = matches!(self.body.last(), Some(Block::Paragraph(p)) if p.is_blank());
        if !reuse {
            self.body.push(Block::Paragraph(Paragraph::default()));
        }
        let last = self.edge_paragraph(Position::End);
        last.text = paragraph.text.clone();
        if paragraph.style.is_some() {
            last.style = paragraph.style.clone();
        }
        if paragraph.alignment.is_some() {
            last.alignment = paragraph.alignment;
        }
    }

    /// Append a table before the trailing blank paragraph and return its
    /// index among the tables.
    pub fn add_table(&mut self, cells: Vec<Vec<String>>, header_row: bool) -> usize {
        let table = Block::Table(Table {
            cells,
            header_row,
            ..Table::default()
        });
        match self.body.last() {
            Some(Block::Paragraph(p)) if p.is_blank() => {
                let at = self.body.len() - 1;
                self.body.insert(at, table);
            }
            _ => {
                self.body.push(table);
                self.body.push(Block::Paragraph(Paragraph::default()));
            }
        }
        self.tables().count() - 1
    }

    pub fn format_table(&mut self, index: usize, format: &TableFormat) -> Result<()> {
        let count = self.tables().count();
        let table = self
            .body
            .iter_mut()
            .filter_map(|b| match b {
                Block::Table(t) => Some(t),
                Block::Paragraph(_) => None,
            })
            .nth(index)
            .ok_or_else(|| {
                OfficeError::invalid(format!(
                    "table index {index} is out of range (document has {count} tables)"
                ))
            })?;
        if let Some(width) = format.border_width {
            table.border_width = Some(width);
        }
        if let Some(color) = format.background_color {
            table.background_color = Some(color);
        }
        if let Some(header) = format.header_row {
            table.header_row = header;
        }
        Ok(())
    }

    /// Replace every literal occurrence in paragraphs and table cells.
    pub fn replace_all(&mut self, search: &str, replace: &str, case_sensitive: bool) -> Result<usize> {
        let re = literal(search, case_sensitive)?;
        let mut replaced = 0;
        let mut apply = |text: &mut String| {
            let found = re.find_iter(text.as_str()).count();
            if found > 0 {
                *text = re.replace_all(text.as_str(), NoExpand(replace)).into_owned();
                replaced += found;
            }
        };
        for block in &mut self.body {
            match block {
                Block::Paragraph(p) => apply(&mut p.text),
                Block::Table(t) => t.cells.iter_mut().flatten().for_each(&mut apply),
            }
        }
        Ok(replaced)
    }

    /// Record `style` on the first occurrence of `target`, or on every one.
    /// Paragraphs and table cells are searched in body order.
    pub fn format_text(&mut self, target: &str, style: &TextStyle, all: bool) -> usize {
        let mut styled = 0;
        for block in &mut self.body {
            let (found, ranges) = match block {
                Block::Paragraph(p) => (p.text.matches(target).count(), &mut p.formatted),
                Block::Table(t) => (
                    t.cells.iter().flatten().map(|c| c.matches(target).count()).sum::<usize>(),
                    &mut t.formatted,
                ),
            };
            let take = if all { found } else { found.min(1) };
            ranges.extend((0..take).map(|_| Formatted {
                text: target.to_owned(),
                style: style.clone(),
            }));
            styled += take;
            if !all && styled > 0 {
                break;
            }
        }
        styled
    }

    /// Remove a body element; the body keeps at least one paragraph.
    pub fn delete_block(&mut self, index: usize) -> Result<()> {
        if index >= self.body.len() {
            return Err(OfficeError::invalid(format!(
                "paragraph index {index} is out of range (document has {} paragraphs)",
                self.body.len()
            )));
        }
        self.body.remove(index);
        if !matches!(self.body.last(), Some(Block::Paragraph(_))) {
            self.body.push(Block::Paragraph(Paragraph::default()));
        }
        Ok(())
    }

    pub fn insert_page_break(&mut self, position: Position) {
        let page_break = Block::Paragraph(Paragraph {
            page_break_before: true,
            ..Paragraph::default()
        });
        match position {
            Position::End => self.body.push(page_break),
            Position::Start => match self.body.first_mut() {
                // The old first paragraph moves to the next page.
                Some(Block::Paragraph(p)) => {
                    p.page_break_before = true;
                    self.body.insert(0, Block::Paragraph(Paragraph::default()));
                }
                // A leading table cannot carry the break; a breaking paragraph goes first.
                _ => self.body.insert(0, page_break),
            },
        }
    }

    pub fn insert_image(&mut self, source: PathBuf, size: ImageSize, position: Position) {
        let image = Image { source, size };
        let p = self.edge_paragraph(position);
        match position {
            Position::Start => p.images.insert(0, image),
            Position::End => p.images.push(image),
        }
    }

    pub fn define_paragraph_style(&mut self, style: &ParagraphStyle) {
        self.paragraph_styles
            .entry(style.name.clone())
            .and_modify(|existing| merge_style(existing, style))
            .or_insert_with(|| style.clone());
    }

    pub fn style_body(&mut self, style: &BodyStyle) {
        let current = self.body_style.get_or_insert_with(BodyStyle::default);
        if style.font_name.is_some() {
            current.font_name = style.font_name.clone();
        }
        if style.font_size.is_some() {
            current.font_size = style.font_size;
        }
        if style.color.is_some() {
            current.color = style.color;
        }
        if style.alignment.is_some() {
            current.alignment = style.alignment;
        }
    }
}

/// Overwrite the attributes `update` sets; leave the others.
fn merge_style(existing: &mut ParagraphStyle, update: &ParagraphStyle) {
    macro_rules! take {
        ($($field:ident),*) => {
            $(if update.$field.is_some() {
                existing.$field = update.$field.clone();
            })*
        };
    }
    take!(font_name, font_size, bold, italic, underline, color, alignment);
}

fn literal(search: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(&regex::escape(search))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| OfficeError::invalid(format!("unusable search text: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc() -> DocumentModel {
        DocumentModel::new(DocType::Text, &Metadata::default())
    }

    fn para(text: &str) -> NewParagraph {
        NewParagraph {
            text: text.into(),
            ..NewParagraph::default()
        }
    }

    #[test]
    fn first_paragraph_fills_the_blank_one() {
        let mut d = doc();
        d.append_paragraph(&para("one"));
        d.append_paragraph(&NewParagraph::heading("two", 2));
        assert_eq!(d.body.len(), 2);
        assert_eq!(d.text(), "one\ntwo");
        let styles: Vec<_> = d.paragraphs().map(|p| p.style.clone()).collect();
        assert_eq!(styles, vec![None, Some("Heading 2".to_string())]);
    }

    #[test]
    fn insert_text_splits_lines_into_paragraphs() {
        let mut d = doc();
        d.insert_text("world", Position::End);
        d.insert_text("hello\n", Position::Start);
        d.insert_text("!\nbye", Position::End);
        assert_eq!(d.text(), "hello\nworld!\nbye");
    }

    #[test]
    fn tables_keep_a_trailing_paragraph() {
        let mut d = doc();
        d.append_paragraph(&para("intro"));
        let first = d.add_table(vec![vec!["a".into(), "b".into()]], true);
        let second = d.add_table(vec![vec!["c".into()]], false);
        assert_eq!((first, second), (0, 1));
        assert!(matches!(d.body.last(), Some(Block::Paragraph(p)) if p.is_blank()));
        assert_eq!(d.body.len(), 4);

        d.append_paragraph(&para("outro"));
        assert_eq!(d.body.len(), 4);
        assert_eq!(d.facts().tables[0].columns, 2);
    }

    #[test]
    fn replace_covers_cells_and_honours_case() {
        let mut d = doc();
        d.append_paragraph(&para("Cat cat CAT"));
        d.add_table(vec![vec!["cat".into(), "dog".into()]], false);

        assert_eq!(d.replace_all("cat", "dog", true).unwrap(), 2);
        assert_eq!(d.text(), "Cat dog CAT\n");
        assert_eq!(d.replace_all("cat", "$1", false).unwrap(), 2);
        assert_eq!(d.text(), "$1 dog $1\n");
        assert_eq!(d.facts().tables[0].cells[0], vec!["dog", "dog"]);
    }

    #[test]
    fn format_text_counts_ranges() {
        let mut d = doc();
        d.append_paragraph(&para("ab ab"));
        d.append_paragraph(&para("ab"));
        let bold = TextStyle {
            bold: Some(true),
            ..TextStyle::default()
        };
        assert_eq!(d.format_text("ab", &bold, false), 1);
        assert_eq!(d.format_text("ab", &bold, true), 3);
        assert_eq!(d.format_text("zz", &bold, true), 0);
    }

    #[test]
    fn deleting_counts_tables_as_elements() {
        let mut d = doc();
        d.append_paragraph(&para("keep"));
        d.add_table(vec![vec!["x".into()]], false);
        d.delete_block(1).unwrap();
        assert!(d.facts().tables.is_empty());
        let err = d.delete_block(5).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn page_break_at_start_moves_the_first_paragraph() {
        let mut d = doc();
        d.append_paragraph(&para("first"));
        d.insert_page_break(Position::Start);
        let flags: Vec<_> = d.paragraphs().map(|p| p.page_break_before).collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn page_break_at_start_before_a_leading_table() {
        let mut d = doc();
        d.add_table(vec![vec!["x".into()]], false);
        assert!(matches!(d.body.first(), Some(Block::Table(_))));
        d.insert_page_break(Position::Start);
        let breaks = d.paragraphs().filter(|p| p.page_break_before).count();
        assert_eq!(breaks, 1);
        assert_eq!(d.facts().tables.len(), 1);
    }

    #[test]
    fn format_text_finds_table_cells() {
        let mut d = doc();
        d.add_table(vec![vec!["alpha".into(), "alpha".into()]], false);
        let bold = TextStyle {
            bold: Some(true),
            ..TextStyle::default()
        };
        assert_eq!(d.format_text("alpha", &bold, false), 1);
        assert_eq!(d.format_text("alpha", &bold, true), 2);
        let Some(Block::Table(t)) = d.body.first() else {
            panic!("table expected first");
        };
        assert_eq!(t.formatted.len(), 3);
    }

    #[test]
    fn redefining_a_style_merges_attributes() {
        let mut d = doc();
        d.define_paragraph_style(&ParagraphStyle {
            name: "Quote".into(),
            italic: Some(true),
            ..ParagraphStyle::default()
        });
        d.define_paragraph_style(&ParagraphStyle {
            name: "Quote".into(),
            font_size: Some(14.0),
            ..ParagraphStyle::default()
        });
        let quote = &d.paragraph_styles["Quote"];
        assert_eq!(quote.italic, Some(true));
        assert_eq!(quote.font_size, Some(14.0));
    }
}
