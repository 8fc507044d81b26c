//! Success payloads.

use serde::{Deserialize, Serialize};

use crate::args::DocType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub message: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub path: String,
    /// Identity of the live document handle.
    pub handle: u64,
    pub doc_type: DocType,
    /// False when the file already existed and was opened instead.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opened {
    pub path: String,
    pub handle: u64,
    pub doc_type: DocType,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Text,
    Spreadsheet,
    Presentation,
    Drawing,
    Pdf,
}

impl FileKind {
    /// Kind for a recognized document extension (lowercase, no dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Some(match ext {
            "odt" | "doc" | "docx" | "rtf" | "txt" => FileKind::Text,
            "ods" | "xls" | "xlsx" | "csv" => FileKind::Spreadsheet,
            "odp" | "ppt" | "pptx" => FileKind::Presentation,
            "odg" => FileKind::Drawing,
            "pdf" => FileKind::Pdf,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub name: String,
    pub path: String,
    pub kind: FileKind,
    pub extension: String,
    pub size: u64,
    /// RFC 3339.
    pub modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub directory: String,
    pub entries: Vec<ListEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: usize,
    /// Row-major cell text.
    pub cells: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub path: String,
    pub doc_type: DocType,
    pub title: String,
    pub subject: String,
    pub author: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub modified_by: String,
    /// RFC 3339, when the document records one.
    pub created: Option<String>,
    pub modified: Option<String>,
    pub word_count: usize,
    pub character_count: usize,
    pub paragraph_count: usize,
    pub text: String,
    pub tables: Vec<TableSummary>,
}

/// Result of a mutation that has nothing to count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edited {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAdded {
    pub path: String,
    pub table_index: usize,
    pub rows: u32,
    pub columns: u32,
}

/// Replacements made, matches deleted or ranges formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counted {
    pub path: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Copied {
    pub source: String,
    pub target: String,
}

/// Word, character and paragraph counts of plain text.
///
/// Paragraphs are the non-empty lines; characters exclude line breaks.
pub fn text_statistics(text: &str) -> (usize, usize, usize) {
    let words = text.split_whitespace().count();
    let chars = text.chars().filter(|c| *c != '\n' && *c != '\r').count();
    let paragraphs = text.lines().filter(|l| !l.trim().is_empty()).count();
    (words, chars, paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_count_words_and_paragraphs() {
        assert_eq!(text_statistics(""), (0, 0, 0));
        assert_eq!(text_statistics("Title\n\nBody text here"), (4, 19, 2));
    }

    #[test]
    fn file_kinds_cover_the_listed_extensions() {
        for ext in ["odt", "ods", "odp", "odg", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "rtf", "txt", "csv", "pdf"] {
            assert!(FileKind::from_extension(ext).is_some(), "{ext}");
        }
        assert_eq!(FileKind::from_extension("png"), None);
    }
}
