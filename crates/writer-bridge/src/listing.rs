//! The `list` operation: documents directly inside one directory.

use std::path::Path;

use chrono::{DateTime, Utc};
use writer_protocol::{ErrorKind, Failure, FileKind, ListEntry, Listing};

fn io_failure(dir: &Path, err: std::io::Error) -> Failure {
    if err.kind() == std::io::ErrorKind::NotFound {
        Failure::new(
            ErrorKind::DocumentNotFound,
            format!("directory not found: {}", dir.display()),
        )
    } else {
        Failure::new(
            ErrorKind::InternalAutomationError,
            format!("cannot list {}: {err}", dir.display()),
        )
    }
}

/// Files with a recognized document extension, sorted by name.
pub async fn list_documents(dir: &Path) -> Result<Listing, Failure> {
    let metadata = tokio::fs::metadata(dir).await.map_err(|e| io_failure(dir, e))?;
    if !metadata.is_dir() {
        return Err(Failure::new(
            ErrorKind::InvalidArgument,
            format!("not a directory: {}", dir.display()),
        ));
    }

    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(dir).await.map_err(|e| io_failure(dir, e))?;
    while let Some(entry) = reader.next_entry().await.map_err(|e| io_failure(dir, e))? {
        let path = entry.path();
        let Some(extension) = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
        else {
            continue;
        };
        let Some(kind) = FileKind::from_extension(&extension) else {
            continue;
        };
        let meta = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let modified = meta
            .modified()
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
            .unwrap_or_default();
        entries.push(ListEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: path.display().to_string(),
            kind,
            extension,
            size: meta.len(),
            modified,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Listing {
        directory: dir.display().to_string(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn lists_recognized_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.docx", "a.odt", "notes.md", "sheet.XLSX", "deck.pptx"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.odt")).unwrap();

        let listing = list_documents(dir.path()).await.unwrap();
        let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.odt", "b.docx", "deck.pptx", "sheet.XLSX"]);
        assert_eq!(listing.entries[3].kind, FileKind::Spreadsheet);
        assert_eq!(listing.entries[3].extension, "xlsx");
        assert_eq!(listing.entries[0].size, 1);
        assert!(!listing.entries[0].modified.is_empty());
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_documents(&dir.path().join("gone")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::DocumentNotFound);
    }
}
