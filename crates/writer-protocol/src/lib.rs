//! Shared protocol types for the writer bridge socket.
//!
//! One request per connection, one JSON response line back:
//!
//! ```text
//! -> {"operation": "add-heading", "arguments": {"path": "~/report.odt", "text": "Intro"}}
//! <- {"success": true, "result": {"path": "/home/me/report.odt", "message": "..."}}
//! <- {"success": false, "error": {"kind": "DocumentNotFound", "message": "..."}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod args;
pub mod results;

pub use args::*;
pub use results::*;

/// Where the bridge listens unless configured otherwise.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8765";

/// Failure categories, serialized exactly as named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    BackendUnavailable,
    DocumentNotFound,
    UnsupportedOperation,
    InvalidArgument,
    ShapeMismatch,
    TextNotFound,
    MalformedRequest,
    BackendTimeout,
    InternalAutomationError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BackendUnavailable => "BackendUnavailable",
            ErrorKind::DocumentNotFound => "DocumentNotFound",
            ErrorKind::UnsupportedOperation => "UnsupportedOperation",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::ShapeMismatch => "ShapeMismatch",
            ErrorKind::TextNotFound => "TextNotFound",
            ErrorKind::MalformedRequest => "MalformedRequest",
            ErrorKind::BackendTimeout => "BackendTimeout",
            ErrorKind::InternalAutomationError => "InternalAutomationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The failure record of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The closed set of operation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ping,
    Create,
    Open,
    List,
    GetProperties,
    AddText,
    AddHeading,
    AddParagraph,
    AddTable,
    FormatTable,
    SearchReplace,
    DeleteText,
    DeleteParagraph,
    InsertPageBreak,
    InsertImage,
    FormatText,
    CopyDocument,
    CreateCustomStyle,
    ApplyDocumentStyle,
}

impl Operation {
    pub const ALL: [Operation; 19] = [
        Operation::Ping,
        Operation::Create,
        Operation::Open,
        Operation::List,
        Operation::GetProperties,
        Operation::AddText,
        Operation::AddHeading,
        Operation::AddParagraph,
        Operation::AddTable,
        Operation::FormatTable,
        Operation::SearchReplace,
        Operation::DeleteText,
        Operation::DeleteParagraph,
        Operation::InsertPageBreak,
        Operation::InsertImage,
        Operation::FormatText,
        Operation::CopyDocument,
        Operation::CreateCustomStyle,
        Operation::ApplyDocumentStyle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Ping => "ping",
            Operation::Create => "create",
            Operation::Open => "open",
            Operation::List => "list",
            Operation::GetProperties => "get-properties",
            Operation::AddText => "add-text",
            Operation::AddHeading => "add-heading",
            Operation::AddParagraph => "add-paragraph",
            Operation::AddTable => "add-table",
            Operation::FormatTable => "format-table",
            Operation::SearchReplace => "search-replace",
            Operation::DeleteText => "delete-text",
            Operation::DeleteParagraph => "delete-paragraph",
            Operation::InsertPageBreak => "insert-page-break",
            Operation::InsertImage => "insert-image",
            Operation::FormatText => "format-text",
            Operation::CopyDocument => "copy-document",
            Operation::CreateCustomStyle => "create-custom-style",
            Operation::ApplyDocumentStyle => "apply-document-style",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded request: one variant per operation with its own arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "arguments", rename_all = "kebab-case")]
pub enum Command {
    /// Liveness check; never touches the backend.
    Ping(PingArgs),
    /// Create a document, or open it when the file already exists.
    Create(CreateArgs),
    /// Open a document and return its text.
    Open(PathArgs),
    /// List documents in a directory, non-recursively.
    List(ListArgs),
    GetProperties(PathArgs),
    AddText(AddTextArgs),
    AddHeading(AddHeadingArgs),
    AddParagraph(AddParagraphArgs),
    AddTable(AddTableArgs),
    FormatTable(FormatTableArgs),
    /// Replace every occurrence; zero matches is a success.
    SearchReplace(SearchReplaceArgs),
    DeleteText(DeleteTextArgs),
    DeleteParagraph(DeleteParagraphArgs),
    InsertPageBreak(PageBreakArgs),
    InsertImage(InsertImageArgs),
    /// Style the first occurrence (or all, with `all`).
    FormatText(FormatTextArgs),
    /// Store the document under another path and format.
    CopyDocument(CopyDocumentArgs),
    CreateCustomStyle(CustomStyleArgs),
    ApplyDocumentStyle(DocumentStyleArgs),
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::Ping(_) => Operation::Ping,
            Command::Create(_) => Operation::Create,
            Command::Open(_) => Operation::Open,
            Command::List(_) => Operation::List,
            Command::GetProperties(_) => Operation::GetProperties,
            Command::AddText(_) => Operation::AddText,
            Command::AddHeading(_) => Operation::AddHeading,
            Command::AddParagraph(_) => Operation::AddParagraph,
            Command::AddTable(_) => Operation::AddTable,
            Command::FormatTable(_) => Operation::FormatTable,
            Command::SearchReplace(_) => Operation::SearchReplace,
            Command::DeleteText(_) => Operation::DeleteText,
            Command::DeleteParagraph(_) => Operation::DeleteParagraph,
            Command::InsertPageBreak(_) => Operation::InsertPageBreak,
            Command::InsertImage(_) => Operation::InsertImage,
            Command::FormatText(_) => Operation::FormatText,
            Command::CopyDocument(_) => Operation::CopyDocument,
            Command::CreateCustomStyle(_) => Operation::CreateCustomStyle,
            Command::ApplyDocumentStyle(_) => Operation::ApplyDocumentStyle,
        }
    }

    /// The document this command targets, as given by the caller.
    pub fn path(&self) -> Option<&str> {
        match self {
            Command::Ping(_) | Command::List(_) => None,
            Command::Create(a) => Some(&a.path),
            Command::Open(a) | Command::GetProperties(a) => Some(&a.path),
            Command::AddText(a) => Some(&a.path),
            Command::AddHeading(a) => Some(&a.path),
            Command::AddParagraph(a) => Some(&a.path),
            Command::AddTable(a) => Some(&a.path),
            Command::FormatTable(a) => Some(&a.path),
            Command::SearchReplace(a) => Some(&a.path),
            Command::DeleteText(a) => Some(&a.path),
            Command::DeleteParagraph(a) => Some(&a.path),
            Command::InsertPageBreak(a) => Some(&a.path),
            Command::InsertImage(a) => Some(&a.path),
            Command::FormatText(a) => Some(&a.path),
            Command::CopyDocument(a) => Some(&a.path),
            Command::CreateCustomStyle(a) => Some(&a.path),
            Command::ApplyDocumentStyle(a) => Some(&a.path),
        }
    }

    /// Check the operation name, then the arguments.
    pub fn decode(raw: RawRequest) -> Result<Command, Failure> {
        let op = Operation::from_name(&raw.operation).ok_or_else(|| {
            Failure::new(
                ErrorKind::UnsupportedOperation,
                format!("unsupported operation {:?}", raw.operation),
            )
        })?;
        let arguments = match raw.arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(Failure::new(
                    ErrorKind::InvalidArgument,
                    format!("{op}: arguments must be an object, got {other}"),
                ))
            }
        };

        decode_arguments(op, arguments.clone()).map_err(|err| {
            let message = err.to_string();
            let detail = match culprit(op, &arguments, &message) {
                Some(field) => format!("{op}: invalid argument `{field}`: {message}"),
                None => format!("{op}: {message}"),
            };
            Failure::new(ErrorKind::InvalidArgument, detail)
        })
    }
}

fn decode_arguments(op: Operation, arguments: Map<String, Value>) -> serde_json::Result<Command> {
    let mut tagged = Map::new();
    tagged.insert("operation".into(), Value::String(op.name().into()));
    tagged.insert("arguments".into(), Value::Object(arguments));
    serde_json::from_value(Value::Object(tagged))
}

/// serde reports type errors without the field name. Decoding stops at the
/// first bad field, so the field whose removal changes the error is it.
fn culprit(op: Operation, arguments: &Map<String, Value>, message: &str) -> Option<String> {
    if message.starts_with("missing field") {
        return None;
    }
    arguments
        .keys()
        .find(|key| {
            let mut trimmed = arguments.clone();
            trimmed.remove(key.as_str());
            match decode_arguments(op, trimmed) {
                Ok(_) => true,
                Err(err) => err.to_string() != message,
            }
        })
        .cloned()
}

/// A request before its operation and arguments are checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    pub operation: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Parse a complete request payload.
pub fn parse_request(bytes: &[u8]) -> Result<Command, Failure> {
    let raw: RawRequest = serde_json::from_slice(bytes).map_err(|err| {
        Failure::new(
            ErrorKind::MalformedRequest,
            format!("undecodable request: {err}"),
        )
    })?;
    Command::decode(raw)
}

/// Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

impl Response {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(failure: Failure) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(failure),
        }
    }

    pub fn from_result(result: Result<Value, Failure>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(failure) => Self::failure(failure),
        }
    }

    pub fn into_result(self) -> Result<Value, Failure> {
        match (self.success, self.result, self.error) {
            (true, result, None) => Ok(result.unwrap_or(Value::Null)),
            (false, _, Some(failure)) => Err(failure),
            (success, _, _) => Err(Failure::new(
                ErrorKind::MalformedRequest,
                format!("inconsistent response (success: {success})"),
            )),
        }
    }
}
