//! Client stub for the command server.
//!
//! Each call opens a connection, sends one request line and reads the one
//! response line. A failure response surfaces as [`ClientError::Failed`] with
//! the server's kind and message untouched.

use std::net::SocketAddr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use writer_protocol::{
    AddHeadingArgs, AddParagraphArgs, AddTableArgs, AddTextArgs, Command, Copied,
    CopyDocumentArgs, Counted, CreateArgs, Created, CustomStyleArgs, DeleteParagraphArgs,
    DeleteTextArgs, DocType, DocumentInfo, DocumentStyleArgs, Edited, ErrorKind, Failure,
    FormatTableArgs, FormatTextArgs, InsertImageArgs, ListArgs, Listing, Metadata, Opened,
    PageBreakArgs, PathArgs, PingArgs, Pong, Position, Response, SearchReplaceArgs, TableAdded,
    DEFAULT_ADDR,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("cannot connect to the bridge at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to the bridge: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON from the bridge: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bridge closed the connection without responding")]
    NoResponse,

    #[error("no response within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("{0}")]
    Failed(Failure),
}

impl ClientError {
    /// The server-side failure kind, when the server answered.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Failed(failure) => Some(failure.kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    timeout: Duration,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR)
    }
}

impl Client {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn at(addr: SocketAddr) -> Self {
        Self::new(addr.to_string())
    }

    /// Bound on the whole exchange. Should exceed the server's command
    /// timeout, or a slow command is reported here instead of by the server.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send raw bytes as the request and decode the response line.
    pub async fn send_raw(&self, request: &[u8]) -> Result<Response> {
        tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
    }

    async fn exchange(&self, request: &[u8]) -> Result<Response> {
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        let mut line = request.to_vec();
        if line.last() != Some(&b'\n') {
            line.push(b'\n');
        }
        stream.write_all(&line).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::NoResponse);
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Send a command and return the raw result value.
    pub async fn send(&self, command: &Command) -> Result<Value> {
        let request = serde_json::to_vec(command)?;
        self.send_raw(&request)
            .await?
            .into_result()
            .map_err(ClientError::Failed)
    }

    /// Send a command and decode its result.
    pub async fn request<T: DeserializeOwned>(&self, command: &Command) -> Result<T> {
        let value = self.send(command).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn ping(&self) -> Result<Pong> {
        self.request(&Command::Ping(PingArgs {})).await
    }

    pub async fn create(
        &self,
        path: &str,
        doc_type: Option<DocType>,
        metadata: Option<Metadata>,
    ) -> Result<Created> {
        self.request(&Command::Create(CreateArgs {
            path: path.to_string(),
            doc_type,
            metadata,
        }))
        .await
    }

    pub async fn open(&self, path: &str) -> Result<Opened> {
        self.request(&Command::Open(PathArgs { path: path.to_string() })).await
    }

    pub async fn list(&self, directory: Option<&str>) -> Result<Listing> {
        self.request(&Command::List(ListArgs {
            directory: directory.map(str::to_string),
        }))
        .await
    }

    pub async fn get_properties(&self, path: &str) -> Result<DocumentInfo> {
        self.request(&Command::GetProperties(PathArgs { path: path.to_string() }))
            .await
    }

    pub async fn add_text(&self, path: &str, text: &str, position: Option<Position>) -> Result<Edited> {
        self.request(&Command::AddText(AddTextArgs {
            path: path.to_string(),
            text: text.to_string(),
            position,
        }))
        .await
    }

    pub async fn add_heading(&self, path: &str, text: &str, level: u8) -> Result<Edited> {
        self.request(&Command::AddHeading(AddHeadingArgs {
            path: path.to_string(),
            text: text.to_string(),
            level,
        }))
        .await
    }

    pub async fn add_paragraph(&self, args: AddParagraphArgs) -> Result<Edited> {
        self.request(&Command::AddParagraph(args)).await
    }

    pub async fn add_table(&self, args: AddTableArgs) -> Result<TableAdded> {
        self.request(&Command::AddTable(args)).await
    }

    pub async fn format_table(&self, args: FormatTableArgs) -> Result<Edited> {
        self.request(&Command::FormatTable(args)).await
    }

    pub async fn search_replace(&self, args: SearchReplaceArgs) -> Result<Counted> {
        self.request(&Command::SearchReplace(args)).await
    }

    pub async fn delete_text(&self, args: DeleteTextArgs) -> Result<Counted> {
        self.request(&Command::DeleteText(args)).await
    }

    pub async fn delete_paragraph(&self, path: &str, index: usize) -> Result<Edited> {
        self.request(&Command::DeleteParagraph(DeleteParagraphArgs {
            path: path.to_string(),
            index,
        }))
        .await
    }

    pub async fn insert_page_break(&self, path: &str, position: Option<Position>) -> Result<Edited> {
        self.request(&Command::InsertPageBreak(PageBreakArgs {
            path: path.to_string(),
            position,
        }))
        .await
    }

    pub async fn insert_image(&self, args: InsertImageArgs) -> Result<Edited> {
        self.request(&Command::InsertImage(args)).await
    }

    pub async fn format_text(&self, args: FormatTextArgs) -> Result<Counted> {
        self.request(&Command::FormatText(args)).await
    }

    pub async fn copy_document(&self, path: &str, target: &str) -> Result<Copied> {
        self.request(&Command::CopyDocument(CopyDocumentArgs {
            path: path.to_string(),
            target: target.to_string(),
        }))
        .await
    }

    pub async fn create_custom_style(&self, args: CustomStyleArgs) -> Result<Edited> {
        self.request(&Command::CreateCustomStyle(args)).await
    }

    pub async fn apply_document_style(&self, args: DocumentStyleArgs) -> Result<Edited> {
        self.request(&Command::ApplyDocumentStyle(args)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_server_is_a_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Client::at(addr).ping().await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }), "{err}");
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn failures_display_kind_and_message() {
        let err = ClientError::Failed(Failure::new(ErrorKind::TextNotFound, "text \"x\" not found"));
        assert_eq!(err.to_string(), "TextNotFound: text \"x\" not found");
        assert_eq!(err.kind(), Some(ErrorKind::TextNotFound));
    }
}
