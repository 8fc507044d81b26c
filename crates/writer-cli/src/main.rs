//! writer - command-line client for the writer bridge

use std::io::{self, Read, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::Value;
use writer_bridge::Client;
use writer_protocol::{
    AddHeadingArgs, AddParagraphArgs, AddTableArgs, AddTextArgs, Alignment, Color, Command,
    CopyDocumentArgs, CreateArgs, CustomStyleArgs, DeleteParagraphArgs, DeleteTextArgs, DocType,
    DocumentStyleArgs, FormatTableArgs, FormatTextArgs, InsertImageArgs, ListArgs, Metadata,
    PageBreakArgs, PathArgs, PingArgs, Position, SearchReplaceArgs, TextStyle, DEFAULT_ADDR,
};

#[derive(Parser)]
#[command(name = "writer")]
#[command(author, version, about = "Edit Writer documents through a running writer-bridge")]
struct Cli {
    /// Bridge address
    #[arg(short, long, global = true, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Seconds to wait for a response
    #[arg(long, global = true, default_value = "120")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Parse a lowercase protocol name such as `end` or `center`.
fn wire_name<T: DeserializeOwned>(s: &str) -> std::result::Result<T, String> {
    serde_json::from_value(Value::String(s.to_string())).map_err(|e| e.to_string())
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the bridge is up
    Ping,

    /// Create a document (or open it if it exists)
    Create {
        path: String,
        /// text, calc or impress (default: from the extension)
        #[arg(long, value_parser = wire_name::<DocType>)]
        doc_type: Option<DocType>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated
        #[arg(long)]
        keywords: Option<String>,
    },

    /// Print a document's text
    Open { path: String },

    /// List documents in a directory (default: the bridge's document folder)
    #[command(alias = "ls")]
    List { directory: Option<String> },

    /// Show properties, statistics and tables
    #[command(alias = "info")]
    Properties { path: String },

    /// Insert text at the start or end
    AddText {
        path: String,
        text: String,
        #[arg(long, value_parser = wire_name::<Position>)]
        position: Option<Position>,
    },

    /// Append a heading
    AddHeading {
        path: String,
        text: String,
        /// 1-10
        #[arg(short, long, default_value = "1")]
        level: u8,
    },

    /// Append a paragraph
    AddParagraph {
        path: String,
        text: String,
        /// Paragraph style name
        #[arg(long)]
        style: Option<String>,
        /// left, center, right or justify
        #[arg(long, value_parser = wire_name::<Alignment>)]
        alignment: Option<Alignment>,
    },

    /// Append a table
    AddTable {
        path: String,
        rows: u32,
        columns: u32,
        /// Cell values as a JSON array of rows, e.g. '[["a","b"],["c","d"]]'
        #[arg(long)]
        data: Option<String>,
        /// Bold the first row
        #[arg(long)]
        header_row: bool,
    },

    /// Style an existing table
    FormatTable {
        path: String,
        #[arg(long, default_value = "0")]
        table_index: usize,
        /// Border width in 1/100 mm
        #[arg(long)]
        border_width: Option<u32>,
        /// #rrggbb
        #[arg(long)]
        background_color: Option<Color>,
        #[arg(long)]
        header_row: Option<bool>,
    },

    /// Replace every occurrence of a string
    Replace {
        path: String,
        search: String,
        replace: String,
        #[arg(short, long)]
        ignore_case: bool,
    },

    /// Remove every occurrence of a string
    DeleteText {
        path: String,
        text: String,
        #[arg(short, long)]
        ignore_case: bool,
    },

    /// Remove a body element by index (tables count)
    DeleteParagraph { path: String, index: usize },

    /// Insert a page break
    PageBreak {
        path: String,
        #[arg(long, value_parser = wire_name::<Position>)]
        position: Option<Position>,
    },

    /// Insert an image anchored as a character
    InsertImage {
        path: String,
        image: String,
        /// 1/100 mm
        #[arg(long)]
        width: Option<u32>,
        /// 1/100 mm
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, value_parser = wire_name::<Position>)]
        position: Option<Position>,
    },

    /// Style the first (or every) occurrence of a string
    FormatText {
        path: String,
        text: String,
        #[arg(long)]
        bold: Option<bool>,
        #[arg(long)]
        italic: Option<bool>,
        #[arg(long)]
        underline: Option<bool>,
        #[arg(long)]
        color: Option<Color>,
        #[arg(long)]
        font: Option<String>,
        /// Points
        #[arg(long)]
        size: Option<f32>,
        #[arg(long)]
        all: bool,
    },

    /// Save a copy under another path and format
    Copy { path: String, target: String },

    /// Define or update a paragraph style
    Style {
        path: String,
        name: String,
        #[arg(long)]
        font_name: Option<String>,
        #[arg(long)]
        font_size: Option<f32>,
        #[arg(long)]
        bold: Option<bool>,
        #[arg(long)]
        italic: Option<bool>,
        #[arg(long)]
        underline: Option<bool>,
        #[arg(long)]
        color: Option<Color>,
        #[arg(long, value_parser = wire_name::<Alignment>)]
        alignment: Option<Alignment>,
    },

    /// Apply font, color and alignment to the whole body
    DocumentStyle {
        path: String,
        #[arg(long)]
        font_name: Option<String>,
        #[arg(long)]
        font_size: Option<f32>,
        #[arg(long)]
        color: Option<Color>,
        #[arg(long, value_parser = wire_name::<Alignment>)]
        alignment: Option<Alignment>,
    },

    /// Send a raw JSON request (from the argument or stdin)
    Raw { request: Option<String> },
}

fn metadata(
    title: Option<String>,
    subject: Option<String>,
    author: Option<String>,
    description: Option<String>,
    keywords: Option<String>,
) -> Option<Metadata> {
    let metadata = Metadata {
        title,
        subject,
        author,
        description,
        keywords,
    };
    (metadata != Metadata::default()).then_some(metadata)
}

fn table_data(data: Option<String>) -> Result<Option<Vec<Vec<Value>>>> {
    data.map(|json| serde_json::from_str(&json).context("--data must be a JSON array of rows"))
        .transpose()
}

fn to_command(command: Commands) -> Result<Command> {
    Ok(match command {
        Commands::Ping => Command::Ping(PingArgs {}),
        Commands::Create {
            path,
            doc_type,
            title,
            subject,
            author,
            description,
            keywords,
        } => Command::Create(CreateArgs {
            path,
            doc_type,
            metadata: metadata(title, subject, author, description, keywords),
        }),
        Commands::Open { path } => Command::Open(PathArgs { path }),
        Commands::List { directory } => Command::List(ListArgs { directory }),
        Commands::Properties { path } => Command::GetProperties(PathArgs { path }),
        Commands::AddText {
            path,
            text,
            position,
        } => Command::AddText(AddTextArgs {
            path,
            text,
            position,
        }),
        Commands::AddHeading { path, text, level } => {
            Command::AddHeading(AddHeadingArgs { path, text, level })
        }
        Commands::AddParagraph {
            path,
            text,
            style,
            alignment,
        } => Command::AddParagraph(AddParagraphArgs {
            path,
            text,
            style,
            alignment,
        }),
        Commands::AddTable {
            path,
            rows,
            columns,
            data,
            header_row,
        } => Command::AddTable(AddTableArgs {
            path,
            rows,
            columns,
            data: table_data(data)?,
            header_row,
        }),
        Commands::FormatTable {
            path,
            table_index,
            border_width,
            background_color,
            header_row,
        } => Command::FormatTable(FormatTableArgs {
            path,
            table_index,
            border_width,
            background_color,
            header_row,
        }),
        Commands::Replace {
            path,
            search,
            replace,
            ignore_case,
        } => Command::SearchReplace(SearchReplaceArgs {
            path,
            search,
            replace,
            case_sensitive: !ignore_case,
        }),
        Commands::DeleteText {
            path,
            text,
            ignore_case,
        } => Command::DeleteText(DeleteTextArgs {
            path,
            text,
            case_sensitive: !ignore_case,
        }),
        Commands::DeleteParagraph { path, index } => {
            Command::DeleteParagraph(DeleteParagraphArgs { path, index })
        }
        Commands::PageBreak { path, position } => {
            Command::InsertPageBreak(PageBreakArgs { path, position })
        }
        Commands::InsertImage {
            path,
            image,
            width,
            height,
            position,
        } => Command::InsertImage(InsertImageArgs {
            path,
            image_path: image,
            width,
            height,
            position,
        }),
        Commands::FormatText {
            path,
            text,
            bold,
            italic,
            underline,
            color,
            font,
            size,
            all,
        } => Command::FormatText(FormatTextArgs {
            path,
            text,
            style: TextStyle {
                bold,
                italic,
                underline,
                color,
                font,
                size,
            },
            all,
        }),
        Commands::Copy { path, target } => Command::CopyDocument(CopyDocumentArgs { path, target }),
        Commands::Style {
            path,
            name,
            font_name,
            font_size,
            bold,
            italic,
            underline,
            color,
            alignment,
        } => Command::CreateCustomStyle(CustomStyleArgs {
            path,
            name,
            font_name,
            font_size,
            bold,
            italic,
            underline,
            color,
            alignment,
        }),
        Commands::DocumentStyle {
            path,
            font_name,
            font_size,
            color,
            alignment,
        } => Command::ApplyDocumentStyle(DocumentStyleArgs {
            path,
            font_name,
            font_size,
            color,
            alignment,
        }),
        Commands::Raw { .. } => bail!("raw requests are sent as given"),
    })
}

fn print_json(value: &Value) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("Failed to write to stdout")?;
    writeln!(stdout).context("Failed to write to stdout")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new(cli.addr).with_timeout(Duration::from_secs(cli.timeout));

    if let Commands::Raw { request } = cli.command {
        let request = match request {
            Some(request) => request,
            None => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read request from stdin")?;
                buf
            }
        };
        let response = client.send_raw(request.trim().as_bytes()).await?;
        let success = response.success;
        print_json(&serde_json::to_value(&response)?)?;
        if !success {
            std::process::exit(1);
        }
        return Ok(());
    }

    let command = to_command(cli.command)?;
    let operation = command.operation();
    let result = client
        .send(&command)
        .await
        .with_context(|| format!("{operation} failed"))?;

    match (&command, result.get("text").and_then(Value::as_str)) {
        (Command::Open(_), Some(text)) => println!("{text}"),
        _ => print_json(&result)?,
    }
    Ok(())
}
