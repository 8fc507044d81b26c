//! End-to-end tests: a real TCP server over the in-memory backend.

use std::path::Path;
use std::time::Duration;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use writer_bridge::{Backend, Bridge, BridgeConfig, Client, ClientError};
use writer_office::{MemoryControl, MemoryOffice};
use writer_protocol::{
    AddParagraphArgs, AddTableArgs, ErrorKind, Response, SearchReplaceArgs,
};

struct TestBridge {
    client: Client,
    control: MemoryControl,
    dir: TempDir,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestBridge {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(tweak: impl FnOnce(&mut BridgeConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BridgeConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
            document_root: dir.path().display().to_string(),
            backend: Backend::Memory,
            ..BridgeConfig::default()
        };
        tweak(&mut config);

        let office = MemoryOffice::new();
        let control = office.control();
        let bridge = Bridge::start(office, &config).await.unwrap();
        let client = Client::at(bridge.local_addr().unwrap()).with_timeout(Duration::from_secs(10));
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(bridge.run_until(async {
            let _ = stopped.await;
        }));

        Self {
            client,
            control,
            dir,
            stop: Some(stop),
            task,
        }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), self.task).await;
    }
}

fn failure_kind(err: ClientError) -> ErrorKind {
    err.kind().unwrap_or_else(|| panic!("expected a server failure, got {err}"))
}

fn paragraph(path: &str, text: &str) -> AddParagraphArgs {
    AddParagraphArgs {
        path: path.to_string(),
        text: text.to_string(),
        style: None,
        alignment: None,
    }
}

// ---------------------------------------------------------------------------
// Table shape
// ---------------------------------------------------------------------------

fn grids() -> impl Strategy<Value = Vec<Vec<String>>> {
    (1usize..=5, 1usize..=5).prop_flat_map(|(rows, columns)| {
        prop::collection::vec(prop::collection::vec("[A-Za-z0-9]{0,6}", columns), rows)
    })
}

async fn add_table_and_read_back(grid: Vec<Vec<String>>) -> (usize, usize, Vec<Vec<String>>) {
    let bridge = TestBridge::start().await;
    bridge.client.create("table.odt", None, None).await.unwrap();
    let added = bridge
        .client
        .add_table(AddTableArgs {
            path: "table.odt".into(),
            rows: grid.len() as u32,
            columns: grid[0].len() as u32,
            data: Some(
                grid.iter()
                    .map(|row| row.iter().map(|c| json!(c)).collect())
                    .collect(),
            ),
            header_row: false,
        })
        .await
        .unwrap();

    let info = bridge.client.get_properties("table.odt").await.unwrap();
    let table = info.tables[added.table_index].clone();
    bridge.stop().await;
    (table.rows, table.columns, table.cells)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn tables_hold_exactly_the_grid(grid in grids()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (rows, columns, cells) = runtime.block_on(add_table_and_read_back(grid.clone()));
        prop_assert_eq!(rows, grid.len());
        prop_assert_eq!(columns, grid[0].len());
        prop_assert_eq!(cells, grid);
    }
}

#[tokio::test]
async fn table_grid_disagreeing_with_its_shape_is_rejected() {
    let bridge = TestBridge::start().await;
    bridge.client.create("t.odt", None, None).await.unwrap();
    let err = bridge
        .client
        .add_table(AddTableArgs {
            path: "t.odt".into(),
            rows: 2,
            columns: 2,
            data: Some(vec![vec![json!("a"), json!("b")]]),
            header_row: true,
        })
        .await
        .unwrap_err();
    assert_eq!(failure_kind(err), ErrorKind::ShapeMismatch);

    let info = bridge.client.get_properties("t.odt").await.unwrap();
    assert!(info.tables.is_empty());
    bridge.stop().await;
}

// ---------------------------------------------------------------------------
// Search and replace
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_replace_is_idempotent() {
    let bridge = TestBridge::start().await;
    bridge.client.create("s.odt", None, None).await.unwrap();
    bridge
        .client
        .add_paragraph(paragraph("s.odt", "cat and cat and Cat"))
        .await
        .unwrap();

    let args = SearchReplaceArgs {
        path: "s.odt".into(),
        search: "cat".into(),
        replace: "dog".into(),
        case_sensitive: true,
    };
    assert_eq!(bridge.client.search_replace(args.clone()).await.unwrap().count, 2);
    assert_eq!(bridge.client.search_replace(args).await.unwrap().count, 0);

    let opened = bridge.client.open("s.odt").await.unwrap();
    assert_eq!(opened.text, "dog and dog and Cat");
    bridge.stop().await;
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn opening_the_same_path_twice_yields_the_same_handle() {
    let bridge = TestBridge::start().await;
    let created = bridge.client.create("same.odt", None, None).await.unwrap();

    let first = bridge.client.open("same.odt").await.unwrap();
    let second = bridge.client.open("same.odt").await.unwrap();
    let absolute = bridge.path("same.odt").display().to_string();
    let third = bridge.client.open(&absolute).await.unwrap();

    assert_eq!(first.handle, created.handle);
    assert_eq!(second.handle, first.handle);
    assert_eq!(third.handle, first.handle);
    bridge.stop().await;
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn heading_and_paragraph_survive_a_round_trip() {
    let bridge = TestBridge::start().await;
    let created = bridge.client.create("docs/round.odt", None, None).await.unwrap();
    assert!(created.created);
    assert!(bridge.path("docs/round.odt").is_file());

    bridge.client.add_heading("docs/round.odt", "Title", 1).await.unwrap();
    bridge
        .client
        .add_paragraph(paragraph("docs/round.odt", "Body"))
        .await
        .unwrap();

    let opened = bridge.client.open("docs/round.odt").await.unwrap();
    assert!(opened.text.contains("Title"), "{}", opened.text);
    assert!(opened.text.contains("Body"), "{}", opened.text);

    let info = bridge.client.get_properties("docs/round.odt").await.unwrap();
    assert!(info.text.contains("Title") && info.text.contains("Body"));
    assert_eq!(info.word_count, 2);
    assert_eq!(info.paragraph_count, 2);
    let stored = std::fs::read(created.path.as_str()).unwrap();
    bridge.stop().await;

    // A fresh bridge reads the stored file.
    let bridge = TestBridge::start().await;
    let copy = bridge.path("round.odt");
    std::fs::write(&copy, stored).unwrap();
    let reopened = bridge.client.open("round.odt").await.unwrap();
    assert_eq!(reopened.text, "Title\nBody");
    bridge.stop().await;
}

// ---------------------------------------------------------------------------
// Unknown operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_operation_is_unsupported_and_changes_nothing() {
    let bridge = TestBridge::start().await;
    bridge.client.create("keep.odt", None, None).await.unwrap();
    bridge.client.add_paragraph(paragraph("keep.odt", "stable")).await.unwrap();
    let before = std::fs::read(bridge.path("keep.odt")).unwrap();

    let response = bridge
        .client
        .send_raw(br#"{"operation":"frobnicate","arguments":{"path":"keep.odt","text":"x"}}"#)
        .await
        .unwrap();
    assert!(!response.success);
    assert!(response.result.is_none());
    assert_eq!(
        response.error.map(|f| f.kind),
        Some(ErrorKind::UnsupportedOperation)
    );

    assert_eq!(std::fs::read(bridge.path("keep.odt")).unwrap(), before);
    bridge.stop().await;
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_commands_on_different_documents_do_not_interleave() {
    let bridge = TestBridge::start().await;
    let names: Vec<String> = (0..6).map(|i| format!("doc-{i}.odt")).collect();
    for name in &names {
        bridge.client.create(name, None, None).await.unwrap();
    }

    let mut tasks = Vec::new();
    for name in names.clone() {
        let client = bridge.client.clone();
        tasks.push(tokio::spawn(async move {
            for line in 0..5 {
                client
                    .add_paragraph(paragraph(&name, &format!("{name} line {line}")))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for name in &names {
        let text = bridge.client.open(name).await.unwrap().text;
        let expected: Vec<String> = (0..5).map(|line| format!("{name} line {line}")).collect();
        assert_eq!(text, expected.join("\n"));
    }
    bridge.stop().await;
}

// ---------------------------------------------------------------------------
// Failure taxonomy at the socket
// ---------------------------------------------------------------------------

async fn raw_exchange(addr: &str, request: &[u8], close_write: bool) -> Response {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    if close_write {
        stream.shutdown().await.unwrap();
    }
    let mut out = String::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut out))
        .await
        .expect("response in time")
        .unwrap();
    assert!(out.ends_with('\n'), "{out:?}");
    serde_json::from_str(out.trim_end()).unwrap()
}

#[tokio::test]
async fn undecodable_payloads_get_a_malformed_response() {
    let bridge = TestBridge::start().await;
    let addr = bridge.client.addr().to_string();

    let response = raw_exchange(&addr, b"this is not json\n", false).await;
    assert_eq!(response.error.unwrap().kind, ErrorKind::MalformedRequest);

    let response = raw_exchange(&addr, br#"{"arguments":{}}"#, true).await;
    assert_eq!(response.error.unwrap().kind, ErrorKind::MalformedRequest);

    let response = raw_exchange(&addr, b"", true).await;
    assert_eq!(response.error.unwrap().kind, ErrorKind::MalformedRequest);
    bridge.stop().await;
}

#[tokio::test]
async fn a_complete_value_without_newline_is_answered() {
    let bridge = TestBridge::start().await;
    let addr = bridge.client.addr().to_string();
    let response = raw_exchange(&addr, br#"{"operation":"ping"}"#, false).await;
    assert!(response.success);
    assert_eq!(response.result.unwrap()["message"], json!("pong"));
    bridge.stop().await;
}

#[tokio::test]
async fn oversized_requests_are_rejected() {
    let bridge = TestBridge::start_with(|c| c.max_request_bytes = 64).await;
    let text = "x".repeat(500);
    let request = format!(
        r#"{{"operation":"add-text","arguments":{{"path":"a.odt","text":"{text}"}}}}"#
    );
    let response = bridge.client.send_raw(request.as_bytes()).await.unwrap();
    assert_eq!(response.error.unwrap().kind, ErrorKind::MalformedRequest);
    bridge.stop().await;
}

#[tokio::test]
async fn bad_arguments_name_the_field() {
    let bridge = TestBridge::start().await;
    let response = bridge
        .client
        .send_raw(br#"{"operation":"add-table","arguments":{"path":"t.odt","rows":"two","columns":1}}"#)
        .await
        .unwrap();
    let failure = response.error.unwrap();
    assert_eq!(failure.kind, ErrorKind::InvalidArgument);
    assert!(failure.message.contains("rows"), "{}", failure.message);
    bridge.stop().await;
}

#[tokio::test]
async fn misspelled_arguments_are_rejected_before_running() {
    let bridge = TestBridge::start().await;
    bridge.client.create("t.odt", None, None).await.unwrap();
    let response = bridge
        .client
        .send_raw(br#"{"operation":"add-table","arguments":{"path":"t.odt","rows":1,"columns":1,"grid":[["x"]]}}"#)
        .await
        .unwrap();
    let failure = response.error.unwrap();
    assert_eq!(failure.kind, ErrorKind::InvalidArgument);
    assert!(failure.message.contains("grid"), "{}", failure.message);

    let info = bridge.client.get_properties("t.odt").await.unwrap();
    assert!(info.tables.is_empty());
    bridge.stop().await;
}

#[tokio::test]
async fn missing_documents_and_missing_text() {
    let bridge = TestBridge::start().await;
    let err = bridge.client.open("absent.odt").await.unwrap_err();
    assert_eq!(failure_kind(err), ErrorKind::DocumentNotFound);

    bridge.client.create("f.odt", None, None).await.unwrap();
    bridge.client.add_paragraph(paragraph("f.odt", "hello")).await.unwrap();
    let err = bridge
        .client
        .format_text(serde_json::from_value(json!({
            "path": "f.odt", "text": "goodbye", "bold": true
        })).unwrap())
        .await
        .unwrap_err();
    let ClientError::Failed(failure) = err else {
        panic!("expected a failure response");
    };
    assert_eq!(failure.kind, ErrorKind::TextNotFound);
    assert!(failure.message.contains("goodbye"), "{}", failure.message);
    bridge.stop().await;
}

// ---------------------------------------------------------------------------
// Backend outages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_commands_time_out_and_reset_the_backend() {
    let bridge = TestBridge::start_with(|c| c.command_timeout_secs = 1).await;
    bridge.client.create("slow.odt", None, None).await.unwrap();
    bridge.client.add_paragraph(paragraph("slow.odt", "kept")).await.unwrap();
    let before = bridge.client.open("slow.odt").await.unwrap();

    bridge.control.set_latency(Duration::from_millis(1500));
    let err = bridge
        .client
        .add_paragraph(paragraph("slow.odt", "lost"))
        .await
        .unwrap_err();
    assert_eq!(failure_kind(err), ErrorKind::BackendTimeout);
    assert_eq!(bridge.control.resets(), 1);

    bridge.control.set_latency(Duration::ZERO);
    let after = bridge.client.open("slow.odt").await.unwrap();
    assert_eq!(after.text, "kept");
    assert_ne!(after.handle, before.handle);
    bridge.stop().await;
}

#[tokio::test]
async fn ping_answers_while_the_worker_is_busy() {
    let bridge = TestBridge::start_with(|c| c.command_timeout_secs = 5).await;
    bridge.client.create("busy.odt", None, None).await.unwrap();
    bridge.control.set_latency(Duration::from_millis(800));

    let client = bridge.client.clone();
    let slow = tokio::spawn(async move { client.add_paragraph(paragraph("busy.odt", "x")).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = std::time::Instant::now();
    let pong = bridge.client.ping().await.unwrap();
    assert_eq!(pong.message, "pong");
    assert!(started.elapsed() < Duration::from_millis(500));

    slow.await.unwrap().unwrap();
    bridge.stop().await;
}

#[tokio::test]
async fn offline_backend_is_unavailable() {
    let bridge = TestBridge::start().await;
    bridge.control.set_offline(true);
    let err = bridge.client.create("x.odt", None, None).await.unwrap_err();
    assert_eq!(failure_kind(err), ErrorKind::BackendUnavailable);

    bridge.control.set_offline(false);
    assert!(bridge.client.create("x.odt", None, None).await.unwrap().created);
    bridge.stop().await;
}

// ---------------------------------------------------------------------------
// Listing and copies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_and_copy_document() {
    let bridge = TestBridge::start().await;
    bridge.client.create("b.odt", None, None).await.unwrap();
    bridge.client.add_paragraph(paragraph("b.odt", "original")).await.unwrap();
    std::fs::write(bridge.path("readme.md"), b"skip").unwrap();

    let copied = bridge.client.copy_document("b.odt", "copies/a.docx").await.unwrap();
    assert!(Path::new(&copied.target).is_file());

    let listing = bridge.client.list(None).await.unwrap();
    let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["b.odt"]);

    let nested = bridge.client.list(Some("copies")).await.unwrap();
    assert_eq!(nested.entries.len(), 1);
    assert_eq!(nested.entries[0].extension, "docx");

    assert_eq!(bridge.client.open("copies/a.docx").await.unwrap().text, "original");

    let err = bridge.client.list(Some("nowhere")).await.unwrap_err();
    assert_eq!(failure_kind(err), ErrorKind::DocumentNotFound);
    bridge.stop().await;
}

// ---------------------------------------------------------------------------
// The remaining editing operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn editing_operations_store_their_changes() {
    let bridge = TestBridge::start_with(|c| c.default_position = writer_protocol::Position::End).await;
    let created = bridge
        .client
        .create(
            "full.odt",
            None,
            Some(writer_protocol::Metadata {
                title: Some("Quarterly".into()),
                keywords: Some("q1, sales".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(created.doc_type, writer_protocol::DocType::Text);

    let client = &bridge.client;
    client.add_paragraph(paragraph("full.odt", "middle")).await.unwrap();
    client
        .add_text("full.odt", "first", Some(writer_protocol::Position::Start))
        .await
        .unwrap();
    client.insert_page_break("full.odt", None).await.unwrap();
    client.add_paragraph(paragraph("full.odt", "after the break")).await.unwrap();

    let table = client
        .add_table(AddTableArgs {
            path: "full.odt".into(),
            rows: 1,
            columns: 2,
            data: None,
            header_row: true,
        })
        .await
        .unwrap();
    client
        .format_table(serde_json::from_value(json!({
            "path": "full.odt",
            "table_index": table.table_index,
            "border_width": 50,
            "background_color": "#eeeeee",
            "header_row": true,
        })).unwrap())
        .await
        .unwrap();
    let err = client
        .format_table(serde_json::from_value(json!({"path": "full.odt", "table_index": 7})).unwrap())
        .await
        .unwrap_err();
    assert_eq!(failure_kind(err), ErrorKind::InvalidArgument);

    let image = bridge.path("dot.png");
    image::RgbImage::new(40, 20).save(&image).unwrap();
    client
        .insert_image(serde_json::from_value(json!({
            "path": "full.odt", "image_path": "dot.png", "width": 1000
        })).unwrap())
        .await
        .unwrap();
    let err = client
        .insert_image(serde_json::from_value(json!({
            "path": "full.odt", "image_path": "missing.png"
        })).unwrap())
        .await
        .unwrap_err();
    assert_eq!(failure_kind(err), ErrorKind::InvalidArgument);

    client
        .create_custom_style(serde_json::from_value(json!({
            "path": "full.odt", "name": "Callout", "italic": true, "font_size": 13
        })).unwrap())
        .await
        .unwrap();
    client
        .apply_document_style(serde_json::from_value(json!({
            "path": "full.odt", "font_name": "Liberation Serif", "alignment": "justify"
        })).unwrap())
        .await
        .unwrap();

    let removed = client
        .delete_text(serde_json::from_value(json!({
            "path": "full.odt", "text": "MIDDLE", "case_sensitive": false
        })).unwrap())
        .await
        .unwrap();
    assert_eq!(removed.count, 1);

    let info = client.get_properties("full.odt").await.unwrap();
    assert_eq!(info.title, "Quarterly");
    assert_eq!(info.keywords, vec!["q1", "sales"]);
    assert_eq!(info.tables.len(), 1);
    assert!(info.text.starts_with("first"), "{}", info.text);
    assert!(!info.text.contains("middle"), "{}", info.text);

    client.delete_paragraph("full.odt", 0).await.unwrap();
    let err = client.delete_paragraph("full.odt", 99).await.unwrap_err();
    assert_eq!(failure_kind(err), ErrorKind::InvalidArgument);
    let text = client.open("full.odt").await.unwrap().text;
    assert!(!text.starts_with("first"), "{text}");
    bridge.stop().await;
}

fn stored_model(path: &Path) -> writer_office::DocumentModel {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn format_text_reaches_table_cells() {
    let bridge = TestBridge::start().await;
    bridge.client.create("cells.odt", None, None).await.unwrap();
    bridge
        .client
        .add_table(AddTableArgs {
            path: "cells.odt".into(),
            rows: 1,
            columns: 1,
            data: Some(vec![vec![json!("alpha")]]),
            header_row: false,
        })
        .await
        .unwrap();

    let styled = bridge
        .client
        .format_text(serde_json::from_value(json!({
            "path": "cells.odt", "text": "alpha", "bold": true
        })).unwrap())
        .await
        .unwrap();
    assert_eq!(styled.count, 1);

    let replaced = bridge
        .client
        .search_replace(SearchReplaceArgs {
            path: "cells.odt".into(),
            search: "alpha".into(),
            replace: "beta".into(),
            case_sensitive: true,
        })
        .await
        .unwrap();
    assert_eq!(replaced.count, styled.count);
    bridge.stop().await;
}

#[tokio::test]
async fn page_break_at_start_of_a_table_first_document() {
    let bridge = TestBridge::start().await;
    bridge.client.create("grid.odt", None, None).await.unwrap();
    bridge
        .client
        .add_table(AddTableArgs {
            path: "grid.odt".into(),
            rows: 1,
            columns: 2,
            data: None,
            header_row: false,
        })
        .await
        .unwrap();
    bridge
        .client
        .insert_page_break("grid.odt", Some(writer_protocol::Position::Start))
        .await
        .unwrap();

    let model = stored_model(&bridge.path("grid.odt"));
    let breaks = model.paragraphs().filter(|p| p.page_break_before).count();
    assert_eq!(breaks, 1);
    assert_eq!(model.facts().tables.len(), 1);
    bridge.stop().await;
}
