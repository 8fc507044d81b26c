//! Live tests against LibreOffice.
//!
//! They need a URP listener on localhost:2002:
//!
//!    soffice --headless --accept="socket,host=localhost,port=2002;urp;StarOffice.ComponentContext"
//!
//! If LibreOffice is not reachable there, every test is skipped.

use writer_office::{
    LibreOffice, NewParagraph, Office, OfficeConfig, ParagraphStyle, TableFormat,
};
use writer_protocol::{Alignment, Color, DocType, Metadata, Position, TextStyle};

fn urp_available() -> bool {
    std::net::TcpStream::connect_timeout(
        &"127.0.0.1:2002".parse().unwrap(),
        std::time::Duration::from_secs(2),
    )
    .is_ok()
}

macro_rules! skip_if_no_urp {
    () => {
        if !urp_available() {
            eprintln!(
                "SKIP: LibreOffice URP not available on localhost:2002.\n\
                 Start LibreOffice with:\n  \
                 soffice --headless --accept=\"socket,host=localhost,port=2002;urp;StarOffice.ComponentContext\""
            );
            return;
        }
    };
}

async fn office() -> LibreOffice {
    let mut office = LibreOffice::new(OfficeConfig {
        launch: false,
        ..OfficeConfig::default()
    });
    office.ensure_session().await.expect("connect");
    office
}

#[tokio::test]
async fn create_write_and_reload() {
    skip_if_no_urp!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("round-trip.odt");
    let mut office = office().await;

    let metadata = Metadata {
        title: Some("Round trip".into()),
        keywords: Some("alpha, beta".into()),
        ..Metadata::default()
    };
    let doc = office.create(&path, DocType::Text, &metadata).await.expect("create");
    office
        .append_paragraph(&doc, &NewParagraph::heading("Title", 1))
        .await
        .expect("heading");
    office
        .append_paragraph(
            &doc,
            &NewParagraph {
                text: "Body".into(),
                alignment: Some(Alignment::Center),
                ..NewParagraph::default()
            },
        )
        .await
        .expect("paragraph");
    office.store(&doc).await.expect("store");
    office.close(&doc).await.expect("close");

    let doc = office.load(&path).await.expect("load");
    assert_eq!(office.doc_type(&doc), DocType::Text);
    let facts = office.facts(&doc).await.expect("facts");
    assert!(facts.text.contains("Title") && facts.text.contains("Body"), "{}", facts.text);
    assert_eq!(facts.title, "Round trip");
    assert_eq!(facts.keywords, vec!["alpha", "beta"]);
    office.close(&doc).await.expect("close");
}

#[tokio::test]
async fn tables_are_filled_and_formatted() {
    skip_if_no_urp!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tables.odt");
    let mut office = office().await;

    let doc = office
        .create(&path, DocType::Text, &Metadata::default())
        .await
        .expect("create");
    let cells = vec![
        vec!["Name".to_string(), "Qty".to_string()],
        vec!["Apples".to_string(), "3".to_string()],
    ];
    let index = office.add_table(&doc, 2, 2, &cells, true).await.expect("table");
    assert_eq!(index, 0);
    office
        .format_table(
            &doc,
            0,
            &TableFormat {
                border_width: Some(35),
                background_color: Some(Color(0xEEEEEE)),
                header_row: Some(true),
            },
        )
        .await
        .expect("format");
    let err = office
        .format_table(&doc, 3, &TableFormat::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), writer_protocol::ErrorKind::InvalidArgument);

    let facts = office.facts(&doc).await.expect("facts");
    assert_eq!(facts.tables.len(), 1);
    assert_eq!((facts.tables[0].rows, facts.tables[0].columns), (2, 2));
    assert_eq!(facts.tables[0].cells, cells);
    office.close(&doc).await.expect("close");
}

#[tokio::test]
async fn search_replace_and_formatting() {
    skip_if_no_urp!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("search.docx");
    let mut office = office().await;

    let doc = office
        .create(&path, DocType::Text, &Metadata::default())
        .await
        .expect("create");
    office
        .insert_text(&doc, "red fish, Red fish, blue fish", Position::End)
        .await
        .expect("text");

    assert_eq!(office.replace_all(&doc, "red", "green", true).await.unwrap(), 1);
    assert_eq!(office.replace_all(&doc, "red", "green", true).await.unwrap(), 0);
    assert_eq!(office.replace_all(&doc, "RED", "green", false).await.unwrap(), 1);

    let bold = TextStyle {
        bold: Some(true),
        ..TextStyle::default()
    };
    assert_eq!(office.format_text(&doc, "fish", &bold, false).await.unwrap(), 1);
    assert_eq!(office.format_text(&doc, "fish", &bold, true).await.unwrap(), 3);
    assert_eq!(office.format_text(&doc, "whale", &bold, true).await.unwrap(), 0);

    office
        .define_paragraph_style(
            &doc,
            &ParagraphStyle {
                name: "Callout".into(),
                italic: Some(true),
                font_size: Some(13.0),
                ..ParagraphStyle::default()
            },
        )
        .await
        .expect("style");
    office
        .append_paragraph(
            &doc,
            &NewParagraph {
                text: "styled".into(),
                style: Some("Callout".into()),
                alignment: None,
            },
        )
        .await
        .expect("styled paragraph");
    office.insert_page_break(&doc, Position::End).await.expect("break");
    office.store(&doc).await.expect("store");

    let text = office.text(&doc).await.unwrap();
    assert!(text.starts_with("green fish, green fish"), "{text}");
    office.close(&doc).await.expect("close");
}
