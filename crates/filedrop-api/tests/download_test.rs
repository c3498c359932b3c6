//! Archive download integration tests.

mod helpers;

use axum::http::header;
use helpers::fixtures::{create_test_pdf, upload_form};
use helpers::{setup_test_app, setup_test_app_with};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

fn unzip(data: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).expect("valid zip");
    let mut contents = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).unwrap();
        contents.insert(entry.name().to_string(), buf);
    }
    contents
}

#[tokio::test]
async fn test_download_archive_matches_storage() {
    let app = setup_test_app_with(|c| c.post_processing_enabled = false).await;
    let pdf = create_test_pdf(4096);
    app.client()
        .post("/upload")
        .multipart(upload_form(vec![
            ("report.pdf", pdf.clone()),
            ("notes.txt", b"remember".to_vec()),
            ("notes.txt", b"again".to_vec()),
        ]))
        .await
        .assert_status_ok();

    let response = app.client().get("/download").await;
    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "application/zip");
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"uploaded_files.zip\""
    );

    let contents = unzip(response.as_bytes());
    assert_eq!(
        contents.keys().cloned().collect::<Vec<_>>(),
        app.stored_names()
    );
    assert_eq!(contents["report.pdf"], pdf);
    let mut notes = vec![
        contents["notes.txt"].clone(),
        contents["notes_1.txt"].clone(),
    ];
    notes.sort();
    assert_eq!(notes, vec![b"again".to_vec(), b"remember".to_vec()]);
}

#[tokio::test]
async fn test_download_empty_storage() {
    let app = setup_test_app().await;

    let response = app.client().get("/download").await;
    response.assert_status_ok();
    assert!(unzip(response.as_bytes()).is_empty());
}

#[tokio::test]
async fn test_deleted_file_not_in_archive() {
    let app = setup_test_app().await;
    app.client()
        .post("/upload")
        .multipart(upload_form(vec![
            ("keep.txt", b"keep".to_vec()),
            ("drop.txt", b"drop".to_vec()),
        ]))
        .await
        .assert_status_ok();

    app.client()
        .delete("/files/drop.txt")
        .await
        .assert_status_ok();

    let contents = unzip(app.client().get("/download").await.as_bytes());
    assert_eq!(contents.keys().collect::<Vec<_>>(), vec!["keep.txt"]);
    assert_eq!(contents["keep.txt"], b"keep");
}
