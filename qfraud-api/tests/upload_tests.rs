//! CSV upload integration tests

mod helpers;

use axum::http::StatusCode;
use helpers::{header_line, multipart_upload, separable_csv, TestApp};
use qfraud_api::db::transactions::count_rows;
use qfraud_common::config::{IngestConfig, TrainingConfig};

#[tokio::test]
async fn test_upload_inserts_rows_in_chunks() {
    let app = TestApp::with_config(TrainingConfig::default(), IngestConfig { chunk_size: 7 }).await;

    let body = app.upload("alpha", &separable_csv(20, 4)).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "CSV data inserted into transactions table");
    assert_eq!(body["data"]["project_name"], "alpha");
    assert_eq!(body["data"]["rows_inserted"], 20);
    assert_eq!(body["data"]["chunks"], 3);

    assert_eq!(count_rows(&app.state.db, Some("alpha")).await.unwrap(), 20);
}

#[tokio::test]
async fn test_repeated_uploads_append() {
    let app = TestApp::new().await;
    app.upload("alpha", &separable_csv(10, 2)).await;
    app.upload("alpha", &separable_csv(5, 1)).await;

    assert_eq!(count_rows(&app.state.db, Some("alpha")).await.unwrap(), 15);
}

#[tokio::test]
async fn test_missing_column_is_400_and_inserts_nothing() {
    let app = TestApp::new().await;
    let csv = separable_csv(5, 1).replace("Amount", "Total");

    let (status, body) = app
        .send(multipart_upload(Some("alpha"), Some(("data.csv", &csv))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing columns in CSV: [\"Amount\"]");
    assert_eq!(count_rows(&app.state.db, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_non_numeric_value_is_400() {
    let app = TestApp::new().await;
    let mut csv = header_line();
    csv.push('\n');
    let mut fields = vec!["1.0"; 30];
    fields[3] = "abc";
    csv.push_str(&fields.join(","));
    csv.push_str(",0\n");

    let (status, body) = app
        .send(multipart_upload(Some("alpha"), Some(("data.csv", &csv))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_project_name_is_required() {
    let app = TestApp::new().await;
    let csv = separable_csv(3, 1);

    for project in [None, Some(""), Some("   ")] {
        let (status, body) = app
            .send(multipart_upload(project, Some(("data.csv", &csv))))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Project name is required.");
    }
    assert_eq!(count_rows(&app.state.db, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_file_is_required() {
    let app = TestApp::new().await;

    let (status, body) = app.send(multipart_upload(Some("alpha"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No file uploaded");

    let (status, body) = app
        .send(multipart_upload(Some("alpha"), Some(("", "Time\n"))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Empty filename");
}

#[tokio::test]
async fn test_labels_outside_zero_and_one_are_400() {
    let app = TestApp::new().await;
    let mut csv = header_line();
    csv.push('\n');
    for label in ["7", "-3"] {
        csv.push_str(&vec!["1.0"; 30].join(","));
        csv.push(',');
        csv.push_str(label);
        csv.push('\n');
    }

    let (status, body) = app
        .send(multipart_upload(Some("alpha"), Some(("data.csv", &csv))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Class"));
    assert_eq!(count_rows(&app.state.db, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_non_multipart_body_is_400() {
    let app = TestApp::new().await;
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/upload_csv")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{}"))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "BAD_REQUEST");
}
