//! Signup, login and password reset over HTTP

mod helpers;

use axum::http::StatusCode;
use helpers::{get, post_form, RecordingMailer, TestApp};
use std::time::{Duration, Instant};

async fn signup(app: &TestApp, name: &str, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    app.send(post_form(
        "/signup",
        &[("name", name), ("email", email), ("password", password)],
    ))
    .await
}

async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    app.send(post_form("/login", &[("email", email), ("password", password)]))
        .await
}

#[tokio::test]
async fn test_signup_then_login() {
    let app = TestApp::new().await;

    let (status, body) = signup(&app, "Ada", "ada@example.com", "s3cret!").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "User created successfully!");

    let (status, body) = login(&app, "ada@example.com", "s3cret!").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["name"], "Ada");
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert!(body["data"]["id"].is_i64());
}

#[tokio::test]
async fn test_password_is_stored_hashed() {
    let app = TestApp::new().await;
    signup(&app, "Ada", "ada@example.com", "s3cret!").await;

    let stored: String = sqlx::query_scalar("SELECT password FROM users WHERE email = ?")
        .bind("ada@example.com")
        .fetch_one(&app.state.db)
        .await
        .unwrap();
    assert_ne!(stored, "s3cret!");
    assert!(stored.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_signup_missing_field_is_400() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(post_form("/signup", &[("name", "Ada"), ("email", "ada@example.com")]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All fields are required.");

    let (status, _) = signup(&app, "   ", "ada@example.com", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_email_is_409() {
    let app = TestApp::new().await;
    signup(&app, "Ada", "ada@example.com", "one").await;

    let (status, body) = signup(&app, "Other", "ada@example.com", "two").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    // The original account is untouched
    let (status, _) = login(&app, "ada@example.com", "one").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bad_credentials_are_401() {
    let app = TestApp::new().await;
    signup(&app, "Ada", "ada@example.com", "right").await;

    for (email, password) in [("ada@example.com", "wrong"), ("nobody@example.com", "right")] {
        let (status, body) = login(&app, email, password).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password!");
    }
}

#[tokio::test]
async fn test_legacy_plain_text_password_is_rejected() {
    let app = TestApp::new().await;
    sqlx::query("INSERT INTO users (username, email, password) VALUES ('Old', 'old@example.com', 'plain')")
        .execute(&app.state.db)
        .await
        .unwrap();

    let (status, _) = login(&app, "old@example.com", "plain").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_missing_fields_is_400() {
    let app = TestApp::new().await;
    let (status, body) = app.send(post_form("/login", &[("email", "ada@example.com")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email and password are required.");
}

#[tokio::test]
async fn test_forget_password_mails_working_temporary_password() {
    let app = TestApp::new().await;
    signup(&app, "Ada", "ada@example.com", "forgotten").await;

    let (status, body) = app
        .send(post_form("/forget_password", &[("email", "ada@example.com")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let sent = app.mailer.wait_for_sent(1).await;
    assert_eq!(sent.len(), 1);
    let (to, temp_password) = &sent[0];
    assert_eq!(to, "ada@example.com");
    assert_eq!(temp_password.len(), 10);
    assert!(temp_password.chars().all(|c| c.is_ascii_alphanumeric()));

    let (status, _) = login(&app, "ada@example.com", temp_password).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = login(&app, "ada@example.com", "forgotten").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forget_password_answers_before_mail_is_delivered() {
    let app = TestApp::with_mailer(RecordingMailer::slow(Duration::from_secs(8))).await;
    signup(&app, "Ada", "ada@example.com", "forgotten").await;

    let started = Instant::now();
    let (status, _) = app
        .send(post_form("/forget_password", &[("email", "ada@example.com")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(started.elapsed() < Duration::from_secs(8));
    assert!(app.mailer.sent().is_empty());

    let sent = app.mailer.wait_for_sent(1).await;
    assert_eq!(sent[0].0, "ada@example.com");
}

#[tokio::test]
async fn test_forget_password_unknown_email_sends_nothing() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(post_form("/forget_password", &[("email", "ghost@example.com")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(app.mailer.sent().is_empty());

    let (status, _) = app.send(post_form("/forget_password", &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_view_users_never_exposes_passwords() {
    let app = TestApp::new().await;
    signup(&app, "Ada", "ada@example.com", "pw1").await;
    signup(&app, "Grace", "grace@example.com", "pw2").await;

    let (status, body) = app.send(get("/view-users")).await;
    assert_eq!(status, StatusCode::OK);

    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["name"], "Ada");
    assert_eq!(users[1]["email"], "grace@example.com");
    assert!(users.iter().all(|u| u.get("password").is_none()));
    assert!(users[0]["created_at"].is_string());
}
