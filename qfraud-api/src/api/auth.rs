//! Signup, login and password reset
//!
//! All three endpoints take `application/x-www-form-urlencoded` bodies.
//! Passwords are stored as Argon2id hashes; hashing runs on the blocking
//! pool so it does not stall the runtime.

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    routing::post,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{non_blank, ApiResponse};
use crate::db::users::{self, CreateUser};
use crate::services::passwords;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgetPasswordForm {
    pub email: Option<String>,
}

/// Identity returned by a successful login
#[derive(Debug, Serialize)]
pub struct LoginData {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    form: Result<Form<SignupForm>, FormRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<()>>)> {
    let Form(form) = form?;

    let (Some(name), Some(email), Some(password)) = (
        non_blank(form.name.as_deref()),
        non_blank(form.email.as_deref()),
        form.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("All fields are required.".to_string()));
    };

    let password_hash = hash_off_thread(password.to_string()).await?;

    match users::create_user(&state.db, name, email, &password_hash).await? {
        CreateUser::Created(user_id) => {
            info!(user_id, email, "User created");
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::message("User created successfully!")),
            ))
        }
        CreateUser::DuplicateEmail => {
            info!(email, "Signup refused: email already registered");
            Err(ApiError::Conflict("Email is already registered.".to_string()))
        }
    }
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> ApiResult<Json<ApiResponse<LoginData>>> {
    let Form(form) = form?;

    let (Some(email), Some(password)) = (
        non_blank(form.email.as_deref()),
        form.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    };

    let invalid = || ApiError::Unauthorized("Invalid email or password!".to_string());

    // Unknown emails still pay for a hash check, so timing does not reveal
    // which accounts exist.
    let user = users::find_user_by_email(&state.db, email).await?;
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let matches = tokio::task::spawn_blocking(move || {
        passwords::verify_password_or_dummy(&password, stored_hash.as_deref())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Password check failed: {}", e)))?;

    let user = match user {
        Some(user) if matches => user,
        _ => {
            info!(email, "Login failed");
            return Err(invalid());
        }
    };

    info!(user_id = user.id, "Login successful");
    Ok(Json(ApiResponse::message_with_data(
        "Login successful!",
        LoginData {
            id: user.id,
            name: user.name,
            email: user.email,
        },
    )))
}

/// POST /forget_password
///
/// Always answers 200 for a well-formed request so the response does not
/// reveal whether an account exists. The mail goes out on a background
/// task; failures are only logged.
pub async fn forget_password(
    State(state): State<AppState>,
    form: Result<Form<ForgetPasswordForm>, FormRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Form(form) = form?;
    let Some(email) = non_blank(form.email.as_deref()) else {
        return Err(ApiError::BadRequest("Email is required.".to_string()));
    };

    let temp_password = passwords::generate_temp_password();
    let password_hash = hash_off_thread(temp_password.clone()).await?;

    let updated = users::update_password(&state.db, email, &password_hash).await?;
    if updated > 0 {
        info!(email, "Temporary password issued");
        let mailer = Arc::clone(&state.mailer);
        let to = email.to_string();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_temporary_password(&to, &temp_password).await {
                warn!(email = %to, error = %e, "Failed to send temporary password");
            }
        });
    } else {
        info!(email, "Password reset requested for unknown email");
    }

    Ok(Json(ApiResponse::message(
        "If the email is registered, a temporary password has been sent.",
    )))
}

async fn hash_off_thread(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || passwords::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

/// Build credential routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forget_password", post(forget_password))
}
