use crate::auth::AuthUser;
use crate::schemas::{
    api_error, database_error, field_errors, rejected_payload, validation_failed, ApiError,
    AppState, ErrorResponse,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use model::{entities::user, password, UserError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Registration credentials
#[derive(Deserialize, Serialize, Validate, ToSchema)]
pub struct SignUpCredentials {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirmation: String,
}

/// Request body for `POST /sign-up/`
#[derive(Deserialize, Serialize, ToSchema)]
pub struct SignUpRequest {
    pub credentials: SignUpCredentials,
}

/// Sign-in credentials
#[derive(Deserialize, Serialize, ToSchema)]
pub struct SignInCredentials {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /sign-in/`
#[derive(Deserialize, Serialize, ToSchema)]
pub struct SignInRequest {
    pub credentials: SignInCredentials,
}

/// Old and new password for a password change
#[derive(Deserialize, Serialize, Validate, ToSchema)]
pub struct PasswordChange {
    pub old: String,
    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub new: String,
}

/// Request body for `PATCH /change-pw/`
#[derive(Deserialize, Serialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub passwords: PasswordChange,
}

/// User response model
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    /// Present only in the sign-in response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Response wrapper keyed by `user`
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            token: None,
        }
    }
}

/// Map a manager error to the response the client should see
fn user_error(err: UserError) -> ApiError {
    match err {
        UserError::EmptyEmail | UserError::EmailTaken(_) => {
            let mut fields = BTreeMap::new();
            fields.insert("email".to_string(), vec![err.to_string()]);
            field_errors(fields)
        }
        UserError::InvalidCredentials => api_error(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            err.to_string(),
        ),
        UserError::PasswordHash(_) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "PASSWORD_HASH_ERROR",
            "Failed to process password",
        ),
        UserError::Database(e) => database_error("Database error while handling user", e),
    }
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/sign-up/",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserEnvelope),
        (status = 400, description = "Invalid credentials or email already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let Json(request) = payload.map_err(rejected_payload)?;
    let credentials = request.credentials;

    if let Err(errors) = credentials.validate() {
        warn!("Sign-up payload failed validation: {}", errors);
        return Err(validation_failed(&errors));
    }

    let created = state
        .users
        .create_user(&credentials.email, Some(&credentials.password))
        .await
        .map_err(user_error)?;

    info!("Registered user {}", created.id);
    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            user: UserResponse::from(created),
        }),
    ))
}

/// Exchange credentials for a fresh token
#[utoipa::path(
    post,
    path = "/sign-in/",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in; any previous token is invalidated", body = UserEnvelope),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let Json(request) = payload.map_err(rejected_payload)?;
    let credentials = request.credentials;

    let signed_in = state
        .users
        .authenticate(&credentials.email, &credentials.password)
        .await
        .map_err(user_error)?;

    let token = state.users.issue_token(&signed_in).await.map_err(user_error)?;
    let signed_in = state
        .users
        .record_login(signed_in)
        .await
        .map_err(user_error)?;

    info!("User {} signed in", signed_in.id);
    let mut user = UserResponse::from(signed_in);
    user.token = Some(token);
    Ok(Json(UserEnvelope { user }))
}

/// Revoke the caller's token
#[utoipa::path(
    delete,
    path = "/sign-out/",
    tag = "auth",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("token" = []))
)]
#[instrument(skip_all)]
pub async fn sign_out(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
) -> Result<StatusCode, ApiError> {
    state.users.revoke_token(&current).await.map_err(user_error)?;

    info!("User {} signed out", current.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Change the caller's password
#[utoipa::path(
    patch,
    path = "/change-pw/",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Old password wrong or new password blank", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("token" = []))
)]
#[instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(rejected_payload)?;
    let passwords = request.passwords;

    if !password::verify_password(&passwords.old, &current.password) {
        debug!("Old password did not match for user {}", current.id);
        let mut fields = BTreeMap::new();
        fields.insert("old".to_string(), vec!["Wrong password".to_string()]);
        return Err(field_errors(fields));
    }

    if let Err(errors) = passwords.validate() {
        return Err(validation_failed(&errors));
    }

    state
        .users
        .set_password(current, &passwords.new)
        .await
        .map_err(user_error)?;

    Ok(StatusCode::NO_CONTENT)
}
