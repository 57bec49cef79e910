use axum::{extract::rejection::JsonRejection, http::StatusCode, response::Json};
use model::UserManager;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use validator::ValidationErrors;

use crate::handlers::auth::{
    ChangePasswordRequest, PasswordChange, SignInCredentials, SignInRequest, SignUpCredentials,
    SignUpRequest, UserEnvelope, UserResponse,
};
use crate::handlers::mangos::{
    CreateMangoRequest, MangoPatch, MangoResponse, NewMango, UpdateMangoRequest,
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// User accounts and token issuance
    pub users: UserManager,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
    /// Per-field validation messages, present only for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponse {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            success: false,
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, Vec<String>>) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(code, error)))
}

/// 400 carrying the messages of every failed field
pub fn validation_failed(errors: &ValidationErrors) -> ApiError {
    let fields = errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value ({})", e.code),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect();

    field_errors(fields)
}

/// 400 for explicitly assembled field errors
pub fn field_errors(fields: BTreeMap<String, Vec<String>>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("VALIDATION_ERROR", "Validation failed").with_fields(fields)),
    )
}

/// 400 for bodies that could not be parsed into the expected envelope
pub fn rejected_payload(rejection: JsonRejection) -> ApiError {
    warn!("Rejected request body: {}", rejection.body_text());
    let mut fields = BTreeMap::new();
    fields.insert("body".to_string(), vec![rejection.body_text()]);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("VALIDATION_ERROR", "Malformed request body").with_fields(fields)),
    )
}

/// Log a persistence failure and turn it into a 500
pub fn database_error(context: &str, err: impl Display) -> ApiError {
    error!("{}: {}", context, err);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", context)
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::mangos::list_mangos,
        crate::handlers::mangos::create_mango,
        crate::handlers::mangos::get_mango,
        crate::handlers::mangos::update_mango,
        crate::handlers::mangos::delete_mango,
        crate::handlers::auth::sign_up,
        crate::handlers::auth::sign_in,
        crate::handlers::auth::sign_out,
        crate::handlers::auth::change_password,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            MangoResponse,
            NewMango,
            MangoPatch,
            CreateMangoRequest,
            UpdateMangoRequest,
            SignUpRequest,
            SignUpCredentials,
            SignInRequest,
            SignInCredentials,
            ChangePasswordRequest,
            PasswordChange,
            UserEnvelope,
            UserResponse,
        )
    ),
    modifiers(&TokenAuthAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "mangos", description = "Mango CRUD endpoints"),
        (name = "auth", description = "Registration and token endpoints"),
    ),
    info(
        title = "MangoRust API",
        description = "Mango CRUD API with email/password users and bearer tokens",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;

/// Registers the `Authorization: Token <key>` scheme used by protected routes.
struct TokenAuthAddon;

impl utoipa::Modify for TokenAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "Token <key> as returned by /sign-in/",
                ))),
            );
        }
    }
}
