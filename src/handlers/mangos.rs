use crate::schemas::{
    api_error, database_error, rejected_payload, validation_failed, ApiError, AppState,
    ErrorResponse,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::mango;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Fields accepted when creating a mango
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct NewMango {
    /// Display name of the mango
    #[validate(length(min = 1, max = 100, message = "Must be between 1 and 100 characters"))]
    pub name: String,
    /// Skin color, free text
    #[validate(length(min = 1, max = 100, message = "Must be between 1 and 100 characters"))]
    pub color: String,
    /// Whether the mango is ripe (defaults to false)
    #[serde(default)]
    pub ripe: bool,
}

impl NewMango {
    /// Strip surrounding whitespace so blank names fail the length check.
    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            color: self.color.trim().to_string(),
            ripe: self.ripe,
        }
    }
}

/// Fields accepted when partially updating a mango; all optional
#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct MangoPatch {
    #[validate(length(min = 1, max = 100, message = "Must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Must be between 1 and 100 characters"))]
    pub color: Option<String>,
    pub ripe: Option<bool>,
}

impl MangoPatch {
    fn trimmed(self) -> Self {
        Self {
            name: self.name.map(|name| name.trim().to_string()),
            color: self.color.map(|color| color.trim().to_string()),
            ripe: self.ripe,
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.ripe.is_none()
    }
}

/// Request body for `POST /mangos/`
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateMangoRequest {
    pub mango: NewMango,
}

/// Request body for `PATCH /mangos/{id}/`
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateMangoRequest {
    pub mango: MangoPatch,
}

/// Mango response model
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct MangoResponse {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub ripe: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<mango::Model> for MangoResponse {
    fn from(model: mango::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            ripe: model.ripe,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn mango_not_found(mango_id: impl std::fmt::Display) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        "MANGO_NOT_FOUND",
        format!("Mango {} not found", mango_id),
    )
}

/// Parse the id path segment; anything that is not an integer cannot name a mango.
fn parse_mango_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, ApiError> {
    match path {
        Ok(Path(mango_id)) => Ok(mango_id),
        Err(rejection) => {
            warn!("Invalid mango id in path: {}", rejection.body_text());
            Err(mango_not_found("with this id"))
        }
    }
}

/// Fetch a mango by primary key or fail with 404
async fn find_mango_or_404(db: &DatabaseConnection, mango_id: i32) -> Result<mango::Model, ApiError> {
    match mango::Entity::find_by_id(mango_id).one(db).await {
        Ok(Some(mango)) => Ok(mango),
        Ok(None) => {
            warn!("Mango with ID {} not found", mango_id);
            Err(mango_not_found(mango_id))
        }
        Err(e) => Err(database_error("Failed to fetch mango", e)),
    }
}

/// Get all mangos
#[utoipa::path(
    get,
    path = "/mangos/",
    tag = "mangos",
    responses(
        (status = 200, description = "All mangos", body = Vec<MangoResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_mangos(
    State(state): State<AppState>,
) -> Result<Json<Vec<MangoResponse>>, ApiError> {
    trace!("Fetching all mangos");

    match mango::Entity::find()
        .order_by_asc(mango::Column::Id)
        .all(&state.db)
        .await
    {
        Ok(mangos) => {
            info!("Successfully fetched {} mangos", mangos.len());
            Ok(Json(mangos.into_iter().map(MangoResponse::from).collect()))
        }
        Err(e) => Err(database_error("Failed to fetch mangos", e)),
    }
}

/// Create a new mango
#[utoipa::path(
    post,
    path = "/mangos/",
    tag = "mangos",
    request_body = CreateMangoRequest,
    responses(
        (status = 201, description = "Mango created successfully", body = MangoResponse),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_mango(
    State(state): State<AppState>,
    payload: Result<Json<CreateMangoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MangoResponse>), ApiError> {
    let Json(request) = payload.map_err(rejected_payload)?;

    let fields = request.mango.trimmed();
    if let Err(errors) = fields.validate() {
        warn!("Mango payload failed validation: {}", errors);
        return Err(validation_failed(&errors));
    }
    debug!("Creating mango with name: {}", fields.name);

    let now = Utc::now();
    let new_mango = mango::ActiveModel {
        name: Set(fields.name),
        color: Set(fields.color),
        ripe: Set(fields.ripe),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_mango.insert(&state.db).await {
        Ok(mango_model) => {
            info!("Successfully created mango with ID: {}", mango_model.id);
            Ok((StatusCode::CREATED, Json(MangoResponse::from(mango_model))))
        }
        Err(e) => Err(database_error("Failed to create mango", e)),
    }
}

/// Get a specific mango by ID
#[utoipa::path(
    get,
    path = "/mangos/{mango_id}/",
    tag = "mangos",
    params(
        ("mango_id" = i32, Path, description = "Mango ID")
    ),
    responses(
        (status = 200, description = "Mango details", body = MangoResponse),
        (status = 404, description = "Mango not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_mango(
    path: Result<Path<i32>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<MangoResponse>, ApiError> {
    let mango_id = parse_mango_id(path)?;
    debug!("Fetching mango with ID: {}", mango_id);

    let mango_model = find_mango_or_404(&state.db, mango_id).await?;
    Ok(Json(MangoResponse::from(mango_model)))
}

/// Partially update a mango
#[utoipa::path(
    patch,
    path = "/mangos/{mango_id}/",
    tag = "mangos",
    params(
        ("mango_id" = i32, Path, description = "Mango ID")
    ),
    request_body = UpdateMangoRequest,
    responses(
        (status = 200, description = "Mango updated successfully", body = MangoResponse),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 404, description = "Mango not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_mango(
    path: Result<Path<i32>, PathRejection>,
    State(state): State<AppState>,
    payload: Result<Json<UpdateMangoRequest>, JsonRejection>,
) -> Result<Json<MangoResponse>, ApiError> {
    let mango_id = parse_mango_id(path)?;
    debug!("Updating mango with ID: {}", mango_id);

    let existing = find_mango_or_404(&state.db, mango_id).await?;

    let Json(request) = payload.map_err(rejected_payload)?;
    let patch = request.mango.trimmed();
    if let Err(errors) = patch.validate() {
        warn!("Mango update failed validation: {}", errors);
        return Err(validation_failed(&errors));
    }

    if patch.is_empty() {
        debug!("No fields to update for mango ID: {}", mango_id);
        return Ok(Json(MangoResponse::from(existing)));
    }

    let mut active_mango: mango::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active_mango.name = Set(name);
    }
    if let Some(color) = patch.color {
        active_mango.color = Set(color);
    }
    if let Some(ripe) = patch.ripe {
        active_mango.ripe = Set(ripe);
    }
    active_mango.updated_at = Set(Utc::now());

    match active_mango.update(&state.db).await {
        Ok(updated) => {
            info!("Successfully updated mango with ID: {}", mango_id);
            Ok(Json(MangoResponse::from(updated)))
        }
        Err(e) => Err(database_error("Failed to update mango", e)),
    }
}

/// Delete a mango
#[utoipa::path(
    delete,
    path = "/mangos/{mango_id}/",
    tag = "mangos",
    params(
        ("mango_id" = i32, Path, description = "Mango ID")
    ),
    responses(
        (status = 204, description = "Mango deleted"),
        (status = 404, description = "Mango not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_mango(
    path: Result<Path<i32>, PathRejection>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let mango_id = parse_mango_id(path)?;
    debug!("Deleting mango with ID: {}", mango_id);

    let existing = find_mango_or_404(&state.db, mango_id).await?;

    match existing.delete(&state.db).await {
        Ok(_) => {
            info!("Successfully deleted mango with ID: {}", mango_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(database_error("Failed to delete mango", e)),
    }
}
