use crate::handlers::{
    auth::{change_password, sign_in, sign_out, sign_up},
    health::health_check,
    mangos::{create_mango, delete_mango, get_mango, list_mangos, update_mango},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Mango CRUD routes
        .route("/mangos/", get(list_mangos).post(create_mango))
        .route(
            "/mangos/:mango_id/",
            get(get_mango).patch(update_mango).delete(delete_mango),
        )
        // Authentication routes
        .route("/sign-up/", post(sign_up))
        .route("/sign-in/", post(sign_in))
        .route("/sign-out/", delete(sign_out))
        .route("/change-pw/", patch(change_password))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
