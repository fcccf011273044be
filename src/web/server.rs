use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::WebConfig;
use crate::visibility::VisibilityService;

use super::api::visibility as visibility_handlers;
use super::api_doc::ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VisibilityService>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/visibility", get(visibility_handlers::get_visibility))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(web: WebConfig, service: Arc<VisibilityService>) -> std::io::Result<()> {
    let app = router(AppState { service });

    log::info!("Starting server on {}", web.bind);

    let listener = tokio::net::TcpListener::bind(&web.bind).await?;
    axum::serve(listener, app).await
}
