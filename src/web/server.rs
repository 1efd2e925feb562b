use std::time::Duration;

use axum::{routing::get, routing::post, Router};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;

use super::api::sessions as session_handlers;
use super::api_doc::ApiDoc;
use super::state::{AppState, StateError};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/sessions", post(session_handlers::create_session))
        .route(
            "/api/sessions/{id}",
            get(session_handlers::get_session).delete(session_handlers::delete_session),
        )
        .route("/api/sessions/{id}/start", post(session_handlers::start))
        .route("/api/sessions/{id}/stop", post(session_handlers::stop))
        .route(
            "/api/sessions/{id}/location",
            post(session_handlers::location),
        )
        .route(
            "/api/sessions/{id}/permission-denied",
            post(session_handlers::permission_denied),
        )
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run_server(config: Config) -> Result<(), ServerError> {
    let bind_addr = config.web.bind.clone();
    let max_idle = config.session_idle_timeout().map_err(StateError::from)?;
    let state = AppState::new(config)?;
    tokio::spawn(sweep_sessions(state.clone(), max_idle));
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn sweep_sessions(state: AppState, max_idle: Duration) {
    let mut interval = tokio::time::interval(max_idle.min(Duration::from_secs(60)));
    loop {
        interval.tick().await;
        let dropped = state.sweep_idle_sessions(Utc::now(), max_idle).await;
        if dropped > 0 {
            log::info!("dropped {} idle sessions", dropped);
        }
    }
}
