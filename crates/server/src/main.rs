use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use server_api::{get_city_theme, ThemeService};
use shared::error::ApiError;
use storage::{redact, ControlStore};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

const JSON_UTF8: &str = "application/json; charset=utf-8";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let settings = load_settings().map_err(|error| {
        error!(error = %format!("{error:#}"), "invalid configuration");
        error
    })?;

    let store = ControlStore::connect(&settings.control_db_url, settings.query_timeout())
        .await
        .map_err(|error| {
            error!(
                url = %redact(&settings.control_db_url),
                error = %format!("{error:#}"),
                "failed to open control database"
            );
            error
        })?;
    store.health_check().await.map_err(|error| {
        error!(error = %format!("{error:#}"), "control database is unreachable");
        error
    })?;

    let api = ThemeService::new(Arc::new(store)).with_query_timeout(settings.query_timeout());
    let app = build_router(Arc::new(AppState { api }));

    let addr = settings.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/cities/:slug/theme", get(http_city_theme))
        .route("/api/cities//theme", get(http_city_theme_without_slug))
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_city_theme(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    theme_response(&state, &slug).await
}

async fn http_city_theme_without_slug(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    theme_response(&state, "").await
}

async fn theme_response(
    state: &AppState,
    slug: &str,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let theme = get_city_theme(&state.api, slug)
        .await
        .map_err(error_response)?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8))],
        Json(theme),
    ))
}

fn error_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = StatusCode::from_u16(err.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
