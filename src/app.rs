use std::net::SocketAddr;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::AppState;
use crate::users;

const API_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .nest("/api/v1",
              Router::new()
                  .merge(users::router())
                  .route("/health", get(health))
                  .route("/docs", get(docs))
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn welcome() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the userdesk API!",
        "version": API_VERSION,
        "docs": "/api/v1/docs",
        "health": "/api/v1/health",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "userdesk API is running",
    }))
}

async fn docs() -> Json<Value> {
    Json(json!({
        "title": "userdesk API",
        "version": API_VERSION,
        "description": "User record management",
        "endpoints": {
            "users": [
                { "method": "POST", "path": "/api/v1/users", "description": "Create a new user" },
                { "method": "GET", "path": "/api/v1/users", "description": "List users with pagination (page, size, search, status)" },
                { "method": "GET", "path": "/api/v1/users/{id}", "description": "Get user by ID" },
                { "method": "PUT", "path": "/api/v1/users/{id}", "description": "Update user" },
                { "method": "DELETE", "path": "/api/v1/users/{id}", "description": "Delete user" },
            ],
            "health": [
                { "method": "GET", "path": "/api/v1/health", "description": "Health check" },
            ],
        },
    }))
}

pub async fn serve(app: Router, bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr.parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
