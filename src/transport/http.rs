//! HTTP transport: `POST /mcp` with `{"tool": ..., "params": {...}}`.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::tools::Dispatcher;
use crate::types::{Envelope, InvocationRequest};

pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/mcp", post(invoke))
        .route("/health", get(health))
        .with_state(dispatcher)
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serve until `shutdown` is cancelled. In-flight requests finish first.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    info!(%addr, tools = dispatcher.registry().len(), "HTTP transport listening");

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("HTTP transport stopped");
    Ok(())
}

async fn invoke(
    State(dispatcher): State<Dispatcher>,
    payload: Result<Json<InvocationRequest>, JsonRejection>,
) -> (StatusCode, Json<Envelope>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "rejected malformed request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(Envelope::error(rejection.body_text())),
            );
        }
    };

    debug!(tool = %request.tool, "http invocation");
    let result = dispatcher.handle(&request).await;
    (StatusCode::OK, Json(result.into()))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
