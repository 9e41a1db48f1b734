use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use tower_http::limit::RequestBodyLimitLayer;
use webhook_core::{
    Fulfiller, FulfillmentResponse, IntentRequest, fulfillment::NOT_UNDERSTOOD_TEXT,
};

pub const LIVENESS_TEXT: &str = "Webhook-tjenesten kjører.";

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub fulfiller: Arc<Fulfiller>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/webhook", post(handle_webhook))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// GET / — liveness check.
async fn handle_root() -> &'static str {
    LIVENESS_TEXT
}

/// POST /webhook — always answers 200 with a fulfillment text. A body that
/// does not parse is answered like an unrecognised intent.
async fn handle_webhook(State(state): State<AppState>, body: Bytes) -> Json<FulfillmentResponse> {
    let request: IntentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "Unparsable webhook body");
            return Json(FulfillmentResponse::new(NOT_UNDERSTOOD_TEXT));
        }
    };

    Json(state.fulfiller.fulfill(&request).await)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
