//! HTTP surface for push refresh notifications.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use chrono::Utc;
use tokio::task::JoinHandle;

use super::tracker::{track, WebhookRequest};
use crate::cache::SettingsCache;
use crate::error::WebhookError;
use crate::models::Store;
use crate::traits::RefreshSink;
use crate::watcher::RefreshEvent;

/// Shared state for the webhook handler.
#[derive(Clone)]
pub struct WebhookServerState {
    pub stores: Arc<Vec<Store>>,
    pub cache: Arc<SettingsCache>,
    pub sink: Arc<dyn RefreshSink>,
    /// Domain used to derive store endpoints from topics, e.g. `azconfig.io`.
    pub domain: String,
}

impl std::fmt::Debug for WebhookServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookServerState")
            .field("stores", &self.stores.len())
            .field("domain", &self.domain)
            .finish()
    }
}

pub fn router(state: WebhookServerState) -> Router {
    Router::new()
        .route("/", post(refresh_handler))
        .with_state(state)
}

/// Start the webhook server on a specific address.
///
/// Bind to port 0 to get a random port; the actual address is returned.
pub async fn start_webhook_server_on(
    addr: SocketAddr,
    state: WebhookServerState,
) -> color_eyre::Result<(JoinHandle<()>, SocketAddr)> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Webhook server listening on http://{}", actual_addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Webhook server error: {}", e);
        }
    });

    Ok((handle, actual_addr))
}

async fn refresh_handler(
    State(state): State<WebhookServerState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> impl IntoResponse {
    handle_notification(&state, &params, &body).await
}

/// Process one notification and produce the HTTP status and body.
pub async fn handle_notification(
    state: &WebhookServerState,
    params: &HashMap<String, String>,
    body: &[u8],
) -> (StatusCode, String) {
    let request = match WebhookRequest::parse(body) {
        Ok(request) => request,
        Err(err) => return rejection(err),
    };

    let auth = match track(&request, params, &state.stores, &state.domain) {
        Ok(auth) => auth,
        Err(err) => {
            tracing::warn!(topic = %request.topic, "Rejected push notification: {}", err);
            return rejection(err);
        }
    };

    if let Some(code) = request.validation_code {
        tracing::info!(store = %auth.store.name, "Webhook subscription validated");
        let body = serde_json::json!({ "validationResponse": code });
        return (StatusCode::OK, body.to_string());
    }

    match auth.matched_trigger {
        Some(trigger) => {
            let expired = state.cache.expire_store(&auth.store.name);
            tracing::info!(
                store = %auth.store.name,
                expired,
                "Push notification matched trigger {}",
                trigger
            );
            let event = RefreshEvent::from_webhook(&auth.store.name, trigger.to_string(), Utc::now());
            state.sink.notify(event).await;
        }
        None => {
            tracing::debug!(
                store = %auth.store.name,
                key = ?request.key,
                label = ?request.label,
                "Push notification matched no trigger"
            );
        }
    }

    (StatusCode::OK, "OK".to_string())
}

fn rejection(err: WebhookError) -> (StatusCode, String) {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
    let body = match err {
        WebhookError::Unauthorized => "Unauthorized".to_string(),
        other => other.to_string(),
    };
    (status, body)
}
