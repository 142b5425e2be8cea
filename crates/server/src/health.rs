use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use bonusbot_core::Conversation;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    conversation: Arc<dyn Conversation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(conversation: Arc<dyn Conversation>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { conversation })
}

/// Handle to the running health endpoint.
pub struct HealthServer {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl HealthServer {
    /// Stops accepting connections and waits up to `grace` for open requests.
    /// Returns `false` when the grace period ran out first.
    pub async fn shutdown(self, grace: Duration) -> bool {
        if self.shutdown.send(()).is_err() {
            return true;
        }
        tokio::time::timeout(grace, self.task).await.is_ok()
    }
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    conversation: Arc<dyn Conversation>,
) -> std::io::Result<HealthServer> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    let (shutdown, signal) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let server =
            axum::serve(listener, router(conversation)).with_graceful_shutdown(async move {
                let _ = signal.await;
            });
        if let Err(error) = server.await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(HealthServer { shutdown, task })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "bonusbot-server runtime initialized".to_string(),
        },
        active_sessions: state.conversation.active_sessions().await,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
