//! Connection manager: realtime WebSocket listener.

pub mod connection;
pub mod protocol;
pub mod tls;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State, WebSocketUpgrade};
use axum::http::Method;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::assistant::{AssistantBackend, OpenAiAssistants};
use crate::config::{ErrorReporting, RelayConfig};
use crate::error::{RelayError, Result};
use crate::gateway::ApiClient;
use crate::session::{ConnectionInfo, EventSink, Session};
use crate::tools::{ToolDispatcher, ToolRegistry};

/// Process-wide collaborators shared by every connection.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn AssistantBackend>,
    pub dispatcher: ToolDispatcher,
    pub assistant_id: Arc<str>,
    pub error_reporting: ErrorReporting,
}

impl AppState {
    /// Wire the assistant client and backend gateway from configuration.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let backend = OpenAiAssistants::new(&config.assistant, config.proxy.as_ref())?;
        let gateway = ApiClient::new(&config.gateway)?;
        let dispatcher = ToolDispatcher::new(ToolRegistry::builtin(Arc::new(gateway)));
        info!(tools = ?dispatcher.registry().names(), "tools registered");
        Ok(Self {
            backend: Arc::new(backend),
            dispatcher,
            assistant_id: config.assistant.assistant_id.as_str().into(),
            error_reporting: config.error_reporting,
        })
    }

    /// A fresh session bound to `connection`.
    pub fn session(&self, connection: ConnectionInfo, sink: EventSink) -> Session {
        Session::builder()
            .connection(connection)
            .backend(self.backend.clone())
            .dispatcher(self.dispatcher.clone())
            .assistant_id(self.assistant_id.as_ref())
            .sink(sink)
            .error_reporting(self.error_reporting)
            .build()
    }
}

/// Handshake parameters supplied by the client.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeParams {
    pub server_id: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/socket", get(socket_upgrade))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn socket_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<HandshakeParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let info = ConnectionInfo::new(addr.ip().to_string(), params.server_id);
    ws.on_upgrade(move |socket| connection::run(socket, info, state))
}

/// Bind the listener and serve until the process stops.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let addr: SocketAddr = config.bind_address().parse().map_err(|e| {
        RelayError::Configuration(format!("invalid listen address {}: {e}", config.bind_address()))
    })?;
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

    match &config.tls {
        Some(tls) => {
            let rustls = tls::load_rustls_config(tls).await?;
            info!("Server running at wss://{addr}");
            axum_server::bind_rustls(addr, rustls).serve(app).await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            info!("Server running at ws://{addr}");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
