use crate::auth::{AuthenticatedUser, extract_credential};
use crate::error::ApiError;
use crate::protocol::{ClientEvent, INVALID_FRAME, ServerEvent};
use crate::state::AppState;
use anyhow::{Context, bail};
use axum::Router;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Json as JsonExtract, Query, State, WebSocketUpgrade};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stellar_core::auth::Identity;
use stellar_core::config::ServerConfig;
use stellar_core::session::{Message, ProfileParams, Session, SessionStatus};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

const OUTBOUND_BUFFER: usize = 64;

/// Binds `config.host:config.port` and serves until Ctrl-C.
pub async fn serve(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state).layer(cors_layer(&config.allowed_origin)?);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// CORS for a single browser origin, with credentials.
pub fn cors_layer(allowed_origin: &str) -> anyhow::Result<CorsLayer> {
    if allowed_origin.trim() == "*" {
        bail!("server.allowed_origin must be an explicit origin when credentials are allowed");
    }
    let origin: HeaderValue = allowed_origin
        .parse()
        .with_context(|| format!("Invalid server.allowed_origin '{allowed_origin}'"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/start-session", post(start_session_handler))
        .route("/start-chat", post(start_session_handler))
        .route("/session", get(active_session_handler))
        .route("/ws", get(ws_upgrade_handler))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// HTTP handlers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "stellar-gateway",
    })
}

async fn root_handler(AuthenticatedUser(identity): AuthenticatedUser) -> &'static str {
    debug!(user_id = %identity, "Liveness check");
    "Server is running"
}

#[derive(Debug, Deserialize)]
struct StartSessionRequest {
    #[serde(default, alias = "dob")]
    date: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    place: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionResponse {
    message: &'static str,
    session_id: String,
}

async fn start_session_handler(
    AuthenticatedUser(identity): AuthenticatedUser,
    State(state): State<AppState>,
    JsonExtract(body): JsonExtract<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let params = ProfileParams::new(body.date, body.time, body.place);
    let session_id = state
        .session_manager()
        .start_session(&identity, params, body.name)
        .await?;

    Ok(Json(StartSessionResponse {
        message: "Chat session started!",
        session_id,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    id: String,
    user_id: Identity,
    status: SessionStatus,
    profile_params: ProfileParams,
    profile_snapshot: serde_json::Value,
    history: Vec<Message>,
    created_at: DateTime<Utc>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        Self {
            id: session.id().to_string(),
            user_id: session.owner_id().clone(),
            status: session.status(),
            profile_params: session.profile_params().clone(),
            profile_snapshot: session.profile_snapshot().clone(),
            history: session.history().to_vec(),
            created_at: session.created_at(),
        }
    }
}

async fn active_session_handler(
    AuthenticatedUser(identity): AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.session_manager().get_active_session(&identity).await?;
    Ok(Json(session.into()))
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Authenticates the handshake, then upgrades. Rejected handshakes never
/// reach the channel.
async fn ws_upgrade_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let credential = extract_credential(&headers, state.cookie_name(), query.token.as_deref());
    let identity = match state.channel().handshake(credential.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "WebSocket handshake rejected");
            return ApiError::from(e).into_response();
        }
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_ws(socket, state, identity)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Runs one connection: peer frames go through the channel, deliveries
/// arrive on the per-connection queue.
async fn handle_ws(mut ws: WebSocket, state: AppState, identity: Identity) {
    let channel = state.channel().clone();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER);
    let mut connection = channel.open(identity, outbound_tx);

    loop {
        tokio::select! {
            frame = recv_message(&mut ws) => {
                let Some(Ok(text)) = frame else {
                    break;
                };

                let reply = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => channel.handle_event(&mut connection, event).await,
                    Err(e) => {
                        debug!(error = %e, "Unparseable frame");
                        Some(ServerEvent::error(INVALID_FRAME))
                    }
                };
                if let Some(reply) = reply {
                    if send_event(&mut ws, &reply).await.is_err() {
                        break;
                    }
                }
            }

            Some(event) = outbound_rx.recv() => {
                if send_event(&mut ws, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    channel.close(&mut connection).await;
}

/// Receive the next text frame, skipping pings and binary frames.
async fn recv_message(ws: &mut WebSocket) -> Option<Result<String, ()>> {
    loop {
        match ws.recv().await {
            Some(Ok(WsMessage::Text(text))) => return Some(Ok(text.to_string())),
            Some(Ok(WsMessage::Close(_))) => return Some(Err(())),
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!(error = %e, "WebSocket receive error");
                return Some(Err(()));
            }
            None => return None,
        }
    }
}

async fn send_event(ws: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = serde_json::to_string(event).map_err(|_| ())?;
    ws.send(WsMessage::Text(json.into())).await.map_err(|e| {
        warn!(error = %e, "WebSocket send error");
    })
}
