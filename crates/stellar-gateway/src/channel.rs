//! Real-time channel: binds a connection to an identity and relays pipeline
//! events.
//!
//! The transport (WebSocket loop in `server`) owns the socket; this module
//! only decides what each event does, so it can be driven directly in tests.

use crate::delivery::{ConnectionId, DeliveryHub, EventSender};
use crate::protocol::{
    ClientEvent, EMPTY_MESSAGE, ERROR_INITIALIZING_CHAT, ERROR_PROCESSING_MESSAGE,
    NO_ACTIVE_CHAT_SESSION, NO_ACTIVE_SESSION_FOUND, ServerEvent,
};
use std::sync::Arc;
use stellar_application::MessagePipeline;
use stellar_core::auth::{AuthError, AuthGate, Identity};
use stellar_core::error::StellarError;
use stellar_core::session::SessionManager;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Lifecycle of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    Bound(Identity),
    Closed,
}

/// Per-connection state held by the transport loop.
pub struct ChannelConnection {
    id: ConnectionId,
    state: ConnectionState,
    outbound: EventSender,
    /// Inbound texts, processed in arrival order by a detached worker
    inbound: Option<mpsc::UnboundedSender<String>>,
    worker: Option<JoinHandle<()>>,
}

impl ChannelConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    fn identity(&self) -> Option<&Identity> {
        match &self.state {
            ConnectionState::Bound(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Drives connections through `Unauthenticated -> Bound -> Closed`.
pub struct RealtimeChannel {
    auth_gate: Arc<AuthGate>,
    session_manager: Arc<SessionManager>,
    pipeline: Arc<MessagePipeline>,
    hub: Arc<DeliveryHub>,
}

impl RealtimeChannel {
    pub fn new(
        auth_gate: Arc<AuthGate>,
        session_manager: Arc<SessionManager>,
        pipeline: Arc<MessagePipeline>,
        hub: Arc<DeliveryHub>,
    ) -> Self {
        Self {
            auth_gate,
            session_manager,
            pipeline,
            hub,
        }
    }

    pub fn hub(&self) -> &Arc<DeliveryHub> {
        &self.hub
    }

    /// Verifies the handshake credential. A failure means the connection is
    /// refused and never reaches `Bound`.
    pub fn handshake(&self, credential: Option<&str>) -> Result<Identity, AuthError> {
        self.auth_gate.verify_credential(credential)
    }

    /// Creates a connection bound to `identity`.
    ///
    /// History is not replayed until the peer sends `initialize`.
    pub fn open(&self, identity: Identity, outbound: EventSender) -> ChannelConnection {
        let id = Uuid::new_v4();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(
            self.pipeline.clone(),
            self.hub.clone(),
            identity.clone(),
            id,
            outbound.clone(),
            inbound_rx,
        ));

        tracing::info!(user_id = %identity, connection_id = %id, "Connection bound");
        ChannelConnection {
            id,
            state: ConnectionState::Bound(identity),
            outbound,
            inbound: Some(inbound_tx),
            worker: Some(worker),
        }
    }

    /// Applies one peer event and returns the immediate reply, if any.
    ///
    /// Advisor replies are not returned here; they arrive later on the
    /// connection's outbound sender through the delivery group.
    pub async fn handle_event(
        &self,
        connection: &mut ChannelConnection,
        event: ClientEvent,
    ) -> Option<ServerEvent> {
        let identity = connection.identity()?.clone();

        match event {
            ClientEvent::Ping => Some(ServerEvent::Pong),
            ClientEvent::Initialize => Some(self.initialize(connection, &identity).await),
            ClientEvent::Message { text } => {
                if text.trim().is_empty() {
                    return Some(ServerEvent::error(EMPTY_MESSAGE));
                }
                let queued = connection
                    .inbound
                    .as_ref()
                    .is_some_and(|inbound| inbound.send(text).is_ok());
                if queued {
                    None
                } else {
                    Some(ServerEvent::error(ERROR_PROCESSING_MESSAGE))
                }
            }
        }
    }

    async fn initialize(&self, connection: &ChannelConnection, identity: &Identity) -> ServerEvent {
        match self.session_manager.get_active_session(identity).await {
            Ok(session) => {
                self.hub
                    .join(identity, connection.id, connection.outbound.clone())
                    .await;
                tracing::debug!(
                    user_id = %identity,
                    session_id = %session.id(),
                    messages = session.history().len(),
                    "Replaying history"
                );
                ServerEvent::History {
                    messages: session.history().to_vec(),
                }
            }
            Err(StellarError::NoActiveSession) => ServerEvent::error(NO_ACTIVE_SESSION_FOUND),
            Err(e) => {
                tracing::error!(user_id = %identity, error = %e, "Failed to initialize chat");
                ServerEvent::error(ERROR_INITIALIZING_CHAT)
            }
        }
    }

    /// Moves the connection to `Closed` and removes it from its group.
    ///
    /// Queued messages keep being processed and persisted; their delivery to
    /// this connection is dropped. Returns the worker handle so callers can
    /// wait for in-flight work.
    pub async fn close(&self, connection: &mut ChannelConnection) -> Option<JoinHandle<()>> {
        if let ConnectionState::Bound(identity) = &connection.state {
            self.hub.leave(identity, connection.id).await;
            tracing::info!(user_id = %identity, connection_id = %connection.id, "Connection closed");
        }
        connection.state = ConnectionState::Closed;
        connection.inbound = None;
        connection.worker.take()
    }
}

async fn run_worker(
    pipeline: Arc<MessagePipeline>,
    hub: Arc<DeliveryHub>,
    identity: Identity,
    connection_id: ConnectionId,
    outbound: EventSender,
    mut inbound: mpsc::UnboundedReceiver<String>,
) {
    while let Some(text) = inbound.recv().await {
        match pipeline.handle_inbound_for(&identity, &text).await {
            Ok(reply) => {
                hub.deliver(&identity, (connection_id, &outbound), reply.into())
                    .await;
            }
            Err(e) => {
                let message = match e {
                    StellarError::NoActiveSession => NO_ACTIVE_CHAT_SESSION,
                    StellarError::InvalidInput(_) => EMPTY_MESSAGE,
                    other => {
                        tracing::error!(user_id = %identity, error = %other, "Failed to process message");
                        ERROR_PROCESSING_MESSAGE
                    }
                };
                if outbound.try_send(ServerEvent::error(message)).is_err() {
                    tracing::debug!(connection_id = %connection_id, "Error event dropped");
                }
            }
        }
    }
}
