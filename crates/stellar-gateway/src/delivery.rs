//! Per-identity delivery groups.

use crate::protocol::ServerEvent;
use std::collections::HashMap;
use stellar_core::auth::Identity;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

pub type ConnectionId = Uuid;
pub type EventSender = mpsc::Sender<ServerEvent>;

/// Routes outbound events to every live connection of an identity.
#[derive(Default)]
pub struct DeliveryHub {
    groups: RwLock<HashMap<Identity, HashMap<ConnectionId, EventSender>>>,
}

impl DeliveryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the group of `identity`. Rejoining is a no-op.
    pub async fn join(&self, identity: &Identity, connection_id: ConnectionId, sender: EventSender) {
        let mut groups = self.groups.write().await;
        groups
            .entry(identity.clone())
            .or_default()
            .entry(connection_id)
            .or_insert(sender);
    }

    pub async fn leave(&self, identity: &Identity, connection_id: ConnectionId) {
        let mut groups = self.groups.write().await;
        if let Some(group) = groups.get_mut(identity) {
            group.remove(&connection_id);
            if group.is_empty() {
                groups.remove(identity);
            }
        }
    }

    pub async fn group_size(&self, identity: &Identity) -> usize {
        let groups = self.groups.read().await;
        groups.get(identity).map_or(0, HashMap::len)
    }

    /// Sends `event` to the group of `identity` and to the originating
    /// connection, which is included even if it never joined.
    ///
    /// Never waits on a recipient: a connection whose outbound queue is full
    /// misses this event, and a closed connection is removed from the group.
    /// Returns the number of connections that accepted the event.
    pub async fn deliver(
        &self,
        identity: &Identity,
        origin: (ConnectionId, &EventSender),
        event: ServerEvent,
    ) -> usize {
        let (origin_id, origin_sender) = origin;
        let recipients: Vec<(ConnectionId, EventSender)> = {
            let groups = self.groups.read().await;
            let group = groups.get(identity);
            let mut recipients: Vec<(ConnectionId, EventSender)> = group
                .map(|group| group.iter().map(|(id, tx)| (*id, tx.clone())).collect())
                .unwrap_or_default();
            if !group.is_some_and(|group| group.contains_key(&origin_id)) {
                recipients.push((origin_id, origin_sender.clone()));
            }
            recipients
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (connection_id, recipient) in recipients {
            match recipient.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        user_id = %identity,
                        connection_id = %connection_id,
                        "Outbound queue full, event dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(connection_id),
            }
        }

        if !closed.is_empty() {
            let mut groups = self.groups.write().await;
            if let Some(group) = groups.get_mut(identity) {
                for connection_id in &closed {
                    group.remove(connection_id);
                }
                if group.is_empty() {
                    groups.remove(identity);
                }
            }
        }
        if delivered == 0 {
            tracing::debug!(user_id = %identity, "No live connection, delivery dropped");
        }
        delivered
    }
}
