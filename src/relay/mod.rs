//! Fan-out of backend change events to browser WebSocket connections.

mod actor;
mod feeds;

pub use actor::{ConnectionId, RelayMessage, RelayStats};
pub use feeds::{FeedSource, spawn_leaderboard_feed};

use ractor::{Actor, ActorRef};
use tokio::sync::mpsc;
use vectorshop_schema::RelayEvent;

use crate::error::RelayError;

#[derive(Clone)]
pub struct RelayHandle {
    actor: ActorRef<RelayMessage>,
}

impl RelayHandle {
    pub async fn attach(
        &self,
        user_id: String,
        outbox: mpsc::Sender<RelayEvent>,
    ) -> Result<ConnectionId, RelayError> {
        ractor::call!(self.actor, RelayMessage::Attach, user_id, outbox)
            .map_err(|e| RelayError::Rpc(format!("RelayActor Attach RPC failed: {e}")))
    }

    pub fn detach(&self, id: ConnectionId) {
        let _ = ractor::cast!(self.actor, RelayMessage::Detach(id));
    }

    pub fn deliver(&self, user_id: String, event: RelayEvent) {
        let _ = ractor::cast!(self.actor, RelayMessage::Deliver(user_id, event));
    }

    pub fn broadcast(&self, event: RelayEvent) {
        let _ = ractor::cast!(self.actor, RelayMessage::Broadcast(event));
    }

    pub async fn stats(&self) -> Result<RelayStats, RelayError> {
        ractor::call!(self.actor, RelayMessage::Stats)
            .map_err(|e| RelayError::Rpc(format!("RelayActor Stats RPC failed: {e}")))
    }
}

/// Starts the relay. Without a feed source sockets are tracked but no
/// notification feeds are opened.
pub async fn spawn(source: Option<FeedSource>) -> Result<RelayHandle, RelayError> {
    let (actor, _jh) = Actor::spawn(None, actor::RelayActor, source)
        .await
        .map_err(|e| RelayError::Spawn(e.to_string()))?;
    Ok(RelayHandle { actor })
}
