use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use vectorshop_schema::RelayEvent;

use super::feeds::{self, FeedSource};

/// Identifies one browser socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ws-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub connections: usize,
    pub users: usize,
    pub feeds: usize,
}

#[derive(Debug)]
pub enum RelayMessage {
    /// Register a socket of `user_id`; events for that user go to the outbox.
    Attach(String, mpsc::Sender<RelayEvent>, RpcReplyPort<ConnectionId>),

    /// Forget a socket. The user's feed stops with their last socket.
    Detach(ConnectionId),

    /// Event for every socket of one user.
    Deliver(String, RelayEvent),

    /// Event for every socket.
    Broadcast(RelayEvent),

    Stats(RpcReplyPort<RelayStats>),
}

struct Connection {
    user_id: String,
    outbox: mpsc::Sender<RelayEvent>,
}

pub(super) struct RelayState {
    next_id: u64,
    connections: HashMap<ConnectionId, Connection>,
    feeds: HashMap<String, JoinHandle<()>>,
    source: Option<FeedSource>,
}

impl RelayState {
    fn sockets_of<'a>(
        &'a self,
        user_id: &'a str,
    ) -> impl Iterator<Item = (&'a ConnectionId, &'a Connection)> {
        self.connections
            .iter()
            .filter(move |(_, conn)| conn.user_id == user_id)
    }

    fn users(&self) -> usize {
        let mut users: Vec<&str> = self
            .connections
            .values()
            .map(|c| c.user_id.as_str())
            .collect();
        users.sort_unstable();
        users.dedup();
        users.len()
    }
}

pub(super) struct RelayActor;

#[ractor::async_trait]
impl Actor for RelayActor {
    type Msg = RelayMessage;
    type State = RelayState;
    type Arguments = Option<FeedSource>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        source: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(feeds = source.is_some(), "RelayActor initialized");
        Ok(RelayState {
            next_id: 0,
            connections: HashMap::new(),
            feeds: HashMap::new(),
            source,
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        for (_, feed) in state.feeds.drain() {
            feed.abort();
        }
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RelayMessage::Attach(user_id, outbox, reply) => {
                state.next_id += 1;
                let id = ConnectionId(state.next_id);

                if !state.feeds.contains_key(&user_id)
                    && let Some(source) = &state.source
                {
                    let feed = feeds::spawn_notification_feed(
                        source.clone(),
                        user_id.clone(),
                        myself.clone(),
                    );
                    state.feeds.insert(user_id.clone(), feed);
                }

                info!(connection = %id, user_id = %user_id, "WebSocket client attached");
                state.connections.insert(id, Connection { user_id, outbox });
                let _ = reply.send(id);
            }

            RelayMessage::Detach(id) => {
                let Some(conn) = state.connections.remove(&id) else {
                    return Ok(());
                };
                info!(connection = %id, user_id = %conn.user_id, "WebSocket client detached");

                let last_socket = state.sockets_of(&conn.user_id).next().is_none();
                if last_socket && let Some(feed) = state.feeds.remove(&conn.user_id) {
                    debug!(user_id = %conn.user_id, "Stopping notification feed");
                    feed.abort();
                }
            }

            RelayMessage::Deliver(user_id, event) => {
                for (id, conn) in state.sockets_of(&user_id) {
                    push(*id, conn, event.clone());
                }
            }

            RelayMessage::Broadcast(event) => {
                for (id, conn) in &state.connections {
                    push(*id, conn, event.clone());
                }
            }

            RelayMessage::Stats(reply) => {
                let _ = reply.send(RelayStats {
                    connections: state.connections.len(),
                    users: state.users(),
                    feeds: state.feeds.len(),
                });
            }
        }
        Ok(())
    }
}

/// Best-effort hand-off to a socket task; slow or closed sockets lose the event.
fn push(id: ConnectionId, conn: &Connection, event: RelayEvent) {
    match conn.outbox.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(connection = %id, user_id = %conn.user_id, "Outbox full, event dropped");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(connection = %id, "Outbox closed, event dropped");
        }
    }
}
