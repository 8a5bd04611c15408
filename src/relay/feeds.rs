use ractor::ActorRef;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vectorshop_schema::RelayEvent;

use super::{RelayHandle, actor::RelayMessage};
use crate::error::ProviderError;
use crate::store::{leaderboard, notifications};
use crate::supabase::{ChangeFilter, RealtimeClient, SupabaseClient};

const LEADERBOARD_CHANNEL: &str = "leaderboard";

/// Where feeds read change events and follow-up rows from.
#[derive(Clone)]
pub struct FeedSource {
    client: SupabaseClient,
    realtime: RealtimeClient,
}

impl FeedSource {
    pub fn new(client: SupabaseClient) -> Result<Self, ProviderError> {
        let realtime = client.realtime()?;
        Ok(Self { client, realtime })
    }
}

pub(super) fn notification_channel(user_id: &str) -> (String, Vec<ChangeFilter>) {
    (
        format!("notifications:{user_id}"),
        vec![
            ChangeFilter::inserts(notifications::TABLE)
                .with_filter(format!("send_to_user_id=eq.{user_id}")),
        ],
    )
}

/// Pushes every notification inserted for `user_id` to that user's sockets.
/// Aborting the task drops the subscription, which leaves the channel.
pub(super) fn spawn_notification_feed(
    source: FeedSource,
    user_id: String,
    relay: ActorRef<RelayMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (channel, filters) = notification_channel(&user_id);
        let mut subscription = source.realtime.subscribe(&channel, filters);
        debug!(user_id = %user_id, "Notification feed started");

        while let Some(change) = subscription.recv().await {
            let event = match notifications::to_event(&source.client, change.record).await {
                Ok(event) => event,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Skipping malformed notification row");
                    continue;
                }
            };
            if ractor::cast!(relay, RelayMessage::Deliver(user_id.clone(), event)).is_err() {
                break;
            }
        }
    })
}

/// Recomputes and broadcasts the leaderboard whenever either player table changes.
/// Bursts of changes that arrive while a recompute is running collapse into one.
pub fn spawn_leaderboard_feed(source: FeedSource, relay: RelayHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let filters = vec![
            ChangeFilter::all(leaderboard::USERS_TABLE),
            ChangeFilter::all(leaderboard::TEMPORARY_TABLE),
        ];
        let mut subscription = source.realtime.subscribe(LEADERBOARD_CHANNEL, filters);

        while let Some(change) = subscription.recv().await {
            let mut coalesced = 0usize;
            while subscription.try_recv().is_some() {
                coalesced += 1;
            }
            debug!(table = %change.table, kind = ?change.kind, coalesced, "Leaderboard changed");

            match leaderboard::load(&source.client).await {
                Ok(entries) => relay.broadcast(RelayEvent::LeaderboardUpdate(entries)),
                Err(e) => warn!(error = %e, "Leaderboard recompute failed"),
            }
        }
    })
}
