use backon::{BackoffBuilder, ExponentialBuilder};
use futures::{SinkExt, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{MissedTickBehavior, timeout},
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::protocol::{self, ChangeFilter, ChangeRecord, Inbound, PhoenixMessage};
use crate::error::ProviderError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CHANGE_BUFFER: usize = 64;

/// Opens Realtime channels for one project.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    endpoint: Url,
    access_token: Arc<str>,
    heartbeat: Duration,
}

impl RealtimeClient {
    pub fn new(base: &Url, anon_key: &str, heartbeat: Duration) -> Result<Self, ProviderError> {
        let mut endpoint = base.join("realtime/v1/websocket")?;
        let scheme = match endpoint.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        endpoint
            .set_scheme(scheme)
            .map_err(|()| ProviderError::Realtime(format!("cannot use {base} for websockets")))?;
        endpoint
            .query_pairs_mut()
            .append_pair("apikey", anon_key)
            .append_pair("vsn", "1.0.0");

        Ok(Self {
            endpoint,
            access_token: Arc::from(anon_key),
            heartbeat,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Joins `realtime:<channel>` with the given bindings. The channel is kept
    /// alive (and re-joined after disconnects) until the [`Subscription`] is
    /// dropped or closed.
    pub fn subscribe(&self, channel: &str, filters: Vec<ChangeFilter>) -> Subscription {
        let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = ChannelWorker {
            endpoint: self.endpoint.clone(),
            access_token: self.access_token.clone(),
            heartbeat: self.heartbeat,
            topic: protocol::topic(channel),
            filters,
            tx,
            next_ref: 0,
        };
        let task = tokio::spawn(worker.run(shutdown_rx));

        Subscription {
            rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Receiving end of a joined channel. Dropping it leaves the channel.
pub struct Subscription {
    rx: mpsc::Receiver<ChangeRecord>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<ChangeRecord> {
        self.rx.recv().await
    }

    /// A change that has already arrived, if any.
    pub fn try_recv(&mut self) -> Option<ChangeRecord> {
        self.rx.try_recv().ok()
    }

    /// Leaves the channel and waits for the socket to be closed.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

enum SessionEnd {
    /// Consumer went away; do not reconnect.
    Stopped,
    /// Socket lost after a successful join.
    Dropped,
}

struct ChannelWorker {
    endpoint: Url,
    access_token: Arc<str>,
    heartbeat: Duration,
    topic: String,
    filters: Vec<ChangeFilter>,
    tx: mpsc::Sender<ChangeRecord>,
    next_ref: u64,
}

impl ChannelWorker {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let policy = reconnect_policy();
        let mut backoff = policy.build();

        loop {
            match self.session(&mut shutdown).await {
                Ok(SessionEnd::Stopped) => break,
                Ok(SessionEnd::Dropped) => {
                    info!(topic = %self.topic, "Realtime channel dropped, reconnecting");
                    backoff = policy.build();
                }
                Err(e) => {
                    warn!(topic = %self.topic, error = %e, "Realtime channel failed");
                }
            }

            let delay = backoff.next().unwrap_or(Duration::from_secs(30));
            debug!(topic = %self.topic, ?delay, "Waiting before re-joining");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => break,
            }
        }

        debug!(topic = %self.topic, "Realtime channel closed");
    }

    async fn session(
        &mut self,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> Result<SessionEnd, ProviderError> {
        let (ws, _) = timeout(CONNECT_TIMEOUT, connect_async(self.endpoint.as_str()))
            .await
            .map_err(|_| ProviderError::Realtime("connect timed out".to_string()))??;
        let (mut write, mut read) = ws.split();

        let join_ref = self.reference();
        let join = protocol::join(&self.topic, &self.filters, &self.access_token, join_ref);
        write.send(encode(&join)?).await?;
        let join_ref = join_ref.to_string();
        let mut joined = false;

        let mut heartbeat = tokio::time::interval(self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = &mut *shutdown => {
                    let leave_ref = self.reference();
                    let leave = protocol::leave(&self.topic, leave_ref);
                    let _ = write.send(encode(&leave)?).await;
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Stopped);
                }
                _ = heartbeat.tick() => {
                    let beat = protocol::heartbeat(self.reference());
                    write.send(encode(&beat)?).await?;
                }
                frame = read.next() => {
                    let message = match frame {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(SessionEnd::Dropped),
                    };
                    match message {
                        Message::Text(text) => {
                            let msg: PhoenixMessage = match serde_json::from_str(text.as_str()) {
                                Ok(msg) => msg,
                                Err(e) => {
                                    debug!(error = %e, "Skipping undecodable realtime frame");
                                    continue;
                                }
                            };
                            match protocol::classify(msg, &self.topic, Some(&join_ref)) {
                                Inbound::Change(change) => {
                                    if self.tx.send(change).await.is_err() {
                                        return Ok(SessionEnd::Stopped);
                                    }
                                }
                                Inbound::JoinOk => {
                                    joined = true;
                                    info!(topic = %self.topic, "Realtime channel joined");
                                }
                                Inbound::JoinError(reason) => {
                                    return Err(ProviderError::Realtime(reason));
                                }
                                Inbound::Closed(event) => {
                                    debug!(topic = %self.topic, %event, "Channel closed by server");
                                    return if joined {
                                        Ok(SessionEnd::Dropped)
                                    } else {
                                        Err(ProviderError::Realtime(event))
                                    };
                                }
                                Inbound::Ignored => {}
                            }
                        }
                        Message::Ping(data) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Message::Close(frame) => {
                            debug!(?frame, "Realtime server closed the socket");
                            return Ok(SessionEnd::Dropped);
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn reference(&mut self) -> u64 {
        self.next_ref += 1;
        self.next_ref
    }
}

fn encode(msg: &PhoenixMessage) -> Result<Message, ProviderError> {
    Ok(Message::Text(serde_json::to_string(msg)?.into()))
}

fn reconnect_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(30))
        .with_jitter()
        .without_max_times()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::realtime::ChangeEvent;
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    #[test]
    fn endpoint_switches_to_websocket_scheme() {
        let base = Url::parse("https://demo.supabase.co/").unwrap();
        let client = RealtimeClient::new(&base, "anon", Duration::from_secs(25)).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );

        let local = Url::parse("http://127.0.0.1:54321/").unwrap();
        let client = RealtimeClient::new(&local, "k", Duration::from_secs(25)).unwrap();
        assert_eq!(client.endpoint().scheme(), "ws");
    }

    #[tokio::test]
    async fn joined_channel_forwards_changes_and_leaves_on_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<Value>();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            while let Some(Ok(frame)) = ws.next().await {
                let Message::Text(text) = frame else { continue };
                let msg: Value = serde_json::from_str(text.as_str()).unwrap();
                let _ = seen_tx.send(msg.clone());

                if msg["event"] == "phx_join" {
                    let reply = json!({
                        "topic": msg["topic"],
                        "event": "phx_reply",
                        "payload": {"status": "ok", "response": {}},
                        "ref": msg["ref"],
                    });
                    ws.send(Message::Text(reply.to_string().into())).await.unwrap();

                    let change = json!({
                        "topic": msg["topic"],
                        "event": "postgres_changes",
                        "payload": {"data": {
                            "table": "notifications",
                            "type": "INSERT",
                            "record": {"id": 1, "notif_title": "Hi"}
                        }},
                        "ref": null,
                    });
                    ws.send(Message::Text(change.to_string().into())).await.unwrap();
                }
            }
        });

        let base = Url::parse(&format!("http://{addr}/")).unwrap();
        let client = RealtimeClient::new(&base, "anon", Duration::from_secs(25)).unwrap();
        let mut sub = client.subscribe(
            "notifications:u1",
            vec![ChangeFilter::inserts("notifications").with_filter("send_to_user_id=eq.u1")],
        );

        let change = timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.kind, ChangeEvent::Insert);
        assert_eq!(change.record.get("notif_title"), Some(&json!("Hi")));

        let join = seen_rx.recv().await.unwrap();
        assert_eq!(join["topic"], "realtime:notifications:u1");
        assert_eq!(
            join["payload"]["config"]["postgres_changes"][0]["filter"],
            "send_to_user_id=eq.u1"
        );

        sub.close().await;
        let leave = timeout(Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(leave["event"], "phx_leave");
    }
}
