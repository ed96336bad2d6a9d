//! Cancellable change subscriptions and the websocket task that feeds them.
//!
//! A [`Subscription`] is the consumer end: it yields [`ChangeNotice`]s until
//! it is closed through any of its [`SubscriptionHandle`]s, or dropped. The
//! producer end ([`SubscriptionSink`]) notices the close and stops.

use crate::api::events::{ChangeFilter, ChangeNotice, RealtimeFrame};
use crate::error::ApiError;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const HEARTBEAT_EVERY: Duration = Duration::from_secs(25);

pub struct Subscription {
    handle: SubscriptionHandle,
    events: mpsc::UnboundedReceiver<ChangeNotice>,
}

/// Closes a subscription. Cloneable; closing is idempotent.
#[derive(Clone, Debug)]
pub struct SubscriptionHandle {
    topic: Arc<str>,
    closed: Arc<watch::Sender<bool>>,
}

pub struct SubscriptionSink {
    events: mpsc::UnboundedSender<ChangeNotice>,
    closed: watch::Receiver<bool>,
}

impl Subscription {
    pub fn channel(topic: impl Into<String>) -> (Self, SubscriptionSink) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let handle = SubscriptionHandle {
            topic: Arc::from(topic.into()),
            closed: Arc::new(closed_tx),
        };
        (
            Self { handle, events: rx },
            SubscriptionSink {
                events: tx,
                closed: closed_rx,
            },
        )
    }

    pub fn topic(&self) -> &str {
        &self.handle.topic
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Next change notice, or `None` once closed or the producer is gone.
    pub async fn next(&mut self) -> Option<ChangeNotice> {
        if self.handle.is_closed() {
            return None;
        }
        let mut closed = self.handle.closed.subscribe();
        tokio::select! {
            notice = self.events.recv() => notice,
            _ = wait_closed(&mut closed) => None,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.close();
    }
}

impl SubscriptionHandle {
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        !self.closed.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl SubscriptionSink {
    /// Forwards a notice; `false` once the consumer has gone away.
    pub fn notify(&self, notice: ChangeNotice) -> bool {
        if *self.closed.borrow() {
            return false;
        }
        self.events.send(notice).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.events.is_closed()
    }

    pub async fn closed(&mut self) {
        tokio::select! {
            _ = wait_closed(&mut self.closed) => {}
            _ = self.events.closed() => {}
        }
    }
}

async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Joins `topic` on the realtime socket and forwards matching row changes
/// into `sink` until the subscription is closed or the socket ends.
/// Connects once; there is no reconnect.
pub(crate) fn spawn_channel(
    ws_url: Url,
    topic: String,
    changes: Vec<ChangeFilter>,
    access_token: Option<String>,
    sink: SubscriptionSink,
) {
    tokio::spawn(async move {
        log::debug!("Opening realtime channel {topic}");
        match run_channel(&ws_url, &topic, &changes, access_token.as_deref(), sink).await {
            Ok(()) => log::debug!("Realtime channel {topic} ended"),
            Err(err) => log::warn!("Realtime channel {topic} failed: {err}"),
        }
    });
}

async fn run_channel(
    ws_url: &Url,
    topic: &str,
    changes: &[ChangeFilter],
    access_token: Option<&str>,
    sink: SubscriptionSink,
) -> Result<(), ApiError> {
    let SubscriptionSink { events, mut closed } = sink;
    let (ws_stream, _) = connect_async(ws_url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut next_ref: u64 = 1;
    let join = RealtimeFrame::join(topic, changes, access_token, next_ref);
    write.send(Message::Text(serde_json::to_string(&join)?)).await?;

    let mut heartbeat = tokio::time::interval(HEARTBEAT_EVERY);
    // The first tick fires immediately.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = wait_closed(&mut closed) => {
                next_ref += 1;
                let leave = RealtimeFrame::leave(topic, next_ref);
                let _ = write.send(Message::Text(serde_json::to_string(&leave)?)).await;
                let _ = write.close().await;
                return Ok(());
            }
            _ = events.closed() => {
                let _ = write.close().await;
                return Ok(());
            }
            _ = heartbeat.tick() => {
                next_ref += 1;
                let beat = RealtimeFrame::heartbeat(next_ref);
                write.send(Message::Text(serde_json::to_string(&beat)?)).await?;
            }
            incoming = read.next() => {
                let text = match incoming {
                    None | Some(Ok(Message::Close(_))) => return Ok(()),
                    Some(Err(err)) => return Err(err.into()),
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(_)) => continue,
                };
                let frame: RealtimeFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(err) => {
                        log::debug!("Skipping undecodable realtime frame: {err}");
                        continue;
                    }
                };
                if frame.topic != topic {
                    continue;
                }
                if let Some(reason) = frame.channel_error() {
                    return Err(ApiError::ChannelRejected(reason));
                }
                if let Some(notice) = frame.change_notice() {
                    if events.send(notice).is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::events::ChangeKind;
    use tokio::time::timeout;

    fn notice() -> ChangeNotice {
        ChangeNotice {
            table: "messages".into(),
            kind: ChangeKind::Insert,
        }
    }

    #[tokio::test]
    async fn delivers_until_closed() {
        let (mut sub, sink) = Subscription::channel("unread:u1");
        assert!(sink.notify(notice()));
        assert_eq!(sub.next().await, Some(notice()));

        let handle = sub.handle();
        assert!(handle.close());
        assert!(!handle.close(), "second close is a no-op");
        assert!(sub.is_closed());
        assert!(!sink.notify(notice()));
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn close_wakes_a_pending_next() {
        let (mut sub, _sink) = Subscription::channel("unread:u1");
        let handle = sub.handle();
        let waiter = tokio::spawn(async move { sub.next().await });
        tokio::task::yield_now().await;
        handle.close();
        let got = timeout(Duration::from_millis(200), waiter)
            .await
            .expect("next() should wake on close")
            .unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn dropping_the_subscription_releases_the_producer() {
        let (sub, mut sink) = Subscription::channel("conversation:c1");
        drop(sub);
        timeout(Duration::from_millis(200), sink.closed())
            .await
            .expect("sink should observe the drop");
        assert!(sink.is_closed());
    }
}
