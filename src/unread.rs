//! Live total of unread messages for the signed-in user.
//!
//! [`UnreadTracker`] owns at most one background task per user. The task
//! fetches the authoritative total, then re-fetches it in full after every
//! change notice from the user's subscription. Manual refreshes are handed
//! to the same task, so refreshes for one user run one after another, and a
//! generation counter keeps a torn-down user's
//! late result from landing in the state.

use crate::api::realtime::{Subscription, SubscriptionHandle};
use crate::error::ApiError;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

/// What the tracker needs from the message backend.
pub trait UnreadFeed: Send + Sync + 'static {
    fn total_unread_count(&self, user_id: &str) -> impl Future<Output = Result<u64, ApiError>> + Send;

    fn subscribe_all(&self, user_id: &str) -> Subscription;

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        handle.close();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadState {
    pub unread_count: u64,
    pub loading: bool,
}

impl Default for UnreadState {
    fn default() -> Self {
        Self {
            unread_count: 0,
            loading: true,
        }
    }
}

struct Active {
    user_id: String,
    handle: SubscriptionHandle,
    kick: Arc<Notify>,
    task: JoinHandle<()>,
}

struct Shared {
    state: watch::Sender<UnreadState>,
    generation: Mutex<u64>,
}

impl Shared {
    /// Applies `update` only if `generation` is still the current one.
    fn apply(&self, generation: u64, update: impl FnOnce(&mut UnreadState)) -> bool {
        let Ok(current) = self.generation.lock() else {
            return false;
        };
        if *current != generation {
            return false;
        }
        self.state.send_modify(update);
        true
    }

    fn advance(&self, update: impl FnOnce(&mut UnreadState)) -> u64 {
        let mut current = match self.generation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current += 1;
        self.state.send_modify(update);
        *current
    }
}

pub struct UnreadTracker<F: UnreadFeed> {
    feed: Arc<F>,
    shared: Arc<Shared>,
    active: Option<Active>,
}

impl<F: UnreadFeed> UnreadTracker<F> {
    pub fn new(feed: Arc<F>) -> Self {
        let (state, _) = watch::channel(UnreadState::default());
        Self {
            feed,
            shared: Arc::new(Shared {
                state,
                generation: Mutex::new(0),
            }),
            active: None,
        }
    }

    pub fn state(&self) -> UnreadState {
        *self.shared.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<UnreadState> {
        self.shared.state.subscribe()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.user_id.as_str())
    }

    /// Points the tracker at a (possibly absent) user. Setting the same
    /// user again is a no-op. Must be called inside a tokio runtime.
    pub fn set_user(&mut self, user_id: Option<&str>) {
        let user_id = user_id.map(str::trim).filter(|u| !u.is_empty());
        if user_id.is_some() && user_id == self.user_id() {
            return;
        }
        self.teardown();

        let Some(user_id) = user_id else {
            self.shared.advance(|s| {
                s.unread_count = 0;
                s.loading = false;
            });
            return;
        };

        let generation = self.shared.advance(|s| s.loading = true);
        let subscription = self.feed.subscribe_all(user_id);
        let handle = subscription.handle();
        let kick = Arc::new(Notify::new());
        let task = tokio::spawn(track(
            Arc::clone(&self.feed),
            Arc::clone(&self.shared),
            user_id.to_string(),
            subscription,
            Arc::clone(&kick),
            generation,
        ));
        self.active = Some(Active {
            user_id: user_id.to_string(),
            handle,
            kick,
            task,
        });
    }

    /// Asks the tracking task for one extra full refresh. Requests made while
    /// a refresh is running collapse into a single follow-up.
    pub fn refresh(&self) {
        if let Some(active) = &self.active {
            active.kick.notify_one();
        }
    }

    /// Closes the subscription and stops the task. Called on drop.
    pub fn shutdown(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(active) = self.active.take() {
            self.feed.unsubscribe(&active.handle);
            active.task.abort();
            log::debug!("Stopped unread tracking for {}", active.user_id);
        }
    }
}

impl<F: UnreadFeed> Drop for UnreadTracker<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn track<F: UnreadFeed>(
    feed: Arc<F>,
    shared: Arc<Shared>,
    user_id: String,
    mut subscription: Subscription,
    kick: Arc<Notify>,
    generation: u64,
) {
    refresh(feed.as_ref(), &shared, &user_id, generation).await;
    // A closed channel stops events, but manual refreshes are still served.
    let mut live = true;
    loop {
        tokio::select! {
            notice = subscription.next(), if live => {
                let Some(notice) = notice else {
                    log::debug!("Unread channel for {user_id} closed");
                    live = false;
                    continue;
                };
                log::debug!("Unread refresh for {user_id} after {:?} on {}", notice.kind, notice.table);
            }
            _ = kick.notified() => log::debug!("Manual unread refresh for {user_id}"),
        }
        refresh(feed.as_ref(), &shared, &user_id, generation).await;
    }
}

async fn refresh<F: UnreadFeed>(feed: &F, shared: &Shared, user_id: &str, generation: u64) {
    match feed.total_unread_count(user_id).await {
        Ok(count) => {
            shared.apply(generation, |s| {
                s.unread_count = count;
                s.loading = false;
            });
        }
        Err(err) => {
            log::error!("Failed to fetch unread count for {user_id}: {err}");
            shared.apply(generation, |s| s.loading = false);
        }
    }
}
