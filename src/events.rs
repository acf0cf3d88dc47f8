//! Live-update fan-out: the subscriber registry and per-client update channels.
//!
//! The watcher feeds [`ChangeEvent`]s into [`Broadcaster::run`], which offers
//! each one to every registered subscriber. Delivery is best effort: a
//! subscriber whose queue is closed or full is dropped on the spot, and its
//! client is expected to reconnect.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{ChangeEvent, StreamFrame};

/// Per-subscriber queue depth. A subscriber that falls this far behind is
/// treated as a failed delivery.
pub const SUBSCRIBER_BUFFER: usize = 64;

pub type SubscriberId = Uuid;

/// A registrable sink for change events.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: SubscriberId,
    sender: mpsc::Sender<ChangeEvent>,
}

impl Subscriber {
    /// Create a subscriber and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ChangeEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let subscriber = Self {
            id: Uuid::new_v4(),
            sender,
        };
        (subscriber, receiver)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

/// Registry of connected subscribers.
///
/// Only `register`, `unregister` and `broadcast` touch the set, so pruning
/// on failed delivery stays inside this type.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    subscribers: Arc<Mutex<HashMap<SubscriberId, mpsc::Sender<ChangeEvent>>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Registering the same handle again is a no-op.
    pub fn register(&self, subscriber: &Subscriber) {
        let mut subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        subscribers
            .entry(subscriber.id)
            .or_insert_with(|| subscriber.sender.clone());
    }

    /// Remove a subscriber. Returns whether it was still registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        subscribers.remove(&id).is_some()
    }

    /// Offer `event` once to every subscriber, dropping any that cannot
    /// take it. Returns the number of successful deliveries.
    pub fn broadcast(&self, event: &ChangeEvent) -> usize {
        let mut subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        let mut delivered = 0;

        subscribers.retain(|id, sender| match sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(e) => {
                tracing::debug!("Dropping subscriber {}: {}", id, e);
                false
            }
        });

        delivered
    }

    /// Drop every subscriber, ending their channels. Used on shutdown so
    /// open push streams finish instead of holding the server open.
    pub fn disconnect_all(&self) -> usize {
        let mut subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        let count = subscribers.len();
        subscribers.clear();
        count
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .len()
    }

    /// Open a new update channel registered with this broadcaster.
    pub fn open_channel(&self) -> UpdateChannel {
        let (subscriber, receiver) = Subscriber::channel(SUBSCRIBER_BUFFER);
        self.register(&subscriber);
        tracing::debug!("Update channel {} opened", subscriber.id);

        UpdateChannel {
            id: subscriber.id,
            broadcaster: self.clone(),
            receiver: Some(receiver),
            greeted: false,
        }
    }

    /// Fan out events from the watcher until every sender is gone.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<ChangeEvent>) {
        while let Some(event) = events.recv().await {
            let delivered = self.broadcast(&event);
            tracing::debug!(
                kind = event.kind.as_str(),
                file = %event.file,
                delivered,
                "Broadcast change"
            );
        }
        tracing::debug!("Change feed closed, broadcaster stopping");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
}

/// One client's server-push channel.
///
/// Yields a synthetic [`StreamFrame::Connected`] first, then every change
/// the broadcaster delivers, in broadcast order. Closing (or dropping) the
/// channel unregisters it immediately. A closed channel never reopens.
#[derive(Debug)]
pub struct UpdateChannel {
    id: SubscriberId,
    broadcaster: Broadcaster,
    receiver: Option<mpsc::Receiver<ChangeEvent>>,
    greeted: bool,
}

impl UpdateChannel {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn state(&self) -> ChannelState {
        if self.receiver.is_some() {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }

    /// The next frame for this client, or `None` once the channel is closed.
    ///
    /// If the broadcaster dropped this subscriber the channel closes itself.
    pub async fn next_frame(&mut self) -> Option<StreamFrame> {
        let receiver = self.receiver.as_mut()?;

        if !self.greeted {
            self.greeted = true;
            return Some(StreamFrame::Connected);
        }

        match receiver.recv().await {
            Some(event) => Some(event.to_frame()),
            None => {
                self.close();
                None
            }
        }
    }

    /// Close the channel. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.receiver.take().is_some() {
            self.broadcaster.unregister(self.id);
            tracing::debug!("Update channel {} closed", self.id);
        }
    }
}

impl Drop for UpdateChannel {
    fn drop(&mut self) {
        self.close();
    }
}
