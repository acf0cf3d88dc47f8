//! Client side of the live-update feed.
//!
//! [`ReconnectingSubscriber`] keeps a push channel open for as long as it
//! lives. It moves through `Disconnected -> Connecting -> Connected`, and
//! every failure sends it back to `Disconnected` with exactly one reconnect
//! scheduled after a fixed interval. It never gives up.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{ClientError, DashboardClient, FrameStream};
use crate::config::DEFAULT_RETRY_INTERVAL;
use crate::models::ChangeEvent;

/// Something that can open a push channel.
pub trait EventSource: Send + Sync + 'static {
    fn connect(&self) -> BoxFuture<'_, Result<FrameStream, ClientError>>;
}

impl EventSource for DashboardClient {
    fn connect(&self) -> BoxFuture<'_, Result<FrameStream, ClientError>> {
        self.open_events().boxed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What a UI shows: connection indicator plus the most recent change.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberStatus {
    pub state: ConnectionState,
    pub last_event: Option<ChangeEvent>,
    pub last_update: Option<DateTime<Utc>>,
}

impl SubscriberStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

impl Default for SubscriberStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_event: None,
            last_update: None,
        }
    }
}

type Handler = Box<dyn FnMut(ChangeEvent) + Send>;

/// State shared between the owner and the connection task. Once `closed`
/// is set the task may not touch the status or call out. The handler is
/// taken out of the lock while it runs.
struct Shared {
    closed: bool,
    handler: Option<Handler>,
    status: watch::Sender<SubscriberStatus>,
}

type SharedRef = Arc<Mutex<Shared>>;

/// Nothing user-supplied runs under this lock, so a poisoned guard is
/// still consistent.
fn lock(shared: &SharedRef) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ReconnectingSubscriber {
    shared: SharedRef,
    status: watch::Receiver<SubscriberStatus>,
    task: Option<JoinHandle<()>>,
}

impl ReconnectingSubscriber {
    /// Start subscribing with the default three-second retry interval.
    pub fn spawn<S, F>(source: S, handler: F) -> Self
    where
        S: EventSource,
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        Self::spawn_with_interval(source, handler, DEFAULT_RETRY_INTERVAL)
    }

    /// Start subscribing. `handler` sees every change except the
    /// `connected` marker. Must be called from within a tokio runtime.
    ///
    /// A handler that panics costs the current connection, not the
    /// subscriber: the panic is logged and a reconnect is scheduled.
    pub fn spawn_with_interval<S, F>(source: S, handler: F, retry_interval: Duration) -> Self
    where
        S: EventSource,
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        let (status_tx, status) = watch::channel(SubscriberStatus::default());
        let shared = Arc::new(Mutex::new(Shared {
            closed: false,
            handler: Some(Box::new(handler)),
            status: status_tx,
        }));

        let task = tokio::spawn(run(source, shared.clone(), retry_interval));

        Self {
            shared,
            status,
            task: Some(task),
        }
    }

    pub fn status(&self) -> SubscriberStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// A receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<SubscriberStatus> {
        self.status.clone()
    }

    /// Close the channel and cancel any pending reconnect. Once this returns
    /// the handler is never called again. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        {
            let mut shared = lock(&self.shared);
            if shared.closed {
                return;
            }
            shared.closed = true;
            shared.handler = None;
            shared
                .status
                .send_modify(|s| s.state = ConnectionState::Disconnected);
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::info!("Live updates stopped");
    }
}

impl Drop for ReconnectingSubscriber {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Move to `state` unless torn down. Returns false if the task should stop.
fn transition(shared: &SharedRef, state: ConnectionState) -> bool {
    let shared = lock(shared);
    if shared.closed {
        return false;
    }
    shared.status.send_modify(|s| s.state = state);
    true
}

#[derive(Debug, PartialEq, Eq)]
enum Dispatch {
    Delivered,
    HandlerPanicked,
    Stopped,
}

/// Record one change and hand it to the handler.
fn deliver(shared: &SharedRef, change: ChangeEvent) -> Dispatch {
    let mut handler = {
        let mut guard = lock(shared);
        if guard.closed {
            return Dispatch::Stopped;
        }
        let Some(handler) = guard.handler.take() else {
            return Dispatch::Stopped;
        };
        guard.status.send_modify(|s| {
            s.last_event = Some(change.clone());
            s.last_update = Some(Utc::now());
        });
        handler
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(change)));

    let mut guard = lock(shared);
    if guard.closed {
        return Dispatch::Stopped;
    }
    guard.handler = Some(handler);
    match outcome {
        Ok(()) => Dispatch::Delivered,
        Err(_) => Dispatch::HandlerPanicked,
    }
}

async fn run<S: EventSource>(source: S, shared: SharedRef, retry_interval: Duration) {
    loop {
        if !transition(&shared, ConnectionState::Connecting) {
            return;
        }
        tracing::info!("Connecting to event stream");

        match source.connect().await {
            Ok(mut frames) => {
                if !transition(&shared, ConnectionState::Connected) {
                    return;
                }
                tracing::info!("Event stream connected");

                loop {
                    match frames.next().await {
                        Some(Ok(frame)) => {
                            let Some(change) = frame.into_change() else {
                                continue;
                            };
                            tracing::debug!(
                                kind = change.kind.as_str(),
                                file = %change.file,
                                "Event"
                            );
                            match deliver(&shared, change) {
                                Dispatch::Delivered => {}
                                Dispatch::HandlerPanicked => {
                                    tracing::error!(
                                        "Event handler panicked, dropping connection"
                                    );
                                    break;
                                }
                                Dispatch::Stopped => return,
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!("Event stream error: {}", e);
                            break;
                        }
                        None => {
                            tracing::warn!("Event stream closed by server");
                            break;
                        }
                    }
                }
            }
            Err(e) => tracing::warn!("Could not open event stream: {}", e),
        }

        if !transition(&shared, ConnectionState::Disconnected) {
            return;
        }
        tokio::time::sleep(retry_interval).await;
        tracing::info!("Reconnecting...");
    }
}
