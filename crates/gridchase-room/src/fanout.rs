//! Per-room subscriber fan-out.
//!
//! Every subscriber gets its own bounded `mpsc` channel. A broadcast tries
//! to push one [`Frame`] into each channel without waiting; when a channel
//! is full the frame is dropped *for that subscriber only* and the
//! broadcast moves on. Delivery is therefore at-most-once: a slow viewer
//! misses intermediate frames, but the next frame it does receive (or a
//! fresh snapshot request) is always the current state.
//!
//! The subscriber table sits behind its own small lock, separate from the
//! registry lock. A broadcast copies the senders out and releases that
//! lock before sending, and a [`Subscription`] removes itself from the
//! table when dropped. Unsubscribing in the middle of a broadcast is
//! therefore safe: the broadcast keeps its copy, and the send to the
//! now-closed channel just fails.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use gridchase_protocol::{Frame, RoomCode};
use tokio::sync::mpsc::{self, error::TrySendError};

type SubscriberId = u64;

#[derive(Debug, Default)]
struct Subscribers {
    senders: Mutex<HashMap<SubscriberId, mpsc::Sender<Frame>>>,
    next_id: AtomicU64,
}

impl Subscribers {
    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Frame>>> {
        // The map stays consistent even if a holder panicked: every
        // critical section is a single insert, remove, or clone.
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts from one [`Fanout::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Subscribers whose buffer was full.
    pub dropped: usize,
}

/// The delivery side of one room's subscriptions.
#[derive(Debug)]
pub struct Fanout {
    room: RoomCode,
    capacity: usize,
    subscribers: Arc<Subscribers>,
}

impl Fanout {
    /// Creates an empty fan-out whose subscribers buffer up to `capacity`
    /// frames each (at least one).
    pub fn new(room: RoomCode, capacity: usize) -> Self {
        Self {
            room,
            capacity: capacity.max(1),
            subscribers: Arc::default(),
        }
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.subscribers.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut senders = self.subscribers.lock();
            senders.insert(id, tx);
            senders.len()
        };
        tracing::debug!(room = %self.room, subscriber = id, subscribers = count, "subscribed");

        Subscription {
            id,
            room: self.room.clone(),
            receiver: rx,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Live subscriptions. Dropped ones are removed immediately.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Offers `frame` to every subscriber without waiting.
    pub fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        let targets: Vec<(SubscriberId, mpsc::Sender<Frame>)> = self
            .subscribers
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut report = BroadcastReport::default();
        let mut gone = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    tracing::debug!(
                        room = %self.room,
                        subscriber = id,
                        "subscriber buffer full, frame dropped"
                    );
                }
                // Lost a race with the subscription's own removal.
                Err(TrySendError::Closed(_)) => gone.push(id),
            }
        }

        if !gone.is_empty() {
            let mut senders = self.subscribers.lock();
            for id in gone {
                senders.remove(&id);
            }
        }
        report
    }
}

/// A live feed of frames for one room.
///
/// Yields frames through [`Subscription::recv`] or as a [`Stream`]. The
/// feed runs until the subscription is dropped or [`closed`](Self::close),
/// which unregisters it from the room.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    room: RoomCode,
    receiver: mpsc::Receiver<Frame>,
    subscribers: Arc<Subscribers>,
}

impl Subscription {
    /// Waits for the next frame.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Takes a buffered frame without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }

    /// Takes every buffered frame and returns the newest one.
    pub fn latest(&mut self) -> Option<Frame> {
        let mut last = None;
        while let Ok(frame) = self.receiver.try_recv() {
            last = Some(frame);
        }
        last
    }

    /// Unsubscribes. Equivalent to dropping the subscription.
    pub fn close(self) {}
}

impl Stream for Subscription {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        let remaining = {
            let mut senders = self.subscribers.lock();
            senders.remove(&self.id);
            senders.len()
        };
        tracing::debug!(
            room = %self.room,
            subscriber = self.id,
            subscribers = remaining,
            "unsubscribed"
        );
    }
}
