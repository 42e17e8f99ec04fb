//! Change notification for session consumers (guards, query filters).
//!
//! Each subscriber gets its own copy of every event published after it
//! subscribed (broadcast semantics). Delivery is in-process and synchronous
//! with the publishing call; a subscriber that was dropped is pruned on the
//! next publish.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Mutex, PoisonError};

use scholaris_core::{PrincipalId, RoleId};

use crate::Scope;

/// What changed in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A principal was stored (login, or a re-fetched principal).
    PrincipalChanged { principal_id: PrincipalId },
    /// The stored principal's role was replaced by a newer snapshot.
    RoleUpdated { role_id: RoleId },
    /// The active branch scope changed.
    ScopeChanged(Scope),
    /// Logout.
    Cleared,
}

/// A subscription to session events.
///
/// Designed for single-threaded consumption by one consumer.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Every message currently queued, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// In-memory fan-out bus.
///
/// - No IO / no async
/// - Best-effort fan-out (dead subscribers are dropped)
#[derive(Debug)]
pub struct SessionBus<M> {
    subscribers: Mutex<Vec<Sender<M>>>,
}

impl<M> Default for SessionBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M: Clone> SessionBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, message: M) {
        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(message.clone()).is_ok());
    }

    pub fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Subscription::new(rx)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_gets_a_copy() {
        let bus = SessionBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(SessionEvent::Cleared);

        assert_eq!(a.drain(), vec![SessionEvent::Cleared]);
        assert_eq!(b.try_recv().unwrap(), SessionEvent::Cleared);
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let bus = SessionBus::new();
        bus.publish(SessionEvent::Cleared);
        let late = bus.subscribe();
        assert!(late.drain().is_empty());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = SessionBus::<SessionEvent>::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(SessionEvent::Cleared);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.drain().len(), 1);
    }
}
