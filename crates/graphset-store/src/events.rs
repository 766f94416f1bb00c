//! Store event notifier.
//!
//! An explicitly constructed hub passed by handle into each store at
//! construction; there is no ambient global emitter. Dispatch is
//! synchronous and ordered: a store publishes only after its batch has
//! committed, and never on failure. Subscribers get relative ordering of
//! events for one owner's slot class, nothing more.

use graphset_core::{CustodyEvent, Message};
use tokio::sync::broadcast;

/// An event published by one of the stores.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A message won its slot. `deleted_messages` lists the records it
    /// superseded (empty when the slot was vacant).
    MergeMessage {
        message: Message,
        deleted_messages: Vec<Message>,
    },
    /// A message was evicted by retention limits.
    PruneMessage { message: Message },
    /// A message was deleted because its signer was revoked.
    RevokeMessage { message: Message },
    /// A custody event was accepted for an owner.
    MergeCustodyEvent { event: CustodyEvent },
}

/// Publish/subscribe hub for store events.
///
/// Cheap to clone; all clones feed the same subscribers. Emitting with no
/// active subscribers is a no-op, not an error.
#[derive(Clone)]
pub struct StoreEventHandler {
    tx: broadcast::Sender<StoreEvent>,
}

impl StoreEventHandler {
    /// Create a hub buffering up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all store events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event. Returns the number of subscribers reached.
    pub fn emit(&self, event: StoreEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn emit_merge_message(&self, message: Message, deleted_messages: Vec<Message>) {
        self.emit(StoreEvent::MergeMessage {
            message,
            deleted_messages,
        });
    }

    pub fn emit_prune_message(&self, message: Message) {
        self.emit(StoreEvent::PruneMessage { message });
    }

    pub fn emit_revoke_message(&self, message: Message) {
        self.emit(StoreEvent::RevokeMessage { message });
    }

    pub fn emit_merge_custody_event(&self, event: CustodyEvent) {
        self.emit(StoreEvent::MergeCustodyEvent { event });
    }
}

impl Default for StoreEventHandler {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphset_core::{ContentHash, Fid, Message, MessageBody, MessageType, SignerKey};

    fn sample_message() -> Message {
        Message {
            fid: Fid::new(1).unwrap(),
            message_type: MessageType::SignerAdd,
            timestamp: 1,
            hash: ContentHash::from_bytes([1; 20]),
            signer: SignerKey::from_bytes(vec![2; 20]),
            body: MessageBody::Signer {
                signer: SignerKey::from_bytes(vec![3; 32]),
            },
        }
    }

    #[tokio::test]
    async fn test_events_reach_all_subscribers_in_order() {
        let hub = StoreEventHandler::new(8);
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();

        hub.emit_merge_message(sample_message(), vec![]);
        hub.emit_prune_message(sample_message());

        for rx in [&mut rx1, &mut rx2] {
            assert!(matches!(
                rx.recv().await.unwrap(),
                StoreEvent::MergeMessage { .. }
            ));
            assert!(matches!(
                rx.recv().await.unwrap(),
                StoreEvent::PruneMessage { .. }
            ));
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let hub = StoreEventHandler::new(8);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.emit(StoreEvent::PruneMessage { message: sample_message() }), 0);
    }
}
