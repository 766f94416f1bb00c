//! The generic CRDT store core.
//!
//! Every message family shares one merge/prune/revoke state machine,
//! parameterized by a [`StoreDef`] that knows how to derive the conflict
//! domain (the slot) from a message body and which index namespaces the
//! family owns.
//!
//! Conflicts between two messages for the same slot are resolved with
//! Last-Write-Wins + Remove-Wins rules:
//!
//! 1. Highest timestamp wins
//! 2. Remove wins over Add
//! 3. Highest lexicographic hash wins
//!
//! Rule 2 applies only across classes: deletion is sticky and cannot be
//! reverted by a same-timestamp Add, however the hashes compare. Two
//! messages of the same class at the same timestamp fall through to the
//! hash. Losers are deleted in the same atomic batch the winner is
//! written in, so at most one record is ever live per slot.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use graphset_core::{
    bytes_compare, decode_value, encode_value, network_time_now, Fid, Message, MessageClass,
    MessageType, TsHash,
};
use graphset_db::{Batch, Database, IterOptions};

use crate::error::{Result, StoreError};
use crate::events::StoreEventHandler;
use crate::keys::{self, UserPostfix};

/// Marker value for index entries whose key carries all the information.
pub(crate) const TRUE_VALUE: [u8; 1] = [1];

/// Page size for the chunked scans in prune and revoke.
const SCAN_PAGE_SIZE: usize = 100;

/// Per-family parameterization of the generic store.
pub trait StoreDef: Send + Sync + 'static {
    /// Slot class under which this family's primary records live.
    const MESSAGE_POSTFIX: UserPostfix;
    /// Set index of live Add records, keyed by slot.
    const ADDS_POSTFIX: UserPostfix;
    /// Set index of live Remove records; `None` for add-only families.
    const REMOVES_POSTFIX: Option<UserPostfix>;

    /// The Add message type accepted by this store.
    const ADD_TYPE: MessageType;
    /// The Remove message type, if the family has one.
    const REMOVE_TYPE: Option<MessageType>;

    /// Derive the conflict-domain key from the message body.
    ///
    /// Fails with invalid-input if the body does not match the family.
    fn slot_key(message: &Message) -> Result<Vec<u8>>;

    /// Reverse-target index entries written alongside the message.
    fn secondary_index_puts(
        _message: &Message,
        _ts_hash: &TsHash,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(Vec::new())
    }

    /// Reverse-target index keys deleted alongside the message.
    fn secondary_index_dels(_message: &Message, _ts_hash: &TsHash) -> Result<Vec<Vec<u8>>> {
        Ok(Vec::new())
    }
}

/// Retention limits enforced by [`Store::prune_messages`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Maximum number of live messages per owner in this slot class.
    pub prune_size_limit: usize,
    /// Maximum age in seconds of a live message, if set.
    pub prune_time_limit: Option<u64>,
}

/// Total order over two candidate messages for the same slot.
///
/// Greater means `a` beats `b`. Equal is only possible for identical
/// tsHashes of the same class, i.e. the same message.
pub(crate) fn message_compare(
    a_class: MessageClass,
    a_ts_hash: &TsHash,
    b_class: MessageClass,
    b_ts_hash: &TsHash,
) -> Ordering {
    // Timestamps first (the leading 4 bytes): Last-Write-Wins.
    let ts_order = bytes_compare(&a_ts_hash.as_bytes()[..4], &b_ts_hash.as_bytes()[..4]);
    if ts_order != Ordering::Equal {
        return ts_order;
    }

    // At a timestamp tie, Remove wins over Add regardless of hash.
    match (a_class, b_class) {
        (MessageClass::Remove, MessageClass::Add) => Ordering::Greater,
        (MessageClass::Add, MessageClass::Remove) => Ordering::Less,
        // Same class: the hash (trailing 20 bytes) breaks the tie.
        _ => bytes_compare(&a_ts_hash.as_bytes()[4..], &b_ts_hash.as_bytes()[4..]),
    }
}

/// Keyed mutex map serializing mutations per owner.
///
/// The lookup-compare-write sequence in merge is not atomic at the engine
/// level, so every mutating operation on one fid must hold that fid's lock.
#[derive(Default)]
struct FidLocks {
    locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
}

impl FidLocks {
    async fn acquire(&self, fid: Fid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                locks
                    .entry(fid.value())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

/// The generic merge/prune/revoke engine over one message family.
pub struct Store<D: Database, T: StoreDef> {
    db: Arc<D>,
    events: StoreEventHandler,
    options: StoreOptions,
    locks: FidLocks,
    _def: PhantomData<T>,
}

impl<D: Database, T: StoreDef> Store<D, T> {
    pub fn new(db: Arc<D>, events: StoreEventHandler, options: StoreOptions) -> Self {
        Self {
            db,
            events,
            options,
            locks: FidLocks::default(),
            _def: PhantomData,
        }
    }

    /// The event hub this store publishes to.
    pub fn event_handler(&self) -> &StoreEventHandler {
        &self.events
    }

    pub(crate) fn db(&self) -> &Arc<D> {
        &self.db
    }

    pub(crate) async fn lock_fid(&self, fid: Fid) -> OwnedMutexGuard<()> {
        self.locks.acquire(fid).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Merge
    // ─────────────────────────────────────────────────────────────────────────

    /// Merge a message into the store.
    ///
    /// Returns the records the message superseded (also carried on the
    /// published merge event). Fails with [`StoreError::Duplicate`] if the
    /// identical message is already live, [`StoreError::Conflict`] if the
    /// slot is held by a record that beats this one, and
    /// [`StoreError::InvalidInput`] if the message does not belong to this
    /// family. On any failure, state is untouched.
    pub async fn merge(&self, message: &Message) -> Result<Vec<Message>> {
        let class = self.classify(message)?;
        let slot = T::slot_key(message)?;
        let ts_hash = message.ts_hash()?;

        let _guard = self.locks.acquire(message.fid).await;

        let mut batch = Batch::new();
        let mut superseded = Vec::new();

        // The removes set is consulted first: a live Remove in the slot is
        // the stickiest competitor.
        if let Some(removes_postfix) = T::REMOVES_POSTFIX {
            if let Some(loser) = self
                .resolve_against(
                    &mut batch,
                    message.fid,
                    removes_postfix,
                    MessageClass::Remove,
                    &slot,
                    class,
                    &ts_hash,
                )
                .await?
            {
                superseded.push(loser);
            }
        }

        if let Some(loser) = self
            .resolve_against(
                &mut batch,
                message.fid,
                T::ADDS_POSTFIX,
                MessageClass::Add,
                &slot,
                class,
                &ts_hash,
            )
            .await?
        {
            superseded.push(loser);
        }

        self.put_message_ops(&mut batch, message, &ts_hash, class, &slot)?;
        self.db.commit(batch).await?;

        if !superseded.is_empty() {
            debug!(
                fid = message.fid.value(),
                superseded = superseded.len(),
                "merge resolved conflict"
            );
        }
        self.events
            .emit_merge_message(message.clone(), superseded.clone());
        Ok(superseded)
    }

    /// Check one set index for a competitor in the slot. Queues deletion
    /// ops for a losing competitor and returns it; errs if the competitor
    /// wins or ties.
    #[allow(clippy::too_many_arguments)]
    async fn resolve_against(
        &self,
        batch: &mut Batch,
        fid: Fid,
        set_postfix: UserPostfix,
        set_class: MessageClass,
        slot: &[u8],
        incoming_class: MessageClass,
        incoming_ts_hash: &TsHash,
    ) -> Result<Option<Message>> {
        let index_key = keys::set_index_key(fid, set_postfix, slot);
        let existing = match self.db.get(&index_key).await? {
            Some(value) => TsHash::from_slice(&value)?,
            None => return Ok(None),
        };

        match message_compare(set_class, &existing, incoming_class, incoming_ts_hash) {
            Ordering::Equal => Err(StoreError::Duplicate),
            Ordering::Greater => Err(StoreError::Conflict(
                "a more recent record occupies the slot",
            )),
            Ordering::Less => {
                let loser = self.get_message(fid, &existing).await?;
                self.delete_message_ops(batch, &loser)?;
                Ok(Some(loser))
            }
        }
    }

    fn classify(&self, message: &Message) -> Result<MessageClass> {
        if message.message_type == T::ADD_TYPE {
            Ok(MessageClass::Add)
        } else if T::REMOVE_TYPE == Some(message.message_type) {
            Ok(MessageClass::Remove)
        } else {
            Err(StoreError::InvalidInput(format!(
                "message type {:?} is not handled by this store",
                message.message_type
            )))
        }
    }

    /// Queue every write for a message: primary record, by-signer index,
    /// slot set index, and the family's reverse indices. One batch, one
    /// commit.
    fn put_message_ops(
        &self,
        batch: &mut Batch,
        message: &Message,
        ts_hash: &TsHash,
        class: MessageClass,
        slot: &[u8],
    ) -> Result<()> {
        let encoded = encode_value(message)?;
        batch.put(
            keys::primary_key(message.fid, T::MESSAGE_POSTFIX, Some(ts_hash)),
            encoded,
        );
        batch.put(
            keys::by_signer_key(
                message.fid,
                message.signer.as_bytes(),
                Some(message.message_type),
                Some(ts_hash),
            ),
            TRUE_VALUE,
        );

        let set_postfix = match class {
            MessageClass::Add => T::ADDS_POSTFIX,
            MessageClass::Remove => T::REMOVES_POSTFIX.ok_or_else(|| {
                StoreError::InvalidInput("this store has no remove set".into())
            })?,
        };
        batch.put(
            keys::set_index_key(message.fid, set_postfix, slot),
            ts_hash.as_bytes().to_vec(),
        );

        for (key, value) in T::secondary_index_puts(message, ts_hash)? {
            batch.put(key, value);
        }
        Ok(())
    }

    /// Queue every delete for a message, mirroring `put_message_ops`.
    pub(crate) fn delete_message_ops(&self, batch: &mut Batch, message: &Message) -> Result<()> {
        let ts_hash = message.ts_hash()?;
        let slot = T::slot_key(message)?;

        for key in T::secondary_index_dels(message, &ts_hash)? {
            batch.delete(key);
        }

        let set_postfix = match message.class() {
            MessageClass::Add => T::ADDS_POSTFIX,
            MessageClass::Remove => T::REMOVES_POSTFIX.ok_or_else(|| {
                StoreError::InvalidInput("this store has no remove set".into())
            })?,
        };
        batch.delete(keys::set_index_key(message.fid, set_postfix, &slot));
        batch.delete(keys::by_signer_key(
            message.fid,
            message.signer.as_bytes(),
            Some(message.message_type),
            Some(&ts_hash),
        ));
        batch.delete(keys::primary_key(
            message.fid,
            T::MESSAGE_POSTFIX,
            Some(&ts_hash),
        ));
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Prune
    // ─────────────────────────────────────────────────────────────────────────

    /// Evict the oldest live messages until the owner is within both
    /// retention limits, measured against the current network time.
    pub async fn prune_messages(&self, fid: Fid) -> Result<Vec<Message>> {
        self.prune_messages_at(fid, network_time_now()?).await
    }

    /// [`Store::prune_messages`] with an explicit notion of "now".
    ///
    /// Candidates are collected by a bounded ascending scan first and
    /// deleted second; one prune event is published per evicted message,
    /// oldest first.
    pub async fn prune_messages_at(&self, fid: Fid, now: u64) -> Result<Vec<Message>> {
        let _guard = self.locks.acquire(fid).await;

        let prefix = keys::primary_key(fid, T::MESSAGE_POSTFIX, None);
        let count = self.db.count_prefix(&prefix).await?;
        let size_to_prune = count.saturating_sub(self.options.prune_size_limit);
        let cutoff = self
            .options
            .prune_time_limit
            .map(|limit| now.saturating_sub(limit));

        let mut pruned: Vec<Message> = Vec::new();
        let mut batch = Batch::new();
        let mut last_key: Option<Vec<u8>> = None;

        'scan: loop {
            let page = self
                .db
                .iterate_prefix(
                    &prefix,
                    IterOptions {
                        limit: Some(SCAN_PAGE_SIZE),
                        start_after: last_key.take(),
                        reverse: false,
                    },
                )
                .await?;
            if page.is_empty() {
                break;
            }
            for (key, value) in page {
                last_key = Some(key);
                let message: Message = decode_value(&value)?;
                let over_size = pruned.len() < size_to_prune;
                let expired = cutoff.is_some_and(|cutoff| message.timestamp < cutoff);
                if !over_size && !expired {
                    break 'scan;
                }
                self.delete_message_ops(&mut batch, &message)?;
                pruned.push(message);
            }
        }

        if pruned.is_empty() {
            return Ok(pruned);
        }

        self.db.commit(batch).await?;
        info!(fid = fid.value(), pruned = pruned.len(), "pruned messages");
        for message in &pruned {
            self.events.emit_prune_message(message.clone());
        }
        Ok(pruned)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Revoke
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete every live message of this family authorized by `signer`,
    /// publishing one revoke event per message in encounter order.
    pub async fn revoke_messages_by_signer(
        &self,
        fid: Fid,
        signer: &[u8],
    ) -> Result<Vec<Message>> {
        let _guard = self.locks.acquire(fid).await;

        let mut types = vec![T::ADD_TYPE];
        if let Some(remove_type) = T::REMOVE_TYPE {
            types.push(remove_type);
        }

        let mut revoked = Vec::new();
        let mut batch = Batch::new();
        for message_type in types {
            let prefix = keys::by_signer_key(fid, signer, Some(message_type), None);
            for (key, _) in self
                .db
                .iterate_prefix(&prefix, IterOptions::ascending())
                .await?
            {
                let (_, ts_hash) = keys::split_by_signer_key(&key)?;
                let message = self.get_message(fid, &ts_hash).await?;
                self.delete_message_ops(&mut batch, &message)?;
                revoked.push(message);
            }
        }

        if revoked.is_empty() {
            return Ok(revoked);
        }

        self.db.commit(batch).await?;
        info!(
            fid = fid.value(),
            signer = %hex::encode(signer),
            revoked = revoked.len(),
            "revoked messages by signer"
        );
        for message in &revoked {
            self.events.emit_revoke_message(message.clone());
        }
        Ok(revoked)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the primary record at a tsHash.
    pub(crate) async fn get_message(&self, fid: Fid, ts_hash: &TsHash) -> Result<Message> {
        let key = keys::primary_key(fid, T::MESSAGE_POSTFIX, Some(ts_hash));
        let value = self.db.get(&key).await?.ok_or_else(|| {
            StoreError::NotFound(format!("message {:?} for fid {}", ts_hash, fid))
        })?;
        Ok(decode_value(&value)?)
    }

    /// The live Add occupying a slot, if any.
    pub async fn get_add(&self, fid: Fid, slot: &[u8]) -> Result<Message> {
        self.get_from_set(fid, T::ADDS_POSTFIX, slot).await
    }

    /// The live Remove occupying a slot, if any.
    pub async fn get_remove(&self, fid: Fid, slot: &[u8]) -> Result<Message> {
        let postfix = T::REMOVES_POSTFIX
            .ok_or_else(|| StoreError::InvalidInput("this store has no remove set".into()))?;
        self.get_from_set(fid, postfix, slot).await
    }

    async fn get_from_set(&self, fid: Fid, postfix: UserPostfix, slot: &[u8]) -> Result<Message> {
        let index_key = keys::set_index_key(fid, postfix, slot);
        let ts_hash = match self.db.get(&index_key).await? {
            Some(value) => TsHash::from_slice(&value)?,
            None => {
                return Err(StoreError::NotFound(format!(
                    "no live record in slot for fid {fid}"
                )))
            }
        };
        self.get_message(fid, &ts_hash).await
    }

    /// All live Adds for an owner, in slot-key order.
    pub async fn get_adds_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.get_set_by_fid(fid, T::ADDS_POSTFIX).await
    }

    /// All live Removes for an owner, in slot-key order.
    pub async fn get_removes_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        match T::REMOVES_POSTFIX {
            Some(postfix) => self.get_set_by_fid(fid, postfix).await,
            None => Ok(Vec::new()),
        }
    }

    async fn get_set_by_fid(&self, fid: Fid, postfix: UserPostfix) -> Result<Vec<Message>> {
        let prefix = keys::set_index_key(fid, postfix, &[]);
        let entries = self
            .db
            .iterate_prefix(&prefix, IterOptions::ascending())
            .await?;
        let mut messages = Vec::with_capacity(entries.len());
        for (_, value) in entries {
            let ts_hash = TsHash::from_slice(&value)?;
            messages.push(self.get_message(fid, &ts_hash).await?);
        }
        Ok(messages)
    }

    /// Every live message of this family for an owner, oldest first.
    pub async fn get_all_messages_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        let prefix = keys::primary_key(fid, T::MESSAGE_POSTFIX, None);
        let entries = self
            .db
            .iterate_prefix(&prefix, IterOptions::ascending())
            .await?;
        entries
            .into_iter()
            .map(|(_, value)| decode_value(&value).map_err(StoreError::from))
            .collect()
    }

    /// Every live message of this family authorized by `signer`,
    /// optionally narrowed to one type.
    pub async fn get_all_by_signer(
        &self,
        fid: Fid,
        signer: &[u8],
        message_type: Option<MessageType>,
    ) -> Result<Vec<Message>> {
        let prefix = keys::by_signer_key(fid, signer, message_type, None);
        let entries = self
            .db
            .iterate_prefix(&prefix, IterOptions::ascending())
            .await?;
        let mut messages = Vec::with_capacity(entries.len());
        for (key, _) in entries {
            let (entry_type, ts_hash) = keys::split_by_signer_key(&key)?;
            // The by-signer namespace is shared by all families; skip
            // entries that belong to another store.
            if entry_type != T::ADD_TYPE && Some(entry_type) != T::REMOVE_TYPE {
                continue;
            }
            messages.push(self.get_message(fid, &ts_hash).await?);
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphset_core::ContentHash;

    fn ts(timestamp: u64, fill: u8) -> TsHash {
        TsHash::from_parts(timestamp, &ContentHash::from_bytes([fill; 20])).unwrap()
    }

    #[test]
    fn test_higher_timestamp_wins() {
        assert_eq!(
            message_compare(MessageClass::Add, &ts(10, 0xff), MessageClass::Remove, &ts(11, 0x00)),
            Ordering::Less
        );
        assert_eq!(
            message_compare(MessageClass::Remove, &ts(12, 0x00), MessageClass::Add, &ts(11, 0xff)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_remove_wins_at_timestamp_tie_regardless_of_hash() {
        // Remove with the smaller hash still beats the Add.
        assert_eq!(
            message_compare(MessageClass::Remove, &ts(10, 0x00), MessageClass::Add, &ts(10, 0xff)),
            Ordering::Greater
        );
        assert_eq!(
            message_compare(MessageClass::Add, &ts(10, 0xff), MessageClass::Remove, &ts(10, 0x00)),
            Ordering::Less
        );
    }

    #[test]
    fn test_same_class_tie_falls_through_to_hash() {
        assert_eq!(
            message_compare(MessageClass::Add, &ts(10, 0x02), MessageClass::Add, &ts(10, 0x01)),
            Ordering::Greater
        );
        assert_eq!(
            message_compare(
                MessageClass::Remove,
                &ts(10, 0x01),
                MessageClass::Remove,
                &ts(10, 0x02)
            ),
            Ordering::Less
        );
    }

    #[test]
    fn test_identical_ts_hash_is_equal() {
        assert_eq!(
            message_compare(MessageClass::Add, &ts(10, 0x07), MessageClass::Add, &ts(10, 0x07)),
            Ordering::Equal
        );
    }
}
