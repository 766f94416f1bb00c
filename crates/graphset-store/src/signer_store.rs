//! Signer store: delegate key authorizations, plus the custody overlay.
//!
//! The CRDT half is an ordinary two-phase set whose slot is the delegate
//! public key. The custody overlay is not a CRDT: registry events carry a
//! total chain order `(block_number, log_index)`, so merge keeps whichever
//! event is later on chain and treats same-position hash mismatches as a
//! reorg signal, never as a conflict to resolve.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::warn;

use graphset_core::{
    bytes_compare, decode_value, encode_value, Address, CustodyEvent, Fid, Message, MessageBody,
    MessageType, SignerKey,
};
use graphset_db::{Batch, Database, IterOptions};

use crate::error::{Result, StoreError};
use crate::events::StoreEventHandler;
use crate::keys::{self, UserPostfix};
use crate::store::{Store, StoreDef, StoreOptions};

/// Default retention: at most this many signer messages per owner, no age
/// limit.
pub const PRUNE_SIZE_LIMIT_DEFAULT: usize = 100;

pub struct SignerStoreDef;

impl StoreDef for SignerStoreDef {
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::SignerMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::SignerAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = Some(UserPostfix::SignerRemoves);
    const ADD_TYPE: MessageType = MessageType::SignerAdd;
    const REMOVE_TYPE: Option<MessageType> = Some(MessageType::SignerRemove);

    fn slot_key(message: &Message) -> Result<Vec<u8>> {
        match &message.body {
            MessageBody::Signer { signer } => Ok(signer.as_bytes().to_vec()),
            _ => Err(StoreError::InvalidInput(
                "signer message carries a non-signer body".into(),
            )),
        }
    }
}

/// Total chain order over two custody events for the same owner.
///
/// Errs with [`StoreError::ConflictingChainData`] when the events claim the
/// same chain position but disagree on the block or transaction hash.
pub(crate) fn custody_event_compare(a: &CustodyEvent, b: &CustodyEvent) -> Result<Ordering> {
    let conflicting = || StoreError::ConflictingChainData {
        fid: a.fid,
        block_number: a.block_number,
        log_index: a.log_index,
    };

    match a.block_number.cmp(&b.block_number) {
        Ordering::Equal => {}
        order => return Ok(order),
    }
    if bytes_compare(&a.block_hash, &b.block_hash) != Ordering::Equal {
        return Err(conflicting());
    }
    match a.log_index.cmp(&b.log_index) {
        Ordering::Equal => {}
        order => return Ok(order),
    }
    if bytes_compare(&a.transaction_hash, &b.transaction_hash) != Ordering::Equal {
        return Err(conflicting());
    }
    Ok(Ordering::Equal)
}

/// Store for delegate signer authorizations and custody events.
pub struct SignerStore<D: Database> {
    store: Store<D, SignerStoreDef>,
}

impl<D: Database> SignerStore<D> {
    pub fn new(db: Arc<D>, events: StoreEventHandler) -> Self {
        Self::with_options(
            db,
            events,
            StoreOptions {
                prune_size_limit: PRUNE_SIZE_LIMIT_DEFAULT,
                prune_time_limit: None,
            },
        )
    }

    pub fn with_options(db: Arc<D>, events: StoreEventHandler, options: StoreOptions) -> Self {
        Self {
            store: Store::new(db, events, options),
        }
    }

    /// Merge a SignerAdd or SignerRemove message.
    pub async fn merge(&self, message: &Message) -> Result<Vec<Message>> {
        self.store.merge(message).await
    }

    /// Merge a custody event for an owner, keeping whichever event is later
    /// in chain order. Returns the event it superseded, if any.
    pub async fn merge_custody_event(&self, event: &CustodyEvent) -> Result<Option<CustodyEvent>> {
        let _guard = self.store.lock_fid(event.fid).await;

        let key = keys::custody_event_key(event.fid);
        let existing: Option<CustodyEvent> = match self.store.db().get(&key).await? {
            Some(value) => Some(decode_value(&value)?),
            None => None,
        };

        if let Some(existing) = &existing {
            match custody_event_compare(event, existing) {
                Ok(Ordering::Greater) => {}
                Ok(Ordering::Equal) => return Err(StoreError::Duplicate),
                Ok(Ordering::Less) => {
                    return Err(StoreError::Conflict("a later custody event is in place"))
                }
                Err(e) => {
                    if let StoreError::ConflictingChainData {
                        fid,
                        block_number,
                        log_index,
                    } = &e
                    {
                        warn!(
                            fid = fid.value(),
                            block_number, log_index, "conflicting chain data in custody event"
                        );
                    }
                    return Err(e);
                }
            }
        }

        let mut batch = Batch::new();
        batch.put(key, encode_value(event)?);
        self.store.db().commit(batch).await?;

        self.store
            .event_handler()
            .emit_merge_custody_event(event.clone());
        Ok(existing)
    }

    /// The latest custody event for an owner.
    pub async fn get_custody_event(&self, fid: Fid) -> Result<CustodyEvent> {
        let key = keys::custody_event_key(fid);
        let value = self
            .store
            .db()
            .get(&key)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("no custody event for fid {fid}")))?;
        Ok(decode_value(&value)?)
    }

    /// The address that currently controls an owner.
    pub async fn get_custody_address(&self, fid: Fid) -> Result<Address> {
        Ok(self.get_custody_event(fid).await?.to)
    }

    /// All owner ids with a custody event, in ascending order.
    pub async fn get_fids(&self) -> Result<Vec<Fid>> {
        let prefix = [keys::RootPrefix::CustodyEvent as u8];
        let entries = self
            .store
            .db()
            .iterate_prefix(&prefix, IterOptions::ascending())
            .await?;
        entries
            .iter()
            .map(|(key, _)| keys::split_custody_event_key(key).map_err(StoreError::from))
            .collect()
    }

    /// The live SignerAdd for a delegate key, if one is in place.
    pub async fn get_signer_add(&self, fid: Fid, signer: &SignerKey) -> Result<Message> {
        self.store.get_add(fid, signer.as_bytes()).await
    }

    /// The live SignerRemove for a delegate key, if one is in place.
    pub async fn get_signer_remove(&self, fid: Fid, signer: &SignerKey) -> Result<Message> {
        self.store.get_remove(fid, signer.as_bytes()).await
    }

    /// All live SignerAdds for an owner.
    pub async fn get_signer_adds_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// All live SignerRemoves for an owner.
    pub async fn get_signer_removes_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_removes_by_fid(fid).await
    }

    /// Every live signer message for an owner, oldest first.
    pub async fn get_all_messages_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_all_messages_by_fid(fid).await
    }

    /// Evict the oldest signer messages beyond the retention limits.
    pub async fn prune_messages(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.prune_messages(fid).await
    }

    /// Delete every signer message authorized by a revoked signer.
    pub async fn revoke_messages_by_signer(
        &self,
        fid: Fid,
        signer: &SignerKey,
    ) -> Result<Vec<Message>> {
        self.store
            .revoke_messages_by_signer(fid, signer.as_bytes())
            .await
    }
}
