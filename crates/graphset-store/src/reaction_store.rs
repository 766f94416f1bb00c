//! Reaction store: likes and recasts pointing at other owners' messages.
//!
//! The slot is `(reaction type, target)`, so one owner holds at most one
//! live reaction of each type per target. Reactions are the highest-volume
//! family and the only one with both a size and an age retention limit by
//! default. A reverse index under [`keys::RootPrefix::ReactionsByTarget`]
//! answers "who reacted to this message" without scanning owners.

use std::sync::Arc;

use graphset_core::{Fid, Message, MessageBody, MessageType, ReactionType, SignerKey, TargetId};
use graphset_db::{Database, IterOptions};

use crate::error::{Result, StoreError};
use crate::events::StoreEventHandler;
use crate::keys::{self, UserPostfix};
use crate::store::{Store, StoreDef, StoreOptions, TRUE_VALUE};

/// Default retention: at most this many reactions per owner.
pub const PRUNE_SIZE_LIMIT_DEFAULT: usize = 5_000;

/// Default retention: reactions older than 90 days are evicted.
pub const PRUNE_TIME_LIMIT_DEFAULT: u64 = 60 * 60 * 24 * 90;

pub struct ReactionStoreDef;

impl ReactionStoreDef {
    fn reaction_body(message: &Message) -> Result<(ReactionType, &TargetId)> {
        match &message.body {
            MessageBody::Reaction {
                reaction_type,
                target,
            } => Ok((*reaction_type, target)),
            _ => Err(StoreError::InvalidInput(
                "reaction message carries a non-reaction body".into(),
            )),
        }
    }
}

impl StoreDef for ReactionStoreDef {
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::ReactionMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::ReactionAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = Some(UserPostfix::ReactionRemoves);
    const ADD_TYPE: MessageType = MessageType::ReactionAdd;
    const REMOVE_TYPE: Option<MessageType> = Some(MessageType::ReactionRemove);

    fn slot_key(message: &Message) -> Result<Vec<u8>> {
        let (reaction_type, target) = Self::reaction_body(message)?;
        let mut slot = Vec::with_capacity(1 + 32);
        slot.push(reaction_type as u8);
        slot.extend_from_slice(&target.to_key_bytes());
        Ok(slot)
    }

    // Only live Adds appear in the reverse index; a Remove retracts the
    // reaction, it is not itself discoverable by target.
    fn secondary_index_puts(
        message: &Message,
        ts_hash: &graphset_core::TsHash,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if message.message_type != MessageType::ReactionAdd {
            return Ok(Vec::new());
        }
        let (reaction_type, target) = Self::reaction_body(message)?;
        let key = keys::reactions_by_target_key(
            target,
            Some(reaction_type),
            Some(message.fid),
            Some(ts_hash),
        );
        Ok(vec![(key, TRUE_VALUE.to_vec())])
    }

    fn secondary_index_dels(
        message: &Message,
        ts_hash: &graphset_core::TsHash,
    ) -> Result<Vec<Vec<u8>>> {
        if message.message_type != MessageType::ReactionAdd {
            return Ok(Vec::new());
        }
        let (reaction_type, target) = Self::reaction_body(message)?;
        Ok(vec![keys::reactions_by_target_key(
            target,
            Some(reaction_type),
            Some(message.fid),
            Some(ts_hash),
        )])
    }
}

/// Store for reactions to target messages.
pub struct ReactionStore<D: Database> {
    store: Store<D, ReactionStoreDef>,
}

impl<D: Database> ReactionStore<D> {
    pub fn new(db: Arc<D>, events: StoreEventHandler) -> Self {
        Self::with_options(
            db,
            events,
            StoreOptions {
                prune_size_limit: PRUNE_SIZE_LIMIT_DEFAULT,
                prune_time_limit: Some(PRUNE_TIME_LIMIT_DEFAULT),
            },
        )
    }

    pub fn with_options(db: Arc<D>, events: StoreEventHandler, options: StoreOptions) -> Self {
        Self {
            store: Store::new(db, events, options),
        }
    }

    /// Merge a ReactionAdd or ReactionRemove message.
    pub async fn merge(&self, message: &Message) -> Result<Vec<Message>> {
        self.store.merge(message).await
    }

    fn slot(reaction_type: ReactionType, target: &TargetId) -> Vec<u8> {
        let mut slot = Vec::with_capacity(1 + 32);
        slot.push(reaction_type as u8);
        slot.extend_from_slice(&target.to_key_bytes());
        slot
    }

    /// The live ReactionAdd for `(type, target)`, if one is in place.
    pub async fn get_reaction_add(
        &self,
        fid: Fid,
        reaction_type: ReactionType,
        target: &TargetId,
    ) -> Result<Message> {
        self.store
            .get_add(fid, &Self::slot(reaction_type, target))
            .await
    }

    /// The live ReactionRemove for `(type, target)`, if one is in place.
    pub async fn get_reaction_remove(
        &self,
        fid: Fid,
        reaction_type: ReactionType,
        target: &TargetId,
    ) -> Result<Message> {
        self.store
            .get_remove(fid, &Self::slot(reaction_type, target))
            .await
    }

    /// All live ReactionAdds for an owner.
    pub async fn get_reaction_adds_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// All live ReactionRemoves for an owner.
    pub async fn get_reaction_removes_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_removes_by_fid(fid).await
    }

    /// Every live reaction message for an owner, oldest first.
    pub async fn get_all_messages_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_all_messages_by_fid(fid).await
    }

    /// All live reactions pointing at a target, optionally narrowed to one
    /// reaction type. Results come back in reactor order.
    pub async fn get_reactions_by_target(
        &self,
        target: &TargetId,
        reaction_type: Option<ReactionType>,
    ) -> Result<Vec<Message>> {
        let prefix = keys::reactions_by_target_key(target, reaction_type, None, None);
        let entries = self
            .store
            .db()
            .iterate_prefix(&prefix, IterOptions::ascending())
            .await?;
        let mut messages = Vec::with_capacity(entries.len());
        for (key, _) in entries {
            let (fid, ts_hash) = keys::split_by_target_key(&key)?;
            messages.push(self.store.get_message(fid, &ts_hash).await?);
        }
        Ok(messages)
    }

    /// Evict the oldest reactions beyond the retention limits.
    pub async fn prune_messages(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.prune_messages(fid).await
    }

    /// [`ReactionStore::prune_messages`] with an explicit notion of "now".
    pub async fn prune_messages_at(&self, fid: Fid, now: u64) -> Result<Vec<Message>> {
        self.store.prune_messages_at(fid, now).await
    }

    /// Delete every reaction authorized by a revoked signer.
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
