//! Link store: directed relationships between owners (follows, etc).
//!
//! The slot is `(link type, target fid)`, so one owner holds at most one
//! live link of each type to each target. A reverse index under
//! [`keys::RootPrefix::LinksByTarget`] answers "who links to this owner".

use std::sync::Arc;

use graphset_core::{Fid, LinkType, Message, MessageBody, MessageType, SignerKey};
use graphset_db::{Database, IterOptions};

use crate::error::{Result, StoreError};
use crate::events::StoreEventHandler;
use crate::keys::{self, UserPostfix};
use crate::store::{Store, StoreDef, StoreOptions, TRUE_VALUE};

/// Default retention: at most this many links per owner, no age limit.
pub const PRUNE_SIZE_LIMIT_DEFAULT: usize = 2_500;

pub struct LinkStoreDef;

impl LinkStoreDef {
    fn link_body(message: &Message) -> Result<(LinkType, Fid)> {
        match &message.body {
            MessageBody::Link {
                link_type,
                target_fid,
            } => Ok((*link_type, *target_fid)),
            _ => Err(StoreError::InvalidInput(
                "link message carries a non-link body".into(),
            )),
        }
    }
}

impl StoreDef for LinkStoreDef {
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::LinkMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::LinkAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = Some(UserPostfix::LinkRemoves);
    const ADD_TYPE: MessageType = MessageType::LinkAdd;
    const REMOVE_TYPE: Option<MessageType> = Some(MessageType::LinkRemove);

    fn slot_key(message: &Message) -> Result<Vec<u8>> {
        let (link_type, target_fid) = Self::link_body(message)?;
        let mut slot = Vec::with_capacity(1 + 8);
        slot.push(link_type.0);
        slot.extend_from_slice(&target_fid.to_be_bytes());
        Ok(slot)
    }

    // Only live Adds are discoverable by target.
    fn secondary_index_puts(
        message: &Message,
        ts_hash: &graphset_core::TsHash,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if message.message_type != MessageType::LinkAdd {
            return Ok(Vec::new());
        }
        let (link_type, target_fid) = Self::link_body(message)?;
        let key =
            keys::links_by_target_key(target_fid, Some(link_type), Some(message.fid), Some(ts_hash));
        Ok(vec![(key, TRUE_VALUE.to_vec())])
    }

    fn secondary_index_dels(
        message: &Message,
        ts_hash: &graphset_core::TsHash,
    ) -> Result<Vec<Vec<u8>>> {
        if message.message_type != MessageType::LinkAdd {
            return Ok(Vec::new());
        }
        let (link_type, target_fid) = Self::link_body(message)?;
        Ok(vec![keys::links_by_target_key(
            target_fid,
            Some(link_type),
            Some(message.fid),
            Some(ts_hash),
        )])
    }
}

/// Store for directed links between owners.
pub struct LinkStore<D: Database> {
    store: Store<D, LinkStoreDef>,
}

impl<D: Database> LinkStore<D> {
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

    /// Merge a LinkAdd or LinkRemove message.
    pub async fn merge(&self, message: &Message) -> Result<Vec<Message>> {
        self.store.merge(message).await
    }

    fn slot(link_type: LinkType, target_fid: Fid) -> Vec<u8> {
        let mut slot = Vec::with_capacity(1 + 8);
        slot.push(link_type.0);
        slot.extend_from_slice(&target_fid.to_be_bytes());
        slot
    }

    /// The live LinkAdd for `(type, target)`, if one is in place.
    pub async fn get_link_add(
        &self,
        fid: Fid,
        link_type: LinkType,
        target_fid: Fid,
    ) -> Result<Message> {
        self.store.get_add(fid, &Self::slot(link_type, target_fid)).await
    }

    /// The live LinkRemove for `(type, target)`, if one is in place.
    pub async fn get_link_remove(
        &self,
        fid: Fid,
        link_type: LinkType,
        target_fid: Fid,
    ) -> Result<Message> {
        self.store
            .get_remove(fid, &Self::slot(link_type, target_fid))
            .await
    }

    /// All live LinkAdds for an owner.
    pub async fn get_link_adds_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// All live LinkRemoves for an owner.
    pub async fn get_link_removes_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_removes_by_fid(fid).await
    }

    /// Every live link message for an owner, oldest first.
    pub async fn get_all_messages_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_all_messages_by_fid(fid).await
    }

    /// All live links pointing at an owner, optionally narrowed to one link
    /// type.
    pub async fn get_links_by_target(
        &self,
        target_fid: Fid,
        link_type: Option<LinkType>,
    ) -> Result<Vec<Message>> {
        let prefix = keys::links_by_target_key(target_fid, link_type, None, None);
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

    /// Evict the oldest links beyond the retention limit.
    pub async fn prune_messages(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.prune_messages(fid).await
    }

    /// Delete every link authorized by a revoked signer.
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
