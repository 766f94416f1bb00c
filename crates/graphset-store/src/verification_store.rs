//! Verification store: proofs that an owner controls an external address.
//!
//! The slot is the 20-byte address, so one owner holds at most one live
//! verification per address. The Add body carries the claim signature and
//! block hash; the Remove only names the address being retracted.

use std::sync::Arc;

use graphset_core::{Address, Fid, Message, MessageBody, MessageType, SignerKey};
use graphset_db::Database;

use crate::error::{Result, StoreError};
use crate::events::StoreEventHandler;
use crate::keys::UserPostfix;
use crate::store::{Store, StoreDef, StoreOptions};

/// Default retention: at most this many verifications per owner.
pub const PRUNE_SIZE_LIMIT_DEFAULT: usize = 50;

pub struct VerificationStoreDef;

impl StoreDef for VerificationStoreDef {
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::VerificationMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::VerificationAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = Some(UserPostfix::VerificationRemoves);
    const ADD_TYPE: MessageType = MessageType::VerificationAdd;
    const REMOVE_TYPE: Option<MessageType> = Some(MessageType::VerificationRemove);

    fn slot_key(message: &Message) -> Result<Vec<u8>> {
        match &message.body {
            MessageBody::VerificationAdd { address, .. }
            | MessageBody::VerificationRemove { address } => Ok(address.as_bytes().to_vec()),
            _ => Err(StoreError::InvalidInput(
                "verification message carries a non-verification body".into(),
            )),
        }
    }
}

/// Store for external address verifications.
pub struct VerificationStore<D: Database> {
    store: Store<D, VerificationStoreDef>,
}

impl<D: Database> VerificationStore<D> {
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

    /// Merge a VerificationAdd or VerificationRemove message.
    pub async fn merge(&self, message: &Message) -> Result<Vec<Message>> {
        self.store.merge(message).await
    }

    /// The live VerificationAdd for an address, if one is in place.
    pub async fn get_verification_add(&self, fid: Fid, address: &Address) -> Result<Message> {
        self.store.get_add(fid, address.as_bytes()).await
    }

    /// The live VerificationRemove for an address, if one is in place.
    pub async fn get_verification_remove(&self, fid: Fid, address: &Address) -> Result<Message> {
        self.store.get_remove(fid, address.as_bytes()).await
    }

    /// All live VerificationAdds for an owner.
    pub async fn get_verification_adds_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// All live VerificationRemoves for an owner.
    pub async fn get_verification_removes_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_removes_by_fid(fid).await
    }

    /// Every live verification message for an owner, oldest first.
    pub async fn get_all_messages_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_all_messages_by_fid(fid).await
    }

    /// Evict the oldest verifications beyond the retention limit.
    pub async fn prune_messages(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.prune_messages(fid).await
    }

    /// Delete every verification authorized by a revoked signer.
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
