//! User data store: profile fields.
//!
//! The only add-only family: there is no UserDataRemove type and no removes
//! set, so the CRDT degenerates to Last-Write-Wins per field. Clearing a
//! field is expressed as a newer UserDataAdd with an empty value.

use std::sync::Arc;

use graphset_core::{Fid, Message, MessageBody, MessageType, SignerKey, UserDataField};
use graphset_db::Database;

use crate::error::{Result, StoreError};
use crate::events::StoreEventHandler;
use crate::keys::UserPostfix;
use crate::store::{Store, StoreDef, StoreOptions};

/// Default retention: at most this many user data records per owner.
pub const PRUNE_SIZE_LIMIT_DEFAULT: usize = 100;

pub struct UserDataStoreDef;

impl StoreDef for UserDataStoreDef {
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::UserDataMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::UserDataAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = None;
    const ADD_TYPE: MessageType = MessageType::UserDataAdd;
    const REMOVE_TYPE: Option<MessageType> = None;

    fn slot_key(message: &Message) -> Result<Vec<u8>> {
        match &message.body {
            MessageBody::UserData { field, .. } => Ok(vec![*field as u8]),
            _ => Err(StoreError::InvalidInput(
                "user data message carries a non-user-data body".into(),
            )),
        }
    }
}

/// Store for profile field values.
pub struct UserDataStore<D: Database> {
    store: Store<D, UserDataStoreDef>,
}

impl<D: Database> UserDataStore<D> {
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

    /// Merge a UserDataAdd message.
    pub async fn merge(&self, message: &Message) -> Result<Vec<Message>> {
        self.store.merge(message).await
    }

    /// The live value of a profile field, if one is set.
    pub async fn get_user_data_add(&self, fid: Fid, field: UserDataField) -> Result<Message> {
        self.store.get_add(fid, &[field as u8]).await
    }

    /// All live profile fields for an owner.
    pub async fn get_user_data_adds_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// Every live user data message for an owner, oldest first.
    pub async fn get_all_messages_by_fid(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.get_all_messages_by_fid(fid).await
    }

    /// Evict the oldest user data records beyond the retention limit.
    pub async fn prune_messages(&self, fid: Fid) -> Result<Vec<Message>> {
        self.store.prune_messages(fid).await
    }

    /// Delete every user data record authorized by a revoked signer.
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
