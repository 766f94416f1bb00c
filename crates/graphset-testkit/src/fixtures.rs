//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use graphset_core::{Fid, SignerKey};
use graphset_db::MemoryDb;
use graphset_store::{
    LinkStore, ReactionStore, SignerStore, StoreEventHandler, UserDataStore, VerificationStore,
};

use crate::factories::TestSigner;

/// A test fixture: one owner, one delegate signer, and a fresh in-memory
/// database shared by every store.
pub struct TestFixture {
    pub fid: Fid,
    pub signer: TestSigner,
    pub db: Arc<MemoryDb>,
    pub events: StoreEventHandler,
}

impl TestFixture {
    /// Fixture for owner 1 with a deterministic signer.
    pub fn new() -> Self {
        Self::for_fid(1)
    }

    /// Fixture for an arbitrary owner, seeding the signer from the fid.
    pub fn for_fid(fid: u64) -> Self {
        let mut seed = [0u8; 32];
        seed[..8].copy_from_slice(&fid.to_be_bytes());
        seed[31] = 0x5e;
        Self {
            fid: Fid::new(fid).expect("fixture fid must be nonzero"),
            signer: TestSigner::from_seed(seed),
            db: Arc::new(MemoryDb::new()),
            events: StoreEventHandler::default(),
        }
    }

    /// The delegate signer's public key.
    pub fn signer_key(&self) -> SignerKey {
        self.signer.key()
    }

    pub fn signer_store(&self) -> SignerStore<MemoryDb> {
        SignerStore::new(Arc::clone(&self.db), self.events.clone())
    }

    pub fn link_store(&self) -> LinkStore<MemoryDb> {
        LinkStore::new(Arc::clone(&self.db), self.events.clone())
    }

    pub fn reaction_store(&self) -> ReactionStore<MemoryDb> {
        ReactionStore::new(Arc::clone(&self.db), self.events.clone())
    }

    pub fn verification_store(&self) -> VerificationStore<MemoryDb> {
        VerificationStore::new(Arc::clone(&self.db), self.events.clone())
    }

    pub fn user_data_store(&self) -> UserDataStore<MemoryDb> {
        UserDataStore::new(Arc::clone(&self.db), self.events.clone())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factories;

    #[tokio::test]
    async fn test_fixture_stores_share_the_database() {
        let fixture = TestFixture::new();
        let links = fixture.link_store();
        let signer = fixture.signer_key();

        let message = factories::link_add(fixture.fid, 100, &signer, Fid::new(2).unwrap());
        links.merge(&message).await.unwrap();

        // A second handle over the same db sees the merge.
        let links_again = fixture.link_store();
        let adds = links_again.get_link_adds_by_fid(fixture.fid).await.unwrap();
        assert_eq!(adds, vec![message]);
    }

    #[test]
    fn test_fixtures_have_distinct_signers() {
        assert_ne!(
            TestFixture::for_fid(1).signer_key(),
            TestFixture::for_fid(2).signer_key()
        );
    }
}
