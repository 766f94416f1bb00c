//! # graphset store
//!
//! The CRDT stores of the graphset social graph: one store per message
//! family, all sharing a single merge/prune/revoke engine over an ordered
//! key-value database.
//!
//! ## Stores
//!
//! - [`SignerStore`] - delegate key authorizations + the custody overlay
//! - [`LinkStore`] - directed relationships between owners
//! - [`ReactionStore`] - likes and recasts on target messages
//! - [`VerificationStore`] - external address proofs
//! - [`UserDataStore`] - profile fields (add-only)
//!
//! ## Guarantees
//!
//! - Deterministic: any replica merging the same set of messages in any
//!   order converges to the same state.
//! - Atomic: every mutation commits a single batch; a failed operation
//!   changes nothing.
//! - Observable: each store publishes merge, prune, and revoke events to a
//!   [`StoreEventHandler`] after its batch commits.

pub mod error;
pub mod events;
pub mod keys;
pub mod link_store;
pub mod reaction_store;
pub mod signer_store;
pub mod store;
pub mod user_data_store;
pub mod verification_store;

pub use error::{Result, StoreError};
pub use events::{StoreEvent, StoreEventHandler};
pub use link_store::LinkStore;
pub use reaction_store::ReactionStore;
pub use signer_store::SignerStore;
pub use store::{Store, StoreDef, StoreOptions};
pub use user_data_store::UserDataStore;
pub use verification_store::VerificationStore;
