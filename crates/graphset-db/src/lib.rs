//! # graphset db
//!
//! Ordered key-value abstraction for the graphset stores.
//!
//! The stores only ever need three things from storage: a point get, an
//! atomic batched write, and bounded prefix iteration in key order. This
//! crate pins that contract down as the [`Database`] trait and ships
//! [`MemoryDb`], a BTreeMap-backed reference implementation with the same
//! semantics a persistent LSM engine provides.
//!
//! ## Key Types
//!
//! - [`Database`] - The async trait for all storage operations
//! - [`Batch`] - An atomic group of puts and deletes
//! - [`IterOptions`] - Bounds for a prefix scan
//! - [`MemoryDb`] - In-memory sorted storage

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{DbError, Result};
pub use memory::MemoryDb;
pub use traits::{Batch, BatchOp, Database, IterOptions};
