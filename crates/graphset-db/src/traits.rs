//! Database trait: the abstract interface the stores require from an
//! ordered key-value engine.
//!
//! This is the entire storage contract: a point get, an atomic batched
//! write, and bounded prefix iteration in key order. Any LSM-style engine
//! can sit behind it; [`crate::MemoryDb`] is the reference implementation.

use async_trait::async_trait;

use crate::error::Result;

/// A single mutation inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// An ordered set of mutations committed atomically.
///
/// Either every operation is applied or none is; the stores rely on this
/// to keep primary records and their index entries consistent.
#[derive(Debug, Default, Clone)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Queue a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key: key.into() });
        self
    }

    /// True if the batch contains no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// The queued operations, in order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consume the batch, yielding its operations.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Bounds for a prefix iteration.
#[derive(Debug, Default, Clone)]
pub struct IterOptions {
    /// Iterate in descending key order instead of ascending.
    pub reverse: bool,
    /// Stop after this many entries.
    pub limit: Option<usize>,
    /// Skip entries with keys <= this bound (ascending) or >= it
    /// (descending). Must itself carry the prefix.
    pub start_after: Option<Vec<u8>>,
}

impl IterOptions {
    /// Ascending, unbounded.
    pub fn ascending() -> Self {
        Self::default()
    }

    /// Ascending, at most `limit` entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// The Database trait: async interface to an ordered key-value engine.
///
/// # Contract
///
/// - Keys are opaque byte strings ordered lexicographically (unsigned).
/// - `commit` is atomic: a crash never leaves a partial batch applied.
/// - `iterate_prefix` returns entries whose keys start with `prefix`, in
///   key order, after materializing at most `limit` entries. Callers that
///   mutate during a scan must collect first and write second.
#[async_trait]
pub trait Database: Send + Sync {
    /// Point lookup. Returns `None` if the key is absent.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Fetch many keys at once, preserving order. Absent keys yield `None`.
    async fn get_many(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// Apply a batch of puts and deletes atomically.
    async fn commit(&self, batch: Batch) -> Result<()>;

    /// Collect `(key, value)` pairs under a prefix, bounded by `opts`.
    async fn iterate_prefix(
        &self,
        prefix: &[u8],
        opts: IterOptions,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Count entries under a prefix without materializing values.
    async fn count_prefix(&self, prefix: &[u8]) -> Result<usize>;
}
