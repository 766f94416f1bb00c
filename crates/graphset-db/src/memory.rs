//! In-memory implementation of the Database trait.
//!
//! A BTreeMap gives the same sorted-key semantics an LSM engine would.
//! Primarily for tests and single-process deployments; data is lost when
//! the value is dropped. Thread-safe via RwLock.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{DbError, Result};
use crate::traits::{Batch, BatchOp, Database, IterOptions};

/// Sorted in-memory key-value store.
#[derive(Default)]
pub struct MemoryDb {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryDb {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries, across all prefixes.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// The smallest key strictly greater than every key with this prefix, or
/// `None` if the prefix is all 0xff.
fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(bound);
        }
        bound.pop();
    }
    None
}

#[async_trait]
impl Database for MemoryDb {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.read().get(key).cloned())
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        // Single write-lock scope makes the whole batch atomic.
        let mut map = self.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn iterate_prefix(
        &self,
        prefix: &[u8],
        opts: IterOptions,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if let Some(start) = &opts.start_after {
            if !start.starts_with(prefix) {
                return Err(DbError::Backend(
                    "start_after bound does not carry the iteration prefix".into(),
                ));
            }
        }

        let map = self.read();
        let upper = prefix_upper_bound(prefix);
        let range: Box<dyn DoubleEndedIterator<Item = (&Vec<u8>, &Vec<u8>)>> = match &upper {
            Some(end) => Box::new(map.range::<Vec<u8>, _>((
                Bound::Included(&prefix.to_vec()),
                Bound::Excluded(end),
            ))),
            None => Box::new(map.range::<Vec<u8>, _>((Bound::Included(&prefix.to_vec()), Bound::Unbounded))),
        };

        let in_bounds = |key: &[u8]| match &opts.start_after {
            Some(start) => {
                if opts.reverse {
                    key < start.as_slice()
                } else {
                    key > start.as_slice()
                }
            }
            None => true,
        };

        let mut entries: Vec<(Vec<u8>, Vec<u8>)>;
        if opts.reverse {
            entries = range
                .rev()
                .filter(|(k, _)| in_bounds(k))
                .take(opts.limit.unwrap_or(usize::MAX))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        } else {
            entries = range
                .filter(|(k, _)| in_bounds(k))
                .take(opts.limit.unwrap_or(usize::MAX))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        entries.shrink_to_fit();
        Ok(entries)
    }

    async fn count_prefix(&self, prefix: &[u8]) -> Result<usize> {
        let map = self.read();
        let upper = prefix_upper_bound(prefix);
        let count = match &upper {
            Some(end) => map
                .range::<Vec<u8>, _>((Bound::Included(&prefix.to_vec()), Bound::Excluded(end)))
                .count(),
            None => map
                .range::<Vec<u8>, _>((Bound::Included(&prefix.to_vec()), Bound::Unbounded))
                .count(),
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_of(pairs: &[(&[u8], &[u8])]) -> Batch {
        let mut batch = Batch::new();
        for (k, v) in pairs {
            batch.put(*k, *v);
        }
        batch
    }

    #[tokio::test]
    async fn test_get_and_commit() {
        let db = MemoryDb::new();
        db.commit(batch_of(&[(b"a", b"1"), (b"b", b"2")])).await.unwrap();

        assert_eq!(db.get(b"a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(db.get(b"missing").await.unwrap(), None);

        let mut batch = Batch::new();
        batch.delete(b"a".as_slice()).put(b"c".as_slice(), b"3".as_slice());
        db.commit(batch).await.unwrap();

        assert_eq!(db.get(b"a").await.unwrap(), None);
        assert_eq!(db.get(b"c").await.unwrap(), Some(b"3".to_vec()));
    }

    #[tokio::test]
    async fn test_prefix_iteration_is_sorted() {
        let db = MemoryDb::new();
        db.commit(batch_of(&[
            (b"k\x02", b"b"),
            (b"k\x01", b"a"),
            (b"k\x03", b"c"),
            (b"other", b"x"),
        ]))
        .await
        .unwrap();

        let entries = db.iterate_prefix(b"k", IterOptions::ascending()).await.unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"k\x01".to_vec(), b"k\x02".to_vec(), b"k\x03".to_vec()]);

        let reversed = db
            .iterate_prefix(
                b"k",
                IterOptions {
                    reverse: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(reversed[0].0, b"k\x03".to_vec());
    }

    #[tokio::test]
    async fn test_limit_and_start_after() {
        let db = MemoryDb::new();
        db.commit(batch_of(&[
            (b"p1", b"a"),
            (b"p2", b"b"),
            (b"p3", b"c"),
            (b"p4", b"d"),
        ]))
        .await
        .unwrap();

        let limited = db.iterate_prefix(b"p", IterOptions::with_limit(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].0, b"p1".to_vec());

        let resumed = db
            .iterate_prefix(
                b"p",
                IterOptions {
                    start_after: Some(b"p2".to_vec()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resumed[0].0, b"p3".to_vec());
        assert_eq!(resumed.len(), 2);
    }

    #[tokio::test]
    async fn test_count_prefix() {
        let db = MemoryDb::new();
        db.commit(batch_of(&[(b"p1", b"a"), (b"p2", b"b"), (b"q1", b"c")]))
            .await
            .unwrap();
        assert_eq!(db.count_prefix(b"p").await.unwrap(), 2);
        assert_eq!(db.count_prefix(b"q").await.unwrap(), 1);
        assert_eq!(db.count_prefix(b"r").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_all_ff_prefix() {
        let db = MemoryDb::new();
        db.commit(batch_of(&[(b"\xff\xff\x01", b"a"), (b"\xfe", b"b")]))
            .await
            .unwrap();
        let entries = db
            .iterate_prefix(b"\xff\xff", IterOptions::ascending())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_prefix_upper_bound() {
        assert_eq!(prefix_upper_bound(b"ab"), Some(b"ac".to_vec()));
        assert_eq!(prefix_upper_bound(b"a\xff"), Some(b"b".to_vec()));
        assert_eq!(prefix_upper_bound(b"\xff\xff"), None);
    }
}
