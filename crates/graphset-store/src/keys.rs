//! Binary key codec.
//!
//! Pure functions mapping (owner, slot class, content) to byte keys whose
//! lexicographic order gives the stores everything they rely on: one
//! owner's records sort contiguously, one slot class scans chronologically,
//! and a signer's records enumerate under a single prefix.
//!
//! Layouts:
//!
//! - primary:    `<User><fid:8><postfix><tsHash:24>` -> message
//! - by-signer:  `<User><fid:8><BySigner><signer><type:1><tsHash:24>` -> 1
//! - set index:  `<User><fid:8><adds|removes postfix><slot>` -> tsHash
//! - custody:    `<CustodyEvent><fid:8>` -> custody event
//! - by-target:  `<ReactionsByTarget|LinksByTarget><target><type:1><fid:8><tsHash:24>` -> 1

use graphset_core::{
    CoreError, Fid, LinkType, MessageType, ReactionType, TargetId, TsHash, TS_HASH_BYTES,
};

/// Top-level key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RootPrefix {
    /// All of one owner's records.
    User = 1,
    /// Latest custody event per owner.
    CustodyEvent = 2,
    /// Reverse index: reactions pointing at a target.
    ReactionsByTarget = 3,
    /// Reverse index: links pointing at an owner.
    LinksByTarget = 4,
}

/// Second-level discriminators under an owner's key range.
///
/// Values 1..=5 are the slot classes holding primary message records;
/// the rest are index namespaces. The numeric values are persisted and
/// must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UserPostfix {
    SignerMessage = 1,
    VerificationMessage = 2,
    ReactionMessage = 3,
    LinkMessage = 4,
    UserDataMessage = 5,

    BySigner = 6,

    SignerAdds = 7,
    SignerRemoves = 8,
    VerificationAdds = 9,
    VerificationRemoves = 10,
    ReactionAdds = 11,
    ReactionRemoves = 12,
    LinkAdds = 13,
    LinkRemoves = 14,
    UserDataAdds = 15,
}

/// Prefix under which all of one owner's keys sort contiguously.
pub fn owner_key(fid: Fid) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(RootPrefix::User as u8);
    key.extend_from_slice(&fid.to_be_bytes());
    key
}

/// Key of a primary message record. Omitting the tsHash yields a prefix
/// that scans one owner's slot class in chronological order.
pub fn primary_key(fid: Fid, postfix: UserPostfix, ts_hash: Option<&TsHash>) -> Vec<u8> {
    let mut key = owner_key(fid);
    key.push(postfix as u8);
    if let Some(ts_hash) = ts_hash {
        key.extend_from_slice(ts_hash.as_bytes());
    }
    key
}

/// Key of a by-signer index entry. Narrowing stops at the first omitted
/// component: `(fid, signer)` and `(fid, signer, type)` are both usable
/// iteration prefixes.
pub fn by_signer_key(
    fid: Fid,
    signer: &[u8],
    message_type: Option<MessageType>,
    ts_hash: Option<&TsHash>,
) -> Vec<u8> {
    let mut key = owner_key(fid);
    key.push(UserPostfix::BySigner as u8);
    key.extend_from_slice(signer);
    if let Some(message_type) = message_type {
        key.push(message_type as u8);
        if let Some(ts_hash) = ts_hash {
            key.extend_from_slice(ts_hash.as_bytes());
        }
    }
    key
}

/// Recover `(message type, tsHash)` from the tail of a full by-signer key.
///
/// The signer may be 20 or 32 bytes, so the suffix parses from the end:
/// the last 24 bytes are the tsHash and the byte before them is the type.
pub fn split_by_signer_key(key: &[u8]) -> Result<(MessageType, TsHash), CoreError> {
    if key.len() < TS_HASH_BYTES + 1 {
        return Err(CoreError::MalformedKey("by-signer key too short".into()));
    }
    let ts_hash = TsHash::from_slice(&key[key.len() - TS_HASH_BYTES..])?;
    let message_type = MessageType::from_u8(key[key.len() - TS_HASH_BYTES - 1])?;
    Ok((message_type, ts_hash))
}

/// Key of a set-index entry: one owner's adds or removes set, keyed by the
/// slot. Value is the winning record's tsHash.
pub fn set_index_key(fid: Fid, postfix: UserPostfix, slot: &[u8]) -> Vec<u8> {
    let mut key = owner_key(fid);
    key.push(postfix as u8);
    key.extend_from_slice(slot);
    key
}

/// Key holding the latest custody event for an owner.
pub fn custody_event_key(fid: Fid) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(RootPrefix::CustodyEvent as u8);
    key.extend_from_slice(&fid.to_be_bytes());
    key
}

/// Recover the fid from a full custody event key.
pub fn split_custody_event_key(key: &[u8]) -> Result<Fid, CoreError> {
    if key.len() != 9 || key[0] != RootPrefix::CustodyEvent as u8 {
        return Err(CoreError::MalformedKey("not a custody event key".into()));
    }
    Fid::from_be_slice(&key[1..])
}

/// Key of a reactions-by-target index entry. Narrowing stops at the first
/// omitted component.
pub fn reactions_by_target_key(
    target: &TargetId,
    reaction_type: Option<ReactionType>,
    fid: Option<Fid>,
    ts_hash: Option<&TsHash>,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 32 + 1 + 8 + TS_HASH_BYTES);
    key.push(RootPrefix::ReactionsByTarget as u8);
    key.extend_from_slice(&target.to_key_bytes());
    if let Some(reaction_type) = reaction_type {
        key.push(reaction_type as u8);
        if let Some(fid) = fid {
            key.extend_from_slice(&fid.to_be_bytes());
            if let Some(ts_hash) = ts_hash {
                key.extend_from_slice(ts_hash.as_bytes());
            }
        }
    }
    key
}

/// Key of a links-by-target index entry.
pub fn links_by_target_key(
    target_fid: Fid,
    link_type: Option<LinkType>,
    fid: Option<Fid>,
    ts_hash: Option<&TsHash>,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 8 + 1 + 8 + TS_HASH_BYTES);
    key.push(RootPrefix::LinksByTarget as u8);
    key.extend_from_slice(&target_fid.to_be_bytes());
    if let Some(link_type) = link_type {
        key.push(link_type.0);
        if let Some(fid) = fid {
            key.extend_from_slice(&fid.to_be_bytes());
            if let Some(ts_hash) = ts_hash {
                key.extend_from_slice(ts_hash.as_bytes());
            }
        }
    }
    key
}

/// Recover `(fid, tsHash)` from the tail of a full by-target key.
pub fn split_by_target_key(key: &[u8]) -> Result<(Fid, TsHash), CoreError> {
    if key.len() < 8 + TS_HASH_BYTES {
        return Err(CoreError::MalformedKey("by-target key too short".into()));
    }
    let ts_hash = TsHash::from_slice(&key[key.len() - TS_HASH_BYTES..])?;
    let fid = Fid::from_be_slice(&key[key.len() - TS_HASH_BYTES - 8..key.len() - TS_HASH_BYTES])?;
    Ok((fid, ts_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphset_core::ContentHash;

    fn fid(value: u64) -> Fid {
        Fid::new(value).unwrap()
    }

    fn ts_hash(timestamp: u64, fill: u8) -> TsHash {
        TsHash::from_parts(timestamp, &ContentHash::from_bytes([fill; 20])).unwrap()
    }

    #[test]
    fn test_owner_keys_sort_by_fid() {
        assert!(owner_key(fid(1)) < owner_key(fid(2)));
        assert!(owner_key(fid(255)) < owner_key(fid(256)));
    }

    #[test]
    fn test_primary_keys_sort_chronologically() {
        let early = primary_key(fid(7), UserPostfix::LinkMessage, Some(&ts_hash(10, 0xff)));
        let late = primary_key(fid(7), UserPostfix::LinkMessage, Some(&ts_hash(11, 0x00)));
        assert!(early < late);
    }

    #[test]
    fn test_primary_key_prefix_contains_full_key() {
        let prefix = primary_key(fid(7), UserPostfix::ReactionMessage, None);
        let full = primary_key(fid(7), UserPostfix::ReactionMessage, Some(&ts_hash(10, 1)));
        assert!(full.starts_with(&prefix));

        // A different slot class does not share the prefix.
        let other = primary_key(fid(7), UserPostfix::LinkMessage, Some(&ts_hash(10, 1)));
        assert!(!other.starts_with(&prefix));
    }

    #[test]
    fn test_by_signer_suffix_roundtrip() {
        let signer = [0xaa; 32];
        let ts = ts_hash(99, 3);
        let key = by_signer_key(fid(5), &signer, Some(MessageType::ReactionAdd), Some(&ts));
        let (parsed_type, parsed_ts) = split_by_signer_key(&key).unwrap();
        assert_eq!(parsed_type, MessageType::ReactionAdd);
        assert_eq!(parsed_ts, ts);

        // A 20-byte signer parses identically from the end.
        let key = by_signer_key(fid(5), &[0xbb; 20], Some(MessageType::SignerAdd), Some(&ts));
        assert_eq!(
            split_by_signer_key(&key).unwrap(),
            (MessageType::SignerAdd, ts)
        );
    }

    #[test]
    fn test_by_signer_prefix_narrowing() {
        let signer = [0xaa; 32];
        let ts = ts_hash(1, 1);
        let full = by_signer_key(fid(5), &signer, Some(MessageType::LinkAdd), Some(&ts));
        assert!(full.starts_with(&by_signer_key(fid(5), &signer, None, None)));
        assert!(full.starts_with(&by_signer_key(
            fid(5),
            &signer,
            Some(MessageType::LinkAdd),
            None
        )));
    }

    #[test]
    fn test_custody_event_key_roundtrip() {
        let key = custody_event_key(fid(123));
        assert_eq!(split_custody_event_key(&key).unwrap(), fid(123));
        assert!(split_custody_event_key(&owner_key(fid(123))).is_err());
    }

    #[test]
    fn test_by_target_suffix_roundtrip() {
        let target = TargetId {
            fid: fid(9),
            ts_hash: ts_hash(50, 2),
        };
        let ts = ts_hash(60, 4);
        let key = reactions_by_target_key(&target, Some(ReactionType::Like), Some(fid(5)), Some(&ts));
        assert_eq!(split_by_target_key(&key).unwrap(), (fid(5), ts));
        assert!(key.starts_with(&reactions_by_target_key(&target, None, None, None)));

        let link_key = links_by_target_key(fid(9), Some(LinkType::FOLLOW), Some(fid(5)), Some(&ts));
        assert_eq!(split_by_target_key(&link_key).unwrap(), (fid(5), ts));
    }
}
