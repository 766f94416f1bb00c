//! Message factories.
//!
//! Build well-formed messages for tests: real Ed25519 delegate keys,
//! blake3-derived content hashes, and one constructor per message type.
//! Everything is deterministic given a seed, so tests can assert exact
//! conflict outcomes.

use ed25519_dalek::SigningKey;

use graphset_core::{
    encode_value, Address, ContentHash, CustodyEvent, Fid, LinkType, Message, MessageBody,
    MessageType, ReactionType, SignerKey, TargetId, UserDataField, CONTENT_HASH_BYTES,
};

/// An Ed25519 delegate keypair for tests.
pub struct TestSigner {
    signing_key: SigningKey,
}

impl TestSigner {
    /// Deterministic keypair from a seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// The public key as stored in messages and index keys.
    pub fn key(&self) -> SignerKey {
        SignerKey::from_bytes(self.signing_key.verifying_key().to_bytes().to_vec())
    }
}

/// Distinct deterministic signers, one per index.
pub fn test_signers(count: usize) -> Vec<TestSigner> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[31] = 0x5e;
            TestSigner::from_seed(seed)
        })
        .collect()
}

/// Blake3 content hash truncated to the message hash width.
pub fn content_hash(input: &[u8]) -> ContentHash {
    let digest = blake3::hash(input);
    let mut bytes = [0u8; CONTENT_HASH_BYTES];
    bytes.copy_from_slice(&digest.as_bytes()[..CONTENT_HASH_BYTES]);
    ContentHash::from_bytes(bytes)
}

/// Assemble a message, deriving its hash from the identifying fields.
///
/// Two calls with the same arguments yield byte-identical messages; any
/// difference in fid, type, timestamp, or body changes the hash.
pub fn make_message(
    fid: Fid,
    message_type: MessageType,
    timestamp: u64,
    signer: &SignerKey,
    body: MessageBody,
) -> Message {
    let mut preimage = Vec::new();
    preimage.extend_from_slice(&fid.to_be_bytes());
    preimage.push(message_type as u8);
    preimage.extend_from_slice(&timestamp.to_be_bytes());
    // Body encoding is deterministic CBOR, infallible for these types.
    if let Ok(encoded) = encode_value(&body) {
        preimage.extend_from_slice(&encoded);
    }
    Message {
        fid,
        message_type,
        timestamp,
        hash: content_hash(&preimage),
        signer: signer.clone(),
        body,
    }
}

pub fn signer_add(fid: Fid, timestamp: u64, signer: &SignerKey, delegate: &SignerKey) -> Message {
    make_message(
        fid,
        MessageType::SignerAdd,
        timestamp,
        signer,
        MessageBody::Signer {
            signer: delegate.clone(),
        },
    )
}

pub fn signer_remove(
    fid: Fid,
    timestamp: u64,
    signer: &SignerKey,
    delegate: &SignerKey,
) -> Message {
    make_message(
        fid,
        MessageType::SignerRemove,
        timestamp,
        signer,
        MessageBody::Signer {
            signer: delegate.clone(),
        },
    )
}

pub fn link_add(fid: Fid, timestamp: u64, signer: &SignerKey, target_fid: Fid) -> Message {
    make_message(
        fid,
        MessageType::LinkAdd,
        timestamp,
        signer,
        MessageBody::Link {
            link_type: LinkType::FOLLOW,
            target_fid,
        },
    )
}

pub fn link_remove(fid: Fid, timestamp: u64, signer: &SignerKey, target_fid: Fid) -> Message {
    make_message(
        fid,
        MessageType::LinkRemove,
        timestamp,
        signer,
        MessageBody::Link {
            link_type: LinkType::FOLLOW,
            target_fid,
        },
    )
}

pub fn reaction_add(
    fid: Fid,
    timestamp: u64,
    signer: &SignerKey,
    reaction_type: ReactionType,
    target: TargetId,
) -> Message {
    make_message(
        fid,
        MessageType::ReactionAdd,
        timestamp,
        signer,
        MessageBody::Reaction {
            reaction_type,
            target,
        },
    )
}

pub fn reaction_remove(
    fid: Fid,
    timestamp: u64,
    signer: &SignerKey,
    reaction_type: ReactionType,
    target: TargetId,
) -> Message {
    make_message(
        fid,
        MessageType::ReactionRemove,
        timestamp,
        signer,
        MessageBody::Reaction {
            reaction_type,
            target,
        },
    )
}

pub fn verification_add(fid: Fid, timestamp: u64, signer: &SignerKey, address: Address) -> Message {
    make_message(
        fid,
        MessageType::VerificationAdd,
        timestamp,
        signer,
        MessageBody::VerificationAdd {
            address,
            claim_signature: vec![0x5c; 64],
            block_hash: [0xb1; 32],
        },
    )
}

pub fn verification_remove(
    fid: Fid,
    timestamp: u64,
    signer: &SignerKey,
    address: Address,
) -> Message {
    make_message(
        fid,
        MessageType::VerificationRemove,
        timestamp,
        signer,
        MessageBody::VerificationRemove { address },
    )
}

pub fn user_data_add(
    fid: Fid,
    timestamp: u64,
    signer: &SignerKey,
    field: UserDataField,
    value: &str,
) -> Message {
    make_message(
        fid,
        MessageType::UserDataAdd,
        timestamp,
        signer,
        MessageBody::UserData {
            field,
            value: value.to_string(),
        },
    )
}

/// A deterministic target for reactions: a message authored by `author_fid`.
pub fn target_id(author_fid: Fid, timestamp: u64) -> TargetId {
    let hash = content_hash(&[author_fid.to_be_bytes().as_slice(), &timestamp.to_be_bytes()].concat());
    TargetId {
        fid: author_fid,
        // Factory timestamps stay well inside 32 bits.
        ts_hash: graphset_core::TsHash::from_parts(timestamp, &hash)
            .unwrap_or_else(|_| panic!("factory timestamp out of range: {timestamp}")),
    }
}

pub fn custody_event(fid: Fid, to_byte: u8, block_number: u64, log_index: u32) -> CustodyEvent {
    let mut position = Vec::new();
    position.extend_from_slice(&block_number.to_be_bytes());
    position.extend_from_slice(&log_index.to_be_bytes());
    let digest = blake3::hash(&position);
    CustodyEvent {
        fid,
        to: Address([to_byte; 20]),
        block_number,
        log_index,
        block_hash: *digest.as_bytes(),
        transaction_hash: *blake3::hash(digest.as_bytes()).as_bytes(),
    }
}
