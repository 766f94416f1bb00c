//! # graphset testkit
//!
//! Factories and fixtures for testing the graphset stores: deterministic
//! Ed25519 signers, blake3-hashed messages, and pre-wired store handles
//! over an in-memory database.
//!
//! This crate is test support only; nothing here belongs in production
//! paths.

pub mod factories;
pub mod fixtures;

pub use factories::{content_hash, make_message, test_signers, TestSigner};
pub use fixtures::TestFixture;
