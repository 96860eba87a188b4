//! Hashing and canonical serialization for ACIP
//!
//! Everything the kernel hashes goes through the canonical form defined in
//! `canonical`; two semantically equal values must produce byte-identical
//! serializations on every implementation.

pub mod canonical;
pub mod hash;

pub use canonical::{
    canonical_hash_hex, canonical_json_string, canonical_string, CanonicalError, MAX_DEPTH,
};
pub use hash::{hash_all, sha256, sha256_hex};
