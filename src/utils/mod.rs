//! Utility functions and helpers
//!
//! Hashing, Base58Check in both checksum variants, and canonical secp256k1 signing
//! shared by the key, codec and assembler modules.

pub mod crypto;

pub use crypto::{
    base58_decode, base58_encode, base58check_decode, base58check_encode, find_recovery_id,
    is_canonical, recover_public_key, ripemd160_digest, secp, sha256_array, sha256_digest,
    sign_digest_canonical, Checksum, CHECKSUM_LEN, SIGNATURE_LEN,
};
