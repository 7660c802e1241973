//! Deterministic account keys
//!
//! Role keys are a pure function of `(account, role, password)`: nothing is generated
//! randomly and nothing is persisted. Private keys travel as WIF text, public keys as
//! network-prefixed Base58Check text.

pub mod key;

pub use key::{
    derive_keys, derive_private_key, is_key, is_key_with_prefix, public_from_wif, public_from_wif_with_prefix,
    AccountKeys, KeyPair, PrivateKey, PublicKey, Role, ADDRESS_PREFIX, PRIVATE_KEY_LEN,
    PUBLIC_KEY_LEN,
};
