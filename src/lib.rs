//! # golos-core
//!
//! Client engine for the Golos blockchain: derive account keys, build and sign
//! transactions byte-for-byte the way the node serializes them, and talk to a pool of
//! nodes over websocket JSON-RPC with failover.
//!
//! ## Layout
//! - `wallet/`: password-derived role keys, WIF and prefixed public key text
//! - `core/`: operation schemas, the binary codec, transactions, assembly and broadcast
//! - `network/`: node pool, retry policy, method routing, websocket client
//! - `config/`: defaults, TOML file and environment layering
//! - `utils/`: hashing, Base58Check and canonical recoverable signatures
//! - `cli/`: arguments for the `golos-call` binary
//!
//! ## Typical flow
//! 1. `WsClient::new(&config)` connects to the first reachable node
//! 2. `TransactionBuilder::finalize` fetches the head block, signs and broadcasts
//! 3. The result carries the local transaction id and the node's block number

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod utils;
pub mod wallet;

pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    encode_operation, encode_transaction, find_op_transaction, get_transaction, transaction_hex,
    transaction_id, Asset, BroadcastResult, ChainId, Operation, Transaction, TransactionBuilder,
};
pub use error::{GolosError, Result};
pub use network::{ConnectionState, NodePool, RetryPolicy, RpcClient, WsClient};
pub use wallet::{
    derive_keys, derive_private_key, is_key, is_key_with_prefix, public_from_wif, public_from_wif_with_prefix,
    AccountKeys, KeyPair, PrivateKey, PublicKey, Role, ADDRESS_PREFIX,
};
