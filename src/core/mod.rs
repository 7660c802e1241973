//! Operations, transactions and their binary form
//!
//! The schema registry and serializer turn JSON-shaped operations into the exact bytes
//! the chain hashes. The transaction and broadcast modules bind those bytes to a
//! reference block, sign them, and hand them to a node.

pub mod asset;
pub mod broadcast;
pub mod schema;
pub mod serializer;
pub mod transaction;

pub use asset::{asset_precision, Asset, SYMBOL_LEN};
pub use broadcast::{
    find_op_transaction, get_transaction, BroadcastResult, RefBlock, TransactionBuilder,
    HISTORY_KEYS,
};
pub use schema::{lookup, operation_names, OperationSchema, WireType};
pub use serializer::{encode_operation, encode_transaction, expiration_seconds, Encoder, Serializer};
pub use transaction::{
    format_expiration, parse_timestamp, transaction_hex, transaction_id, ChainId, Operation,
    Transaction, EXPIRATION_FORMAT, GOLOS_CHAIN_ID, TRANSACTION_ID_LEN,
};
