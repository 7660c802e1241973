//! Transaction assembly, signing and submission
//!
//! [`TransactionBuilder::finalize`] is the whole pipeline: read the head block from
//! the node, bind the transaction to it, sign, broadcast, and merge the node's
//! placement info with the locally computed id.

use chrono::Duration as ChronoDuration;
use data_encoding::HEXLOWER_PERMISSIVE;
use log::{info, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::core::serializer::Serializer;
use crate::core::transaction::{parse_timestamp, ChainId, Operation, Transaction};
use crate::error::{GolosError, Result};
use crate::network::RpcClient;
use crate::wallet::{PrivateKey, ADDRESS_PREFIX};

/// History bookkeeping keys that never appear inside a block's operations.
pub const HISTORY_KEYS: [&str; 4] = ["number", "block", "timestamp", "type_op"];

/// Reference block data taken from `get_dynamic_global_properties`.
#[derive(Debug, Clone, PartialEq)]
pub struct RefBlock {
    pub head_block_number: u64,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub head_time: chrono::DateTime<chrono::Utc>,
}

impl RefBlock {
    /// `ref_block_num` is the low 16 bits of the head block number; the prefix is the
    /// little-endian u32 at bytes 4..8 of the head block id.
    pub fn from_properties(props: &Value) -> Result<RefBlock> {
        let head_block_number = props
            .get("head_block_number")
            .and_then(Value::as_u64)
            .ok_or_else(|| GolosError::Assembly("Missing head_block_number".to_string()))?;
        let head_block_id = props
            .get("head_block_id")
            .and_then(Value::as_str)
            .ok_or_else(|| GolosError::Assembly("Missing head_block_id".to_string()))?;
        let time = props
            .get("time")
            .and_then(Value::as_str)
            .ok_or_else(|| GolosError::Assembly("Missing head block time".to_string()))?;

        let id_bytes = HEXLOWER_PERMISSIVE
            .decode(head_block_id.as_bytes())
            .map_err(|e| GolosError::Assembly(format!("head_block_id is not hex: {e}")))?;
        let prefix_bytes: [u8; 4] = id_bytes
            .get(4..8)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| GolosError::Assembly(format!("head_block_id too short: {head_block_id}")))?;
        let head_time = parse_timestamp(time).map_err(|e| GolosError::Assembly(e.to_string()))?;

        Ok(RefBlock {
            head_block_number,
            ref_block_num: (head_block_number & 0xffff) as u16,
            ref_block_prefix: u32::from_le_bytes(prefix_bytes),
            head_time,
        })
    }
}

/// A broadcast transaction together with where the node placed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastResult {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub id: String,
    pub block_num: Option<u64>,
    pub trx_num: Option<u64>,
}

/// Builds, signs and submits transactions for one chain.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    chain_id: ChainId,
    expiration_secs: u32,
    prefix: String,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        TransactionBuilder {
            chain_id: ChainId::golos(),
            expiration_secs: 60,
            prefix: ADDRESS_PREFIX.to_string(),
        }
    }
}

impl TransactionBuilder {
    pub fn new(chain_id: ChainId, expiration_secs: u32, prefix: &str) -> Self {
        TransactionBuilder {
            chain_id,
            expiration_secs,
            prefix: prefix.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(TransactionBuilder::new(
            config.chain_id()?,
            config.expiration_secs,
            &config.address_prefix,
        ))
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    fn serializer(&self) -> Serializer<'_> {
        Serializer::with_prefix(&self.prefix)
    }

    /// Unsigned transaction bound to the node's current head block.
    pub fn prepare<R: RpcClient + ?Sized>(&self, rpc: &mut R, operations: Vec<Operation>) -> Result<Transaction> {
        let props = rpc.call("get_dynamic_global_properties", vec![])?;
        let ref_block = RefBlock::from_properties(&props)?;
        let expiration = ref_block.head_time + ChronoDuration::seconds(i64::from(self.expiration_secs));
        Ok(Transaction::new(
            ref_block.ref_block_num,
            ref_block.ref_block_prefix,
            expiration,
            operations,
        ))
    }

    /// Sign in key order. Keys are not checked against the required authorities.
    pub fn sign(&self, tx: &mut Transaction, keys: &[PrivateKey]) -> Result<()> {
        tx.sign_with(keys, &self.chain_id, &self.serializer())
    }

    /// Prepare, sign and broadcast synchronously, returning the signed transaction with
    /// its id and the block it landed in.
    pub fn finalize<R: RpcClient + ?Sized>(
        &self,
        rpc: &mut R,
        operations: Vec<Operation>,
        keys: &[PrivateKey],
    ) -> Result<BroadcastResult> {
        let mut tx = self.prepare(rpc, operations)?;
        self.sign(&mut tx, keys)?;
        let id = tx.id_with(&self.serializer())?;

        let response = rpc.call("broadcast_transaction_synchronous", vec![serde_json::to_value(&tx)?])?;
        let block_num = response.get("block_num").and_then(Value::as_u64);
        let trx_num = response.get("trx_num").and_then(Value::as_u64);
        if let Some(node_id) = response.get("id").and_then(Value::as_str) {
            if node_id != id {
                warn!("Node reported transaction id {node_id}, computed {id}");
            }
        }
        info!("Broadcast transaction {id} in block {block_num:?}");

        Ok(BroadcastResult {
            transaction: tx,
            id,
            block_num,
            trx_num,
        })
    }
}

/// Fetch a transaction by id. A node that does not know it yields `TransactionNotFound`.
pub fn get_transaction<R: RpcClient + ?Sized>(rpc: &mut R, txid: &str) -> Result<Value> {
    match rpc.call("get_transaction", vec![json!(txid)]) {
        Ok(Value::Null) => Err(GolosError::TransactionNotFound(txid.to_string())),
        other => other,
    }
}

/// Find the transaction in `block` holding an operation equal to `fields`.
///
/// `fields` may be an account history entry: the history keys in [`HISTORY_KEYS`] and
/// any `ignore_keys` are dropped before comparing. When `op_name` is given only
/// operations of that type are considered.
pub fn find_op_transaction<R: RpcClient + ?Sized>(
    rpc: &mut R,
    block: u64,
    op_name: Option<&str>,
    fields: &Map<String, Value>,
    ignore_keys: &[&str],
) -> Result<Value> {
    let wanted = Operation::new(
        op_name.unwrap_or_default(),
        fields
            .iter()
            .filter(|(key, _)| !HISTORY_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    );

    let block_data = rpc.call("get_block", vec![json!(block)])?;
    let transactions = block_data
        .get("transactions")
        .and_then(Value::as_array)
        .ok_or_else(|| GolosError::TransactionNotFound(format!("Block {block} has no transactions")))?;

    for tx in transactions {
        let Some(operations) = tx.get("operations").and_then(Value::as_array) else {
            continue;
        };
        for op in operations {
            let Ok(op) = serde_json::from_value::<Operation>(op.clone()) else {
                continue;
            };
            if op_name.is_some_and(|name| name != op.name()) {
                continue;
            }
            if wanted.same_fields(&op, ignore_keys) {
                return Ok(tx.clone());
            }
        }
    }

    Err(GolosError::TransactionNotFound(format!(
        "No matching operation in block {block}"
    )))
}
