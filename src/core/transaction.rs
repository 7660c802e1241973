// Transactions as the node sees them: a reference block, an expiration, a list of
// tagged operations and the signatures over the chain-bound digest.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::serializer::{encode_transaction, Serializer};
use crate::error::{GolosError, Result};
use crate::utils::{recover_public_key, sha256_array, sign_digest_canonical};
use crate::wallet::{PrivateKey, PublicKey};

/// Node timestamps carry no zone and are always UTC.
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Golos mainnet chain id.
pub const GOLOS_CHAIN_ID: &str = "782a3039b478c839e4cb0c941ff4eaeb7df40bdd68bd441afd444b9da763de12";

/// Transaction ids are the leading 20 bytes of the SHA-256 of the unsigned bytes.
pub const TRANSACTION_ID_LEN: usize = 20;

/// 32-byte chain identifier mixed into every signing digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId([u8; 32]);

impl ChainId {
    pub fn from_hex(text: &str) -> Result<ChainId> {
        let bytes = HEXLOWER
            .decode(text.trim().to_ascii_lowercase().as_bytes())
            .map_err(|e| GolosError::Config(format!("Chain id is not hex: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| GolosError::Config("Chain id must be 32 bytes".to_string()))?;
        Ok(ChainId(bytes))
    }

    pub fn golos() -> ChainId {
        let mut bytes = [0u8; 32];
        // constant above is valid hex of the right width
        if let Ok(decoded) = HEXLOWER.decode(GOLOS_CHAIN_ID.as_bytes()) {
            bytes.copy_from_slice(&decoded);
        }
        ChainId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Default for ChainId {
    fn default() -> Self {
        ChainId::golos()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&HEXLOWER.encode(&self.0))
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({self})")
    }
}

impl FromStr for ChainId {
    type Err = GolosError;

    fn from_str(s: &str) -> Result<Self> {
        ChainId::from_hex(s)
    }
}

/// One operation, carried on the wire as a `["name", {fields}]` pair.
///
/// Field maps are ordered by key, so two operations with the same fields compare equal
/// no matter how they were built. The serializer takes wire order from the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "(String, Map<String, Value>)",
    into = "(String, Map<String, Value>)"
)]
pub struct Operation {
    name: String,
    fields: Map<String, Value>,
}

impl Operation {
    pub fn new(name: &str, fields: Map<String, Value>) -> Operation {
        Operation {
            name: name.to_string(),
            fields,
        }
    }

    /// Build from a JSON object, failing on anything else.
    pub fn from_value(name: &str, fields: Value) -> Result<Operation> {
        match fields {
            Value::Object(map) => Ok(Operation::new(name, map)),
            other => Err(GolosError::Encoding(format!(
                "Operation {name} fields must be an object, got {other}"
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field-wise equality ignoring the named keys on both sides. Operation names are
    /// not compared.
    pub fn same_fields(&self, other: &Operation, ignore: &[&str]) -> bool {
        kept_fields(&self.fields, ignore).eq(kept_fields(&other.fields, ignore))
    }
}

fn kept_fields<'a>(
    fields: &'a Map<String, Value>,
    ignore: &'a [&'a str],
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    fields
        .iter()
        .filter(move |(key, _)| !ignore.contains(&key.as_str()))
}

impl From<(String, Map<String, Value>)> for Operation {
    fn from((name, fields): (String, Map<String, Value>)) -> Self {
        Operation { name, fields }
    }
}

impl From<Operation> for (String, Map<String, Value>) {
    fn from(op: Operation) -> Self {
        (op.name, op.fields)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: String,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub extensions: Vec<Value>,
    #[serde(default)]
    pub signatures: Vec<String>,
}

impl Transaction {
    pub fn new(
        ref_block_num: u16,
        ref_block_prefix: u32,
        expiration: DateTime<Utc>,
        operations: Vec<Operation>,
    ) -> Transaction {
        Transaction {
            ref_block_num,
            ref_block_prefix,
            expiration: format_expiration(&expiration),
            operations,
            extensions: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Accept a node-returned transaction object, ignoring the bookkeeping fields
    /// (`transaction_id`, `block_num`, ...) the node adds around it.
    pub fn from_json(value: Value) -> Result<Transaction> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_bytes(&self, include_signatures: bool) -> Result<Vec<u8>> {
        encode_transaction(self, include_signatures)
    }

    pub fn to_bytes_with(&self, include_signatures: bool, serializer: &Serializer<'_>) -> Result<Vec<u8>> {
        serializer.encode_transaction(self, include_signatures)
    }

    /// Lowercase hex of the serialized transaction.
    pub fn to_hex(&self, remove_signatures: bool) -> Result<String> {
        Ok(HEXLOWER.encode(&self.to_bytes(!remove_signatures)?))
    }

    /// Hex id: the first 20 bytes of SHA-256 over the unsigned serialization.
    pub fn id(&self) -> Result<String> {
        self.id_with(&Serializer::default())
    }

    /// Like [`Transaction::id`], reading public keys with the serializer's prefix.
    pub fn id_with(&self, serializer: &Serializer<'_>) -> Result<String> {
        let digest = sha256_array(&self.to_bytes_with(false, serializer)?);
        Ok(HEXLOWER.encode(&digest[..TRANSACTION_ID_LEN]))
    }

    /// SHA-256 of `chain_id ++ unsigned bytes`.
    pub fn signing_digest(&self, chain_id: &ChainId) -> Result<[u8; 32]> {
        self.signing_digest_with(chain_id, &Serializer::default())
    }

    pub fn signing_digest_with(&self, chain_id: &ChainId, serializer: &Serializer<'_>) -> Result<[u8; 32]> {
        let unsigned = serializer.encode_transaction(self, false)?;
        let mut message = Vec::with_capacity(chain_id.as_bytes().len() + unsigned.len());
        message.extend_from_slice(chain_id.as_bytes());
        message.extend_from_slice(&unsigned);
        Ok(sha256_array(&message))
    }

    /// Append one signature per key. Existing signatures are kept; whether the keys
    /// actually authorize the operations is left to the node.
    pub fn sign(&mut self, keys: &[PrivateKey], chain_id: &ChainId) -> Result<()> {
        self.sign_with(keys, chain_id, &Serializer::default())
    }

    pub fn sign_with(&mut self, keys: &[PrivateKey], chain_id: &ChainId, serializer: &Serializer<'_>) -> Result<()> {
        let digest = self.signing_digest_with(chain_id, serializer)?;
        for key in keys {
            let signature = sign_digest_canonical(&key.secret_key()?, &digest)?;
            self.signatures.push(HEXLOWER.encode(&signature));
        }
        Ok(())
    }

    /// Recover the public key behind each attached signature.
    pub fn signers(&self, chain_id: &ChainId) -> Result<Vec<PublicKey>> {
        self.signers_with(chain_id, &Serializer::default())
    }

    pub fn signers_with(&self, chain_id: &ChainId, serializer: &Serializer<'_>) -> Result<Vec<PublicKey>> {
        let digest = self.signing_digest_with(chain_id, serializer)?;
        self.signatures
            .iter()
            .map(|signature| -> Result<PublicKey> {
                let bytes = HEXLOWER
                    .decode(signature.to_ascii_lowercase().as_bytes())
                    .map_err(|e| GolosError::Encoding(format!("Signature is not hex: {e}")))?;
                Ok(PublicKey::from_point(&recover_public_key(&digest, &bytes)?))
            })
            .collect()
    }

    pub fn expiration_time(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.expiration)
    }
}

pub fn format_expiration(time: &DateTime<Utc>) -> String {
    time.format(EXPIRATION_FORMAT).to_string()
}

/// Parse a zone-less node timestamp as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, EXPIRATION_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| GolosError::Encoding(format!("Invalid timestamp {text:?}: {e}")))
}

/// Serialize a JSON transaction to hex without touching the network.
pub fn transaction_hex(tx: &Value, remove_signatures: bool) -> Result<String> {
    Transaction::from_json(tx.clone())?.to_hex(remove_signatures)
}

/// Compute the id of a JSON transaction without touching the network.
pub fn transaction_id(tx: &Value) -> Result<String> {
    Transaction::from_json(tx.clone())?.id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const REFERENCE_HEX: &str = "4b6d2b19f0b3784b935d01020a736f6d656775793132330d6b73616e746f70726f7465696e640000000000000003474f4c4f5300000774657374696e6700";

    fn reference_tx() -> Value {
        json!({
            "ref_block_num": 27979,
            "ref_block_prefix": 3018856747u32,
            "expiration": "2019-10-01T12:50:00",
            "operations": [["transfer", {
                "from": "someguy123",
                "to": "ksantoprotein",
                "amount": "0.100 GOLOS",
                "memo": "testing",
            }]],
            "extensions": [],
            "signatures": [],
        })
    }

    #[test]
    fn test_reference_transaction_bytes() {
        let tx = Transaction::from_json(reference_tx()).unwrap();
        assert_eq!(tx.to_hex(true).unwrap(), REFERENCE_HEX);
        assert_eq!(transaction_hex(&reference_tx(), true).unwrap(), REFERENCE_HEX);
        // kept signatures add their (empty) count
        assert_eq!(
            transaction_hex(&reference_tx(), false).unwrap(),
            format!("{REFERENCE_HEX}00")
        );
    }

    #[test]
    fn test_reference_transaction_id() {
        assert_eq!(
            transaction_id(&reference_tx()).unwrap(),
            "c901c52daf57b60242d9d7be67f790e023cf2780"
        );
    }

    #[test]
    fn test_id_ignores_signatures_and_node_fields() {
        let mut value = reference_tx();
        value["signatures"] = json!(["1f".repeat(65)]);
        value["transaction_id"] = json!("ffff");
        value["block_num"] = json!(12);
        let tx = Transaction::from_json(value).unwrap();
        assert_eq!(tx.id().unwrap(), "c901c52daf57b60242d9d7be67f790e023cf2780");

        let signed = tx.to_hex(false).unwrap();
        assert!(signed.starts_with(&REFERENCE_HEX[..REFERENCE_HEX.len() - 2]));
        assert!(signed.ends_with(&format!("01{}", "1f".repeat(65))));
    }

    #[test]
    fn test_operation_serializes_as_pair() {
        let op = Operation::from_value("vote", json!({"voter": "a", "weight": 100})).unwrap();
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!(["vote", {"voter": "a", "weight": 100}])
        );
        let back: Operation = serde_json::from_value(json!(["vote", {"weight": 100, "voter": "a"}])).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_same_fields_ignores_keys() {
        let query = Operation::from_value("transfer", json!({"from": "a", "to": "b", "memo": "x"})).unwrap();
        let found = Operation::from_value("transfer", json!({"to": "b", "from": "a", "memo": "y"})).unwrap();
        assert!(!query.same_fields(&found, &[]));
        assert!(query.same_fields(&found, &["memo"]));

        let wider = Operation::from_value("transfer", json!({"from": "a", "to": "b", "amount": "1.000 GOLOS"})).unwrap();
        assert!(!query.same_fields(&wider, &["memo"]));
    }

    #[test]
    fn test_sign_and_recover() {
        let key = PrivateKey::from_wif("5JWbXCEZuB9d1KDcDShQ41at452DSLyhyao12q1ZWaDWz3Lxyor").unwrap();
        let mut tx = Transaction::from_json(reference_tx()).unwrap();
        let chain_id = ChainId::golos();

        tx.sign(&[key.clone()], &chain_id).unwrap();
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.signatures[0].len(), 130);

        let signers = tx.signers(&chain_id).unwrap();
        assert_eq!(signers, vec![key.public_key().unwrap()]);
        assert_eq!(
            signers[0].to_string(),
            "GLS8PwccyJcqMsrrwk7pYJ64DVEcw7a3p4EWuXXLRBaCx4LHnVyjW"
        );

        // signing is deterministic for a fixed digest
        let mut again = Transaction::from_json(reference_tx()).unwrap();
        again.sign(&[key], &chain_id).unwrap();
        assert_eq!(again.signatures, tx.signatures);
    }

    #[test]
    fn test_digest_depends_on_chain_id() {
        let tx = Transaction::from_json(reference_tx()).unwrap();
        let other = ChainId::from_hex(&"00".repeat(32)).unwrap();
        assert_ne!(
            tx.signing_digest(&ChainId::golos()).unwrap(),
            tx.signing_digest(&other).unwrap()
        );
    }

    #[test]
    fn test_chain_id_parsing() {
        assert_eq!(ChainId::golos().to_string(), GOLOS_CHAIN_ID);
        assert!(ChainId::from_hex("abcd").is_err());
        assert!(ChainId::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_expiration_roundtrip() {
        let time = parse_timestamp("2019-10-01T12:50:00").unwrap();
        assert_eq!(time.timestamp(), 0x5d93_4b78);
        let tx = Transaction::new(1, 2, time, Vec::new());
        assert_eq!(tx.expiration, "2019-10-01T12:50:00");
        assert_eq!(tx.expiration_time().unwrap(), time);
    }
}
