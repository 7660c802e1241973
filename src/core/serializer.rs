//! Graphene binary encoding
//!
//! Little-endian fixed-width integers, LEB128 varints for lengths and counts, and
//! schema-driven operation bodies. The bytes produced here are what the chain hashes
//! for transaction ids and signature digests, so they must match the node exactly.

use chrono::NaiveDateTime;
use data_encoding::HEXLOWER_PERMISSIVE;
use serde_json::{Map, Value};

use crate::core::asset::Asset;
use crate::core::schema::{self, WireType};
use crate::core::transaction::{Transaction, EXPIRATION_FORMAT};
use crate::error::{GolosError, Result};
use crate::utils::SIGNATURE_LEN;
use crate::wallet::{PublicKey, ADDRESS_PREFIX};

/// Extension tag carrying comment payout beneficiaries.
const BENEFICIARIES_TAG: u64 = 0;

static ABSENT: Value = Value::Null;

/// Append-only byte sink with Graphene primitive writers.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Unsigned LEB128: seven bits per byte, high bit set on all but the last.
    pub fn write_varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Varint byte length followed by the bytes themselves.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write_asset(&mut self, asset: &Asset) {
        self.write_i64(asset.amount());
        self.write_u8(asset.precision());
        self.write_raw(&asset.symbol_bytes());
    }

    pub fn write_public_key(&mut self, key: &PublicKey) {
        self.write_raw(key.as_bytes());
    }
}

/// Schema-driven encoder bound to one public key prefix.
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    prefix: &'a str,
}

impl Default for Serializer<'static> {
    fn default() -> Self {
        Serializer {
            prefix: ADDRESS_PREFIX,
        }
    }
}

impl<'a> Serializer<'a> {
    pub fn with_prefix(prefix: &'a str) -> Self {
        Serializer { prefix }
    }

    /// Encode the field values of one operation in schema order. The operation tag id
    /// is not included; transactions write it ahead of each body.
    pub fn encode_operation(&self, name: &str, fields: &Map<String, Value>) -> Result<Vec<u8>> {
        let mut encoder = Encoder::new();
        self.write_operation_body(&mut encoder, name, fields)?;
        Ok(encoder.into_bytes())
    }

    /// Encode a whole transaction. Signatures are appended only when asked for; the
    /// id and the signing digest are both computed over the unsigned form.
    pub fn encode_transaction(&self, tx: &Transaction, include_signatures: bool) -> Result<Vec<u8>> {
        let mut encoder = Encoder::new();
        encoder.write_u16(tx.ref_block_num);
        encoder.write_u32(tx.ref_block_prefix);
        encoder.write_u32(expiration_seconds(&tx.expiration)?);

        encoder.write_varint(tx.operations.len() as u64);
        for operation in &tx.operations {
            let schema = schema::lookup(operation.name())?;
            encoder.write_varint(u64::from(schema.id));
            self.write_operation_body(&mut encoder, operation.name(), operation.fields())?;
        }

        write_extensions(&mut encoder, "transaction", &Value::Array(tx.extensions.clone()), false)?;

        if include_signatures {
            encoder.write_varint(tx.signatures.len() as u64);
            for signature in &tx.signatures {
                let bytes = HEXLOWER_PERMISSIVE.decode(signature.as_bytes()).map_err(|e| {
                    GolosError::Encoding(format!("Signature is not hex: {e}"))
                })?;
                if bytes.len() != SIGNATURE_LEN {
                    return Err(GolosError::Encoding(format!(
                        "Signature must be {SIGNATURE_LEN} bytes, got {}",
                        bytes.len()
                    )));
                }
                encoder.write_raw(&bytes);
            }
        }

        Ok(encoder.into_bytes())
    }

    fn write_operation_body(
        &self,
        encoder: &mut Encoder,
        name: &str,
        fields: &Map<String, Value>,
    ) -> Result<()> {
        let schema = schema::lookup(name)?;
        for (field, wire_type) in schema.fields {
            let value = match fields.get(*field) {
                Some(value) => value,
                None if *wire_type == WireType::OptionalPermission => &ABSENT,
                None => {
                    return Err(GolosError::MissingField {
                        operation: name.to_string(),
                        field: field.to_string(),
                    })
                }
            };
            self.write_value(encoder, field, *wire_type, value)?;
        }
        Ok(())
    }

    fn write_value(&self, encoder: &mut Encoder, field: &str, wire_type: WireType, value: &Value) -> Result<()> {
        match wire_type {
            WireType::String => encoder.write_string(as_str(field, value)?),
            WireType::Bool => encoder.write_bool(as_bool(field, value)?),
            WireType::Int16 => encoder.write_i16(as_int(field, value)?),
            WireType::Uint16 => encoder.write_u16(as_int(field, value)?),
            WireType::Int32 => encoder.write_i32(as_int(field, value)?),
            WireType::Uint32 => encoder.write_u32(as_int(field, value)?),
            WireType::Int64 => encoder.write_i64(as_int(field, value)?),
            WireType::Uint64 => encoder.write_u64(as_int(field, value)?),
            WireType::Amount => encoder.write_asset(&Asset::parse(as_str(field, value)?)?),
            WireType::PublicKey => {
                let key = PublicKey::from_text(as_str(field, value)?, self.prefix)?;
                encoder.write_public_key(&key);
            }
            WireType::Permission => self.write_permission(encoder, field, value)?,
            WireType::OptionalPermission => {
                if value.is_null() {
                    encoder.write_u8(0);
                } else {
                    encoder.write_u8(1);
                    self.write_permission(encoder, field, value)?;
                }
            }
            WireType::ArrayString => {
                let mut names = as_array(field, value)?
                    .iter()
                    .map(|item| as_str(field, item))
                    .collect::<Result<Vec<&str>>>()?;
                names.sort_unstable();
                names.dedup();
                encoder.write_varint(names.len() as u64);
                for name in names {
                    encoder.write_string(name);
                }
            }
            WireType::Extensions => write_extensions(encoder, field, value, false)?,
            WireType::CommentExtensions => write_extensions(encoder, field, value, true)?,
        }
        Ok(())
    }

    /// `weight_threshold` as u32, then account and key weight maps. The node stores both
    /// maps sorted by key, so they are written sorted to reproduce its bytes.
    fn write_permission(&self, encoder: &mut Encoder, field: &str, value: &Value) -> Result<()> {
        let object = value
            .as_object()
            .ok_or_else(|| type_error(field, "a permission object", value))?;
        let threshold = object
            .get("weight_threshold")
            .ok_or_else(|| GolosError::Encoding(format!("Permission {field} lacks weight_threshold")))?;
        encoder.write_u32(as_int(field, threshold)?);

        let mut accounts = weight_pairs(field, object.get("account_auths"))?
            .into_iter()
            .map(|(name, weight)| -> Result<(String, u16)> {
                Ok((as_str(field, name)?.to_string(), weight))
            })
            .collect::<Result<Vec<(String, u16)>>>()?;
        accounts.sort_by(|a, b| a.0.cmp(&b.0));
        encoder.write_varint(accounts.len() as u64);
        for (name, weight) in &accounts {
            encoder.write_string(name);
            encoder.write_u16(*weight);
        }

        let mut keys = weight_pairs(field, object.get("key_auths"))?
            .into_iter()
            .map(|(key, weight)| -> Result<(PublicKey, u16)> {
                Ok((PublicKey::from_text(as_str(field, key)?, self.prefix)?, weight))
            })
            .collect::<Result<Vec<(PublicKey, u16)>>>()?;
        keys.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        encoder.write_varint(keys.len() as u64);
        for (key, weight) in &keys {
            encoder.write_public_key(key);
            encoder.write_u16(*weight);
        }
        Ok(())
    }
}

/// Encode operation fields with the default `GLS` key prefix.
pub fn encode_operation(name: &str, fields: &Map<String, Value>) -> Result<Vec<u8>> {
    Serializer::default().encode_operation(name, fields)
}

/// Encode a transaction with the default `GLS` key prefix.
pub fn encode_transaction(tx: &Transaction, include_signatures: bool) -> Result<Vec<u8>> {
    Serializer::default().encode_transaction(tx, include_signatures)
}

/// Seconds since the unix epoch for a `YYYY-MM-DDTHH:MM:SS` UTC timestamp.
pub fn expiration_seconds(expiration: &str) -> Result<u32> {
    let parsed = NaiveDateTime::parse_from_str(expiration, EXPIRATION_FORMAT)
        .map_err(|e| GolosError::Encoding(format!("Invalid expiration {expiration:?}: {e}")))?;
    u32::try_from(parsed.and_utc().timestamp())
        .map_err(|_| GolosError::EncodingOverflow(format!("Expiration {expiration} does not fit u32")))
}

/// Count-prefixed `(tag, payload)` pairs. With `comment` set, tag 0 carries payout
/// beneficiaries; every other tag writes its payload through the raw fallback.
fn write_extensions(encoder: &mut Encoder, field: &str, value: &Value, comment: bool) -> Result<()> {
    let entries = match value {
        Value::Null => {
            encoder.write_varint(0);
            return Ok(());
        }
        other => as_array(field, other)?,
    };
    encoder.write_varint(entries.len() as u64);

    for entry in entries {
        let (tag, payload) = match entry.as_array().map(Vec::as_slice) {
            Some([tag, payload]) => (as_int::<u64>(field, tag)?, payload),
            _ => return Err(type_error(field, "a [tag, payload] pair", entry)),
        };
        encoder.write_varint(tag);

        if comment && tag == BENEFICIARIES_TAG {
            let beneficiaries = payload
                .get("beneficiaries")
                .ok_or_else(|| GolosError::Encoding(format!("{field}: beneficiaries list expected")))?;
            let beneficiaries = as_array(field, beneficiaries)?;
            encoder.write_varint(beneficiaries.len() as u64);
            for beneficiary in beneficiaries {
                let account = beneficiary
                    .get("account")
                    .ok_or_else(|| type_error(field, "a beneficiary account", beneficiary))?;
                let weight = beneficiary
                    .get("weight")
                    .ok_or_else(|| type_error(field, "a beneficiary weight", beneficiary))?;
                encoder.write_string(as_str(field, account)?);
                encoder.write_u16(as_int(field, weight)?);
            }
        } else {
            encoder.write_raw(&raw_extension_payload(payload));
        }
    }
    Ok(())
}

/// Hex strings are written as their decoded bytes, anything else as its compact JSON.
fn raw_extension_payload(payload: &Value) -> Vec<u8> {
    if let Value::String(text) = payload {
        if let Ok(bytes) = HEXLOWER_PERMISSIVE.decode(text.as_bytes()) {
            return bytes;
        }
    }
    payload.to_string().into_bytes()
}

fn weight_pairs<'v>(field: &str, value: Option<&'v Value>) -> Result<Vec<(&'v Value, u16)>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    as_array(field, value)?
        .iter()
        .map(|pair| -> Result<(&'v Value, u16)> {
            match pair.as_array().map(Vec::as_slice) {
                Some([key, weight]) => Ok((key, as_int(field, weight)?)),
                _ => Err(type_error(field, "a [key, weight] pair", pair)),
            }
        })
        .collect()
}

fn type_error(field: &str, expected: &str, value: &Value) -> GolosError {
    GolosError::Encoding(format!("Field {field} expects {expected}, got {value}"))
}

fn as_str<'v>(field: &str, value: &'v Value) -> Result<&'v str> {
    value.as_str().ok_or_else(|| type_error(field, "a string", value))
}

fn as_bool(field: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| type_error(field, "a boolean", value))
}

fn as_array<'v>(field: &str, value: &'v Value) -> Result<&'v Vec<Value>> {
    value.as_array().ok_or_else(|| type_error(field, "a list", value))
}

/// Integers arrive as JSON numbers or, for 64-bit values, decimal strings. Values
/// outside the target width are an overflow, never a silent truncation.
fn as_int<T>(field: &str, value: &Value) -> Result<T>
where
    T: TryFrom<i128>,
{
    let wide: i128 = match value {
        Value::Number(number) => {
            if let Some(v) = number.as_i64() {
                i128::from(v)
            } else if let Some(v) = number.as_u64() {
                i128::from(v)
            } else {
                return Err(type_error(field, "an integer", value));
            }
        }
        Value::String(text) => text
            .trim()
            .parse::<i128>()
            .map_err(|_| type_error(field, "an integer", value))?,
        _ => return Err(type_error(field, "an integer", value)),
    };
    T::try_from(wide).map_err(|_| {
        GolosError::EncodingOverflow(format!(
            "Field {field} value {wide} is out of range for {}",
            std::any::type_name::<T>()
        ))
    })
}
