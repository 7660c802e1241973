use once_cell::sync::Lazy;
use ring::digest::{Context, SHA256};
use ripemd::{Digest as RipemdDigest, Ripemd160};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

use crate::error::{GolosError, Result};

pub const CHECKSUM_LEN: usize = 4;

/// Compact recoverable signature: one header byte followed by `r` and `s`.
pub const SIGNATURE_LEN: usize = 65;

// compressed key flag (4) on top of the legacy 27 offset
const RECOVERY_HEADER_BASE: u8 = 27 + 4;

static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Which checksum a Base58Check string carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checksum {
    /// First four bytes of SHA-256(SHA-256(payload)); used for WIF private keys
    DoubleSha256,
    /// First four bytes of RIPEMD-160(payload); used for prefixed public keys
    Ripemd160,
}

impl Checksum {
    fn compute(self, payload: &[u8]) -> [u8; CHECKSUM_LEN] {
        let digest = match self {
            Checksum::DoubleSha256 => sha256_digest(&sha256_digest(payload)),
            Checksum::Ripemd160 => ripemd160_digest(payload),
        };
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[..CHECKSUM_LEN]);
        out
    }
}

pub fn secp() -> &'static Secp256k1<All> {
    &SECP
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(context.finish().as_ref());
    out
}

pub fn ripemd160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| GolosError::InvalidKeyEncoding(format!("Invalid base58 encoding: {e}")))
}

/// Append the checksum to `payload` and base58 encode the result.
pub fn base58check_encode(payload: &[u8], checksum: Checksum) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&checksum.compute(payload));
    base58_encode(&data)
}

/// Decode base58 text and verify its trailing checksum, returning the payload.
pub fn base58check_decode(text: &str, checksum: Checksum) -> Result<Vec<u8>> {
    let mut data = base58_decode(text)?;
    if data.len() <= CHECKSUM_LEN {
        return Err(GolosError::InvalidKeyEncoding(
            "Base58Check payload too short".to_string(),
        ));
    }

    let actual = data.split_off(data.len() - CHECKSUM_LEN);
    let expected = checksum.compute(&data);
    if actual.as_slice() != expected {
        return Err(GolosError::InvalidKeyEncoding(format!(
            "Checksum mismatch for {text}"
        )));
    }
    Ok(data)
}

/// Graphene nodes only accept signatures whose `r` and `s` are both exactly 32 bytes
/// in DER form, i.e. no high bit and no redundant leading zero.
pub fn is_canonical(compact: &[u8; 64]) -> bool {
    compact[0] & 0x80 == 0
        && !(compact[0] == 0 && compact[1] & 0x80 == 0)
        && compact[32] & 0x80 == 0
        && !(compact[32] == 0 && compact[33] & 0x80 == 0)
}

/// Sign a 32-byte digest producing a canonical, low-S, recoverable signature.
///
/// The nonce is RFC6979-deterministic. When the result is not canonical the nonce
/// derivation is fed an attempt counter as extra data, so the output is still a pure
/// function of `(secret, digest)`.
pub fn sign_digest_canonical(secret: &SecretKey, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN]> {
    let message = Message::from_digest(*digest);
    let public_key = PublicKey::from_secret_key(secp(), secret);

    let mut attempt: u32 = 0;
    loop {
        let mut signature = if attempt == 0 {
            secp().sign_ecdsa(&message, secret)
        } else {
            let mut noncedata = [0u8; 32];
            noncedata[..4].copy_from_slice(&attempt.to_le_bytes());
            secp().sign_ecdsa_with_noncedata(&message, secret, &noncedata)
        };
        signature.normalize_s();
        let compact = signature.serialize_compact();

        if is_canonical(&compact) {
            let recovery_id = find_recovery_id(digest, &compact, &public_key)?;
            let mut out = [0u8; SIGNATURE_LEN];
            out[0] = RECOVERY_HEADER_BASE + recovery_id;
            out[1..].copy_from_slice(&compact);
            return Ok(out);
        }

        attempt = attempt
            .checked_add(1)
            .ok_or_else(|| GolosError::Crypto("Canonical signature search exhausted".to_string()))?;
    }
}

/// Try each candidate recovery id until the recovered key is the signer's.
pub fn find_recovery_id(digest: &[u8; 32], compact: &[u8; 64], expected: &PublicKey) -> Result<u8> {
    let message = Message::from_digest(*digest);
    for candidate in 0..4u8 {
        let recovery_id = RecoveryId::from_i32(i32::from(candidate))?;
        let Ok(signature) = RecoverableSignature::from_compact(compact, recovery_id) else {
            continue;
        };
        if let Ok(recovered) = secp().recover_ecdsa(&message, &signature) {
            if &recovered == expected {
                return Ok(candidate);
            }
        }
    }
    Err(GolosError::Crypto(
        "No recovery id reproduces the signing key".to_string(),
    ))
}

/// Recover the signer's public key from a digest and a 65-byte signature.
pub fn recover_public_key(digest: &[u8; 32], signature: &[u8]) -> Result<PublicKey> {
    if signature.len() != SIGNATURE_LEN {
        return Err(GolosError::Crypto(format!(
            "Signature must be {SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }
    let header = signature[0];
    if !(RECOVERY_HEADER_BASE..RECOVERY_HEADER_BASE + 4).contains(&header) {
        return Err(GolosError::Crypto(format!(
            "Unexpected signature header byte {header}"
        )));
    }
    let recovery_id = RecoveryId::from_i32(i32::from(header - RECOVERY_HEADER_BASE))?;
    let recoverable = RecoverableSignature::from_compact(&signature[1..], recovery_id)?;
    let message = Message::from_digest(*digest);
    Ok(secp().recover_ecdsa(&message, &recoverable)?)
}
