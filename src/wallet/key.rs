use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use once_cell::sync::Lazy;
use secp256k1::constants::CURVE_ORDER;
use secp256k1::SecretKey;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{GolosError, Result};
use crate::utils::{base58check_decode, base58check_encode, secp, sha256_array, Checksum};

/// Public key prefix of the Golos network.
pub const ADDRESS_PREFIX: &str = "GLS";
pub const PRIVATE_KEY_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 33;

const WIF_VERSION: u8 = 0x80;
const WIF_COMPRESSED_FLAG: u8 = 0x01;

static ORDER: Lazy<BigUint> = Lazy::new(|| BigUint::from_bytes_be(&CURVE_ORDER));

/// Authority role an account key is derived for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Owner,
    Active,
    Posting,
    Memo,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Active, Role::Posting, Role::Memo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Active => "active",
            Role::Posting => "posting",
            Role::Memo => "memo",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = GolosError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "active" => Ok(Role::Active),
            "posting" => Ok(Role::Posting),
            "memo" => Ok(Role::Memo),
            _ => Err(GolosError::Config(format!(
                "Invalid role: {s}. Valid options: owner, active, posting, memo"
            ))),
        }
    }
}

/// secp256k1 private scalar. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    bytes: [u8; PRIVATE_KEY_LEN],
}

impl PrivateKey {
    /// Interpret `seed` as a big-endian integer reduced modulo the curve order.
    pub fn from_seed(seed: &[u8; 32]) -> Result<PrivateKey> {
        let scalar = BigUint::from_bytes_be(seed) % &*ORDER;
        let mut reduced = scalar.to_bytes_be();
        if reduced.len() > PRIVATE_KEY_LEN {
            return Err(GolosError::Crypto("Reduced scalar exceeds 32 bytes".to_string()));
        }

        let mut bytes = [0u8; PRIVATE_KEY_LEN];
        bytes[PRIVATE_KEY_LEN - reduced.len()..].copy_from_slice(&reduced);
        reduced.zeroize();
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<PrivateKey> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(GolosError::InvalidKeyEncoding(format!(
                "Private key must be {PRIVATE_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        // rejects zero and values at or above the curve order
        SecretKey::from_slice(bytes)
            .map_err(|e| GolosError::InvalidKeyEncoding(format!("Invalid private scalar: {e}")))?;

        let mut key = [0u8; PRIVATE_KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(PrivateKey { bytes: key })
    }

    pub fn from_wif(wif: &str) -> Result<PrivateKey> {
        let payload = Zeroizing::new(base58check_decode(wif, Checksum::DoubleSha256)?);
        if payload.first() != Some(&WIF_VERSION) {
            return Err(GolosError::InvalidKeyEncoding(
                "WIF version byte must be 0x80".to_string(),
            ));
        }

        let body = &payload[1..];
        match body.len() {
            PRIVATE_KEY_LEN => Self::from_bytes(body),
            n if n == PRIVATE_KEY_LEN + 1 && body[PRIVATE_KEY_LEN] == WIF_COMPRESSED_FLAG => {
                Self::from_bytes(&body[..PRIVATE_KEY_LEN])
            }
            n => Err(GolosError::InvalidKeyEncoding(format!(
                "Unexpected WIF payload length {n}"
            ))),
        }
    }

    pub fn to_wif(&self) -> String {
        let mut payload = Zeroizing::new(Vec::with_capacity(PRIVATE_KEY_LEN + 1));
        payload.push(WIF_VERSION);
        payload.extend_from_slice(&self.bytes);
        base58check_encode(&payload, Checksum::DoubleSha256)
    }

    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.bytes
    }

    pub fn secret_key(&self) -> Result<SecretKey> {
        Ok(SecretKey::from_slice(&self.bytes)?)
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        let secret = self.secret_key()?;
        let point = secp256k1::PublicKey::from_secret_key(secp(), &secret);
        Ok(PublicKey::from_point(&point))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

impl FromStr for PrivateKey {
    type Err = GolosError;

    fn from_str(s: &str) -> Result<Self> {
        PrivateKey::from_wif(s)
    }
}

/// Compressed secp256k1 point (parity prefix followed by the x coordinate).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    compressed: [u8; PUBLIC_KEY_LEN],
}

impl PublicKey {
    pub fn from_point(point: &secp256k1::PublicKey) -> PublicKey {
        PublicKey {
            compressed: point.serialize(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<PublicKey> {
        let point = secp256k1::PublicKey::from_slice(bytes)
            .map_err(|e| GolosError::InvalidKeyEncoding(format!("Invalid curve point: {e}")))?;
        Ok(Self::from_point(&point))
    }

    /// Parse `<prefix><base58(point ++ ripemd160(point)[..4])>`.
    pub fn from_text(text: &str, prefix: &str) -> Result<PublicKey> {
        let encoded = text.strip_prefix(prefix).ok_or_else(|| {
            GolosError::InvalidKeyEncoding(format!("Public key {text} lacks prefix {prefix}"))
        })?;
        let payload = base58check_decode(encoded, Checksum::Ripemd160)?;
        if payload.len() != PUBLIC_KEY_LEN {
            return Err(GolosError::InvalidKeyEncoding(format!(
                "Public key must be {PUBLIC_KEY_LEN} bytes, got {}",
                payload.len()
            )));
        }
        Self::from_bytes(&payload)
    }

    pub fn to_text(&self, prefix: &str) -> String {
        format!(
            "{prefix}{}",
            base58check_encode(&self.compressed, Checksum::Ripemd160)
        )
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.compressed
    }

    pub fn to_point(&self) -> Result<secp256k1::PublicKey> {
        Ok(secp256k1::PublicKey::from_slice(&self.compressed)?)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text(ADDRESS_PREFIX))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = GolosError;

    fn from_str(s: &str) -> Result<Self> {
        PublicKey::from_text(s, ADDRESS_PREFIX)
    }
}

/// Keys of one role, in both raw and text form.
#[derive(Clone)]
pub struct KeyPair {
    role: Role,
    private_key: PrivateKey,
    public_key: PublicKey,
    wif: Zeroizing<String>,
    public_text: String,
}

impl KeyPair {
    pub fn derive(account: &str, role: Role, password: &str, prefix: &str) -> Result<KeyPair> {
        let private_key = derive_private_key(account, role, password)?;
        let public_key = private_key.public_key()?;
        Ok(KeyPair {
            role,
            wif: Zeroizing::new(private_key.to_wif()),
            public_text: public_key.to_text(prefix),
            private_key,
            public_key,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn wif(&self) -> &str {
        self.wif.as_str()
    }

    pub fn public_text(&self) -> &str {
        &self.public_text
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("role", &self.role)
            .field("public", &self.public_text)
            .finish_non_exhaustive()
    }
}

/// Role keys of one account, as derived from its login and password.
#[derive(Debug, Clone)]
pub struct AccountKeys {
    login: String,
    pairs: Vec<KeyPair>,
}

impl AccountKeys {
    pub fn derive(account: &str, password: &str, prefix: &str) -> Result<AccountKeys> {
        let pairs = Role::ALL
            .iter()
            .map(|role| KeyPair::derive(account, *role, password, prefix))
            .collect::<Result<Vec<_>>>()?;
        Ok(AccountKeys {
            login: account.to_string(),
            pairs,
        })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn get(&self, role: Role) -> Option<&KeyPair> {
        self.pairs.iter().find(|pair| pair.role == role)
    }

    pub fn private(&self, role: Role) -> Option<&str> {
        self.get(role).map(KeyPair::wif)
    }

    pub fn public(&self, role: Role) -> Option<&str> {
        self.get(role).map(KeyPair::public_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPair> {
        self.pairs.iter()
    }
}

/// SHA-256 over `account ++ role ++ password`, reduced to a private scalar.
pub fn derive_private_key(account: &str, role: Role, password: &str) -> Result<PrivateKey> {
    let mut material = Zeroizing::new(String::with_capacity(
        account.len() + role.as_str().len() + password.len(),
    ));
    material.push_str(account);
    material.push_str(role.as_str());
    material.push_str(password);

    let mut seed = sha256_array(material.as_bytes());
    let key = PrivateKey::from_seed(&seed);
    seed.zeroize();
    key
}

/// Derive all four role keys of `account` with the Golos prefix.
pub fn derive_keys(account: &str, password: &str) -> Result<AccountKeys> {
    AccountKeys::derive(account, password, ADDRESS_PREFIX)
}

pub fn public_from_wif(wif: &str) -> Result<String> {
    public_from_wif_with_prefix(wif, ADDRESS_PREFIX)
}

pub fn public_from_wif_with_prefix(wif: &str, prefix: &str) -> Result<String> {
    Ok(PrivateKey::from_wif(wif)?.public_key()?.to_text(prefix))
}

/// Check whether `public_text` is the public key of `wif`.
///
/// Malformed input on either side simply does not match.
pub fn is_key(wif: &str, public_text: &str) -> bool {
    is_key_with_prefix(wif, public_text, ADDRESS_PREFIX)
}

pub fn is_key_with_prefix(wif: &str, public_text: &str, prefix: &str) -> bool {
    match public_from_wif_with_prefix(wif, prefix) {
        Ok(derived) => constant_time_eq(derived.as_bytes(), public_text.as_bytes()),
        Err(_) => false,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIF_1: &str = "5Jq19TeeVmGrBFnu32oxfxQMiipnSCKmwW7fZGUVLAoqsKJ9JwP";
    const PUB_1: &str = "GLS7qHue1h2eWV8M7WKtb6F8dbhKfEFvLVy9JqvSTHBBEM5JMdsmh";
    const WIF_2: &str = "5KPQo2iNeACYagW5qAsgNpFxDDuwuArCCG8PvU6FKTMcD5LmhzJ";
    const PUB_2: &str = "GLS8G7rgqhPUbyzYVYWb8BPcHtpgLDmJYooHmHPbaLaH7cdywsdwm";

    #[test]
    fn test_public_from_private() {
        assert_eq!(public_from_wif(WIF_1).unwrap(), PUB_1);
        assert_eq!(public_from_wif(WIF_2).unwrap(), PUB_2);
    }

    #[test]
    fn test_is_key() {
        assert!(is_key(WIF_1, PUB_1));
        assert!(!is_key(WIF_1, PUB_2));
        assert!(!is_key("not-a-wif", PUB_1));
    }

    #[test]
    fn test_is_key_with_prefix() {
        let tst = PUB_1.replacen(ADDRESS_PREFIX, "TST", 1);
        assert!(is_key_with_prefix(WIF_1, &tst, "TST"));
        assert!(!is_key_with_prefix(WIF_1, PUB_1, "TST"));
        assert!(!is_key(WIF_1, &tst));
    }

    #[test]
    fn test_derive_active_key() {
        let keys = derive_keys("someguy123", "example").unwrap();
        assert_eq!(
            keys.private(Role::Active).unwrap(),
            "5KME2a7DBdGBdpAwLC4tGmJ8mSz9HgZkcMtKc8rkADn6cLZyvPc"
        );
        assert_eq!(
            keys.public(Role::Active).unwrap(),
            "GLS7LjcmXF4mf9z3MNgcceSvMG8oezEtGhcL4yAXpJWFZxdX47ET7"
        );
    }

    #[test]
    fn test_derive_all_roles() {
        let keys = derive_keys("someguy123", "example").unwrap();
        assert_eq!(keys.login(), "someguy123");
        assert_eq!(keys.iter().count(), 4);
        assert_eq!(
            keys.public(Role::Owner).unwrap(),
            "GLS7jcKpYMs7EL2QoQCu4mHJnNGU9ZmoVZ4j5UEAxi1sKZxhXBMoU"
        );
        assert_eq!(
            keys.private(Role::Posting).unwrap(),
            "5JPw2n6NpitXh7xCXA2of3FcmAPtQFv92PA38jvrHdL4unqXR58"
        );
        assert_eq!(
            keys.public(Role::Memo).unwrap(),
            "GLS8PwccyJcqMsrrwk7pYJ64DVEcw7a3p4EWuXXLRBaCx4LHnVyjW"
        );
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_keys("alice", "correct horse").unwrap();
        let b = derive_keys("alice", "correct horse").unwrap();
        for role in Role::ALL {
            assert_eq!(a.private(role), b.private(role));
            assert_eq!(a.public(role), b.public(role));
        }
        let c = derive_keys("alice", "correct horsf").unwrap();
        assert_ne!(a.public(Role::Active), c.public(Role::Active));
    }

    #[test]
    fn test_wif_roundtrip() {
        let key = PrivateKey::from_wif(WIF_1).unwrap();
        assert_eq!(key.to_wif(), WIF_1);
    }

    #[test]
    fn test_public_text_roundtrip() {
        let key: PublicKey = PUB_1.parse().unwrap();
        assert_eq!(key.to_string(), PUB_1);
        assert!(key.as_bytes()[0] == 0x02 || key.as_bytes()[0] == 0x03);
    }

    #[test]
    fn test_public_text_rejects_bad_checksum_and_prefix() {
        let mut corrupted = PUB_1.to_string();
        corrupted.pop();
        corrupted.push('z');
        assert!(matches!(
            corrupted.parse::<PublicKey>(),
            Err(GolosError::InvalidKeyEncoding(_))
        ));
        assert!(matches!(
            PublicKey::from_text(PUB_1, "STM"),
            Err(GolosError::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn test_wif_rejects_corruption() {
        let mut corrupted = WIF_1.to_string();
        corrupted.replace_range(10..11, "X");
        assert!(matches!(
            PrivateKey::from_wif(&corrupted),
            Err(GolosError::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn test_seed_reduction_modulo_order() {
        // the order itself reduces to zero, which is not a valid scalar
        assert!(PrivateKey::from_seed(&CURVE_ORDER).is_err());

        let mut above = CURVE_ORDER;
        above[31] += 1;
        let key = PrivateKey::from_seed(&above).unwrap();
        let mut one = [0u8; 32];
        one[31] = 1;
        assert_eq!(key.as_bytes(), &one);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Active".parse::<Role>().unwrap(), Role::Active);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let keys = derive_keys("someguy123", "example").unwrap();
        let printed = format!("{keys:?}");
        assert!(!printed.contains("5KME2a7DBdGBdpAwLC4tGmJ8mSz9HgZkcMtKc8rkADn6cLZyvPc"));
    }
}
