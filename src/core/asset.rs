use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GolosError, Result};

/// Asset symbols are stored NUL-padded to this width on the wire.
pub const SYMBOL_LEN: usize = 7;

/// Decimal places the chain uses for each native asset.
pub fn asset_precision(symbol: &str) -> Option<u8> {
    match symbol {
        "GOLOS" | "GBG" => Some(3),
        "GESTS" => Some(6),
        _ => None,
    }
}

/// A chain amount such as `"0.100 GOLOS"`, kept as an integer in base units.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    amount: i64,
    precision: u8,
    symbol: String,
}

impl Asset {
    pub fn new(amount: i64, precision: u8, symbol: &str) -> Result<Asset> {
        validate_symbol(symbol)?;
        Ok(Asset {
            amount,
            precision,
            symbol: symbol.to_string(),
        })
    }

    /// Parse `"<decimal> <SYMBOL>"`. Precision is the number of fractional digits as
    /// written, so `"1.000 GOLOS"` and `"1 GOLOS"` differ.
    pub fn parse(text: &str) -> Result<Asset> {
        let mut parts = text.split_whitespace();
        let (Some(number), Some(symbol), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(GolosError::Encoding(format!(
                "Amount must look like \"0.100 GOLOS\", got {text:?}"
            )));
        };
        validate_symbol(symbol)?;

        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || !is_digits(whole) || (digits.contains('.') && fraction.is_empty()) {
            return Err(GolosError::Encoding(format!("Invalid amount number {number:?}")));
        }
        if !fraction.is_empty() && !is_digits(fraction) {
            return Err(GolosError::Encoding(format!("Invalid amount number {number:?}")));
        }

        let precision = u8::try_from(fraction.len())
            .map_err(|_| GolosError::EncodingOverflow(format!("Too many decimals in {number}")))?;
        let amount = scaled_amount(whole, fraction, negative)
            .ok_or_else(|| GolosError::EncodingOverflow(format!("Amount {number} does not fit i64")))?;

        Ok(Asset {
            amount,
            precision,
            symbol: symbol.to_string(),
        })
    }

    /// Build an asset from a bare decimal using the symbol's native precision, padding
    /// short fractions with zeros. Extra non-zero digits are rejected rather than rounded.
    pub fn from_decimal(number: &str, symbol: &str) -> Result<Asset> {
        let precision = asset_precision(symbol)
            .ok_or_else(|| GolosError::Encoding(format!("Unknown asset symbol {symbol}")))?;
        let parsed = Asset::parse(&format!("{number} {symbol}"))?;

        match parsed.precision.cmp(&precision) {
            std::cmp::Ordering::Equal => Ok(parsed),
            std::cmp::Ordering::Less => {
                let factor = 10i64
                    .checked_pow(u32::from(precision - parsed.precision))
                    .and_then(|f| parsed.amount.checked_mul(f))
                    .ok_or_else(|| GolosError::EncodingOverflow(format!("Amount {number} does not fit i64")))?;
                Asset::new(factor, precision, symbol)
            }
            std::cmp::Ordering::Greater => {
                let divisor = 10i64
                    .checked_pow(u32::from(parsed.precision - precision))
                    .ok_or_else(|| GolosError::EncodingOverflow(format!("Too many decimals in {number}")))?;
                if parsed.amount % divisor != 0 {
                    return Err(GolosError::Encoding(format!(
                        "{symbol} amounts carry at most {precision} decimals, got {number}"
                    )));
                }
                Asset::new(parsed.amount / divisor, precision, symbol)
            }
        }
    }

    /// `format("0.1", "GOLOS")` gives `"0.100 GOLOS"`.
    pub fn format(number: &str, symbol: &str) -> Result<String> {
        Ok(Asset::from_decimal(number, symbol)?.to_string())
    }

    /// Amount in base units, i.e. scaled by `10^precision`.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Symbol bytes padded with NULs to [`SYMBOL_LEN`].
    pub fn symbol_bytes(&self) -> [u8; SYMBOL_LEN] {
        let mut out = [0u8; SYMBOL_LEN];
        out[..self.symbol.len()].copy_from_slice(self.symbol.as_bytes());
        out
    }
}

fn is_digits(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_digit())
}

fn scaled_amount(whole: &str, fraction: &str, negative: bool) -> Option<i64> {
    let mut value: i64 = 0;
    for digit in whole.bytes().chain(fraction.bytes()) {
        let digit = i64::from(digit - b'0');
        value = value.checked_mul(10)?;
        value = if negative {
            value.checked_sub(digit)?
        } else {
            value.checked_add(digit)?
        };
    }
    Some(value)
}

fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() || symbol.len() > SYMBOL_LEN {
        return Err(GolosError::Encoding(format!(
            "Asset symbol must be 1 to {SYMBOL_LEN} bytes, got {symbol:?}"
        )));
    }
    if !symbol.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(GolosError::Encoding(format!(
            "Asset symbol must be upper-case ASCII, got {symbol:?}"
        )));
    }
    Ok(())
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        if self.precision == 0 {
            return write!(f, "{sign}{magnitude} {}", self.symbol);
        }
        let digits = format!("{magnitude:0>width$}", width = usize::from(self.precision) + 1);
        let (whole, fraction) = digits.split_at(digits.len() - usize::from(self.precision));
        write!(f, "{sign}{whole}.{fraction} {}", self.symbol)
    }
}

impl FromStr for Asset {
    type Err = GolosError;

    fn from_str(s: &str) -> Result<Self> {
        Asset::parse(s)
    }
}

impl Serialize for Asset {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Asset::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transfer_amount() {
        let asset = Asset::parse("0.100 GOLOS").unwrap();
        assert_eq!(asset.amount, 100);
        assert_eq!(asset.precision, 3);
        assert_eq!(asset.symbol, "GOLOS");
        assert_eq!(asset.symbol_bytes(), *b"GOLOS\0\0");
        assert_eq!(asset.to_string(), "0.100 GOLOS");
    }

    #[test]
    fn test_symbol_length_is_bounded() {
        assert!(Asset::new(1, 0, "ABCDEFGH").is_err());
        assert!(Asset::parse("1.000 ABCDEFGH").is_err());

        let longest = Asset::new(1, 0, "ABCDEFG").unwrap();
        assert_eq!(longest.symbol_bytes(), *b"ABCDEFG");
        assert_eq!(longest.symbol(), "ABCDEFG");
    }

    #[test]
    fn test_parse_negative_and_integer() {
        let asset = Asset::parse("-12.5 GBG").unwrap();
        assert_eq!((asset.amount, asset.precision), (-125, 1));
        assert_eq!(asset.to_string(), "-12.5 GBG");

        let asset = Asset::parse("7 GOLOS").unwrap();
        assert_eq!((asset.amount, asset.precision), (7, 0));
        assert_eq!(asset.to_string(), "7 GOLOS");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["", "1.000", "abc GOLOS", "1. GOLOS", ".5 GOLOS", "1.0 golos", "1.0 TOOLONGSYM", "1 2 GOLOS"] {
            assert!(Asset::parse(text).is_err(), "{text} should not parse");
        }
    }

    #[test]
    fn test_parse_overflow() {
        assert!(matches!(
            Asset::parse("92233720368547758.08 GOLOS"),
            Err(GolosError::EncodingOverflow(_))
        ));
        assert_eq!(
            Asset::parse("-9223372036854775808 GOLOS").unwrap().amount,
            i64::MIN
        );
    }

    #[test]
    fn test_from_decimal_uses_native_precision() {
        assert_eq!(Asset::from_decimal("0.1", "GOLOS").unwrap().to_string(), "0.100 GOLOS");
        assert_eq!(Asset::from_decimal("2", "GESTS").unwrap().to_string(), "2.000000 GESTS");
        assert_eq!(Asset::from_decimal("1.2500", "GBG").unwrap().to_string(), "1.250 GBG");
        assert!(Asset::from_decimal("1.2345", "GBG").is_err());
        assert!(Asset::from_decimal("1", "XYZ").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let asset: Asset = serde_json::from_str("\"1.000 GOLOS\"").unwrap();
        assert_eq!(serde_json::to_string(&asset).unwrap(), "\"1.000 GOLOS\"");
    }
}
