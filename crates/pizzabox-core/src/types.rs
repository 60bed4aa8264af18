//! Core type definitions for PizzaBox

/// Nanoton amount (1 TON = 1_000_000_000 nanoton)
pub type NanoTon = u64;

/// Constants
pub mod constants {
    use super::NanoTon;

    /// 1 TON in nanoton
    pub const NANOTON_PER_TON: NanoTon = 1_000_000_000;

    /// Decimal places of the native coin
    pub const TON_DECIMALS: usize = 9;

    /// Seconds in one day
    pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
}

/// Convert a decimal TON string (e.g. "0.645") to nanoton.
///
/// Returns `None` for malformed input, more than 9 fractional digits, or overflow.
pub fn to_nano(ton: &str) -> Option<NanoTon> {
    let ton = ton.trim();
    let (whole, frac) = match ton.split_once('.') {
        Some((w, f)) => (w, f),
        None => (ton, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > constants::TON_DECIMALS
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let whole: NanoTon = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_nano: NanoTon = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = constants::TON_DECIMALS);
        padded.parse().ok()?
    };

    whole
        .checked_mul(constants::NANOTON_PER_TON)?
        .checked_add(frac_nano)
}

/// Serde adapter that writes a `BigUint` as a decimal string.
///
/// Jetton amounts routinely exceed what JSON numbers can carry exactly.
pub mod biguint_string {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid unsigned integer: {}", s)))
    }
}
