//! Hand-rolled ULID (Universally Unique Lexicographically Sortable Identifier)
//! generation and parsing: a 128-bit value made of a 48-bit millisecond
//! timestamp and 80 bits of randomness, rendered as 26 Crockford base32
//! characters, canonicalized to uppercase.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use thiserror::Error;

const ENCODING: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ULID_LEN: usize = 26;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UlidError {
    #[error("ULID must be exactly 26 characters, got {0}")]
    WrongLength(usize),
    #[error("invalid Crockford base32 character '{0}' in ULID")]
    InvalidChar(char),
    #[error("ULID value overflows 128 bits")]
    Overflow,
}

/// A 128-bit ULID value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ulid(u128);

impl Ulid {
    /// Generates a new ULID from the current wall-clock millisecond
    /// timestamp and 80 bits of OS randomness.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        let mut rng = rand::rng();
        let random_hi: u64 = rng.random();
        let random_lo: u16 = rng.random();

        let timestamp = (millis & ((1u128 << 48) - 1)) << 80;
        let randomness = (u128::from(random_hi) << 16) | u128::from(random_lo);
        Ulid(timestamp | (randomness & ((1u128 << 80) - 1)))
    }

    pub fn from_u128(value: u128) -> Self {
        Ulid(value)
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    /// Canonical 26-character uppercase Crockford base32 rendering.
    pub fn to_canonical_string(&self) -> String {
        let mut chars = [0u8; ULID_LEN];
        // 26 groups of 5 bits cover 130 bits; the first group only holds
        // the top 2 of our 128 bits (its upper 3 bits are always zero).
        for (i, slot) in chars.iter_mut().enumerate() {
            let shift = (ULID_LEN - 1 - i) * 5;
            let idx = if shift >= 128 {
                0
            } else {
                ((self.0 >> shift) & 0x1F) as usize
            };
            *slot = ENCODING[idx];
        }
        String::from_utf8(chars.to_vec()).expect("ULID alphabet is ASCII")
    }
}

impl fmt::Display for Ulid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Ulid {
    type Err = UlidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        if upper.len() != ULID_LEN {
            return Err(UlidError::WrongLength(upper.len()));
        }

        let chars: Vec<char> = upper.chars().collect();
        // The top character may only carry the 2 leftover high bits, i.e.
        // digit values 0..=7; anything higher would overflow 128 bits.
        let top_digit = decode_char(chars[0])?;
        if top_digit > 7 {
            return Err(UlidError::Overflow);
        }

        let mut value: u128 = 0;
        for &c in &chars {
            let digit = decode_char(c)?;
            value = (value << 5) | u128::from(digit);
        }

        Ok(Ulid(value))
    }
}

fn decode_char(c: char) -> Result<u8, UlidError> {
    ENCODING
        .iter()
        .position(|&b| b == c as u8)
        .map(|p| p as u8)
        .ok_or(UlidError::InvalidChar(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ulid_is_26_chars_uppercase() {
        let id = Ulid::generate();
        let rendered = id.to_canonical_string();
        assert_eq!(rendered.len(), 26);
        assert_eq!(rendered, rendered.to_ascii_uppercase());
    }

    #[test]
    fn roundtrips_through_string() {
        let id = Ulid::generate();
        let rendered = id.to_string();
        let parsed: Ulid = rendered.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn lowercase_input_is_accepted_and_canonicalized() {
        let id = Ulid::generate();
        let lower = id.to_canonical_string().to_ascii_lowercase();
        let parsed: Ulid = lower.parse().unwrap();
        assert_eq!(parsed.to_canonical_string(), id.to_canonical_string());
    }

    #[test]
    fn rejects_wrong_length() {
        let err = "ABC".parse::<Ulid>().unwrap_err();
        assert_eq!(err, UlidError::WrongLength(3));
    }

    #[test]
    fn rejects_invalid_character() {
        // 'I' is excluded from the Crockford alphabet.
        let bad = "I".repeat(26);
        let err = bad.parse::<Ulid>().unwrap_err();
        assert!(matches!(err, UlidError::InvalidChar('I')));
    }

    #[test]
    fn two_generated_ulids_differ() {
        let a = Ulid::generate();
        let b = Ulid::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn ordering_follows_raw_value() {
        let a = Ulid::from_u128(1u128 << 80);
        let b = Ulid::from_u128((1u128 << 80) | 5);
        assert!(a < b);
        assert!(a.to_canonical_string() < b.to_canonical_string());
    }
}
