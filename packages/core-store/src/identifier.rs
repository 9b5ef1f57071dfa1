//! Identifier codec.
//!
//! Records refer to palettes and other objects by UUID. Text formats store
//! them as 32 lowercase hex digits without separators, binary formats as the
//! raw 16 bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::Value;

/// Number of hex digits in the text form.
pub const TEXT_LEN: usize = 32;

/// Number of bytes in the binary form.
pub const BINARY_LEN: usize = 16;

/// A malformed identifier.
///
/// Parse routines recover from this locally by substituting a default, so it
/// rarely escapes a record implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected 32 hex digits, found {0} characters")]
    TextLength(usize),

    #[error("invalid hex digit {ch:?} at offset {offset}")]
    InvalidDigit { ch: char, offset: usize },

    #[error("expected 16 bytes, found {0}")]
    BinaryLength(usize),

    #[error("expected a {expected} value, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
}

/// A universally-unique identifier as stored in records.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Identifier(Uuid);

impl Identifier {
    /// The all-zero identifier.
    pub const NIL: Identifier = Identifier(Uuid::nil());

    pub const fn from_u128(v: u128) -> Self {
        Self(Uuid::from_u128(v))
    }

    /// Generate a fresh random identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Text form: 32 lowercase hex digits, no separators.
    pub fn to_text(&self) -> String {
        self.0.simple().to_string()
    }

    /// Parse the text form. Upper-case digits are accepted, separators are not.
    pub fn from_text(s: &str) -> Result<Self, DecodeError> {
        if s.len() != TEXT_LEN {
            return Err(DecodeError::TextLength(s.chars().count()));
        }
        if let Some((offset, ch)) = s.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
            return Err(DecodeError::InvalidDigit { ch, offset });
        }
        // Only ASCII hex digits remain, so this cannot fail.
        u128::from_str_radix(s, 16)
            .map(Self::from_u128)
            .map_err(|_| DecodeError::TextLength(s.len()))
    }

    /// Binary form: the 16 raw bytes, big-endian as in RFC 4122.
    pub fn to_binary(&self) -> [u8; BINARY_LEN] {
        *self.0.as_bytes()
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, DecodeError> {
        let arr: [u8; BINARY_LEN] = bytes
            .try_into()
            .map_err(|_| DecodeError::BinaryLength(bytes.len()))?;
        Ok(Self(Uuid::from_bytes(arr)))
    }

    /// Decode a text-backend value (a hex string).
    pub fn from_text_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::String(s) => Self::from_text(s),
            other => Err(DecodeError::WrongType {
                expected: "string",
                found: other.kind(),
            }),
        }
    }

    /// Decode a binary-backend value (raw bytes).
    pub fn from_binary_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bytes(b) => Self::from_binary(b),
            other => Err(DecodeError::WrongType {
                expected: "bytes",
                found: other.kind(),
            }),
        }
    }

    pub fn to_text_value(&self) -> Value {
        Value::String(self.to_text())
    }

    pub fn to_binary_value(&self) -> Value {
        Value::Bytes(self.to_binary().to_vec())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for Identifier {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

impl From<Uuid> for Identifier {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "5a1c2bd9e4f04f0c9d3d2a4a6f1b8e77";

    #[test]
    fn text_form_is_lowercase_without_separators() {
        let id = Identifier::from_u128(0xABCDEF);
        let text = id.to_text();
        assert_eq!(text.len(), TEXT_LEN);
        assert_eq!(text, "00000000000000000000000000abcdef");
        assert_eq!(id.to_string(), text);
    }

    #[test]
    fn uppercase_text_is_accepted() {
        let lower = Identifier::from_text(SAMPLE).unwrap();
        let upper = Identifier::from_text(&SAMPLE.to_uppercase()).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.to_text(), SAMPLE);
    }

    #[test]
    fn hyphenated_text_is_rejected() {
        let err = Identifier::from_text("5a1c2bd9-e4f0-4f0c-9d3d-2a4a6f1b8e77").unwrap_err();
        assert_eq!(err, DecodeError::TextLength(36));
    }

    #[test]
    fn empty_text_is_rejected() {
        assert_eq!(Identifier::from_text(""), Err(DecodeError::TextLength(0)));
    }

    #[test]
    fn non_hex_digit_is_reported_with_offset() {
        let bad = "5a1c2bd9e4f04f0c9d3d2a4a6f1b8eZ7";
        assert_eq!(
            Identifier::from_text(bad),
            Err(DecodeError::InvalidDigit { ch: 'Z', offset: 30 })
        );
    }

    #[test]
    fn plus_sign_is_not_a_digit() {
        let bad = "+a1c2bd9e4f04f0c9d3d2a4a6f1b8e77";
        assert!(matches!(
            Identifier::from_text(bad),
            Err(DecodeError::InvalidDigit { ch: '+', offset: 0 })
        ));
    }

    #[test]
    fn binary_length_is_checked() {
        assert_eq!(
            Identifier::from_binary(&[0u8; 15]),
            Err(DecodeError::BinaryLength(15))
        );
        assert_eq!(
            Identifier::from_binary(&[0u8; 17]),
            Err(DecodeError::BinaryLength(17))
        );
        assert_eq!(Identifier::from_binary(&[0u8; 16]), Ok(Identifier::NIL));
    }

    #[test]
    fn binary_form_matches_uuid_bytes() {
        let id = Identifier::from_text(SAMPLE).unwrap();
        assert_eq!(id.to_binary(), *Uuid::parse_str(SAMPLE).unwrap().as_bytes());
        assert_eq!(id.to_binary()[0], 0x5a);
    }

    #[test]
    fn value_helpers_check_type() {
        let id = Identifier::new_v4();
        assert_eq!(Identifier::from_text_value(&id.to_text_value()), Ok(id));
        assert_eq!(Identifier::from_binary_value(&id.to_binary_value()), Ok(id));
        assert_eq!(
            Identifier::from_text_value(&Value::Integer(3)),
            Err(DecodeError::WrongType {
                expected: "string",
                found: "integer"
            })
        );
        assert!(Identifier::from_binary_value(&id.to_text_value()).is_err());
    }

    #[test]
    fn serializes_as_text_form() {
        let id = Identifier::from_text(SAMPLE).unwrap();
        assert_eq!(
            serde_json::to_value(id).unwrap(),
            serde_json::Value::String(SAMPLE.to_string())
        );
    }

    proptest! {
        #[test]
        fn text_round_trip(raw in any::<u128>()) {
            let id = Identifier::from_u128(raw);
            prop_assert_eq!(Identifier::from_text(&id.to_text()), Ok(id));
        }

        #[test]
        fn binary_round_trip(raw in any::<[u8; 16]>()) {
            let id = Identifier::from_binary(&raw).unwrap();
            prop_assert_eq!(id.to_binary(), raw);
            prop_assert_eq!(Identifier::from_binary(&id.to_binary()), Ok(id));
        }

        #[test]
        fn arbitrary_text_never_panics(s in ".{0,40}") {
            let _ = Identifier::from_text(&s);
        }
    }
}
