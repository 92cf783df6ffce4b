//! Byte/text transcoding for binary payloads that cross text-only interfaces.
//!
//! Two representations are supported:
//! - base64 (standard alphabet, padded) for JSON transport;
//! - "binary strings", where each char is one byte value in U+0000..=U+00FF.
//!
//! Neither path goes through UTF-8 decoding, so arbitrary bytes round-trip.

use std::fmt;

use base64::{engine::general_purpose, Engine as _};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeError {
    InvalidBase64(String),
    /// A char outside U+0000..=U+00FF was found at `index` (in chars).
    CharOutOfRange { index: usize, ch: char },
}

impl fmt::Display for TranscodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBase64(message) => write!(f, "invalid base64: {message}"),
            Self::CharOutOfRange { index, ch } => write!(
                f,
                "character U+{:04X} at index {index} is not a byte value",
                u32::from(*ch)
            ),
        }
    }
}

impl std::error::Error for TranscodeError {}

pub fn encode_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

pub fn decode_base64(text: &str) -> Result<Vec<u8>, TranscodeError> {
    general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|error| TranscodeError::InvalidBase64(error.to_string()))
}

/// Maps every byte to the char with the same code point.
pub fn bytes_to_binary_string(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| char::from(*byte)).collect()
}

pub fn binary_string_to_bytes(text: &str) -> Result<Vec<u8>, TranscodeError> {
    text.chars()
        .enumerate()
        .map(|(index, ch)| {
            u8::try_from(ch).map_err(|_| TranscodeError::CharOutOfRange { index, ch })
        })
        .collect()
}

/// Serde adapter for `Option<Vec<u8>>` carried as base64 text.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&super::encode_base64(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|text| super::decode_base64(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
