//! Interpretation rules attached to every parsed value.
//!
//! An [`Encoding`] makes explicit how a run of bytes turns into a number or a string:
//! two's-complement versus magnitude, which end holds the most significant byte, and
//! which character set decodes text. Tokens may override the encoding; nested tokens
//! inherit the nearest enclosing override.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    #[default]
    Unsigned,
    Signed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Charset {
    #[default]
    Ascii,
    Latin1,
    Utf8,
}

impl Charset {
    /// Decodes bytes to text; bytes the charset cannot represent become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
            Charset::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Encodes text; characters outside the charset become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Charset::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            Charset::Utf8 => text.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Encoding {
    pub sign: Sign,
    pub charset: Charset,
    pub byte_order: ByteOrder,
}

impl Encoding {
    pub fn new(sign: Sign, charset: Charset, byte_order: ByteOrder) -> Self {
        Self {
            sign,
            charset,
            byte_order,
        }
    }

    pub fn signed() -> Self {
        Self::default().with_sign(Sign::Signed)
    }

    pub fn little_endian() -> Self {
        Self::default().with_byte_order(ByteOrder::LittleEndian)
    }

    pub fn with_sign(self, sign: Sign) -> Self {
        Self { sign, ..self }
    }

    pub fn with_charset(self, charset: Charset) -> Self {
        Self { charset, ..self }
    }

    pub fn with_byte_order(self, byte_order: ByteOrder) -> Self {
        Self { byte_order, ..self }
    }

    /// Returns the bytes in big-endian (most significant first) order.
    pub fn to_big_endian(&self, bytes: &[u8]) -> Vec<u8> {
        let mut ordered = bytes.to_vec();
        if self.byte_order == ByteOrder::LittleEndian {
            ordered.reverse();
        }
        ordered
    }

    /// Inverse of [`Encoding::to_big_endian`].
    pub fn from_big_endian(&self, mut bytes: Vec<u8>) -> Vec<u8> {
        if self.byte_order == ByteOrder::LittleEndian {
            bytes.reverse();
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unsigned_ascii_big_endian() {
        let encoding = Encoding::default();
        assert_eq!(encoding.sign, Sign::Unsigned);
        assert_eq!(encoding.charset, Charset::Ascii);
        assert_eq!(encoding.byte_order, ByteOrder::BigEndian);
    }

    #[test]
    fn test_ascii_replaces_high_bytes() {
        assert_eq!(Charset::Ascii.decode(&[b'o', b'k', 0xE9]), "ok\u{FFFD}");
        assert_eq!(Charset::Latin1.decode(&[0xE9]), "é");
    }

    #[test]
    fn test_little_endian_round_trips_order() {
        let encoding = Encoding::little_endian();
        assert_eq!(encoding.to_big_endian(&[1, 2, 3]), vec![3, 2, 1]);
        assert_eq!(encoding.from_big_endian(vec![3, 2, 1]), vec![1, 2, 3]);
    }
}
