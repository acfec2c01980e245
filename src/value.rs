//! Evaluation results.
//!
//! Every expression produces a list of [`Value`]s. A value is either a [`CoreValue`]
//! (a slice plus the encoding that says how to read it) or the sentinel
//! [`Value::NotAValue`], which stands for "absent or invalid" and absorbs every
//! operation it touches.

use std::fmt;
use std::rc::Rc;

use num_bigint::{BigInt, Sign as BigSign};
use num_traits::{Signed, Zero};

use crate::encoding::{Encoding, Sign};
use crate::source::{Slice, Source};
use crate::YantraResult;

/// Ordered result of evaluating an expression, oldest first.
pub type ValueList = Vec<Value>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CoreValue {
    slice: Slice,
    encoding: Encoding,
}

impl CoreValue {
    pub fn new(slice: Slice, encoding: Encoding) -> Self {
        Self { slice, encoding }
    }

    pub fn from_bytes(bytes: impl Into<Rc<[u8]>>, encoding: Encoding) -> Self {
        Self::new(Slice::constant(bytes), encoding)
    }

    /// Encodes `number` at minimal width. Negative numbers are marked signed so they
    /// read back unchanged.
    pub fn from_numeric(number: &BigInt, encoding: Encoding) -> Self {
        let (bytes, encoding) = if number.is_negative() {
            (number.to_signed_bytes_be(), encoding.with_sign(Sign::Signed))
        } else if encoding.sign == Sign::Signed {
            (number.to_signed_bytes_be(), encoding)
        } else {
            (number.to_bytes_be().1, encoding)
        };
        Self::from_bytes(encoding.from_big_endian(bytes), encoding)
    }

    pub fn from_text(text: &str, encoding: Encoding) -> Self {
        Self::from_bytes(encoding.charset.encode(text), encoding)
    }

    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    pub fn length(&self) -> &BigInt {
        self.slice.length()
    }

    pub fn bytes(&self) -> YantraResult<Vec<u8>> {
        self.slice.data()
    }

    /// Reads the bytes as an integer: two's complement when signed, magnitude
    /// otherwise. An empty value reads as zero.
    pub fn as_numeric(&self) -> YantraResult<BigInt> {
        let bytes = self.encoding.to_big_endian(&self.bytes()?);
        if bytes.is_empty() {
            return Ok(BigInt::zero());
        }
        Ok(match self.encoding.sign {
            Sign::Signed => BigInt::from_signed_bytes_be(&bytes),
            Sign::Unsigned => BigInt::from_bytes_be(BigSign::Plus, &bytes),
        })
    }

    pub fn as_text(&self) -> YantraResult<String> {
        Ok(self.encoding.charset.decode(&self.bytes()?))
    }

    /// The same bytes read under another encoding.
    pub fn with_encoding(&self, encoding: Encoding) -> Self {
        Self::new(self.slice.clone(), encoding)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Core(CoreValue),
    NotAValue,
}

impl Value {
    pub fn from_numeric(number: &BigInt, encoding: Encoding) -> Self {
        Value::Core(CoreValue::from_numeric(number, encoding))
    }

    pub fn from_bytes(bytes: impl Into<Rc<[u8]>>, encoding: Encoding) -> Self {
        Value::Core(CoreValue::from_bytes(bytes, encoding))
    }

    pub fn is_not_a_value(&self) -> bool {
        matches!(self, Value::NotAValue)
    }

    pub fn as_core(&self) -> Option<&CoreValue> {
        match self {
            Value::Core(value) => Some(value),
            Value::NotAValue => None,
        }
    }

    /// Numeric reading, `None` for `NotAValue`.
    pub fn numeric(&self) -> YantraResult<Option<BigInt>> {
        self.as_core().map(CoreValue::as_numeric).transpose()
    }

    /// Concatenates the bytes of all values into one value backed by a
    /// concatenated source.
    pub fn concatenate(values: &[Value], encoding: Encoding) -> Value {
        match Source::concatenated(values) {
            Some(source) => {
                let length = values
                    .iter()
                    .filter_map(Value::as_core)
                    .fold(BigInt::zero(), |total, value| total + value.length());
                match Slice::create(source, BigInt::zero(), length) {
                    Some(slice) => Value::Core(CoreValue::new(slice, encoding)),
                    None => Value::NotAValue,
                }
            }
            None => Value::NotAValue,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NotAValue => write!(f, "NOT_A_VALUE"),
            Value::Core(value) => match value.bytes() {
                Ok(bytes) => write!(f, "0x{}", hex(&bytes)),
                Err(_) => write!(f, "<unreadable {} bytes>", value.length()),
            },
        }
    }
}

/// Lowercase hex rendering without separators.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_and_signed_readings() {
        let unsigned = CoreValue::from_bytes(vec![0xFF, 0xFE], Encoding::default());
        assert_eq!(unsigned.as_numeric().unwrap(), BigInt::from(0xFFFE));
        let signed = unsigned.with_encoding(Encoding::signed());
        assert_eq!(signed.as_numeric().unwrap(), BigInt::from(-2));
    }

    #[test]
    fn test_little_endian_reading() {
        let value = CoreValue::from_bytes(vec![0x01, 0x02], Encoding::little_endian());
        assert_eq!(value.as_numeric().unwrap(), BigInt::from(0x0201));
    }

    #[test]
    fn test_numeric_encoding_is_minimal() {
        let value = CoreValue::from_numeric(&BigInt::from(10), Encoding::default());
        assert_eq!(value.bytes().unwrap(), vec![0x0A]);
        let negative = CoreValue::from_numeric(&BigInt::from(-3), Encoding::default());
        assert_eq!(negative.encoding().sign, Sign::Signed);
        assert_eq!(negative.as_numeric().unwrap(), BigInt::from(-3));
    }

    #[test]
    fn test_numbers_beyond_machine_words() {
        let huge = BigInt::from(u64::MAX) * BigInt::from(u64::MAX);
        let value = CoreValue::from_numeric(&huge, Encoding::little_endian());
        assert_eq!(value.as_numeric().unwrap(), huge);
    }

    #[test]
    fn test_concatenate_propagates_not_a_value() {
        let encoding = Encoding::default();
        let joined = Value::concatenate(
            &[Value::from_bytes(vec![1], encoding), Value::from_bytes(vec![2], encoding)],
            encoding,
        );
        assert_eq!(joined.as_core().unwrap().bytes().unwrap(), vec![1, 2]);
        let broken = Value::concatenate(&[Value::NotAValue], encoding);
        assert!(broken.is_not_a_value());
    }
}
