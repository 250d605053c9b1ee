//! Typed key-value dictionary carried by the watch/phone message channel.
//!
//! # Wire format
//!
//! ```text
//! u8        tuple count
//! per tuple:
//!   u32 LE  key
//!   u8      type   (0 = byte array, 1 = C string, 2 = unsigned int, 3 = signed int)
//!   u16 LE  length of value in bytes
//!   [u8]    value  (integers little-endian with width 1, 2 or 4;
//!                   C strings include their NUL terminator)
//! ```
//!
//! Tuples keep their insertion order. Decoding validates every header and
//! never panics, whatever the input. A broken header fails the whole
//! message; a value that does not match its declared type (an unknown type
//! tag, a bad integer width, an unterminated or non-UTF-8 string) decodes as
//! [`TupleValue::Malformed`] so the rest of the message is still usable.

use core::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Size of the tuple-count header.
pub const DICT_HEADER_LEN: usize = 1;

/// Size of each tuple header (key, type, length).
pub const TUPLE_HEADER_LEN: usize = 7;

/// Minimum outbox size the channel guarantees, in bytes.
pub const OUTBOX_SIZE: usize = 636;

/// Declared type of a tuple value, including integer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TupleType {
    /// Raw bytes.
    ByteArray,
    /// NUL-terminated UTF-8 string.
    CString,
    /// Unsigned integer of the given width in bytes.
    UInt(u8),
    /// Signed integer of the given width in bytes.
    Int(u8),
    /// A value that failed to decode, with its raw type tag.
    Malformed(u8),
}

impl TupleType {
    /// Type tag written in the tuple header.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            TupleType::ByteArray => 0,
            TupleType::CString => 1,
            TupleType::UInt(_) => 2,
            TupleType::Int(_) => 3,
            TupleType::Malformed(tag) => tag,
        }
    }
}

impl fmt::Display for TupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TupleType::ByteArray => write!(f, "byte array"),
            TupleType::CString => write!(f, "cstring"),
            TupleType::UInt(width) => write!(f, "uint{}", u32::from(*width) * 8),
            TupleType::Int(width) => write!(f, "int{}", u32::from(*width) * 8),
            TupleType::Malformed(tag) => write!(f, "malformed (type {})", tag),
        }
    }
}

/// A typed tuple value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TupleValue {
    Bytes(Vec<u8>),
    CString(String),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    /// Raw bytes of a value that did not match its declared type.
    Malformed { tag: u8, data: Vec<u8> },
}

impl TupleValue {
    /// Declared type and width of this value.
    #[must_use]
    pub fn tuple_type(&self) -> TupleType {
        match self {
            TupleValue::Bytes(_) => TupleType::ByteArray,
            TupleValue::CString(_) => TupleType::CString,
            TupleValue::UInt8(_) => TupleType::UInt(1),
            TupleValue::UInt16(_) => TupleType::UInt(2),
            TupleValue::UInt32(_) => TupleType::UInt(4),
            TupleValue::Int8(_) => TupleType::Int(1),
            TupleValue::Int16(_) => TupleType::Int(2),
            TupleValue::Int32(_) => TupleType::Int(4),
            TupleValue::Malformed { tag, .. } => TupleType::Malformed(*tag),
        }
    }

    /// Number of bytes the value occupies on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            TupleValue::Bytes(bytes) | TupleValue::Malformed { data: bytes, .. } => bytes.len(),
            // Terminator included
            TupleValue::CString(s) => s.len() + 1,
            TupleValue::UInt8(_) | TupleValue::Int8(_) => 1,
            TupleValue::UInt16(_) | TupleValue::Int16(_) => 2,
            TupleValue::UInt32(_) | TupleValue::Int32(_) => 4,
        }
    }

    fn write_to(&self, buf: &mut BytesMut) {
        match self {
            TupleValue::Bytes(bytes) | TupleValue::Malformed { data: bytes, .. } => {
                buf.put_slice(bytes)
            }
            TupleValue::CString(s) => {
                buf.put_slice(s.as_bytes());
                buf.put_u8(0);
            }
            TupleValue::UInt8(v) => buf.put_u8(*v),
            TupleValue::UInt16(v) => buf.put_u16_le(*v),
            TupleValue::UInt32(v) => buf.put_u32_le(*v),
            TupleValue::Int8(v) => buf.put_i8(*v),
            TupleValue::Int16(v) => buf.put_i16_le(*v),
            TupleValue::Int32(v) => buf.put_i32_le(*v),
        }
    }

    /// Decode a value, keeping it as [`TupleValue::Malformed`] if it does
    /// not match its declared type.
    fn decode(key: u32, tag: u8, data: &[u8]) -> Self {
        Self::decode_strict(key, tag, data).unwrap_or_else(|_| TupleValue::Malformed {
            tag,
            data: data.to_vec(),
        })
    }

    fn decode_strict(key: u32, tag: u8, mut data: &[u8]) -> ParseResult<Self> {
        let width = data.len();
        match tag {
            0 => Ok(TupleValue::Bytes(data.to_vec())),
            1 => {
                let Some(nul) = data.iter().position(|b| *b == 0) else {
                    return Err(ParseError::InvalidString {
                        key,
                        reason: "missing NUL terminator",
                    });
                };
                let text = std::str::from_utf8(&data[..nul]).map_err(|_| {
                    ParseError::InvalidString {
                        key,
                        reason: "not valid UTF-8",
                    }
                })?;
                Ok(TupleValue::CString(text.to_string()))
            }
            2 => match width {
                1 => Ok(TupleValue::UInt8(data.get_u8())),
                2 => Ok(TupleValue::UInt16(data.get_u16_le())),
                4 => Ok(TupleValue::UInt32(data.get_u32_le())),
                _ => Err(ParseError::InvalidIntegerWidth { key, width }),
            },
            3 => match width {
                1 => Ok(TupleValue::Int8(data.get_i8())),
                2 => Ok(TupleValue::Int16(data.get_i16_le())),
                4 => Ok(TupleValue::Int32(data.get_i32_le())),
                _ => Err(ParseError::InvalidIntegerWidth { key, width }),
            },
            other => Err(ParseError::UnknownTupleType(other)),
        }
    }
}

/// A single key-value pair in a [`Dictionary`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tuple {
    /// Message key (see [`crate::MessageKey`] for the recognized ones).
    pub key: u32,
    /// Typed value.
    pub value: TupleValue,
}

impl Tuple {
    /// Create a tuple from a raw key and value.
    pub fn new(key: impl Into<u32>, value: TupleValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// 8-bit signed integer tuple.
    pub fn int8(key: impl Into<u32>, value: i8) -> Self {
        Self::new(key, TupleValue::Int8(value))
    }

    /// 16-bit signed integer tuple.
    pub fn int16(key: impl Into<u32>, value: i16) -> Self {
        Self::new(key, TupleValue::Int16(value))
    }

    /// String tuple. Anything after an embedded NUL is dropped, since the
    /// receiver would stop reading there anyway.
    pub fn cstring(key: impl Into<u32>, value: &str) -> Self {
        let value = value.split('\0').next().unwrap_or_default();
        Self::new(key, TupleValue::CString(value.to_string()))
    }

    /// Read a one-byte integer as `i8`.
    ///
    /// Signed and unsigned one-byte values are both accepted; wider integers
    /// are not narrowed.
    #[must_use]
    pub fn as_i8(&self) -> Option<i8> {
        match self.value {
            TupleValue::Int8(v) => Some(v),
            TupleValue::UInt8(v) => Some(v as i8),
            _ => None,
        }
    }

    /// Read a two-byte integer as `i16`.
    #[must_use]
    pub fn as_i16(&self) -> Option<i16> {
        match self.value {
            TupleValue::Int16(v) => Some(v),
            TupleValue::UInt16(v) => Some(v as i16),
            _ => None,
        }
    }

    /// Read a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            TupleValue::CString(s) => Some(s),
            _ => None,
        }
    }

    /// Why this tuple's value could not be decoded, if it could not.
    #[must_use]
    pub fn problem(&self) -> Option<ParseError> {
        match &self.value {
            TupleValue::Malformed { tag, data } => {
                TupleValue::decode_strict(self.key, *tag, data).err()
            }
            _ => None,
        }
    }

    /// Bytes this tuple occupies on the wire, header included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        TUPLE_HEADER_LEN + self.value.encoded_len()
    }
}

/// An ordered collection of tuples forming one channel message.
///
/// # Examples
///
/// ```
/// use quickhue_types::{Dictionary, MessageKey, Tuple};
///
/// let message = Dictionary::new().with(Tuple::int16(MessageKey::Brightness, 128));
/// let bytes = message.encode().unwrap();
/// assert_eq!(bytes.len(), message.encoded_len());
/// assert_eq!(Dictionary::decode(&bytes).unwrap(), message);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dictionary {
    tuples: Vec<Tuple>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tuple, builder style.
    #[must_use]
    pub fn with(mut self, tuple: Tuple) -> Self {
        self.tuples.push(tuple);
        self
    }

    /// Append a tuple.
    pub fn push(&mut self, tuple: Tuple) {
        self.tuples.push(tuple);
    }

    /// Iterate over tuples in message order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tuple> {
        self.tuples.iter()
    }

    /// Number of tuples.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Whether the dictionary has no tuples.
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// First tuple with the given key.
    pub fn get(&self, key: impl Into<u32>) -> Option<&Tuple> {
        let key = key.into();
        self.tuples.iter().find(|t| t.key == key)
    }

    /// Whether any tuple carries the given key.
    pub fn contains_key(&self, key: impl Into<u32>) -> bool {
        self.get(key).is_some()
    }

    /// Total encoded size in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        DICT_HEADER_LEN + self.tuples.iter().map(Tuple::encoded_len).sum::<usize>()
    }

    /// Serialize to the channel's wire format.
    pub fn encode(&self) -> ParseResult<Bytes> {
        let count = u8::try_from(self.tuples.len())
            .map_err(|_| ParseError::TooManyTuples(self.tuples.len()))?;

        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(count);
        for tuple in &self.tuples {
            let len = tuple.value.encoded_len();
            let wire_len = u16::try_from(len).map_err(|_| ParseError::ValueTooLarge {
                key: tuple.key,
                len,
                max: u16::MAX as usize,
            })?;
            buf.put_u32_le(tuple.key);
            buf.put_u8(tuple.value.tuple_type().tag());
            buf.put_u16_le(wire_len);
            tuple.value.write_to(&mut buf);
        }
        Ok(buf.freeze())
    }

    /// Parse a message from the channel's wire format.
    pub fn decode(data: &[u8]) -> ParseResult<Self> {
        let mut buf = data;
        ensure_remaining(&buf, DICT_HEADER_LEN)?;
        let count = buf.get_u8();

        let mut tuples = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            ensure_remaining(&buf, TUPLE_HEADER_LEN)?;
            let key = buf.get_u32_le();
            let tag = buf.get_u8();
            let len = usize::from(buf.get_u16_le());

            ensure_remaining(&buf, len)?;
            let (value, rest) = buf.split_at(len);
            buf = rest;

            tuples.push(Tuple {
                key,
                value: TupleValue::decode(key, tag, value),
            });
        }

        if buf.has_remaining() {
            return Err(ParseError::TrailingBytes(buf.remaining()));
        }

        Ok(Self { tuples })
    }
}

impl FromIterator<Tuple> for Dictionary {
    fn from_iter<I: IntoIterator<Item = Tuple>>(iter: I) -> Self {
        Self {
            tuples: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = &'a Tuple;
    type IntoIter = std::slice::Iter<'a, Tuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.iter()
    }
}

fn ensure_remaining(buf: &[u8], expected: usize) -> ParseResult<()> {
    if buf.remaining() < expected {
        Err(ParseError::InsufficientBytes {
            expected,
            actual: buf.remaining(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageKey;

    #[test]
    fn test_encode_toggle_layout() {
        let dict = Dictionary::new().with(Tuple::int8(MessageKey::LightState, 0));
        let bytes = dict.encode().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x01, // one tuple
                0x00, 0x00, 0x00, 0x00, // key 0
                0x03, // signed int
                0x01, 0x00, // length 1
                0x00, // value
            ]
        );
    }

    #[test]
    fn test_encode_cstring_includes_terminator() {
        let dict = Dictionary::new().with(Tuple::cstring(MessageKey::BridgeAddress, "10.0.0.2"));
        let bytes = dict.encode().unwrap();
        assert_eq!(bytes.len(), 1 + 7 + 9);
        assert_eq!(bytes[5], 1);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 9);
        assert_eq!(*bytes.last().unwrap(), 0);
    }

    #[test]
    fn test_decode_brightness() {
        let bytes = [
            0x01, 0x01, 0x00, 0x00, 0x00, 0x03, 0x02, 0x00, 0x80, 0x00, // key 1 = int16 128
        ];
        let dict = Dictionary::decode(&bytes).unwrap();
        let tuple = dict.get(MessageKey::Brightness).unwrap();
        assert_eq!(tuple.as_i16(), Some(128));
        assert_eq!(tuple.as_i8(), None);
    }

    #[test]
    fn test_decode_keeps_order_and_unknown_keys() {
        let dict = Dictionary::new()
            .with(Tuple::int8(99u32, 1))
            .with(Tuple::int8(MessageKey::SettingsRequest, 0))
            .with(Tuple::cstring(MessageKey::BridgeCredential, "user"));
        let decoded = Dictionary::decode(&dict.encode().unwrap()).unwrap();
        let keys: Vec<u32> = decoded.iter().map(|t| t.key).collect();
        assert_eq!(keys, vec![99, 5, 3]);
    }

    #[test]
    fn test_decode_empty_buffer() {
        assert_eq!(
            Dictionary::decode(&[]),
            Err(ParseError::InsufficientBytes {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_decode_truncated_value() {
        let bytes = [0x01, 0x02, 0x00, 0x00, 0x00, 0x01, 0x05, 0x00, b'a', b'b'];
        assert!(matches!(
            Dictionary::decode(&bytes),
            Err(ParseError::InsufficientBytes {
                expected: 5,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_bad_integer_width_is_kept_as_malformed() {
        let bytes = [0x01, 0x01, 0x00, 0x00, 0x00, 0x03, 0x03, 0x00, 1, 2, 3];
        let dict = Dictionary::decode(&bytes).unwrap();
        let tuple = dict.get(MessageKey::Brightness).unwrap();
        assert_eq!(
            tuple.value,
            TupleValue::Malformed {
                tag: 3,
                data: vec![1, 2, 3]
            }
        );
        assert_eq!(tuple.as_i16(), None);
        assert_eq!(
            tuple.problem(),
            Some(ParseError::InvalidIntegerWidth { key: 1, width: 3 })
        );
    }

    #[test]
    fn test_unterminated_string_is_kept_as_malformed() {
        let bytes = [0x01, 0x02, 0x00, 0x00, 0x00, 0x01, 0x02, 0x00, b'h', b'i'];
        let dict = Dictionary::decode(&bytes).unwrap();
        let tuple = dict.get(MessageKey::BridgeAddress).unwrap();
        assert_eq!(tuple.as_str(), None);
        assert!(matches!(
            tuple.problem(),
            Some(ParseError::InvalidString { key: 2, .. })
        ));
    }

    #[test]
    fn test_malformed_value_does_not_hide_later_fields() {
        let bytes = [
            0x02, // two tuples
            0x2A, 0x00, 0x00, 0x00, 0x07, 0x01, 0x00, 0xEE, // key 42, unknown type 7
            0x00, 0x00, 0x00, 0x00, 0x03, 0x01, 0x00, 0x01, // key 0 = int8 1
        ];
        let dict = Dictionary::decode(&bytes).unwrap();
        assert_eq!(dict.len(), 2);
        let unknown = dict.get(42u32).unwrap();
        assert_eq!(unknown.value.tuple_type(), TupleType::Malformed(7));
        assert_eq!(unknown.problem(), Some(ParseError::UnknownTupleType(7)));
        assert_eq!(
            dict.get(MessageKey::LightState).and_then(Tuple::as_i8),
            Some(1)
        );

        // Raw bytes are written back unchanged
        assert_eq!(dict.encode().unwrap().as_ref(), &bytes);
    }

    #[test]
    fn test_decode_rejects_broken_framing() {
        // Declared length runs past the end of the buffer
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x00, 0x07, 0x02, 0x00, 0x00];
        assert_eq!(
            Dictionary::decode(&bytes),
            Err(ParseError::InsufficientBytes {
                expected: 2,
                actual: 1
            })
        );

        let bytes = [0x00, 0xAA];
        assert_eq!(Dictionary::decode(&bytes), Err(ParseError::TrailingBytes(1)));
    }

    #[test]
    fn test_well_formed_tuple_has_no_problem() {
        let tuple = Tuple::int8(MessageKey::LightId, 3);
        assert_eq!(tuple.problem(), None);
        assert_eq!(TupleType::Malformed(9).to_string(), "malformed (type 9)");
    }

    #[test]
    fn test_unsigned_byte_reads_as_i8_without_widening() {
        let tuple = Tuple::new(MessageKey::LightState, TupleValue::UInt8(0xFF));
        assert_eq!(tuple.as_i8(), Some(-1));

        let wide = Tuple::new(MessageKey::LightState, TupleValue::Int32(1));
        assert_eq!(wide.as_i8(), None);
    }

    #[test]
    fn test_cstring_constructor_stops_at_nul() {
        let tuple = Tuple::cstring(MessageKey::BridgeCredential, "abc\0def");
        assert_eq!(tuple.as_str(), Some("abc"));
    }

    #[test]
    fn test_too_many_tuples() {
        let dict: Dictionary = (0..256u32).map(|k| Tuple::int8(k, 0)).collect();
        assert_eq!(dict.encode(), Err(ParseError::TooManyTuples(256)));
    }

    #[test]
    fn test_tuple_type_display() {
        assert_eq!(TupleType::Int(2).to_string(), "int16");
        assert_eq!(TupleType::UInt(1).to_string(), "uint8");
        assert_eq!(TupleType::CString.to_string(), "cstring");
    }
}
