//!
//! Contains the types that flow between the [`Decoder`][`super::Decoder`] and the [`Encoder`][`super::Encoder`].
//!
//! A decoded stream is a sequence of [`Event`]s.  Master (container) elements produce an [`Event::Start`] when they are opened and an [`Event::End`] when all of their content has been read.  Every other element produces a single [`Event::Tag`] holding the decoded value.
//!

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

pub use ebml_stream_specification::ElementType;

///
/// Where an element ends, as an absolute byte offset from the start of the stream.
///
/// Elements written with an unknown size have an [`ElementEnd::Unknown`] end.  This matches the `-1` end value used by other EBML tooling.
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ElementEnd {
    Known(u64),
    Unknown,
}

impl ElementEnd {
    pub fn is_known(&self) -> bool {
        matches!(self, ElementEnd::Known(_))
    }

    ///
    /// Returns the end offset, or `-1` for an unknown end.
    ///
    pub fn as_i64(&self) -> i64 {
        match self {
            ElementEnd::Known(end) => *end as i64,
            ElementEnd::Unknown => -1,
        }
    }
}

///
/// A single element as seen by the decoder.
///
/// `start` is the offset of the first byte of the element id, and `end` the offset one past the last byte of its content.  For leaf elements, `data` holds the raw payload exactly as it was read.
///
/// `id` is the raw id bytes read as a big-endian integer, marker bit included (`0x1A45DFA3` for `EBML`), and `id_hex` is the lowercase hex of those same bytes, used as the schema key.
///
/// `size_length` is the width in bytes of the size field as it was read.  Writers keep this width so that a decoded stream can be written back byte for byte; `0` means no width was recorded and the smallest one is used.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ElementHeader {
    pub id: u64,
    pub id_hex: String,
    pub element_type: ElementType,
    pub name: &'static str,
    pub start: u64,
    pub end: ElementEnd,
    pub data_size: Option<u64>,
    pub size_length: usize,
    pub data: Bytes,
}

impl ElementHeader {

    ///
    /// Returns the number of bytes taken by the id and size fields.
    ///
    /// Returns `None` while the size is unknown.
    ///
    pub fn header_length(&self) -> Option<u64> {
        match (self.end, self.data_size) {
            (ElementEnd::Known(end), Some(size)) => Some(end - self.start - size),
            _ => None,
        }
    }
}

///
/// An EBML date: a signed count of nanoseconds from 2001-01-01T00:00:00 UTC.
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EbmlDate(i64);

impl EbmlDate {
    ///
    /// Seconds between the unix epoch and the EBML epoch (2001-01-01T00:00:00 UTC).
    ///
    pub const EPOCH_UNIX_SECONDS: i64 = 978_307_200;

    pub fn from_nanos(nanos: i64) -> Self {
        EbmlDate(nanos)
    }

    pub fn nanos(&self) -> i64 {
        self.0
    }

    ///
    /// Returns nanoseconds relative to the unix epoch.
    ///
    pub fn unix_nanos(&self) -> i128 {
        self.0 as i128 + Self::EPOCH_UNIX_SECONDS as i128 * 1_000_000_000
    }

    pub fn to_system_time(&self) -> SystemTime {
        let nanos = self.unix_nanos();
        if nanos >= 0 {
            UNIX_EPOCH + Duration::from_nanos(nanos as u64)
        } else {
            UNIX_EPOCH - Duration::from_nanos(nanos.unsigned_abs() as u64)
        }
    }
}

///
/// The decoded content of a `SimpleBlock` or `Block` element.
///
/// Only the block header is interpreted.  `payload` holds the (possibly laced) frame data untouched.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub track: u64,
    pub timecode: i16,
    pub flags: u8,
    pub discardable: bool,
    pub payload: Bytes,
}

impl Block {
    pub const FLAG_KEYFRAME: u8 = 0x80;
    pub const FLAG_INVISIBLE: u8 = 0x08;
    pub const FLAG_LACING: u8 = 0x06;
    pub const FLAG_DISCARDABLE: u8 = 0x01;

    ///
    /// Keyframe bit.  Only meaningful for `SimpleBlock` - the bit is reserved in `Block`.
    ///
    pub fn keyframe(&self) -> bool {
        self.flags & Self::FLAG_KEYFRAME != 0
    }

    pub fn invisible(&self) -> bool {
        self.flags & Self::FLAG_INVISIBLE != 0
    }

    ///
    /// Lacing mode: 0 none, 1 Xiph, 2 fixed-size, 3 EBML.
    ///
    pub fn lacing(&self) -> u8 {
        (self.flags & Self::FLAG_LACING) >> 1
    }
}

///
/// The decoded value of a leaf element, based on its schema type.
///
#[derive(Clone, Debug, PartialEq)]
pub enum ElementValue {
    UnsignedInt(u64),
    SignedInt(i64),
    Float(f64),
    String(String),
    Utf8(String),
    Date(EbmlDate),
    Binary(Bytes),
    Block(Block),
}

impl ElementValue {
    pub fn as_unsigned_int(&self) -> Option<u64> {
        match self {
            ElementValue::UnsignedInt(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_signed_int(&self) -> Option<i64> {
        match self {
            ElementValue::SignedInt(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ElementValue::Float(val) => Some(*val),
            _ => None,
        }
    }

    ///
    /// Returns the text of either string type.
    ///
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ElementValue::String(val) | ElementValue::Utf8(val) => Some(val.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<EbmlDate> {
        match self {
            ElementValue::Date(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            ElementValue::Binary(val) => Some(val.as_ref()),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            ElementValue::Block(val) => Some(val),
            _ => None,
        }
    }
}

///
/// A structural event produced by the [`Decoder`][`super::Decoder`] and consumed by the [`Encoder`][`super::Encoder`].
///
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    ///
    /// A master element was opened.  Its children follow.
    ///
    Start(ElementHeader),

    ///
    /// A leaf element was read completely.
    ///
    Tag(ElementHeader, ElementValue),

    ///
    /// A previously started master element was closed.
    ///
    End(ElementHeader),
}

impl Event {
    pub fn header(&self) -> &ElementHeader {
        match self {
            Event::Start(header) | Event::Tag(header, _) | Event::End(header) => header,
        }
    }

    pub fn name(&self) -> &'static str {
        self.header().name
    }

    pub fn value(&self) -> Option<&ElementValue> {
        match self {
            Event::Tag(_, value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_epoch_conversion() {
        let date = EbmlDate::from_nanos(0);
        assert_eq!(978_307_200_000_000_000, date.unix_nanos());
        assert_eq!(UNIX_EPOCH + Duration::from_secs(978_307_200), date.to_system_time());

        let before_unix = EbmlDate::from_nanos(-(EbmlDate::EPOCH_UNIX_SECONDS + 1) * 1_000_000_000);
        assert_eq!(UNIX_EPOCH - Duration::from_secs(1), before_unix.to_system_time());
    }

    #[test]
    fn block_flags() {
        let block = Block { track: 1, timecode: 0, flags: 0x87, discardable: true, payload: Bytes::new() };
        assert!(block.keyframe());
        assert!(!block.invisible());
        assert_eq!(3, block.lacing());
    }

    #[test]
    fn unknown_end_is_minus_one() {
        assert_eq!(-1, ElementEnd::Unknown.as_i64());
        assert_eq!(9, ElementEnd::Known(9).as_i64());
    }
}
