//!
//! Interprets leaf element payloads according to their schema type, and turns values back into payload bytes.
//!

use bytes::{BufMut, Bytes, BytesMut};

use super::errors::tag_value::ValueError;
use super::tags::{Block, EbmlDate, ElementType, ElementValue};
use super::tools::{self, AsVint, EbmlSize};
use super::errors::tool::ToolError;

const BLOCK_NAMES: [&str; 2] = ["SimpleBlock", "Block"];

///
/// Decodes the payload of a leaf element.
///
/// Elements named `SimpleBlock` or `Block` have their block header split out into a [`Block`] regardless of `element_type`.  Master elements have no payload of their own and should never be passed here; if they are, their bytes are returned as [`ElementValue::Binary`].
///
/// # Errors
///
/// Returns a [`ValueError`] if the payload does not fit the declared type - for example a float that is not 0, 4 or 8 bytes long.
///
pub fn read_value(element_type: ElementType, name: &str, data: Bytes) -> Result<ElementValue, ValueError> {
    if BLOCK_NAMES.contains(&name) {
        return read_block(data).map(ElementValue::Block);
    }

    match element_type {
        ElementType::UnsignedInt => {
            tools::arr_to_u64(&data).map(ElementValue::UnsignedInt).map_err(|_| ValueError::IntegerTooLong(data.len()))
        },
        ElementType::SignedInt => {
            tools::arr_to_i64(&data).map(ElementValue::SignedInt).map_err(|_| ValueError::IntegerTooLong(data.len()))
        },
        ElementType::Float => {
            if data.is_empty() {
                Ok(ElementValue::Float(0.0))
            } else {
                tools::arr_to_f64(&data).map(ElementValue::Float).map_err(|_| ValueError::FloatLength(data.len()))
            }
        },
        ElementType::String => {
            Ok(ElementValue::String(data.iter().map(|b| *b as char).collect()))
        },
        ElementType::Utf8 => {
            std::str::from_utf8(&data).map(|s| ElementValue::Utf8(s.to_string())).map_err(ValueError::Utf8)
        },
        ElementType::Date => match data.len() {
            0 => Ok(ElementValue::Date(EbmlDate::from_nanos(0))),
            8 => {
                let bytes: [u8; 8] = data[..].try_into().map_err(|_| ValueError::DateLength(data.len()))?;
                Ok(ElementValue::Date(EbmlDate::from_nanos(i64::from_be_bytes(bytes))))
            },
            len => Err(ValueError::DateLength(len)),
        },
        ElementType::Binary | ElementType::Unknown | ElementType::Master => Ok(ElementValue::Binary(data)),
    }
}

///
/// Splits a `SimpleBlock`/`Block` payload into its header fields and frame data.
///
/// The layout is: track number (vint), timecode relative to the cluster (signed 16 bit, big endian), flags (1 byte), then the frame data.
///
pub fn read_block(data: Bytes) -> Result<Block, ValueError> {
    let track = match tools::read_vint(&data).map_err(ValueError::BlockTrack)? {
        Some(vint) => vint,
        None => return Err(ValueError::TruncatedBlock(data.len())),
    };
    let header_len = track.length + 3;
    if data.len() < header_len {
        return Err(ValueError::TruncatedBlock(data.len()));
    }

    let track_number = match track.value {
        EbmlSize::Known(value) => value,
        // All value bits set: take the bits literally rather than as a size sentinel
        EbmlSize::Unknown => (1u64 << (7 * track.length)) - 1,
    };
    let timecode = i16::from_be_bytes([data[track.length], data[track.length + 1]]);
    let flags = data[track.length + 2];

    Ok(Block {
        track: track_number,
        timecode,
        flags,
        discardable: flags & Block::FLAG_DISCARDABLE != 0,
        payload: data.slice(header_len..),
    })
}

///
/// Encodes an unsigned integer using the fewest bytes that hold it.  Zero is written as a single byte.
///
pub fn unsigned_to_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = (value.leading_zeros() as usize / 8).min(7);
    bytes[skip..].to_vec()
}

///
/// Encodes a signed integer using the fewest bytes that preserve its sign.
///
pub fn signed_to_bytes(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let redundant = (if value < 0 { value.leading_ones() } else { value.leading_zeros() }) as usize;
    let skip = ((redundant - 1) / 8).min(7);
    bytes[skip..].to_vec()
}

pub fn float_to_bytes(value: f64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn date_to_bytes(value: EbmlDate) -> Vec<u8> {
    value.nanos().to_be_bytes().to_vec()
}

impl Block {

    ///
    /// Writes the block header followed by the payload.
    ///
    /// # Errors
    ///
    /// Fails if the track number cannot be written as a vint.
    ///
    pub fn to_bytes(&self) -> Result<Vec<u8>, ToolError> {
        let track = self.track.as_vint()?;
        let flags = if self.discardable {
            self.flags | Block::FLAG_DISCARDABLE
        } else {
            self.flags & !Block::FLAG_DISCARDABLE
        };

        let mut buf = BytesMut::with_capacity(track.len() + 3 + self.payload.len());
        buf.put_slice(&track);
        buf.put_i16(self.timecode);
        buf.put_u8(flags);
        buf.put_slice(&self.payload);
        Ok(buf.to_vec())
    }
}

impl ElementValue {

    ///
    /// Encodes the value as element payload bytes, ready to be passed to [`Encoder::tag`][`super::Encoder::tag`].
    ///
    /// Integers use their minimal width, so a decoded value may not re-encode to exactly the bytes it was read from.  Use [`ElementHeader::data`][`super::tags::ElementHeader::data`] when an exact copy is needed.
    ///
    /// # Errors
    ///
    /// Fails only for blocks whose track number cannot be written as a vint.
    ///
    pub fn to_bytes(&self) -> Result<Vec<u8>, ToolError> {
        Ok(match self {
            ElementValue::UnsignedInt(val) => unsigned_to_bytes(*val),
            ElementValue::SignedInt(val) => signed_to_bytes(*val),
            ElementValue::Float(val) => float_to_bytes(*val),
            ElementValue::String(val) => val.chars().map(|c| c as u32 as u8).collect(),
            ElementValue::Utf8(val) => val.as_bytes().to_vec(),
            ElementValue::Date(val) => date_to_bytes(*val),
            ElementValue::Binary(val) => val.to_vec(),
            ElementValue::Block(block) => block.to_bytes()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(element_type: ElementType, data: &[u8]) -> Result<ElementValue, ValueError> {
        read_value(element_type, "Test", Bytes::copy_from_slice(data))
    }

    #[test]
    fn unsigned_ints() {
        assert_eq!(ElementValue::UnsignedInt(0), read(ElementType::UnsignedInt, &[]).unwrap());
        assert_eq!(ElementValue::UnsignedInt(352), read(ElementType::UnsignedInt, &[0x01, 0x60]).unwrap());
        assert_eq!(ElementValue::UnsignedInt(1_000_000), read(ElementType::UnsignedInt, &[0x0f, 0x42, 0x40]).unwrap());
        assert_eq!(ElementValue::UnsignedInt(0x306d02aaa74d06), read(ElementType::UnsignedInt, &[0x30, 0x6d, 0x02, 0xaa, 0xa7, 0x4d, 0x06]).unwrap());
        assert!(matches!(read(ElementType::UnsignedInt, &[0; 9]), Err(ValueError::IntegerTooLong(9))));
    }

    #[test]
    fn signed_ints() {
        assert_eq!(ElementValue::SignedInt(-1), read(ElementType::SignedInt, &[0xff]).unwrap());
        assert_eq!(ElementValue::SignedInt(-256), read(ElementType::SignedInt, &[0xff, 0x00]).unwrap());
        assert_eq!(ElementValue::SignedInt(127), read(ElementType::SignedInt, &[0x7f]).unwrap());
        assert_eq!(ElementValue::SignedInt(0), read(ElementType::SignedInt, &[]).unwrap());
    }

    #[test]
    fn floats() {
        assert_eq!(ElementValue::Float(44100.0), read(ElementType::Float, &44100f32.to_be_bytes()).unwrap());
        assert_eq!(ElementValue::Float(1234.5678), read(ElementType::Float, &1234.5678f64.to_be_bytes()).unwrap());
        assert_eq!(ElementValue::Float(0.0), read(ElementType::Float, &[]).unwrap());
        assert!(matches!(read(ElementType::Float, &[0, 0, 0]), Err(ValueError::FloatLength(3))));
    }

    #[test]
    fn strings() {
        assert_eq!(ElementValue::String(String::from("webm")), read(ElementType::String, b"webm").unwrap());
        assert_eq!(ElementValue::String(String::from("\u{e9}")), read(ElementType::String, &[0xe9]).unwrap());
        assert_eq!(ElementValue::Utf8(String::from("Chrome \u{2713}")), read(ElementType::Utf8, "Chrome \u{2713}".as_bytes()).unwrap());
        assert!(matches!(read(ElementType::Utf8, &[0xff, 0xfe]), Err(ValueError::Utf8(_))));
    }

    #[test]
    fn dates() {
        let nanos: i64 = 1_000_000_000 * 60 * 60 * 24;
        assert_eq!(ElementValue::Date(EbmlDate::from_nanos(nanos)), read(ElementType::Date, &nanos.to_be_bytes()).unwrap());
        assert_eq!(ElementValue::Date(EbmlDate::from_nanos(-1)), read(ElementType::Date, &[0xff; 8]).unwrap());
        assert!(matches!(read(ElementType::Date, &[0; 4]), Err(ValueError::DateLength(4))));
    }

    #[test]
    fn binary_and_unknown() {
        assert_eq!(ElementValue::Binary(Bytes::from_static(&[1, 2, 3])), read(ElementType::Binary, &[1, 2, 3]).unwrap());
        assert_eq!(ElementValue::Binary(Bytes::from_static(&[4])), read(ElementType::Unknown, &[4]).unwrap());
    }

    #[test]
    fn simple_block() {
        let data = [0x81, 0x00, 0x60, 0x80, 0xaa, 0xbb];
        let value = read_value(ElementType::Binary, "SimpleBlock", Bytes::copy_from_slice(&data)).unwrap();
        let block = value.as_block().expect("should be a block");
        assert_eq!(1, block.track);
        assert_eq!(96, block.timecode);
        assert!(block.keyframe());
        assert!(!block.discardable);
        assert_eq!(&[0xaa, 0xbb][..], &block.payload[..]);
        assert_eq!(data.to_vec(), value.to_bytes().unwrap());
    }

    #[test]
    fn block_with_negative_timecode_and_long_track() {
        let data = [0x40, 0xc8, 0xff, 0xfe, 0x01];
        let value = read_value(ElementType::Binary, "Block", Bytes::copy_from_slice(&data)).unwrap();
        let block = value.as_block().expect("should be a block");
        assert_eq!(200, block.track);
        assert_eq!(-2, block.timecode);
        assert!(block.discardable);
        assert!(block.payload.is_empty());
    }

    #[test]
    fn truncated_block() {
        let err = read_value(ElementType::Binary, "SimpleBlock", Bytes::from_static(&[0x81, 0x00])).unwrap_err();
        assert!(matches!(err, ValueError::TruncatedBlock(2)));
        let err = read_value(ElementType::Binary, "SimpleBlock", Bytes::from_static(&[0x40])).unwrap_err();
        assert!(matches!(err, ValueError::TruncatedBlock(1)));
        let err = read_value(ElementType::Binary, "SimpleBlock", Bytes::from_static(&[0x00, 0x00, 0x00, 0x00])).unwrap_err();
        assert!(matches!(err, ValueError::BlockTrack(ToolError::UnrepresentableLength)));
    }

    #[test]
    fn minimal_integer_widths() {
        assert_eq!(vec![0x00], unsigned_to_bytes(0));
        assert_eq!(vec![0x01, 0x60], unsigned_to_bytes(352));
        assert_eq!(vec![0xff; 8], unsigned_to_bytes(u64::MAX));
        assert_eq!(vec![0x00], signed_to_bytes(0));
        assert_eq!(vec![0xff], signed_to_bytes(-1));
        assert_eq!(vec![0x00, 0x80], signed_to_bytes(128));
        assert_eq!(vec![0x80], signed_to_bytes(-128));
        assert_eq!(vec![0xff, 0x7f], signed_to_bytes(-129));
        assert_eq!(i64::MIN.to_be_bytes().to_vec(), signed_to_bytes(i64::MIN));
    }

    #[test]
    fn values_round_trip_through_bytes() {
        let values = vec![
            (ElementType::UnsignedInt, ElementValue::UnsignedInt(1_000_000)),
            (ElementType::SignedInt, ElementValue::SignedInt(-40_000)),
            (ElementType::Float, ElementValue::Float(-2.5)),
            (ElementType::String, ElementValue::String(String::from("und"))),
            (ElementType::Utf8, ElementValue::Utf8(String::from("\u{65e5}\u{672c}"))),
            (ElementType::Date, ElementValue::Date(EbmlDate::from_nanos(-5))),
        ];
        for (element_type, value) in values {
            let bytes = value.to_bytes().unwrap();
            assert_eq!(value, read(element_type, &bytes).unwrap());
        }
    }
}
