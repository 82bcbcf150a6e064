//!
//! Contains the vint codec along with a number of other tools that are useful when working with EBML encoded data.
//!

use std::fmt::Write;

use super::errors::tool::ToolError;

///
/// The size marker written for elements whose size is not known when they are written.
///
/// This is the 8 byte all-ones vint pattern, which decodes to [`EbmlSize::Unknown`].
///
pub const UNKNOWN_SIZE: [u8; 8] = [0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];

///
/// The value held by a vint.
///
/// Each vint length reserves the value with every bit set.  That pattern is read as [`EbmlSize::Unknown`], which for element sizes means the element's end is not declared.
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EbmlSize {
    Known(u64),
    Unknown,
}

impl EbmlSize {
    pub fn is_known(&self) -> bool {
        matches!(self, EbmlSize::Known(_))
    }

    pub fn known(&self) -> Option<u64> {
        match self {
            EbmlSize::Known(value) => Some(*value),
            EbmlSize::Unknown => None,
        }
    }
}

///
/// A decoded vint: its value and the number of bytes it occupied (1 to 8).
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Vint {
    pub value: EbmlSize,
    pub length: usize,
}

#[inline]
fn reserved_for_length(length: usize) -> u64 {
    (1u64 << (7 * length)) - 1
}

///
/// Trait to enable easy serialization to a vint.
///
/// This is available for the primitive integer types.  Negative values can never be written as a vint and produce an error.
///
pub trait AsVint: Copy {

    ///
    /// Returns the value as a `u64`, or an error if it is negative.
    ///
    fn vint_value(self) -> Result<u64, ToolError>;

    ///
    /// Returns a representation of the current value as a vint array, using the smallest length that can hold it.
    ///
    /// # Errors
    ///
    /// This can return an error if the value is negative or too large to be representable as a vint (greater than 2^56 - 2).
    ///
    fn as_vint(&self) -> Result<Vec<u8>, ToolError> {
        let val = self.vint_value()?;
        check_size_u64(val, 8)?;
        let mut length = 1;
        while val >= reserved_for_length(length) {
            length += 1;
        }

        Ok(as_vint_no_check_u64(val, length))
    }

    ///
    /// Returns a representation of the current value as a vint array with a specified length.
    ///
    /// # Errors
    ///
    /// This can return an error if the length is not between 1 and 8, or if the value does not fit in a vint of that length.
    ///
    fn as_vint_with_length(&self, length: usize) -> Result<Vec<u8>, ToolError> {
        if !(1..=8).contains(&length) {
            return Err(ToolError::InvalidVintLength(length));
        }
        let val = self.vint_value()?;
        check_size_u64(val, length)?;
        Ok(as_vint_no_check_u64(val, length))
    }
}

macro_rules! unsigned_as_vint {
    ($($t:ty),*) => {
        $(
            impl AsVint for $t {
                fn vint_value(self) -> Result<u64, ToolError> {
                    Ok(self as u64)
                }
            }
        )*
    };
}

macro_rules! signed_as_vint {
    ($($t:ty),*) => {
        $(
            impl AsVint for $t {
                fn vint_value(self) -> Result<u64, ToolError> {
                    u64::try_from(self).map_err(|_| ToolError::UnrepresentableValue(self as i128))
                }
            }
        )*
    };
}

unsigned_as_vint!(u8, u16, u32, u64, usize);
signed_as_vint!(i8, i16, i32, i64, isize);

#[inline]
fn check_size_u64(val: u64, max_length: usize) -> Result<(), ToolError> {
    if val >= reserved_for_length(max_length) {
        Err(ToolError::UnrepresentableValue(val as i128))
    } else {
        Ok(())
    }
}

#[inline]
fn as_vint_no_check_u64(val: u64, length: usize) -> Vec<u8> {
    let bytes: [u8; 8] = val.to_be_bytes();
    let mut result: Vec<u8> = Vec::from(&bytes[(8 - length)..]);
    result[0] |= 1 << (8 - length);
    result
}

///
/// Reads a vint from the beginning of the input array slice.
///
/// This method returns an option with the `None` variant used to indicate there was not enough data in the buffer to completely read a vint.  The caller should wait for more data and try again.
///
/// # Errors
///
/// This method returns [`ToolError::UnrepresentableLength`] if the first byte is zero, as that would require a vint longer than 8 bytes.
///
pub fn read_vint(buffer: &[u8]) -> Result<Option<Vint>, ToolError> {
    if buffer.is_empty() {
        return Ok(None);
    }

    if buffer[0] == 0 {
        return Err(ToolError::UnrepresentableLength);
    }

    let length = buffer[0].leading_zeros() as usize + 1;

    if length > buffer.len() {
        return Ok(None);
    }

    let mut value = (buffer[0] as u64) & ((1u64 << (8 - length)) - 1);
    for item in buffer.iter().take(length).skip(1) {
        value = (value << 8) | *item as u64;
    }

    let value = if value == reserved_for_length(length) {
        EbmlSize::Unknown
    } else {
        EbmlSize::Known(value)
    };

    Ok(Some(Vint { value, length }))
}

///
/// Returns the unknown size marker of the given length: the marker bit followed by all ones.
///
/// Lengths outside 1 to 8 produce the 8 byte [`UNKNOWN_SIZE`].
///
pub fn unknown_size_with_length(length: usize) -> Vec<u8> {
    if !(1..=8).contains(&length) {
        return UNKNOWN_SIZE.to_vec();
    }
    let mut marker = vec![0xff; length];
    marker[0] = 0xff >> (length - 1);
    marker
}

///
/// Formats bytes as a lowercase hex string with no separators, e.g. `[0x1a, 0x45]` becomes `"1a45"`.
///
pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut acc, byte| {
        let _ = write!(acc, "{:02x}", byte);
        acc
    })
}

///
/// Reads a `u64` value from any length array slice.
///
/// Rather than forcing the input to be a `[u8; 8]` like standard library methods, this can interpret a `u64` from a slice of any length <= 8.  Bytes are big endian - i.e. an array of `[4, 0]` would return a value of `1024`.  An empty slice reads as `0`.
///
/// # Errors
///
/// This method will return an error if the input slice has a length > 8.
///
/// ## Example
///
/// ```
/// # use ebml_stream::tools::arr_to_u64;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = arr_to_u64(&[16,0])?;
/// assert_eq!(result, 4096);
/// # Ok(())
/// # }
/// ```
///
pub fn arr_to_u64(arr: &[u8]) -> Result<u64, ToolError> {
    if arr.len() > 8 {
        return Err(ToolError::ReadU64Overflow(Vec::from(arr)));
    }

    Ok(arr.iter().fold(0u64, |val, byte| (val << 8) | *byte as u64))
}

///
/// Reads an `i64` value from any length array slice.
///
/// The slice is read as a big endian two's complement number of its own width, so `[0xff]` is `-1` and `[0x00, 0xff]` is `255`.  An empty slice reads as `0`.
///
/// # Errors
///
/// This method will return an error if the input slice has a length > 8.
///
/// ## Example
///
/// ```
/// # use ebml_stream::tools::arr_to_i64;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// assert_eq!(arr_to_i64(&[4,0])?, 1024);
/// assert_eq!(arr_to_i64(&[0xff, 0xfe])?, -2);
/// # Ok(())
/// # }
/// ```
///
pub fn arr_to_i64(arr: &[u8]) -> Result<i64, ToolError> {
    if arr.len() > 8 {
        return Err(ToolError::ReadI64Overflow(Vec::from(arr)));
    }
    if arr.is_empty() {
        return Ok(0);
    }

    let shift = 64 - 8 * arr.len() as u32;
    let unsigned = arr_to_u64(arr)?;
    Ok(((unsigned << shift) as i64) >> shift)
}

///
/// Reads an `f64` value from an array slice of length 4 or 8.
///
/// This method wraps `f32` and `f64` conversions from big endian byte arrays and casts the result as an `f64`.
///
/// # Errors
///
/// This method will return an error if the input slice length is not 4 or 8.
///
pub fn arr_to_f64(arr: &[u8]) -> Result<f64, ToolError> {
    if let Ok(bytes) = TryInto::<[u8; 4]>::try_into(arr) {
        Ok(f32::from_be_bytes(bytes) as f64)
    } else if let Ok(bytes) = TryInto::<[u8; 8]>::try_into(arr) {
        Ok(f64::from_be_bytes(bytes))
    } else {
        Err(ToolError::ReadF64Mismatch(Vec::from(arr)))
    }
}
