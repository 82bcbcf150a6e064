pub mod tool {
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq, Eq)]
    pub enum ToolError {
        #[error("Unrepresentable vint length: no marker bit found in the first byte.")]
        UnrepresentableLength,
        #[error("Unrepresentable value, cannot be written as a vint: {0}")]
        UnrepresentableValue(i128),
        #[error("Vint length must be between 1 and 8, got {0}")]
        InvalidVintLength(usize),
        #[error("Could not read unsigned int from array: {0:?}")]
        ReadU64Overflow(Vec<u8>),
        #[error("Could not read int from array: {0:?}")]
        ReadI64Overflow(Vec<u8>),
        #[error("Could not read float from array: {0:?}")]
        ReadF64Mismatch(Vec<u8>),
    }
}

pub mod tag_value {
    use std::str::Utf8Error;
    use thiserror::Error;

    use super::tool::ToolError;

    #[derive(Debug, Error)]
    pub enum ValueError {
        #[error("Integer payload is longer than 8 bytes ({0} bytes).")]
        IntegerTooLong(usize),
        #[error("Float payload must be 0, 4 or 8 bytes long, got {0} bytes.")]
        FloatLength(usize),
        #[error("Date payload must be 0 or 8 bytes long, got {0} bytes.")]
        DateLength(usize),
        #[error("Error parsing data as Utf8.")]
        Utf8(#[source] Utf8Error),
        #[error("Block payload is too short to hold a block header ({0} bytes).")]
        TruncatedBlock(usize),
        #[error("Block track number is malformed.")]
        BlockTrack(#[source] ToolError),
    }
}

pub mod decoder {
    use std::io;
    use thiserror::Error;

    use super::tag_value::ValueError;
    use super::tool::ToolError;

    #[derive(Debug, Error)]
    pub enum DecodeError {
        #[error("Encountered corrupted data at offset {position}.")]
        CorruptedData {
            position: u64,
            #[source]
            problem: ToolError,
        },
        #[error("Could not decode the value of element {id_hex} ({name}).")]
        CorruptedTagData {
            id_hex: String,
            name: &'static str,
            #[source]
            problem: ValueError,
        },
        #[error("Element {id_hex} ({name}) at offset {position} has an unknown size, but only master elements may be unknown sized.")]
        UnknownSizedLeaf {
            id_hex: String,
            name: &'static str,
            position: u64,
        },
        #[error("Element {id_hex} declares a payload of {size} bytes, larger than the configured maximum of {max}.")]
        PayloadTooLarge {
            id_hex: String,
            size: u64,
            max: usize,
        },
        #[error("Source ended in the middle of an element ({buffered} bytes buffered, {open} elements open).")]
        UnexpectedEof {
            buffered: usize,
            open: usize,
        },
        #[error("Error reading from source.")]
        ReadError {
            #[from]
            source: io::Error,
        },
    }
}

pub mod encoder {
    use std::io;
    use thiserror::Error;

    use super::tool::ToolError;

    #[derive(Debug, Error)]
    pub enum EncodeError {
        #[error("No schema entry found for {0}")]
        UnknownSchemaName(String),
        #[error("Problem writing element size.")]
        TagSizeError(#[from] ToolError),
        #[error("Unexpected closing tag {name:?}. Innermost open element: {expected:?}")]
        UnexpectedClosingTag {
            name: Option<String>,
            expected: Option<String>,
        },
        #[error("{open} elements are still open and {corked} bytes are still corked.")]
        UnclosedElements {
            open: usize,
            corked: usize,
        },
        #[error("Error writing to destination.")]
        WriteError {
            #[from]
            source: io::Error,
        },
    }
}
