pub const DEFAULT_BUFFER_LEN: usize = 1024 * 64;

///
/// The part of an element the [`Decoder`](crate::Decoder) expects to read next.
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DecodeState {
    Tag,
    Size,
    Content,
}

///
/// Result of a single step of the decoder state machine.
///
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Step {
    Advanced,
    NeedMoreData,
}

///
/// Configuration for a [`Decoder`](crate::Decoder) and the reader adapters built on it.
///
/// ## Example
///
/// ```
/// use ebml_stream::DecoderOptions;
///
/// let options = DecoderOptions::default()
///     .with_capacity(4096)
///     .with_max_payload_size(16 * 1024 * 1024);
/// assert_eq!(Some(16 * 1024 * 1024), options.max_payload_size);
/// ```
///
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DecoderOptions {

    ///
    /// Initial capacity of the pending byte buffer.  The buffer still grows past this if a single element needs more.
    ///
    pub capacity: usize,

    ///
    /// Largest leaf payload the decoder will buffer.  Elements declaring a bigger size fail with [`DecodeError::PayloadTooLarge`](crate::error::DecodeError::PayloadTooLarge).  `None` means no limit.
    ///
    pub max_payload_size: Option<usize>,

    ///
    /// How many bytes the reader adapters request from their source per read.
    ///
    pub read_chunk_size: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            capacity: DEFAULT_BUFFER_LEN,
            max_payload_size: None,
            read_chunk_size: DEFAULT_BUFFER_LEN,
        }
    }
}

impl DecoderOptions {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = Some(max);
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }
}
