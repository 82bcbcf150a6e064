//! This crate provides a streaming decoder and encoder for [EBML][EBML] data.  Bytes can be fed to the decoder in chunks of any size as they arrive, and it produces events as soon as elements are complete.
//!
//! [EBML][EBML] stands for Extensible Binary Meta-Language and is somewhat of a
//! binary version of XML. It's used for container formats like [WebM][webm] or
//! [MKV][mkv].
//!
//! # Events
//! A decoded stream is a flat sequence of [`tags::Event`]s: master elements produce a `Start` and an `End`, every other element a single `Tag` with its decoded value.  The [`Encoder`] accepts the same events, so a stream can be decoded, filtered and written back out.
//!
//! # Specifications
//! Both the decoder and the encoder are schema-agnostic and require a schema implementing the [`specs::EbmlSchema`] trait.  A table for the common Matroska/WebM elements is included as [`specs::MatroskaSchema`].
//!
//! # Unknown Data Size
//! Master elements may be written with an "Unknown Data Size" as defined in [RFC8794][rfc8794], which is common in live streams.  The decoder keeps such elements open until they are closed explicitly with [`Decoder::close_unknown`]; the reader adapters close them when their source ends.
//!
//! [EBML]: http://ebml.sourceforge.net/
//! [webm]: https://www.webmproject.org/
//! [mkv]: http://www.matroska.org/technical/specs/index.html
//! [rfc8794]: https://datatracker.ietf.org/doc/rfc8794/
//!

mod errors;
mod decoder_util;
mod decoder;
mod encoder;
mod reader;
pub mod tools;
pub mod specs;
pub mod tags;
pub mod tag_value;

#[cfg(feature = "futures")]
pub mod nonblocking;

pub use self::decoder::{Decoder, Events};
pub use self::decoder_util::{DecodeState, DecoderOptions};
pub use self::encoder::Encoder;
pub use self::reader::DecoderReader;

#[cfg(feature = "futures")]
pub use self::nonblocking::DecoderReaderAsync;

pub mod error {
    //!
    //! Potential errors that can occur when decoding or encoding EBML data.
    //!
    pub use super::errors::tool::ToolError;
    pub use super::errors::tag_value::ValueError;
    pub use super::errors::decoder::DecodeError;
    pub use super::errors::encoder::EncodeError;
}
