use std::io::{ErrorKind, Read};

use log::debug;

use super::decoder::Decoder;
use super::decoder_util::DecoderOptions;
use super::errors::decoder::DecodeError;
use super::specs::EbmlSchema;
use super::tags::Event;

///
/// Provides an iterator over the [`Event`]s of an EBML stream read from a source implementing [`std::io::Read`].
///
/// Bytes are pulled from the source in chunks of [`DecoderOptions::read_chunk_size`] and fed to a [`Decoder`].  When the source is exhausted, any unknown-sized elements that are still open are closed, so every [`Event::Start`] gets a matching [`Event::End`].
///
/// Iteration ends after the first error.  If the source ends in the middle of an element, the last item is [`DecodeError::UnexpectedEof`].
///
/// ## Example
///
/// ```
/// use std::io::Cursor;
/// use ebml_stream::DecoderReader;
/// use ebml_stream::specs::MatroskaSchema;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = Cursor::new(vec![0x1a, 0x45, 0xdf, 0xa3, 0x84, 0x42, 0x86, 0x81, 0x00]);
/// let reader: DecoderReader<_, MatroskaSchema> = DecoderReader::new(source);
///
/// let names = reader.map(|event| event.map(|e| e.name())).collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(vec!["EBML", "EBMLVersion", "EBML"], names);
/// # Ok(())
/// # }
/// ```
///
pub struct DecoderReader<R: Read, TSpec: EbmlSchema> {
    source: R,
    buffer: Box<[u8]>,
    decoder: Decoder<TSpec>,
    reached_eof: bool,
    failed: bool,
}

impl<R: Read, TSpec: EbmlSchema> DecoderReader<R, TSpec> {
    pub fn new(source: R) -> Self {
        DecoderReader::with_options(source, DecoderOptions::default())
    }

    pub fn with_options(source: R, options: DecoderOptions) -> Self {
        DecoderReader {
            source,
            buffer: vec![0u8; options.read_chunk_size.max(1)].into_boxed_slice(),
            decoder: Decoder::with_options(options),
            reached_eof: false,
            failed: false,
        }
    }

    pub fn decoder(&self) -> &Decoder<TSpec> {
        &self.decoder
    }

    ///
    /// Gives access to the underlying decoder, for example to close an unknown-sized element with [`Decoder::close_unknown`] before the source ends.
    ///
    pub fn decoder_mut(&mut self) -> &mut Decoder<TSpec> {
        &mut self.decoder
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn fail(&mut self, err: DecodeError) -> Option<Result<Event, DecodeError>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl<R: Read, TSpec: EbmlSchema> Iterator for DecoderReader<R, TSpec> {
    type Item = Result<Event, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }

            match self.decoder.next_event() {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => {},
                Err(err) => return self.fail(err),
            }

            if self.reached_eof {
                return self.decoder.close_unknown().map(Ok);
            }

            match self.source.read(&mut self.buffer) {
                Ok(0) => {
                    debug!("source exhausted after {} bytes", self.decoder.total());
                    self.reached_eof = true;
                    if let Err(err) = self.decoder.finish() {
                        return self.fail(err);
                    }
                },
                Ok(len) => self.decoder.push(&self.buffer[..len]),
                Err(err) if err.kind() == ErrorKind::Interrupted => {},
                Err(source) => return self.fail(DecodeError::ReadError { source }),
            }
        }
    }
}
