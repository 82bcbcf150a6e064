use futures::{AsyncRead, AsyncReadExt, Stream};
use log::debug;

use crate::error::DecodeError;
use crate::specs::EbmlSchema;
use crate::tags::Event;
use crate::{Decoder, DecoderOptions};

///
/// The async counterpart of [`DecoderReader`](crate::DecoderReader), reading from any source that implements [`futures::AsyncRead`].
///
/// This can be transformed into a [`Stream`] using [`into_stream`][DecoderReaderAsync::into_stream], or consumed directly by calling [`.next().await`] in a loop.
///
pub struct DecoderReaderAsync<R: AsyncRead + Unpin, TSpec: EbmlSchema> {
    source: R,
    buffer: Box<[u8]>,
    decoder: Decoder<TSpec>,
    reached_eof: bool,
    failed: bool,
}

impl<R: AsyncRead + Unpin, TSpec: EbmlSchema> DecoderReaderAsync<R, TSpec> {
    pub fn new(source: R) -> Self {
        Self::with_options(source, DecoderOptions::default())
    }

    pub fn with_options(source: R, options: DecoderOptions) -> Self {
        Self {
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

    pub fn decoder_mut(&mut self) -> &mut Decoder<TSpec> {
        &mut self.decoder
    }

    pub async fn next(&mut self) -> Option<Result<Event, DecodeError>> {
        loop {
            if self.failed {
                return None;
            }

            match self.decoder.next_event() {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => {},
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }

            if self.reached_eof {
                return self.decoder.close_unknown().map(Ok);
            }

            match self.source.read(&mut self.buffer).await {
                Ok(0) => {
                    debug!("source exhausted after {} bytes", self.decoder.total());
                    self.reached_eof = true;
                    if let Err(err) = self.decoder.finish() {
                        self.failed = true;
                        return Some(Err(err));
                    }
                },
                Ok(len) => self.decoder.push(&self.buffer[..len]),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {},
                Err(source) => {
                    self.failed = true;
                    return Some(Err(DecodeError::ReadError { source }));
                }
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Event, DecodeError>> {
        futures::stream::unfold(self, |mut read| async {
            let next = read.next().await;
            next.map(move |it| (it, read))
        })
    }
}
