use std::collections::VecDeque;
use std::marker::PhantomData;
use std::mem;

use bytes::{Bytes, BytesMut};
use log::{debug, trace};

use super::decoder_util::{DecodeState, DecoderOptions, Step};
use super::errors::decoder::DecodeError;
use super::specs::EbmlSchema;
use super::tag_value;
use super::tags::{ElementEnd, ElementHeader, ElementType, Event};
use super::tools::{self, EbmlSize, Vint};

const UNKNOWN_NAME: &str = "unknown";

enum Phase {
    Tag,
    Size(ElementHeader),
    Content(ElementHeader),
}

///
/// Incremental EBML decoder.  Bytes are pushed in as they arrive, in chunks of any size, and structural [`Event`]s come out.
///
/// This is a generic struct that requires a schema implementing [`EbmlSchema`] to resolve element ids into names and types.  Ids that are not in the schema are not an error: they decode as [`ElementType::Unknown`] elements named `"unknown"` whose payload is passed through as binary.
///
/// The decoder never blocks and never needs the whole stream.  When a chunk ends in the middle of an element, event iteration simply stops and resumes where it left off once the next chunk is fed.  Splitting the input differently never changes the events produced.
///
/// Master elements with a known size are closed ([`Event::End`]) as soon as the last byte of their content has been consumed.  Master elements with an unknown size stay open until [`Decoder::close_unknown`] is called.
///
/// ## Example
///
/// ```
/// use ebml_stream::Decoder;
/// use ebml_stream::tags::Event;
/// use ebml_stream::specs::MatroskaSchema;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
///
/// // Chunk boundaries can fall anywhere
/// let mut names = Vec::new();
/// for chunk in [&[0x1a, 0x45][..], &[0xdf, 0xa3, 0x84, 0x42][..], &[0x86, 0x81, 0x00][..]] {
///     for event in decoder.feed(chunk) {
///         names.push(match event? {
///             Event::Start(header) => format!("start {}", header.name),
///             Event::Tag(header, value) => format!("tag {} {:?}", header.name, value.as_unsigned_int()),
///             Event::End(header) => format!("end {}", header.name),
///         });
///     }
/// }
/// assert_eq!(names, vec!["start EBML", "tag EBMLVersion Some(0)", "end EBML"]);
/// # Ok(())
/// # }
/// ```
///
pub struct Decoder<TSpec: EbmlSchema> {
    buffer: BytesMut,
    cursor: usize,
    total: u64,
    phase: Phase,
    tag_stack: Vec<ElementHeader>,
    pending_events: VecDeque<Event>,
    options: DecoderOptions,
    spec_type: PhantomData<fn() -> TSpec>,
}

impl<TSpec: EbmlSchema> Default for Decoder<TSpec> {
    fn default() -> Self {
        Decoder::new()
    }
}

impl<TSpec: EbmlSchema> Decoder<TSpec> {

    ///
    /// Returns a new `Decoder<TSpec>` with the default [`DecoderOptions`].
    ///
    pub fn new() -> Self {
        Decoder::with_options(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Decoder {
            buffer: BytesMut::with_capacity(options.capacity),
            cursor: 0,
            total: 0,
            phase: Phase::Tag,
            tag_stack: Vec::new(),
            pending_events: VecDeque::new(),
            options,
            spec_type: PhantomData,
        }
    }

    ///
    /// Decodes a complete, in-memory stream in one call.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.  Trailing bytes that do not form a complete element are reported as [`DecodeError::UnexpectedEof`].
    ///
    pub fn decode_all(data: &[u8]) -> Result<Vec<Event>, DecodeError> {
        let mut decoder: Decoder<TSpec> = Decoder::new();
        let events = decoder.feed(data).collect::<Result<Vec<Event>, DecodeError>>()?;
        decoder.finish()?;
        Ok(events)
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    ///
    /// Appends a chunk of bytes to the decoder's buffer and returns an iterator over the events that can now be produced.
    ///
    /// The iterator is lazy: bytes are parsed only as events are pulled from it.  Events that are not pulled stay queued and are produced by the next iterator.  The iterator ends when more data is needed, or right after yielding an error.
    ///
    pub fn feed(&mut self, chunk: &[u8]) -> Events<'_, TSpec> {
        self.push(chunk);
        self.events()
    }

    ///
    /// Appends a chunk of bytes to the decoder's buffer without producing any events.
    ///
    pub fn push(&mut self, chunk: &[u8]) {
        trace!("received {} bytes", chunk.len());
        self.buffer.extend_from_slice(chunk);
    }

    ///
    /// Returns an iterator over the events that can be produced from the bytes already buffered.
    ///
    pub fn events(&mut self) -> Events<'_, TSpec> {
        Events { decoder: self, failed: false }
    }

    ///
    /// Produces the next event, if the buffered bytes allow it.
    ///
    /// Returns `Ok(None)` when more data is needed.
    ///
    /// # Errors
    ///
    /// Malformed element ids or sizes produce [`DecodeError::CorruptedData`]; the decoder does not move past them, so calling again reports the same error.  A payload that does not match its schema type produces [`DecodeError::CorruptedTagData`]; that element is skipped and decoding can continue with the next call.
    ///
    pub fn next_event(&mut self) -> Result<Option<Event>, DecodeError> {
        loop {
            if let Some(event) = self.pending_events.pop_front() {
                return Ok(Some(event));
            }

            if let Step::NeedMoreData = self.step()? {
                return Ok(None);
            }
        }
    }

    ///
    /// Closes the innermost open element if its size is unknown, returning its [`Event::End`].
    ///
    /// Unknown-sized elements are never closed by the decoder itself.  Callers that know the element is complete (for example because they saw the start of a sibling, or the stream ended) use this to close it.  Nothing is closed unless the decoder is between elements and every queued event has been consumed.
    ///
    /// Any known-sized ancestors that were only waiting on the closed element are closed too; their events are queued behind the returned one.
    ///
    pub fn close_unknown(&mut self) -> Option<Event> {
        if !matches!(self.phase, Phase::Tag) || !self.pending_events.is_empty() {
            return None;
        }
        if !matches!(self.tag_stack.last(), Some(top) if top.end == ElementEnd::Unknown) {
            return None;
        }

        let header = self.tag_stack.pop()?;
        debug!("closing unknown sized element {} ({}) at {}", header.name, header.id_hex, self.total);
        self.close_finished();
        Some(Event::End(header))
    }

    ///
    /// Checks that the stream can end here.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedEof`] if an element is partially read, bytes are left over, or a known-sized element still expects content.  Open unknown-sized elements are allowed.
    ///
    pub fn finish(&self) -> Result<(), DecodeError> {
        // Known-sized elements can stay on the stack after their end while an unknown-sized child is open
        let truncated = self.tag_stack.iter().any(|header| matches!(header.end, ElementEnd::Known(end) if end > self.total));
        if matches!(self.phase, Phase::Tag) && self.buffered_len() == 0 && !truncated {
            Ok(())
        } else {
            Err(DecodeError::UnexpectedEof {
                buffered: self.buffered_len(),
                open: self.tag_stack.len(),
            })
        }
    }

    ///
    /// Total bytes consumed since the start of the stream.
    ///
    pub fn total(&self) -> u64 {
        self.total
    }

    ///
    /// Number of master elements currently open.
    ///
    pub fn depth(&self) -> usize {
        self.tag_stack.len()
    }

    ///
    /// Headers of the currently open master elements, outermost first.
    ///
    pub fn open_elements(&self) -> &[ElementHeader] {
        &self.tag_stack
    }

    ///
    /// Bytes received but not yet consumed.
    ///
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn state(&self) -> DecodeState {
        match self.phase {
            Phase::Tag => DecodeState::Tag,
            Phase::Size(_) => DecodeState::Size,
            Phase::Content(_) => DecodeState::Content,
        }
    }

    ///
    /// Returns `true` when the decoder is between elements with nothing buffered and no queued events.
    ///
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Tag) && self.buffered_len() == 0 && self.pending_events.is_empty()
    }

    fn step(&mut self) -> Result<Step, DecodeError> {
        match mem::replace(&mut self.phase, Phase::Tag) {
            Phase::Tag => self.read_tag(),
            Phase::Size(header) => self.read_size(header),
            Phase::Content(header) => self.read_content(header),
        }
    }

    fn peek_vint(&self) -> Result<Option<Vint>, DecodeError> {
        tools::read_vint(&self.buffer[self.cursor..]).map_err(|problem| DecodeError::CorruptedData {
            position: self.total,
            problem,
        })
    }

    fn advance(&mut self, length: usize) {
        self.cursor += length;
        self.total += length as u64;
    }

    fn read_tag(&mut self) -> Result<Step, DecodeError> {
        let vint = match self.peek_vint()? {
            Some(vint) => vint,
            None => {
                trace!("waiting for more data to read element id at {}", self.total);
                return Ok(Step::NeedMoreData);
            }
        };

        let id_bytes = &self.buffer[self.cursor..self.cursor + vint.length];
        let id_hex = tools::hex_string(id_bytes);
        let id = tools::arr_to_u64(id_bytes).map_err(|problem| DecodeError::CorruptedData {
            position: self.total,
            problem,
        })?;
        let (element_type, name) = match TSpec::get_element(&id_hex) {
            Some(element) => (element.element_type, element.name),
            None => (ElementType::Unknown, UNKNOWN_NAME),
        };

        let start = self.total;
        self.advance(vint.length);
        trace!("read element id {} ({}) at {}", id_hex, name, start);

        self.phase = Phase::Size(ElementHeader {
            id,
            id_hex,
            element_type,
            name,
            start,
            end: ElementEnd::Known(self.total),
            data_size: None,
            size_length: 0,
            data: Bytes::new(),
        });
        Ok(Step::Advanced)
    }

    fn read_size(&mut self, mut header: ElementHeader) -> Result<Step, DecodeError> {
        let vint = match self.peek_vint() {
            Ok(Some(vint)) => vint,
            other => {
                self.phase = Phase::Size(header);
                return other.map(|_| {
                    trace!("waiting for more data to read element size at {}", self.total);
                    Step::NeedMoreData
                });
            }
        };

        if let Err(err) = self.check_size(&header, vint.value) {
            self.phase = Phase::Size(header);
            return Err(err);
        }

        self.advance(vint.length);
        header.size_length = vint.length;
        match vint.value {
            EbmlSize::Known(size) => {
                header.data_size = Some(size);
                header.end = ElementEnd::Known(self.total + size);
            },
            EbmlSize::Unknown => {
                header.data_size = None;
                header.end = ElementEnd::Unknown;
            },
        }
        trace!("read size {:?} for {}", vint.value, header.id_hex);

        self.phase = Phase::Content(header);
        Ok(Step::Advanced)
    }

    fn check_size(&self, header: &ElementHeader, size: EbmlSize) -> Result<(), DecodeError> {
        if header.element_type == ElementType::Master {
            return Ok(());
        }

        let size = match size {
            EbmlSize::Known(size) => size,
            EbmlSize::Unknown => return Err(DecodeError::UnknownSizedLeaf {
                id_hex: header.id_hex.clone(),
                name: header.name,
                position: header.start,
            }),
        };

        let max = self.options.max_payload_size.unwrap_or(usize::MAX);
        if usize::try_from(size).map_or(true, |size| size > max) {
            return Err(DecodeError::PayloadTooLarge {
                id_hex: header.id_hex.clone(),
                size,
                max,
            });
        }

        Ok(())
    }

    fn read_content(&mut self, mut header: ElementHeader) -> Result<Step, DecodeError> {
        if header.element_type == ElementType::Master {
            debug!("start {} ({}) at {}, end {:?}", header.name, header.id_hex, header.start, header.end);
            self.tag_stack.push(header.clone());
            self.pending_events.push_back(Event::Start(header));
            self.close_finished();
            return Ok(Step::Advanced);
        }

        // Checked against usize in `check_size`
        let size = header.data_size.unwrap_or_default() as usize;
        if self.buffer.len() < self.cursor + size {
            trace!("waiting for more data: got {}, need {}", self.buffer.len(), self.cursor + size);
            self.phase = Phase::Content(header);
            return Ok(Step::NeedMoreData);
        }

        let consumed = self.buffer.split_to(self.cursor + size).freeze();
        let data = consumed.slice(self.cursor..);
        self.cursor = 0;
        self.total += size as u64;

        let value = tag_value::read_value(header.element_type, header.name, data.clone());
        let result = match value {
            Ok(value) => {
                debug!("tag {} ({}) at {}, {} bytes", header.name, header.id_hex, header.start, size);
                header.data = data;
                self.pending_events.push_back(Event::Tag(header, value));
                Ok(Step::Advanced)
            },
            Err(problem) => Err(DecodeError::CorruptedTagData {
                id_hex: header.id_hex,
                name: header.name,
                problem,
            }),
        };

        self.close_finished();
        result
    }

    fn close_finished(&mut self) {
        while let Some(top) = self.tag_stack.last() {
            match top.end {
                ElementEnd::Known(end) if self.total >= end => {},
                _ => break,
            }
            if let Some(header) = self.tag_stack.pop() {
                debug!("end {} ({}) at {}", header.name, header.id_hex, self.total);
                self.pending_events.push_back(Event::End(header));
            }
        }
    }
}

///
/// Iterator over the events a [`Decoder`] can currently produce.  Returned by [`Decoder::feed`] and [`Decoder::events`].
///
/// Iteration stops when more data is needed, and right after an error has been yielded.
///
pub struct Events<'a, TSpec: EbmlSchema> {
    decoder: &'a mut Decoder<TSpec>,
    failed: bool,
}

impl<'a, TSpec: EbmlSchema> Iterator for Events<'a, TSpec> {
    type Item = Result<Event, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.decoder.next_event() {
            Ok(event) => event.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs::MatroskaSchema;
    use crate::tags::ElementValue;

    const EBML_HEADER: [u8; 9] = [0x1a, 0x45, 0xdf, 0xa3, 0x84, 0x42, 0x86, 0x81, 0x00];

    fn collect(decoder: &mut Decoder<MatroskaSchema>, chunk: &[u8]) -> Vec<Event> {
        decoder.feed(chunk).map(|e| e.expect("decoding should not fail")).collect()
    }

    #[test]
    fn decodes_ebml_header() {
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        let events = collect(&mut decoder, &EBML_HEADER);
        assert_eq!(3, events.len());

        match &events[0] {
            Event::Start(header) => {
                assert_eq!(0x1a45dfa3, header.id);
                assert_eq!("1a45dfa3", header.id_hex);
                assert_eq!("EBML", header.name);
                assert_eq!(ElementType::Master, header.element_type);
                assert_eq!(0, header.start);
                assert_eq!(ElementEnd::Known(9), header.end);
                assert_eq!(Some(4), header.data_size);
                assert_eq!(Some(5), header.header_length());
                assert_eq!(1, header.size_length);
            },
            other => panic!("expected start, got {:?}", other),
        }
        match &events[1] {
            Event::Tag(header, value) => {
                assert_eq!("4286", header.id_hex);
                assert_eq!("EBMLVersion", header.name);
                assert_eq!(5, header.start);
                assert_eq!(ElementEnd::Known(9), header.end);
                assert_eq!(&[0x00][..], &header.data[..]);
                assert_eq!(&ElementValue::UnsignedInt(0), value);
            },
            other => panic!("expected tag, got {:?}", other),
        }
        assert!(matches!(&events[2], Event::End(header) if header.name == "EBML"));
        assert_eq!(9, decoder.total());
        assert!(decoder.is_idle());
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn waits_for_more_data() {
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        assert!(collect(&mut decoder, &EBML_HEADER[..2]).is_empty());
        assert_eq!(DecodeState::Tag, decoder.state());

        let events = collect(&mut decoder, &EBML_HEADER[2..8]);
        assert_eq!(1, events.len());
        assert_eq!(DecodeState::Content, decoder.state());
        assert!(decoder.finish().is_err());

        let events = collect(&mut decoder, &EBML_HEADER[8..]);
        assert_eq!(2, events.len());
        assert!(decoder.is_idle());
    }

    #[test]
    fn unknown_ids_pass_through() {
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        let events = collect(&mut decoder, &[0x4f, 0xff, 0x82, 0xbe, 0xef]);
        assert_eq!(1, events.len());
        match &events[0] {
            Event::Tag(header, value) => {
                assert_eq!(ElementType::Unknown, header.element_type);
                assert_eq!("unknown", header.name);
                assert_eq!(0x4fff, header.id);
                assert_eq!(format!("{:x}", header.id), header.id_hex);
                assert_eq!(&ElementValue::Binary(Bytes::from_static(&[0xbe, 0xef])), value);
            },
            other => panic!("expected tag, got {:?}", other),
        }
    }

    #[test]
    fn malformed_id_is_reported_again() {
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        let mut events = decoder.feed(&[0x00, 0x81]);
        assert!(matches!(events.next(), Some(Err(DecodeError::CorruptedData { position: 0, .. }))));
        assert!(events.next().is_none());
        assert!(matches!(decoder.next_event(), Err(DecodeError::CorruptedData { .. })));
    }

    #[test]
    fn unknown_size_stays_open() {
        // Segment (unknown size) > Timecode(0x10) inside a Cluster (unknown size)
        let data = [
            0x18, 0x53, 0x80, 0x67, 0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0x1f, 0x43, 0xb6, 0x75, 0xff,
            0xe7, 0x81, 0x10,
        ];
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        let events = collect(&mut decoder, &data);
        assert_eq!(3, events.len());
        assert!(matches!(&events[0], Event::Start(h) if h.name == "Segment" && h.end == ElementEnd::Unknown && h.data_size.is_none()));
        assert!(matches!(&events[1], Event::Start(h) if h.name == "Cluster" && h.end == ElementEnd::Unknown));
        assert!(matches!(&events[2], Event::Tag(h, ElementValue::UnsignedInt(16)) if h.name == "Timecode"));
        assert_eq!(2, decoder.depth());
        assert!(decoder.finish().is_ok());

        assert!(matches!(decoder.close_unknown(), Some(Event::End(h)) if h.name == "Cluster"));
        assert!(matches!(decoder.close_unknown(), Some(Event::End(h)) if h.name == "Segment"));
        assert!(decoder.close_unknown().is_none());
        assert_eq!(0, decoder.depth());
    }

    #[test]
    fn close_unknown_closes_finished_parents() {
        // Segment (size 8) > Cluster (unknown size) > Timecode
        let data = [
            0x18, 0x53, 0x80, 0x67, 0x88,
            0x1f, 0x43, 0xb6, 0x75, 0xff,
            0xe7, 0x81, 0x10,
        ];
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        let events = collect(&mut decoder, &data);
        assert_eq!(3, events.len());

        assert!(matches!(decoder.close_unknown(), Some(Event::End(h)) if h.name == "Cluster"));
        assert!(matches!(decoder.next_event(), Ok(Some(Event::End(h))) if h.name == "Segment"));
        assert!(decoder.is_idle());
    }

    #[test]
    fn finish_allows_finished_parent_of_unknown_child() {
        let data = [
            0x18, 0x53, 0x80, 0x67, 0x88,
            0x1f, 0x43, 0xb6, 0x75, 0xff,
            0xe7, 0x81, 0x10,
        ];
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        collect(&mut decoder, &data);
        assert_eq!(2, decoder.depth());
        assert!(decoder.finish().is_ok());

        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        collect(&mut decoder, &data[..12]);
        assert!(matches!(decoder.finish(), Err(DecodeError::UnexpectedEof { .. })));
    }

    #[test]
    fn close_unknown_ignores_known_sizes() {
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        let events = collect(&mut decoder, &EBML_HEADER[..5]);
        assert_eq!(1, events.len());
        assert!(decoder.close_unknown().is_none());
        assert_eq!(1, decoder.depth());
    }

    #[test]
    fn empty_master_closes_immediately() {
        // Segment (size 8) > Cues (size 0), Void (size 1)
        let data = [0x18, 0x53, 0x80, 0x67, 0x88, 0x1c, 0x53, 0xbb, 0x6b, 0x80, 0xec, 0x81, 0x00];
        let events = Decoder::<MatroskaSchema>::decode_all(&data).unwrap();
        let names: Vec<(&str, &str)> = events.iter().map(|e| (match e {
            Event::Start(_) => "start",
            Event::Tag(_, _) => "tag",
            Event::End(_) => "end",
        }, e.name())).collect();
        assert_eq!(vec![
            ("start", "Segment"),
            ("start", "Cues"),
            ("end", "Cues"),
            ("tag", "Void"),
            ("end", "Segment"),
        ], names);
    }

    #[test]
    fn unknown_sized_leaf_is_an_error() {
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        let result: Result<Vec<Event>, DecodeError> = decoder.feed(&[0xe7, 0xff, 0x00]).collect();
        assert!(matches!(result, Err(DecodeError::UnknownSizedLeaf { position: 0, .. })));
    }

    #[test]
    fn payload_limit() {
        let mut decoder: Decoder<MatroskaSchema> = Decoder::with_options(DecoderOptions::default().with_max_payload_size(2));
        let result: Result<Vec<Event>, DecodeError> = decoder.feed(&[0xec, 0x83]).collect();
        assert!(matches!(result, Err(DecodeError::PayloadTooLarge { size: 3, max: 2, .. })));

        let mut decoder: Decoder<MatroskaSchema> = Decoder::with_options(DecoderOptions::default().with_max_payload_size(2));
        assert_eq!(1, collect(&mut decoder, &[0xec, 0x82, 0x00, 0x00]).len());
    }

    #[test]
    fn bad_value_skips_element() {
        // Duration with a 3 byte payload followed by EBMLVersion
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        let mut events = decoder.feed(&[0x44, 0x89, 0x83, 0x00, 0x00, 0x00, 0x42, 0x86, 0x81, 0x01]);
        assert!(matches!(events.next(), Some(Err(DecodeError::CorruptedTagData { name: "Duration", .. }))));
        assert!(events.next().is_none());
        assert!(matches!(decoder.next_event(), Ok(Some(Event::Tag(_, ElementValue::UnsignedInt(1))))));
    }

    #[test]
    fn consumed_bytes_are_released() {
        let mut decoder: Decoder<MatroskaSchema> = Decoder::new();
        let events = collect(&mut decoder, &[0xec, 0x82, 0x00, 0x00, 0xec]);
        assert_eq!(1, events.len());
        assert_eq!(1, decoder.buffered_len());
        assert_eq!(4, decoder.total());
    }
}
