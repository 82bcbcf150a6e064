use std::io::Write;
use std::marker::PhantomData;
use std::mem;

use log::debug;

use super::errors::encoder::EncodeError;
use super::specs::EbmlSchema;
use super::tags::{ElementEnd, Event};
use super::tools::{self, AsVint};

#[derive(Copy, Clone, Debug, PartialEq)]
enum SizeField {
    Minimal,
    Width(usize),
    Unknown(usize),
}

enum Child {
    Bytes(Vec<u8>),
    Node(usize),
}

struct Node {
    id: Vec<u8>,
    name: &'static str,
    size: SizeField,
    children: Vec<Child>,
    encoded: Vec<u8>,
}

///
/// Provides a tool to write EBML streams.  Writes to a destination that implements [`std::io::Write`].
///
/// Elements are addressed by their schema name.  Master elements are opened with [`Encoder::start`] and closed with [`Encoder::end`]; their size is computed from their children when they are closed, unless they were started with an unknown size.  A root element is written to the destination as soon as it is complete, and the destination is flushed after each write.
///
/// Output can be held back with [`Encoder::cork`] and released with [`Encoder::uncork`].
///
/// ## Example
///
/// ```
/// use ebml_stream::Encoder;
/// use ebml_stream::specs::MatroskaSchema;
/// use ebml_stream::tags::ElementEnd;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut encoder: Encoder<Vec<u8>, MatroskaSchema> = Encoder::new(Vec::new());
/// encoder.start("EBML", ElementEnd::Known(0))?;
/// encoder.tag("EBMLVersion", &[0x00])?;
/// encoder.end()?;
///
/// assert_eq!(vec![0x1a, 0x45, 0xdf, 0xa3, 0x84, 0x42, 0x86, 0x81, 0x00], encoder.into_inner()?);
/// # Ok(())
/// # }
/// ```
///
pub struct Encoder<W: Write, TSpec: EbmlSchema> {
    dest: W,
    nodes: Vec<Node>,
    stack: Vec<usize>,
    corked: bool,
    pending: Vec<u8>,
    spec_type: PhantomData<fn() -> TSpec>,
}

impl<W: Write, TSpec: EbmlSchema> Encoder<W, TSpec> {
    pub fn new(dest: W) -> Self {
        Encoder {
            dest,
            nodes: Vec::new(),
            stack: Vec::new(),
            corked: false,
            pending: Vec::new(),
            spec_type: PhantomData,
        }
    }

    ///
    /// Opens a master element.
    ///
    /// Pass [`ElementEnd::Unknown`] to write the element with the unknown size marker.  For [`ElementEnd::Known`] the value is ignored: the size is computed from the children when the element is closed.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownSchemaName`] if `name` is not in the schema.
    ///
    pub fn start(&mut self, name: &str, size: ElementEnd) -> Result<(), EncodeError> {
        let (id, name) = Self::lookup(name)?;
        let size = match size {
            ElementEnd::Known(_) => SizeField::Minimal,
            ElementEnd::Unknown => SizeField::Unknown(8),
        };
        self.open(id, name, size);
        Ok(())
    }

    ///
    /// Writes a leaf element with the given payload.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownSchemaName`] if `name` is not in the schema, or [`EncodeError::WriteError`] if the element is a root and the destination fails.
    ///
    pub fn tag(&mut self, name: &str, data: &[u8]) -> Result<(), EncodeError> {
        let (id, name) = Self::lookup(name)?;
        self.leaf(&id, name, SizeField::Minimal, data)
    }

    ///
    /// Writes a leaf element with the unknown size marker in place of its size.
    ///
    pub fn tag_unknown_size(&mut self, name: &str, data: &[u8]) -> Result<(), EncodeError> {
        let (id, name) = Self::lookup(name)?;
        self.leaf(&id, name, SizeField::Unknown(8), data)
    }

    ///
    /// Closes the innermost open master element.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnexpectedClosingTag`] if no element is open.
    ///
    pub fn end(&mut self) -> Result<(), EncodeError> {
        let index = self.stack.pop().ok_or(EncodeError::UnexpectedClosingTag {
            name: None,
            expected: None,
        })?;
        self.close(index)
    }

    ///
    /// Writes an event produced by a [`Decoder`][`super::Decoder`].
    ///
    /// Elements are identified by the header id rather than by name, so elements the schema does not know are written back unchanged.  Size fields keep the width recorded in [`ElementHeader::size_length`][`super::tags::ElementHeader::size_length`], falling back to the minimal width when the content no longer fits.  Leaf elements are written from the raw payload in [`ElementHeader::data`][`super::tags::ElementHeader::data`].
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnexpectedClosingTag`] if an [`Event::End`] does not match the innermost open element.
    ///
    pub fn write_event(&mut self, event: &Event) -> Result<(), EncodeError> {
        match event {
            Event::Start(header) => {
                let size = match header.end {
                    ElementEnd::Known(_) => SizeField::Width(header.size_length),
                    ElementEnd::Unknown => SizeField::Unknown(header.size_length),
                };
                self.open(id_bytes(header.id), header.name, size);
                Ok(())
            },
            Event::Tag(header, _) => self.leaf(&id_bytes(header.id), header.name, SizeField::Width(header.size_length), &header.data),
            Event::End(header) => {
                let id = id_bytes(header.id);
                let innermost = self.stack.last().map(|&index| &self.nodes[index]);
                if innermost.map_or(false, |node| node.id == id) {
                    return self.end();
                }
                Err(EncodeError::UnexpectedClosingTag {
                    name: Some(header.name.to_string()),
                    expected: innermost.map(|node| node.name.to_string()),
                })
            },
        }
    }

    ///
    /// Holds back output.  Completed root elements accumulate in memory until [`Encoder::uncork`] is called.
    ///
    pub fn cork(&mut self) {
        self.corked = true;
    }

    ///
    /// Writes everything held back since [`Encoder::cork`] and resumes writing root elements as they complete.
    ///
    pub fn uncork(&mut self) -> Result<(), EncodeError> {
        self.corked = false;
        if self.pending.is_empty() {
            return Ok(());
        }

        let pending = mem::take(&mut self.pending);
        self.write_out(&pending)
    }

    pub fn is_corked(&self) -> bool {
        self.corked
    }

    ///
    /// Number of master elements currently open.
    ///
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn get_ref(&self) -> &W {
        &self.dest
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.dest
    }

    ///
    /// Returns the destination.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnclosedElements`] if elements are still open or output is still corked, since those bytes would be lost.
    ///
    pub fn into_inner(self) -> Result<W, EncodeError> {
        if !self.stack.is_empty() || !self.pending.is_empty() {
            return Err(EncodeError::UnclosedElements {
                open: self.stack.len(),
                corked: self.pending.len(),
            });
        }
        Ok(self.dest)
    }

    fn lookup(name: &str) -> Result<(Vec<u8>, &'static str), EncodeError> {
        TSpec::get_id_hex(name)
            .and_then(|id_hex| Some((id_from_hex(id_hex)?, TSpec::get_element(id_hex)?.name)))
            .ok_or_else(|| EncodeError::UnknownSchemaName(name.to_string()))
    }

    fn open(&mut self, id: Vec<u8>, name: &'static str, size: SizeField) {
        debug!("start {}{}", name, if matches!(size, SizeField::Unknown(_)) { " (unknown size)" } else { "" });
        let index = self.nodes.len();
        self.nodes.push(Node {
            id,
            name,
            size,
            children: Vec::new(),
            encoded: Vec::new(),
        });
        if let Some(&parent) = self.stack.last() {
            self.nodes[parent].children.push(Child::Node(index));
        }
        self.stack.push(index);
    }

    fn leaf(&mut self, id: &[u8], name: &'static str, size: SizeField, data: &[u8]) -> Result<(), EncodeError> {
        debug!("tag {}, {} bytes", name, data.len());
        let encoded = wrap(id, size, data)?;
        match self.stack.last() {
            Some(&parent) => {
                self.nodes[parent].children.push(Child::Bytes(encoded));
                Ok(())
            },
            None => self.deliver(encoded),
        }
    }

    fn close(&mut self, index: usize) -> Result<(), EncodeError> {
        let children = mem::take(&mut self.nodes[index].children);
        let mut content = Vec::new();
        for child in children {
            match child {
                Child::Bytes(bytes) => content.extend_from_slice(&bytes),
                Child::Node(child) => content.append(&mut self.nodes[child].encoded),
            }
        }

        let node = &self.nodes[index];
        debug!("end {}, {} content bytes", node.name, content.len());
        let encoded = wrap(&node.id, node.size, &content)?;

        if self.stack.is_empty() {
            self.nodes.clear();
            self.deliver(encoded)
        } else {
            self.nodes[index].encoded = encoded;
            Ok(())
        }
    }

    fn deliver(&mut self, bytes: Vec<u8>) -> Result<(), EncodeError> {
        if self.corked {
            self.pending.extend_from_slice(&bytes);
            Ok(())
        } else {
            self.write_out(&bytes)
        }
    }

    fn write_out(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        debug!("writing {} bytes", bytes.len());
        self.dest.write_all(bytes).map_err(|source| EncodeError::WriteError { source })?;
        self.dest.flush().map_err(|source| EncodeError::WriteError { source })?;
        Ok(())
    }
}

fn wrap(id: &[u8], size: SizeField, content: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let len = content.len() as u64;
    let size = match size {
        SizeField::Minimal | SizeField::Width(0) => len.as_vint()?,
        SizeField::Width(width) => len.as_vint_with_length(width).or_else(|_| len.as_vint())?,
        SizeField::Unknown(length) => tools::unknown_size_with_length(length),
    };

    let mut buf = Vec::with_capacity(id.len() + size.len() + content.len());
    buf.extend_from_slice(id);
    buf.extend_from_slice(&size);
    buf.extend_from_slice(content);
    Ok(buf)
}

fn id_bytes(id: u64) -> Vec<u8> {
    id.to_be_bytes().iter().skip_while(|&v| *v == 0u8).copied().collect()
}

fn id_from_hex(id_hex: &str) -> Option<Vec<u8>> {
    if id_hex.is_empty() || id_hex.len() % 2 != 0 {
        return None;
    }
    (0..id_hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(id_hex.get(i..i + 2)?, 16).ok())
        .collect()
}
