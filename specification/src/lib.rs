//! This crate provides the core ebml schema that is used by the ebml-stream crate.
//!
//! A schema is a static, two-way table: element id (as a lowercase hex string) to
//! element type and name, and element name back to id.  The [`matroska`] module
//! contains a table covering the commonly used Matroska/WebM elements.
//!

///
/// Contains a schema table for the common Matroska and WebM elements.
///
pub mod matroska;

///
/// Different data types defined in the EBML specification.
///
/// [`ElementType::Unknown`] is never returned by a schema lookup.  Decoders assign it to elements whose id is not found in the schema, and their data is passed through as binary.
///
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ElementType {
    Master,
    UnsignedInt,
    SignedInt,
    Float,
    String,
    Utf8,
    Date,
    Binary,
    Unknown,
}

///
/// The information a schema holds about a single element id.
///
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SchemaElement {
    pub element_type: ElementType,
    pub name: &'static str,
}

///
/// This trait should be implemented to define a schema so that EBML can be decoded and encoded.  Typically implemented on a unit struct backed by static tables.
///
/// Lookups are expected to be constant time - both the decoder and the encoder call into the schema once per element.
///
pub trait EbmlSchema {

    ///
    /// Pulls the type and name of an element from the schema, keyed by the lowercase hex form of the raw id bytes (for example `"1a45dfa3"`).
    ///
    /// This function *must* return [`None`] if the id is not in the schema.
    ///
    fn get_element(id_hex: &str) -> Option<SchemaElement>;

    ///
    /// Reverse lookup: gets the lowercase hex id of an element from its name.
    ///
    /// This function *must* return [`None`] if the name is not in the schema.
    ///
    fn get_id_hex(name: &str) -> Option<&'static str>;
}
