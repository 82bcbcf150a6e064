//!
//! Provides the EBML schema types.
//!
//! Implement [`EbmlSchema`] to decode and encode a custom EBML format.  [`MatroskaSchema`] covers the common Matroska and WebM elements.
//!

pub use ebml_stream_specification::EbmlSchema as EbmlSchema;
pub use ebml_stream_specification::ElementType as ElementType;
pub use ebml_stream_specification::SchemaElement as SchemaElement;
pub use ebml_stream_specification::matroska::MatroskaSchema as MatroskaSchema;
