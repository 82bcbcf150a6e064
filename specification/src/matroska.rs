use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::{EbmlSchema, ElementType, SchemaElement};
use super::ElementType::{Binary, Date, Float, Master, SignedInt, String, UnsignedInt, Utf8};

///
/// Schema for the commonly used elements of the Matroska and WebM formats.
///
/// This is not the complete Matroska element dictionary.  Ids that are missing will decode as [`ElementType::Unknown`] and are passed through untouched.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MatroskaSchema;

const ELEMENTS: &[(&str, ElementType, &str)] = &[
    // EBML header
    ("1a45dfa3", Master, "EBML"),
    ("4286", UnsignedInt, "EBMLVersion"),
    ("42f7", UnsignedInt, "EBMLReadVersion"),
    ("42f2", UnsignedInt, "EBMLMaxIDLength"),
    ("42f3", UnsignedInt, "EBMLMaxSizeLength"),
    ("4282", String, "DocType"),
    ("4287", UnsignedInt, "DocTypeVersion"),
    ("4285", UnsignedInt, "DocTypeReadVersion"),
    ("ec", Binary, "Void"),
    ("bf", Binary, "CRC-32"),

    ("18538067", Master, "Segment"),

    // Meta seek
    ("114d9b74", Master, "SeekHead"),
    ("4dbb", Master, "Seek"),
    ("53ab", Binary, "SeekID"),
    ("53ac", UnsignedInt, "SeekPosition"),

    // Segment information
    ("1549a966", Master, "Info"),
    ("73a4", Binary, "SegmentUID"),
    ("2ad7b1", UnsignedInt, "TimecodeScale"),
    ("4489", Float, "Duration"),
    ("4461", Date, "DateUTC"),
    ("7ba9", Utf8, "Title"),
    ("4d80", Utf8, "MuxingApp"),
    ("5741", Utf8, "WritingApp"),

    // Cluster
    ("1f43b675", Master, "Cluster"),
    ("e7", UnsignedInt, "Timecode"),
    ("a7", UnsignedInt, "Position"),
    ("ab", UnsignedInt, "PrevSize"),
    ("a3", Binary, "SimpleBlock"),
    ("a0", Master, "BlockGroup"),
    ("a1", Binary, "Block"),
    ("9b", UnsignedInt, "BlockDuration"),
    ("fb", SignedInt, "ReferenceBlock"),
    ("75a2", SignedInt, "DiscardPadding"),

    // Tracks
    ("1654ae6b", Master, "Tracks"),
    ("ae", Master, "TrackEntry"),
    ("d7", UnsignedInt, "TrackNumber"),
    ("73c5", UnsignedInt, "TrackUID"),
    ("83", UnsignedInt, "TrackType"),
    ("b9", UnsignedInt, "FlagEnabled"),
    ("88", UnsignedInt, "FlagDefault"),
    ("55aa", UnsignedInt, "FlagForced"),
    ("9c", UnsignedInt, "FlagLacing"),
    ("23e383", UnsignedInt, "DefaultDuration"),
    ("536e", Utf8, "Name"),
    ("22b59c", String, "Language"),
    ("86", String, "CodecID"),
    ("63a2", Binary, "CodecPrivate"),
    ("258688", Utf8, "CodecName"),
    ("56aa", UnsignedInt, "CodecDelay"),
    ("56bb", UnsignedInt, "SeekPreRoll"),
    ("e0", Master, "Video"),
    ("9a", UnsignedInt, "FlagInterlaced"),
    ("b0", UnsignedInt, "PixelWidth"),
    ("ba", UnsignedInt, "PixelHeight"),
    ("54b0", UnsignedInt, "DisplayWidth"),
    ("54ba", UnsignedInt, "DisplayHeight"),
    ("e1", Master, "Audio"),
    ("b5", Float, "SamplingFrequency"),
    ("78b5", Float, "OutputSamplingFrequency"),
    ("9f", UnsignedInt, "Channels"),
    ("6264", UnsignedInt, "BitDepth"),

    // Cueing data
    ("1c53bb6b", Master, "Cues"),
    ("bb", Master, "CuePoint"),
    ("b3", UnsignedInt, "CueTime"),
    ("b7", Master, "CueTrackPositions"),
    ("f7", UnsignedInt, "CueTrack"),
    ("f1", UnsignedInt, "CueClusterPosition"),
    ("f0", UnsignedInt, "CueRelativePosition"),

    ("1043a770", Master, "Chapters"),
    ("1941a469", Master, "Attachments"),

    // Tagging
    ("1254c367", Master, "Tags"),
    ("7373", Master, "Tag"),
    ("63c0", Master, "Targets"),
    ("68ca", UnsignedInt, "TargetTypeValue"),
    ("67c8", Master, "SimpleTag"),
    ("45a3", Utf8, "TagName"),
    ("447a", String, "TagLanguage"),
    ("4487", Utf8, "TagString"),
    ("4485", Binary, "TagBinary"),
];

static BY_ID: Lazy<HashMap<&'static str, SchemaElement>> = Lazy::new(|| {
    ELEMENTS.iter()
        .map(|&(id_hex, element_type, name)| (id_hex, SchemaElement { element_type, name }))
        .collect()
});

static BY_NAME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    ELEMENTS.iter()
        .map(|&(id_hex, _, name)| (name, id_hex))
        .collect()
});

impl EbmlSchema for MatroskaSchema {
    fn get_element(id_hex: &str) -> Option<SchemaElement> {
        BY_ID.get(id_hex).copied()
    }

    fn get_id_hex(name: &str) -> Option<&'static str> {
        BY_NAME.get(name).copied()
    }
}
