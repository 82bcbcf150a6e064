use ebml_stream::specs::{EbmlSchema, ElementType, SchemaElement};

///
/// A small custom schema, to check that nothing depends on the bundled Matroska table.
///
pub struct TestSchema;

impl EbmlSchema for TestSchema {
    fn get_element(id_hex: &str) -> Option<SchemaElement> {
        let (element_type, name) = match id_hex {
            "1a45dfa3" => (ElementType::Master, "Ebml"),
            "18538067" => (ElementType::Master, "Segment"),
            "1f43b675" => (ElementType::Master, "Cluster"),
            "4100" => (ElementType::UnsignedInt, "Count"),
            "4101" => (ElementType::Float, "Rate"),
            "4102" => (ElementType::SignedInt, "Offset"),
            "4103" => (ElementType::Utf8, "Label"),
            "4104" => (ElementType::String, "Code"),
            "4105" => (ElementType::Date, "Created"),
            "83" => (ElementType::UnsignedInt, "TrackType"),
            "a3" => (ElementType::Binary, "SimpleBlock"),
            "bf" => (ElementType::Binary, "Checksum"),
            _ => return None,
        };
        Some(SchemaElement { element_type, name })
    }

    fn get_id_hex(name: &str) -> Option<&'static str> {
        match name {
            "Ebml" => Some("1a45dfa3"),
            "Segment" => Some("18538067"),
            "Cluster" => Some("1f43b675"),
            "Count" => Some("4100"),
            "Rate" => Some("4101"),
            "Offset" => Some("4102"),
            "Label" => Some("4103"),
            "Code" => Some("4104"),
            "Created" => Some("4105"),
            "TrackType" => Some("83"),
            "SimpleBlock" => Some("a3"),
            "Checksum" => Some("bf"),
            _ => None,
        }
    }
}
