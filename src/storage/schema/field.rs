use super::Type;

#[derive(PartialEq, Debug, Clone)]
pub struct FieldItem {
    pub field_type: Type,
    pub field_name: String,
}

impl FieldItem {
    pub fn new(field_name: &str, field_type: Type) -> FieldItem {
        FieldItem {
            field_type,
            field_name: field_name.to_string(),
        }
    }

    /// A field whose name is absent. Anonymous fields never match a name
    /// lookup.
    pub fn anonymous(field_type: Type) -> FieldItem {
        FieldItem {
            field_type,
            field_name: String::new(),
        }
    }
}
