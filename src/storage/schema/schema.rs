use std::fmt;

use super::{FieldItem, Type};

/// Ordered description of the fields of a tuple. Immutable after
/// construction; a schema always has at least one field.
#[derive(Clone, Debug)]
pub struct Schema {
    pub fields: Vec<FieldItem>,
}

impl Schema {
    pub fn new(fields: Vec<FieldItem>) -> Schema {
        assert!(!fields.is_empty(), "schema must have at least one field");
        Schema { fields }
    }

    /// Build a schema from parallel type/name lists.
    pub fn from_types(types: &[Type], names: &[&str]) -> Schema {
        assert_eq!(types.len(), names.len());
        let fields = types
            .iter()
            .zip(names.iter())
            .map(|(t, n)| FieldItem::new(n, *t))
            .collect();
        Schema::new(fields)
    }

    pub fn merge(schema1: &Schema, schema2: &Schema) -> Schema {
        let mut fields = Vec::new();
        for f in &schema1.fields {
            fields.push(f.clone());
        }
        for f in &schema2.fields {
            fields.push(f.clone());
        }
        Schema::new(fields)
    }

    pub fn fields_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get_field_type(&self, i: usize) -> Type {
        self.fields[i].field_type
    }

    pub fn get_field_name(&self, i: usize) -> &str {
        &self.fields[i].field_name
    }

    /// Tuple size in bytes.
    pub fn get_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.size()).sum()
    }

    /// Position of the first field whose name equals `name` (value
    /// equality). Anonymous fields never match.
    pub fn index_for_field_name(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.fields.iter().position(|f| f.field_name == name)
    }
}

// Equality ignores field names, only arity and types matter.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields
            .iter()
            .zip(&other.fields)
            .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "(".to_owned();
        for field in &self.fields {
            content.push_str(&format!(
                "{}: {:?}, ",
                field.field_name, field.field_type
            ));
        }
        content = content.trim_end_matches(", ").to_string();
        content.push(')');
        write!(f, "{}", content)
    }
}

/// A schema of `width` int fields, names prefixed by `name_prefix`.
pub fn small_int_schema(width: usize, name_prefix: &str) -> Schema {
    let mut fields: Vec<FieldItem> = Vec::new();
    for i in 0..width {
        let field = FieldItem::new(
            &format!("{}-{}", name_prefix, i),
            Type::Int,
        );
        fields.push(field);
    }

    Schema::new(fields)
}
