//! Decoded field tree handed to the host renderer.
//!
//! Every node carries the byte range it was decoded from; bit sub-fields
//! keep the range of their containing bytes plus the mask they occupy.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Enumerated { value: u64, name: &'static str },
    /// Value already shifted down from its mask.
    Bits { value: u64, mask: u64 },
    Bytes(Vec<u8>),
    Text(String),
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
    pub value: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Field>,
}

impl Field {
    pub fn new(name: &'static str, offset: usize, len: usize, value: FieldValue) -> Self {
        Self {
            name,
            offset,
            len,
            value,
            label: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: &'static str, offset: usize) -> Self {
        Self::new(name, offset, 0, FieldValue::Group)
    }

    /// Direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Field> {
        self.children.iter().find(|field| field.name == name)
    }

    /// First node with the given name in depth-first order, self included.
    pub fn find(&self, name: &str) -> Option<&Field> {
        if self.name == name {
            return Some(self);
        }
        find_field(&self.children, name)
    }

    /// Numeric view of integer-like values.
    pub fn as_u64(&self) -> Option<u64> {
        match self.value {
            FieldValue::Unsigned(value)
            | FieldValue::Bits { value, .. }
            | FieldValue::Enumerated { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// First node with the given name in depth-first order.
pub fn find_field<'f>(fields: &'f [Field], name: &str) -> Option<&'f Field> {
    fields.iter().find_map(|field| field.find(name))
}
