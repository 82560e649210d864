//! Measurement schema
//!
//! The explicit descriptor a model hands to the query layer: measurement
//! name plus the ordered list of its fields.

use crate::model::FieldDef;

/// Name and fields of a measurement
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    measurement: String,
    fields: Vec<FieldDef>,
}

impl Schema {
    /// Create a schema with no fields
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            fields: Vec::new(),
        }
    }

    /// Builder: append a field, replacing any earlier field of the same name
    pub fn field(mut self, def: FieldDef) -> Self {
        match self.position(&def.name) {
            Some(index) => self.fields[index] = def,
            None => self.fields.push(def),
        }
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Whether `name` can be used in a filter: any declared field, or `time`
    pub fn accepts_column(&self, name: &str) -> bool {
        name == "time" || self.contains(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// The first timestamp field, which becomes the point time
    pub fn timestamp_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.is_timestamp())
    }
}
