//! Data models for staged backup records
//!
//! Every staged row is a [`Record`]: one optional string per schema column,
//! in schema order. The typed wrappers add the accessors the dedup key and
//! the emitter need.

use rusqlite::Row;

use crate::document::Element;
use crate::error::{MergeError, Result};
use crate::schema::{addrs, mmss, parts, smss, Presence, Table};

/// Attribute values for one row, aligned with a [`Table`]'s columns.
///
/// `None` means the attribute was absent from the source element, which is
/// distinct from an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    schema: &'static Table,
    values: Vec<Option<String>>,
}

impl Record {
    /// Build a record from `(name, value)` attribute pairs.
    ///
    /// Fails on an attribute the table has no column for. Missing required
    /// attributes are left for the store to refuse.
    pub fn from_attributes<'a, I>(schema: &'static Table, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut values = vec![None; schema.columns.len()];
        for (name, value) in attributes {
            let index = schema.position(name).ok_or_else(|| MergeError::UnknownAttribute {
                table: schema.name,
                attribute: name.to_string(),
            })?;
            values[index] = Some(value.to_string());
        }
        Ok(Self { schema, values })
    }

    /// Read the attribute columns from a row, starting at column `offset`
    pub fn from_row(schema: &'static Table, row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        let values = (0..schema.columns.len())
            .map(|index| row.get::<_, Option<String>>(offset + index))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Self { schema, values })
    }

    /// Value of a column, `None` when absent or unknown
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.schema
            .position(name)
            .and_then(|index| self.values[index].as_deref())
    }

    /// Values in column order, for binding
    #[must_use]
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Build an output element following each column's presence rule.
    #[must_use]
    pub fn to_element(&self, tag: &str) -> Element {
        let mut element = Element::new(tag);
        element.attributes.reserve(self.values.len());
        for (column, value) in self.schema.columns.iter().zip(&self.values) {
            match (value, column.presence) {
                (Some(value), _) => element.attributes.push((column.name.to_string(), value.clone())),
                (None, Presence::NullToken) => {
                    element.attributes.push((column.name.to_string(), "null".to_string()));
                }
                (None, Presence::Required | Presence::Optional) => {}
            }
        }
        element
    }
}

/// A single SMS entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsRecord {
    /// Staged attributes
    pub fields: Record,
}

impl SmsRecord {
    /// Build from export attributes (already stripped of dropped ones)
    pub fn from_attributes<'a, I>(attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Ok(Self { fields: Record::from_attributes(&smss::SCHEMA, attributes)? })
    }

    /// Counterparty address
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.fields.get(smss::ADDRESS)
    }

    /// Message type (1 received, 2 sent)
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.fields.get(smss::TYPE)
    }

    /// Human-readable date
    #[must_use]
    pub fn readable_date(&self) -> Option<&str> {
        self.fields.get(smss::READABLE_DATE)
    }
}

/// A single MMS entry with its owned parts and addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmsRecord {
    /// Synthetic identity assigned at ingestion
    pub id: i64,
    /// Staged attributes
    pub fields: Record,
    /// Content fragments in insertion order
    pub parts: Vec<PartRecord>,
    /// Participants in insertion order
    pub addrs: Vec<AddrRecord>,
}

impl MmsRecord {
    /// Human-readable date
    #[must_use]
    pub fn readable_date(&self) -> Option<&str> {
        self.fields.get(mmss::READABLE_DATE)
    }
}

/// One content fragment of an MMS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    /// Staged attributes
    pub fields: Record,
}

impl PartRecord {
    /// Build from a `part` element's attributes
    pub fn from_attributes<'a, I>(attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Ok(Self { fields: Record::from_attributes(&parts::SCHEMA, attributes)? })
    }
}

/// One participant of an MMS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrRecord {
    /// Staged attributes
    pub fields: Record,
}

impl AddrRecord {
    /// Build from an `addr` element's attributes
    pub fn from_attributes<'a, I>(attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Ok(Self { fields: Record::from_attributes(&addrs::SCHEMA, attributes)? })
    }

    /// Participant address
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.fields.get(addrs::ADDRESS)
    }

    /// PDU direction code
    #[must_use]
    pub fn direction_code(&self) -> Option<&str> {
        self.fields.get(addrs::TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_attribute_rejected() {
        let err = AddrRecord::from_attributes([("address", "1"), ("bogus", "x")]).unwrap_err();
        assert!(matches!(err, MergeError::UnknownAttribute { table: "addrs", .. }));
    }

    #[test]
    fn test_absent_and_empty_are_distinct() {
        let addr = AddrRecord::from_attributes([("address", ""), ("type", "151")]).unwrap();
        assert_eq!(addr.address(), Some(""));
        assert_eq!(addr.fields.get("charset"), None);
    }

    #[test]
    fn test_null_token_emitted_for_absent_part_payload() {
        let part = PartRecord::from_attributes([("seq", "0"), ("text", "hello")]).unwrap();
        let element = part.fields.to_element("part");
        assert_eq!(element.attribute("text"), Some("hello"));
        assert_eq!(element.attribute("data"), Some("null"));
        assert_eq!(element.attribute("ct"), None);
    }
}
