use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single property value as exposed by the content store.
///
/// Serialized untagged, so JSON scalars map onto the matching variant.
/// RFC 3339 strings deserialize as [`PropertyValue::DateTime`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
    Text(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as a timestamp, accepting RFC 3339 text.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            PropertyValue::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::DateTime(value)
    }
}

/// Canonical text form of a timestamp inside the store.
///
/// Fixed millisecond precision keeps lexical order equal to time order.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One entry of a document's property set.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub name: String,
    pub value: PropertyValue,
}

impl PropertyEntry {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A flat, user-facing view of one stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Store-assigned identity.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Symbolic name of the document class.
    pub document_class: String,
    /// Content type of the document's content, if it has any.
    pub mime_type: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_last_modified: DateTime<Utc>,
    pub creator: String,
    pub last_modifier: String,
    /// Every user-defined property of the document, keyed by property name.
    pub custom_properties: BTreeMap<String, PropertyValue>,
}

impl DocumentRecord {
    /// Narrow the custom properties to the given names.
    ///
    /// Names absent from the record are simply absent from the result.
    pub fn retain_properties(mut self, include: &BTreeSet<String>) -> Self {
        self.custom_properties.retain(|name, _| include.contains(name));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> DocumentRecord {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        DocumentRecord {
            id: "doc-1".to_string(),
            name: "invoice.pdf".to_string(),
            document_class: "Invoice".to_string(),
            mime_type: Some("application/pdf".to_string()),
            date_created: created,
            date_last_modified: created,
            creator: "alice".to_string(),
            last_modifier: "bob".to_string(),
            custom_properties: BTreeMap::from([
                ("a".to_string(), PropertyValue::Integer(1)),
                ("b".to_string(), PropertyValue::Integer(2)),
                ("c".to_string(), PropertyValue::Integer(3)),
            ]),
        }
    }

    #[test]
    fn test_retain_properties_subset() {
        let include = BTreeSet::from(["a".to_string(), "c".to_string()]);
        let record = sample_record().retain_properties(&include);

        assert_eq!(
            record.custom_properties,
            BTreeMap::from([
                ("a".to_string(), PropertyValue::Integer(1)),
                ("c".to_string(), PropertyValue::Integer(3)),
            ])
        );
    }

    #[test]
    fn test_retain_properties_unknown_name_yields_empty_map() {
        let include = BTreeSet::from(["z".to_string()]);
        let record = sample_record().retain_properties(&include);
        assert!(record.custom_properties.is_empty());
        assert_eq!(record.id, "doc-1");
    }

    #[test]
    fn test_record_serializes_with_camel_case_field_names() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["documentClass"], "Invoice");
        assert_eq!(json["mimeType"], "application/pdf");
        assert_eq!(json["lastModifier"], "bob");
        assert_eq!(json["customProperties"]["b"], 2);
        assert!(json["dateCreated"].as_str().unwrap().starts_with("2024-03-01T09:30:00"));
    }

    #[test]
    fn test_property_value_deserialization() {
        let values: Vec<PropertyValue> =
            serde_json::from_str(r#"[null, true, 42, 1.5, "alice", "2024-01-01T00:00:00Z", ["x", 1]]"#)
                .unwrap();

        assert_eq!(values[0], PropertyValue::Null);
        assert_eq!(values[1], PropertyValue::Boolean(true));
        assert_eq!(values[2], PropertyValue::Integer(42));
        assert_eq!(values[3], PropertyValue::Float(1.5));
        assert_eq!(values[4], PropertyValue::Text("alice".to_string()));
        assert_eq!(
            values[5],
            PropertyValue::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            values[6],
            PropertyValue::List(vec![PropertyValue::from("x"), PropertyValue::Integer(1)])
        );
    }

    #[test]
    fn test_as_timestamp_accepts_text() {
        let value = PropertyValue::from("2024-05-06T07:08:09.123Z");
        let dt = value.as_timestamp().unwrap();
        assert_eq!(format_timestamp(&dt), "2024-05-06T07:08:09.123Z");
        assert_eq!(PropertyValue::Integer(3).as_timestamp(), None);
    }
}
