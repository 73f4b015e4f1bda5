use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::db::repository::DocumentHandle;
use crate::error::AppError;
use crate::models::document::{PropertyEntry, PropertyValue};
use crate::search::classifier::names;

/// Snapshot of one document's property set, as read from the store.
///
/// Entries keep store order. Accessors read the well-known property names;
/// when a name appears twice the later entry wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredDocument {
    entries: Vec<PropertyEntry>,
}

impl StoredDocument {
    pub fn new(entries: Vec<PropertyEntry>) -> Self {
        Self { entries }
    }

    /// Append a property, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.entries.push(PropertyEntry::new(name, value));
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    /// Key of the content blob, if the document has content.
    pub fn content_key(&self) -> Option<&str> {
        self.property(names::CONTENT_KEY).and_then(PropertyValue::as_text)
    }

    fn text(&self, name: &str) -> Result<String, AppError> {
        match self.property(name) {
            Some(PropertyValue::Text(value)) => Ok(value.clone()),
            Some(other) => Err(AppError::Mapping(format!(
                "property '{name}' is not text: {other:?}"
            ))),
            None => Err(AppError::Mapping(format!("property '{name}' is missing"))),
        }
    }

    fn timestamp(&self, name: &str) -> Result<DateTime<Utc>, AppError> {
        let value = self
            .property(name)
            .ok_or_else(|| AppError::Mapping(format!("property '{name}' is missing")))?;
        value.as_timestamp().ok_or_else(|| {
            AppError::Mapping(format!("property '{name}' is not a timestamp: {value:?}"))
        })
    }
}

impl DocumentHandle for StoredDocument {
    fn id(&self) -> Result<String, AppError> {
        self.text(names::ID)
    }

    fn name(&self) -> Result<String, AppError> {
        self.text(names::NAME)
    }

    fn class_name(&self) -> Result<String, AppError> {
        self.text(names::DOCUMENT_CLASS)
    }

    fn mime_type(&self) -> Result<Option<String>, AppError> {
        match self.property(names::MIME_TYPE) {
            None | Some(PropertyValue::Null) => Ok(None),
            Some(_) => self.text(names::MIME_TYPE).map(Some),
        }
    }

    fn date_created(&self) -> Result<DateTime<Utc>, AppError> {
        self.timestamp(names::DATE_CREATED)
    }

    fn date_last_modified(&self) -> Result<DateTime<Utc>, AppError> {
        self.timestamp(names::DATE_LAST_MODIFIED)
    }

    fn creator(&self) -> Result<String, AppError> {
        self.text(names::CREATOR)
    }

    fn last_modifier(&self) -> Result<String, AppError> {
        self.text(names::LAST_MODIFIER)
    }

    fn properties(&self) -> Result<Vec<PropertyEntry>, AppError> {
        Ok(self.entries.clone())
    }
}

/// Everything the store needs to create a document.
///
/// Timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub id: String,
    pub name: String,
    pub document_class: String,
    pub mime_type: Option<String>,
    /// Recorded as both creator and last modifier.
    pub creator: String,
    pub content_key: Option<String>,
    pub content_size: i64,
    pub properties: BTreeMap<String, PropertyValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_document() -> StoredDocument {
        StoredDocument::default()
            .with(names::ID, "doc-1")
            .with(names::NAME, "report.txt")
            .with(names::DOCUMENT_CLASS, "Document")
            .with(names::MIME_TYPE, "text/plain")
            .with(names::DATE_CREATED, "2024-01-02T03:04:05.000Z")
            .with(names::DATE_LAST_MODIFIED, "2024-01-03T03:04:05.000Z")
            .with(names::CREATOR, "alice")
            .with(names::LAST_MODIFIER, "bob")
            .with(names::CONTENT_KEY, "content/doc-1")
    }

    #[test]
    fn test_accessors() {
        let doc = full_document();
        assert_eq!(doc.id().unwrap(), "doc-1");
        assert_eq!(doc.name().unwrap(), "report.txt");
        assert_eq!(doc.class_name().unwrap(), "Document");
        assert_eq!(doc.mime_type().unwrap().as_deref(), Some("text/plain"));
        assert_eq!(doc.creator().unwrap(), "alice");
        assert_eq!(doc.last_modifier().unwrap(), "bob");
        assert!(doc.date_created().unwrap() < doc.date_last_modified().unwrap());
        assert_eq!(doc.content_key(), Some("content/doc-1"));
    }

    #[test]
    fn test_missing_property_is_mapping_failure() {
        let doc = StoredDocument::default().with(names::ID, "doc-1");
        match doc.name() {
            Err(AppError::Mapping(msg)) => assert!(msg.contains("Name")),
            other => panic!("Expected Mapping error, got: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type_is_mapping_failure() {
        let doc = StoredDocument::default()
            .with(names::ID, 42_i64)
            .with(names::DATE_CREATED, "yesterday");
        assert!(matches!(doc.id(), Err(AppError::Mapping(_))));
        assert!(matches!(doc.date_created(), Err(AppError::Mapping(_))));
    }

    #[test]
    fn test_null_mime_type_is_none() {
        let doc = StoredDocument::default().with(names::MIME_TYPE, PropertyValue::Null);
        assert_eq!(doc.mime_type().unwrap(), None);
        assert_eq!(StoredDocument::default().mime_type().unwrap(), None);
    }

    #[test]
    fn test_later_duplicate_wins() {
        let doc = StoredDocument::default()
            .with("Title", "first")
            .with("Title", "second");
        assert_eq!(doc.property("Title"), Some(&PropertyValue::from("second")));
    }
}
