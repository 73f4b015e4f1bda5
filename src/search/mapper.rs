use std::collections::BTreeMap;

use crate::db::repository::DocumentHandle;
use crate::error::AppError;
use crate::models::document::DocumentRecord;
use crate::search::classifier::is_system_property;

/// Convert a document handle into a flat record.
///
/// Only user-defined properties land in `custom_properties`. Accessor
/// failures propagate unchanged.
pub fn to_record<H: DocumentHandle + ?Sized>(handle: &H) -> Result<DocumentRecord, AppError> {
    let custom_properties: BTreeMap<_, _> = handle
        .properties()?
        .into_iter()
        .filter(|entry| !is_system_property(&entry.name))
        .map(|entry| (entry.name, entry.value))
        .collect();

    Ok(DocumentRecord {
        id: handle.id()?,
        name: handle.name()?,
        document_class: handle.class_name()?,
        mime_type: handle.mime_type()?,
        date_created: handle.date_created()?,
        date_last_modified: handle.date_last_modified()?,
        creator: handle.creator()?,
        last_modifier: handle.last_modifier()?,
        custom_properties,
    })
}
