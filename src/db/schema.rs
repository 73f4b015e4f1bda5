//! SQLite schema for the document table.
//!
//! System properties are fixed columns. Custom properties are added as
//! untyped columns the first time a document carries them.

use rusqlite::Connection;

use crate::error::AppError;
use crate::search::classifier::{is_system_property, names};

/// Name of the table every document lives in.
pub const DOCUMENT_TABLE: &str = "Document";

const MAX_PROPERTY_NAME_LEN: usize = 64;

/// Fixed columns of the document table.
const SYSTEM_COLUMNS: [&str; 10] = [
    names::ID,
    names::NAME,
    names::MIME_TYPE,
    names::DATE_CREATED,
    names::DATE_LAST_MODIFIED,
    names::CREATOR,
    names::LAST_MODIFIER,
    names::DOCUMENT_CLASS,
    names::CONTENT_KEY,
    names::CONTENT_SIZE,
];

const CREATE_DOCUMENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "Document" (
    "Id"               TEXT PRIMARY KEY NOT NULL,
    "Name"             TEXT NOT NULL,
    "MimeType"         TEXT,
    "DateCreated"      TEXT NOT NULL,
    "DateLastModified" TEXT NOT NULL,
    "Creator"          TEXT NOT NULL,
    "LastModifier"     TEXT NOT NULL,
    "F_DocumentClass"  TEXT NOT NULL,
    "F_ContentKey"     TEXT,
    "F_ContentSize"    INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS "idx_document_class" ON "Document" ("F_DocumentClass");
CREATE INDEX IF NOT EXISTS "idx_document_created" ON "Document" ("DateCreated");
"#;

/// Create the document table and its indexes if they don't exist yet.
pub fn initialize_schema(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(CREATE_DOCUMENT_TABLE)
        .map_err(|e| AppError::Database(format!("Failed to initialize schema: {e}")))
}

/// Whether `name` can be used as a user-defined property (and column) name.
///
/// SQLite column names are case-insensitive, so a name that only differs in
/// case from a system column would write into that column.
pub fn is_valid_property_name(name: &str) -> bool {
    is_valid_identifier(name)
        && !is_system_property(name)
        && !SYSTEM_COLUMNS.iter().any(|col| col.eq_ignore_ascii_case(name))
}

/// Validate the property names of one document.
///
/// Every name must be valid and no two may differ only in case.
pub fn check_property_names<'a, I>(names: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        if !is_valid_property_name(name) {
            return Err(AppError::BadRequest(format!(
                "Invalid property name '{name}'"
            )));
        }
        if let Some(other) = seen.iter().find(|s| s.eq_ignore_ascii_case(name)) {
            return Err(AppError::BadRequest(format!(
                "Property names '{other}' and '{name}' differ only in case"
            )));
        }
        seen.push(name);
    }
    Ok(())
}

/// Plain identifier: ASCII letter followed by letters, digits or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name.len() <= MAX_PROPERTY_NAME_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Current column names of the document table.
pub fn document_columns(conn: &Connection) -> Result<Vec<String>, AppError> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .map_err(|e| AppError::Database(e.to_string()))?;
    let columns = stmt
        .query_map([DOCUMENT_TABLE], |row| row.get::<_, String>(0))
        .map_err(|e| AppError::Database(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(columns)
}

/// Add a column for every property name the table doesn't have yet.
///
/// Column names compare case-insensitively, as SQLite does.
pub fn ensure_property_columns<'a, I>(conn: &Connection, names: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();
    check_property_names(names.iter().copied())?;

    let mut existing = document_columns(conn)?;

    for name in names {
        if existing.iter().any(|col| col.eq_ignore_ascii_case(name)) {
            continue;
        }

        conn.execute_batch(&format!(
            r#"ALTER TABLE "{DOCUMENT_TABLE}" ADD COLUMN "{name}""#
        ))
        .map_err(|e| AppError::Database(format!("Failed to add property '{name}': {e}")))?;
        tracing::info!("Added property column '{name}' to the document table");
        existing.push(name.to_string());
    }

    Ok(())
}
