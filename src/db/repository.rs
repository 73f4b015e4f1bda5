use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::Row;

use crate::db::models::{NewDocument, StoredDocument};
use crate::db::schema::{self, DOCUMENT_TABLE};
use crate::error::AppError;
use crate::models::document::{format_timestamp, PropertyEntry, PropertyValue};
use crate::search::classifier::names;
use crate::search::query::ExecutableQuery;

/// Accessor surface of one document held by the store.
///
/// Every accessor may fail; failures are reported as [`AppError::Mapping`].
#[cfg_attr(test, mockall::automock)]
pub trait DocumentHandle: Send {
    fn id(&self) -> Result<String, AppError>;
    fn name(&self) -> Result<String, AppError>;
    /// Symbolic name of the document class.
    fn class_name(&self) -> Result<String, AppError>;
    fn mime_type(&self) -> Result<Option<String>, AppError>;
    fn date_created(&self) -> Result<DateTime<Utc>, AppError>;
    fn date_last_modified(&self) -> Result<DateTime<Utc>, AppError>;
    fn creator(&self) -> Result<String, AppError>;
    fn last_modifier(&self) -> Result<String, AppError>;
    /// The full property set, system properties included.
    fn properties(&self) -> Result<Vec<PropertyEntry>, AppError>;
}

/// Forward-only stream of query results.
pub type DocumentCursor = Box<dyn Iterator<Item = Result<StoredDocument, AppError>> + Send>;

/// Store trait for document operations.
///
/// Implementations own their connection/session handling; callers pass the
/// store explicitly wherever it is needed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document. The caller supplies the id.
    async fn create(&self, doc: NewDocument) -> Result<(), AppError>;

    /// Fetch a document by id.
    async fn fetch(&self, id: &str) -> Result<Option<StoredDocument>, AppError>;

    /// Delete a document by id, returning what was removed.
    async fn delete(&self, id: &str) -> Result<Option<StoredDocument>, AppError>;

    /// Execute a query, yielding at most `max_rows` documents.
    async fn execute(
        &self,
        query: &ExecutableQuery,
        max_rows: usize,
    ) -> Result<DocumentCursor, AppError>;
}

/// SQLite implementation of the DocumentStore.
///
/// Queries run in SQLite's SQL dialect against the `Document` table; result
/// column names become property names.
pub struct SqliteDocumentStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteDocumentStore {
    /// Opens (or creates) a file-based store. `:memory:` opens a private in-memory store.
    pub fn open<P: AsRef<Path>>(path: P, max_connections: u32) -> Result<Self, AppError> {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            return Self::in_memory();
        }
        let manager = SqliteConnectionManager::file(path).with_init(configure_connection);
        Self::with_manager(manager, max_connections.max(1))
    }

    /// Creates an in-memory store.
    ///
    /// The pool holds a single connection, since every SQLite in-memory
    /// connection is its own database.
    pub fn in_memory() -> Result<Self, AppError> {
        let manager = SqliteConnectionManager::memory().with_init(configure_connection);
        Self::with_manager(manager, 1)
    }

    fn with_manager(
        manager: SqliteConnectionManager,
        max_connections: u32,
    ) -> Result<Self, AppError> {
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(Duration::from_secs(30))
            .build(manager)?;
        Ok(Self { pool })
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> Result<(), AppError> {
        let conn = self.connection()?;
        schema::initialize_schema(&conn)
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, AppError> {
        Ok(self.pool.get()?)
    }
}

fn configure_connection(conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(Duration::from_secs(5))
}

fn query_error(e: rusqlite::Error) -> AppError {
    AppError::QueryExecution(e.to_string())
}

fn database_error(e: rusqlite::Error) -> AppError {
    AppError::Database(e.to_string())
}

/// Resolve a parameter key to the placeholder it binds.
fn placeholder(name: &str) -> String {
    if name.starts_with([':', '@', '$']) {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

/// Whether `sql` holds anything besides whitespace and comments after its
/// first top-level `;`.
fn has_trailing_statement(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut terminated = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |n| i + n + 1);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = sql[i + 2..].find("*/").map_or(bytes.len(), |n| i + n + 4);
                continue;
            }
            b';' => terminated = true,
            c if c.is_ascii_whitespace() => {}
            _ if terminated => return true,
            open @ (b'\'' | b'"' | b'`' | b'[') => {
                let close = if open == b'[' { b']' } else { open };
                i = bytes[i + 1..]
                    .iter()
                    .position(|&b| b == close)
                    .map_or(bytes.len(), |n| i + n + 2);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    false
}

fn read_value(value: ValueRef<'_>) -> PropertyValue {
    match value {
        ValueRef::Null => PropertyValue::Null,
        ValueRef::Integer(i) => PropertyValue::Integer(i),
        ValueRef::Real(f) => PropertyValue::Float(f),
        ValueRef::Text(bytes) => PropertyValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            PropertyValue::Text(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
    }
}

fn snapshot_row(row: &Row<'_>, columns: &[String]) -> Result<StoredDocument, rusqlite::Error> {
    let mut entries = Vec::with_capacity(columns.len());
    for (index, name) in columns.iter().enumerate() {
        entries.push(PropertyEntry {
            name: name.clone(),
            value: read_value(row.get_ref(index)?),
        });
    }
    Ok(StoredDocument::new(entries))
}

fn fetch_by_id(conn: &rusqlite::Connection, id: &str) -> Result<Option<StoredDocument>, AppError> {
    let mut stmt = conn
        .prepare(&format!(
            r#"SELECT * FROM "{DOCUMENT_TABLE}" WHERE "{}" = ?1"#,
            names::ID
        ))
        .map_err(database_error)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([id]).map_err(database_error)?;
    match rows.next().map_err(database_error)? {
        Some(row) => Ok(Some(snapshot_row(row, &columns).map_err(database_error)?)),
        None => Ok(None),
    }
}

impl ToSql for PropertyValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            PropertyValue::Null => ToSqlOutput::Owned(Value::Null),
            PropertyValue::Boolean(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            PropertyValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            PropertyValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            PropertyValue::DateTime(dt) => ToSqlOutput::Owned(Value::Text(format_timestamp(dt))),
            PropertyValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            PropertyValue::List(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    "list values cannot be bound to a single parameter".into(),
                ))
            }
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create(&self, doc: NewDocument) -> Result<(), AppError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction().map_err(database_error)?;

        schema::ensure_property_columns(&tx, doc.properties.keys().map(String::as_str))?;

        let now = PropertyValue::Text(format_timestamp(&Utc::now()));
        let mut columns: Vec<&str> = vec![
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
        let mut values: Vec<PropertyValue> = vec![
            PropertyValue::Text(doc.id.clone()),
            PropertyValue::Text(doc.name),
            doc.mime_type.map_or(PropertyValue::Null, PropertyValue::Text),
            now.clone(),
            now,
            PropertyValue::Text(doc.creator.clone()),
            PropertyValue::Text(doc.creator),
            PropertyValue::Text(doc.document_class),
            doc.content_key.map_or(PropertyValue::Null, PropertyValue::Text),
            PropertyValue::Integer(doc.content_size),
        ];
        for (name, value) in &doc.properties {
            columns.push(name);
            values.push(value.clone());
        }

        let column_list = columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(r#"INSERT INTO "{DOCUMENT_TABLE}" ({column_list}) VALUES ({placeholders})"#);

        tx.execute(&sql, rusqlite::params_from_iter(values.iter()))
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    AppError::BadRequest(format!("Document '{}' already exists", doc.id))
                }
                rusqlite::Error::ToSqlConversionFailure(err) => {
                    AppError::BadRequest(format!("Unsupported property value: {err}"))
                }
                other => database_error(other),
            })?;

        tx.commit().map_err(database_error)?;
        tracing::debug!("Created document '{}'", doc.id);
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<StoredDocument>, AppError> {
        let conn = self.connection()?;
        fetch_by_id(&conn, id)
    }

    async fn delete(&self, id: &str) -> Result<Option<StoredDocument>, AppError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction().map_err(database_error)?;

        let Some(existing) = fetch_by_id(&tx, id)? else {
            return Ok(None);
        };

        tx.execute(
            &format!(r#"DELETE FROM "{DOCUMENT_TABLE}" WHERE "{}" = ?1"#, names::ID),
            [id],
        )
        .map_err(database_error)?;
        tx.commit().map_err(database_error)?;

        tracing::debug!("Deleted document '{id}'");
        Ok(Some(existing))
    }

    async fn execute(
        &self,
        query: &ExecutableQuery,
        max_rows: usize,
    ) -> Result<DocumentCursor, AppError> {
        if has_trailing_statement(query.text()) {
            return Err(AppError::QueryExecution(
                "only a single statement can be executed".into(),
            ));
        }

        let conn = self.connection()?;
        let mut stmt = conn.prepare(query.text()).map_err(query_error)?;

        if !stmt.readonly() {
            return Err(AppError::QueryExecution(
                "only read-only queries can be executed".into(),
            ));
        }

        for (name, value) in query.parameters() {
            let index = stmt
                .parameter_index(&placeholder(name))
                .map_err(query_error)?
                .ok_or_else(|| {
                    AppError::QueryExecution(format!("query has no parameter named '{name}'"))
                })?;
            stmt.raw_bind_parameter(index, value).map_err(query_error)?;
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut documents = Vec::new();
        let mut rows = stmt.raw_query();
        while documents.len() < max_rows {
            match rows.next().map_err(query_error)? {
                Some(row) => documents.push(snapshot_row(row, &columns).map_err(query_error)?),
                None => break,
            }
        }

        tracing::debug!(rows = documents.len(), max_rows, "Executed query");
        Ok(Box::new(documents.into_iter().map(Ok)))
    }
}
