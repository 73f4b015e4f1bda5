//! Separates store-managed properties from user-defined ones.

/// Prefix reserved by the store for administrative properties.
pub const SYSTEM_PREFIX: &str = "F_";

/// Well-known property names of the store's document model.
pub mod names {
    pub const ID: &str = "Id";
    pub const NAME: &str = "Name";
    pub const MIME_TYPE: &str = "MimeType";
    pub const DATE_CREATED: &str = "DateCreated";
    pub const DATE_LAST_MODIFIED: &str = "DateLastModified";
    pub const CREATOR: &str = "Creator";
    pub const LAST_MODIFIER: &str = "LastModifier";

    /// Symbolic name of the document's class.
    pub const DOCUMENT_CLASS: &str = "F_DocumentClass";
    /// Key of the content blob in the blob store.
    pub const CONTENT_KEY: &str = "F_ContentKey";
    /// Size of the content blob in bytes.
    pub const CONTENT_SIZE: &str = "F_ContentSize";
}

/// Names that are system properties regardless of prefix.
pub const RESERVED_NAMES: [&str; 7] = [
    names::ID,
    names::NAME,
    names::MIME_TYPE,
    names::DATE_CREATED,
    names::DATE_LAST_MODIFIED,
    names::CREATOR,
    names::LAST_MODIFIER,
];

/// Returns `true` for properties the store manages itself.
///
/// Matching is exact and case-sensitive: `f_custom` is a user property.
pub fn is_system_property(name: &str) -> bool {
    name.starts_with(SYSTEM_PREFIX) || RESERVED_NAMES.contains(&name)
}
