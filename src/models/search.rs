use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::document::{DocumentRecord, PropertyValue};

/// Hard ceiling on the number of records one search call may return.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Page size used when a request does not name one.
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// One page of search results, in cursor order.
pub type ResultPage = Vec<DocumentRecord>;

/// A caller's description of one search.
///
/// Pagination bounds are clamped on construction, so a `QuerySpec` always
/// holds `1 <= page_size <= MAX_PAGE_SIZE`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    base_query: String,
    order_by: Option<String>,
    ascending: bool,
    parameters: BTreeMap<String, PropertyValue>,
    page_size: usize,
    offset: usize,
    properties_to_include: Option<BTreeSet<String>>,
}

impl QuerySpec {
    /// A spec that runs `base_query` unchanged and returns the first page.
    pub fn new(base_query: impl Into<String>) -> Self {
        Self {
            base_query: base_query.into(),
            order_by: None,
            ascending: true,
            parameters: BTreeMap::new(),
            page_size: clamp_page_size(DEFAULT_PAGE_SIZE),
            offset: 0,
            properties_to_include: None,
        }
    }

    /// Append an ORDER BY on the given property list. An empty string clears it.
    pub fn with_order_by(mut self, order_by: impl Into<String>, ascending: bool) -> Self {
        let order_by = order_by.into();
        self.order_by = if order_by.is_empty() {
            None
        } else {
            Some(order_by)
        };
        self.ascending = ascending;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, PropertyValue>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Set the pagination window, clamping both bounds.
    pub fn with_page(mut self, page_size: i64, offset: i64) -> Self {
        self.page_size = clamp_page_size(page_size);
        self.offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        self
    }

    /// Restrict custom properties to the given names. An empty set disables filtering.
    pub fn with_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        self.properties_to_include = if names.is_empty() { None } else { Some(names) };
        self
    }

    pub fn base_query(&self) -> &str {
        &self.base_query
    }

    pub fn order_by(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn ascending(&self) -> bool {
        self.ascending
    }

    pub fn parameters(&self) -> &BTreeMap<String, PropertyValue> {
        &self.parameters
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn properties_to_include(&self) -> Option<&BTreeSet<String>> {
        self.properties_to_include.as_ref()
    }
}

fn clamp_page_size(requested: i64) -> usize {
    let ceiling = MAX_PAGE_SIZE as i64;
    requested.clamp(1, ceiling) as usize
}

/// The JSON body of `POST /api/documents/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Base query in the store's query language.
    pub sql_query: String,
    #[serde(default = "default_max_results")]
    pub max_results: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, PropertyValue>>,
    #[serde(default)]
    pub properties_to_include: Option<Vec<String>>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

fn default_max_results() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn default_ascending() -> bool {
    true
}

impl From<SearchRequest> for QuerySpec {
    fn from(request: SearchRequest) -> Self {
        QuerySpec::new(request.sql_query)
            .with_order_by(request.order_by.unwrap_or_default(), request.ascending)
            .with_parameters(request.parameters.unwrap_or_default())
            .with_page(request.max_results, request.offset)
            .with_properties(request.properties_to_include.unwrap_or_default())
    }
}

/// Query string of `GET /api/documents/search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleSearchQuery {
    pub sql: String,
    #[serde(default = "default_max_results")]
    pub max_results: i64,
}

impl From<SimpleSearchQuery> for QuerySpec {
    fn from(query: SimpleSearchQuery) -> Self {
        QuerySpec::new(query.sql).with_page(query.max_results, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec = QuerySpec::new("SELECT * FROM Document");
        assert_eq!(spec.base_query(), "SELECT * FROM Document");
        assert_eq!(spec.order_by(), None);
        assert!(spec.ascending());
        assert_eq!(spec.page_size(), 100);
        assert_eq!(spec.offset(), 0);
        assert!(spec.properties_to_include().is_none());
    }

    #[test]
    fn test_page_size_clamped_to_ceiling() {
        let spec = QuerySpec::new("q").with_page(5000, 0);
        assert_eq!(spec.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_page_size_never_zero() {
        assert_eq!(QuerySpec::new("q").with_page(0, 0).page_size(), 1);
        assert_eq!(QuerySpec::new("q").with_page(-7, 0).page_size(), 1);
    }

    #[test]
    fn test_negative_offset_clamped() {
        let spec = QuerySpec::new("q").with_page(10, -10);
        assert_eq!(spec.offset(), 0);
    }

    #[test]
    fn test_empty_order_by_is_none() {
        let spec = QuerySpec::new("q").with_order_by("", false);
        assert_eq!(spec.order_by(), None);
        assert!(!spec.ascending());
    }

    #[test]
    fn test_empty_projection_disables_filtering() {
        let spec = QuerySpec::new("q").with_properties(Vec::<String>::new());
        assert!(spec.properties_to_include().is_none());
    }

    #[test]
    fn test_search_request_defaults() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"sqlQuery": "SELECT * FROM Document"}"#).unwrap();
        assert_eq!(request.max_results, 100);
        assert_eq!(request.offset, 0);
        assert!(request.ascending);
        assert!(request.parameters.is_none());
        assert!(request.order_by.is_none());
    }

    #[test]
    fn test_search_request_into_spec() {
        let request: SearchRequest = serde_json::from_str(
            r#"{
                "sqlQuery": "SELECT * FROM Document WHERE Owner = :owner",
                "maxResults": 5000,
                "offset": -3,
                "parameters": {"owner": "alice"},
                "propertiesToInclude": ["Title", "Owner"],
                "orderBy": "Title",
                "ascending": false
            }"#,
        )
        .unwrap();

        let spec = QuerySpec::from(request);
        assert_eq!(spec.page_size(), 1000);
        assert_eq!(spec.offset(), 0);
        assert_eq!(spec.order_by(), Some("Title"));
        assert!(!spec.ascending());
        assert_eq!(spec.parameters().get("owner"), Some(&PropertyValue::from("alice")));
        let include = spec.properties_to_include().unwrap();
        assert!(include.contains("Title") && include.contains("Owner"));
    }

    #[test]
    fn test_simple_search_query_into_spec() {
        let spec = QuerySpec::from(SimpleSearchQuery {
            sql: "SELECT * FROM Document".to_string(),
            max_results: 20,
        });
        assert_eq!(spec.page_size(), 20);
        assert_eq!(spec.offset(), 0);
        assert!(spec.parameters().is_empty());
    }
}
