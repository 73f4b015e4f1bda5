use crate::models::document::PropertyValue;
use crate::models::search::QuerySpec;

/// A query ready to hand to the store: query text plus named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableQuery {
    text: String,
    parameters: Vec<(String, PropertyValue)>,
}

impl ExecutableQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    /// Bind a value to a named parameter. Binding the same name again replaces it.
    pub fn bind(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        match self.parameters.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.parameters.push((name, value)),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &[(String, PropertyValue)] {
        &self.parameters
    }
}

/// Build the executable query for a spec.
///
/// The base query is taken verbatim. `order_by` is concatenated as-is, so it
/// must come from a trusted source (see [`is_valid_order_by`]); parameter
/// values go through the store's own binding.
pub fn compose(spec: &QuerySpec) -> ExecutableQuery {
    let mut text = String::from(spec.base_query());

    if let Some(order_by) = spec.order_by() {
        text.push_str(" ORDER BY ");
        text.push_str(order_by);
        text.push_str(if spec.ascending() { " ASC" } else { " DESC" });
    }

    let mut query = ExecutableQuery::new(text);
    for (name, value) in spec.parameters() {
        query.bind(name.clone(), value.clone());
    }
    query
}

/// Whether `order_by` is a comma-separated list of plain property identifiers.
pub fn is_valid_order_by(order_by: &str) -> bool {
    order_by.split(',').all(|part| is_identifier(part.trim()))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
