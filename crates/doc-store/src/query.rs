use serde_json::{Map, Value};

/// Equality filter on top-level document fields.
///
/// A document matches when every listed field is present with an equal
/// value. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: Map<String, Value>,
}

impl Filter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Requires `field` to equal `value` when one is given.
    pub fn eq_opt(self, field: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    /// Returns true if no fields are constrained.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns true if the document body satisfies the filter.
    pub fn matches(&self, body: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| body.get(field) == Some(expected))
    }

    /// Returns the filter as a JSON object (used for JSONB containment).
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Query for documents in a collection.
///
/// Results are always ordered by insertion sequence, oldest first.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    /// Field filter.
    pub filter: Filter,

    /// Number of matching documents to skip.
    pub offset: Option<usize>,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl FindQuery {
    /// Creates a query matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for the given filter.
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// Sets the number of documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Selects a 1-based page of `per_page` documents.
    ///
    /// A page past the addressable range yields an empty result.
    pub fn page(self, page: usize, per_page: usize) -> Self {
        self.offset(page.saturating_sub(1).saturating_mul(per_page))
            .limit(per_page)
    }
}
