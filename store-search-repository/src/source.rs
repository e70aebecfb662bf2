//! Search request composition: query plus pagination and sorting.

use serde_json::{json, Map, Value};

use crate::query::QueryVariant;

/// Page size used when the caller does not supply a positive one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// A complete search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSource {
    pub query: QueryVariant,
    pub from: i64,
    pub size: i64,
    pub sort_field: Option<String>,
    pub sort_descending: bool,
    pub search_after: Option<Vec<Value>>,
    pub track_total_hits: bool,
}

impl SearchSource {
    /// Compose a request from a query and optional paging.
    ///
    /// `from` and `size` are defaulted independently: a missing or
    /// non-positive `from` becomes 0 and a missing or non-positive `size`
    /// becomes [`DEFAULT_PAGE_SIZE`]. A non-empty sort field sorts
    /// descending.
    pub fn compose(
        query: QueryVariant,
        from: Option<i64>,
        size: Option<i64>,
        sort_field: Option<&str>,
        search_after: Option<Vec<Value>>,
    ) -> Self {
        let sort_field = sort_field
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string);

        Self {
            query,
            from: from.filter(|from| *from > 0).unwrap_or(0),
            size: size.filter(|size| *size > 0).unwrap_or(DEFAULT_PAGE_SIZE),
            sort_descending: sort_field.is_some(),
            sort_field,
            search_after: search_after.filter(|values| !values.is_empty()),
            track_total_hits: true,
        }
    }

    /// A first page with default paging and no sort.
    pub fn for_query(query: QueryVariant) -> Self {
        Self::compose(query, None, None, None, None)
    }

    /// Render the request body.
    ///
    /// `from` is left out when `search_after` is set; the engine rejects
    /// both together.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".into(), self.query.to_dsl());
        if self.search_after.is_none() {
            body.insert("from".into(), json!(self.from));
        }
        body.insert("size".into(), json!(self.size));
        if let Some(field) = &self.sort_field {
            let order = if self.sort_descending { "desc" } else { "asc" };
            body.insert("sort".into(), json!([{ field: { "order": order } }]));
        }
        if let Some(search_after) = &self.search_after {
            body.insert("search_after".into(), json!(search_after));
        }
        body.insert("track_total_hits".into(), json!(self.track_total_hits));
        Value::Object(body)
    }
}
