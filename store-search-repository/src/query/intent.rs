//! Structured search requests from the store server's handlers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::variant::QueryVariant;

/// Search request made of field filters, a free-text query and boosts.
///
/// Each map is keyed by field name. Every populated part becomes a clause
/// of one bool query; see [`QueryIntent::into_query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryIntent {
    /// Exact matches, rendered as must/term.
    pub terms: BTreeMap<String, Value>,
    /// Analyzed matches, rendered as must/match.
    pub filter: BTreeMap<String, Value>,
    /// Inclusive `[lower, upper]` windows; `null` leaves a bound open.
    pub range: BTreeMap<String, (Option<Value>, Option<Value>)>,
    /// Free text, rendered as must/query_string.
    pub query: Option<String>,
    /// Fields searched by `query`. Empty searches the index defaults.
    pub fields: Vec<String>,
    /// Text to search for, keyed to the fields it is matched against.
    pub multi_match: BTreeMap<String, Vec<String>>,
    /// Per-field boosts applied to the multi-match clauses.
    pub boosts: BTreeMap<String, f64>,
    /// Optional exact matches, at least one of which must hold.
    pub should: BTreeMap<String, Value>,
}

impl QueryIntent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.insert(field.into(), value.into());
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    pub fn with_range(
        mut self,
        field: impl Into<String>,
        lower: Option<Value>,
        upper: Option<Value>,
    ) -> Self {
        self.range.insert(field.into(), (lower, upper));
        self
    }

    pub fn with_query<S: Into<String>>(
        mut self,
        text: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.query = Some(text.into());
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_multi_match<S: Into<String>>(
        mut self,
        value: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.multi_match
            .insert(value.into(), fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_boost(mut self, field: impl Into<String>, boost: f64) -> Self {
        self.boosts.insert(field.into(), boost);
        self
    }

    pub fn with_should(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.should.insert(field.into(), value.into());
        self
    }

    /// Whether no clause would be produced.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
            && self.filter.is_empty()
            && self.range.is_empty()
            && self.query.is_none()
            && self.multi_match.is_empty()
            && self.should.is_empty()
    }

    /// Render the intent as a bool query.
    ///
    /// Clause order is terms, filters, ranges, query string, then
    /// multi-matches. The query text is passed through as written and
    /// joined with `OR`. Should clauses set a minimum of one match.
    pub fn into_query(self) -> QueryVariant {
        let mut must = Vec::new();

        must.extend(
            self.terms
                .into_iter()
                .map(|(field, value)| QueryVariant::term(field, value)),
        );
        must.extend(
            self.filter
                .into_iter()
                .map(|(field, value)| QueryVariant::match_field(field, value)),
        );
        must.extend(
            self.range
                .into_iter()
                .map(|(field, (lower, upper))| QueryVariant::range(field, lower, upper)),
        );
        if let Some(text) = self.query {
            must.push(QueryVariant::string_query_raw(text, true, self.fields));
        }
        for (value, fields) in self.multi_match {
            let boosts = self
                .boosts
                .iter()
                .filter(|(field, _)| fields.contains(field))
                .map(|(field, boost)| (field.clone(), *boost))
                .collect::<Vec<_>>();
            must.push(QueryVariant::multi_match(value, fields).with_field_boosts(boosts));
        }

        let should = self
            .should
            .into_iter()
            .map(|(field, value)| QueryVariant::term(field, value))
            .collect();

        QueryVariant::bool_query(must, should)
    }
}
