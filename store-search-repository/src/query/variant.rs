//! The query algebra and its rendering to the engine query DSL.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use super::classify::{classify, MATCH_ALL};

/// Minimum-should-match applied to full-text queries.
pub const MINIMUM_SHOULD_MATCH: &str = "95%";

/// Tie-breaker applied to multi-field queries.
pub const TIE_BREAKER: f64 = 0.3;

/// Edit-distance tolerance for full-text queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    /// Let the engine pick by term length.
    Auto,
    /// A fixed number of edits.
    Edits(u8),
}

impl Fuzziness {
    fn to_dsl(self) -> Value {
        match self {
            Fuzziness::Auto => json!("AUTO"),
            Fuzziness::Edits(n) => json!(n),
        }
    }
}

/// Boolean join of analyzed terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }
}

/// A query understood by the search executor.
///
/// Values are immutable once built; the `with_*` combinators consume and
/// return the query. Combinators that do not apply to a variant leave it
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryVariant {
    Term {
        field: String,
        value: Value,
        boost: Option<f64>,
    },
    Terms {
        field: String,
        values: Vec<Value>,
    },
    Match {
        field: String,
        value: Value,
        boost: Option<f64>,
        fuzziness: Option<Fuzziness>,
        operator: Option<Operator>,
    },
    Range {
        field: String,
        lower: Option<Value>,
        upper: Option<Value>,
        inclusive: bool,
    },
    MultiMatch {
        fields: Vec<String>,
        value: Value,
        field_boosts: BTreeMap<String, f64>,
        fuzziness: Option<Fuzziness>,
    },
    Wildcard {
        field: String,
        pattern: String,
    },
    StringQuery {
        text: String,
        all_tokens_are_ids: bool,
        fields: Vec<String>,
    },
    Bool {
        must: Vec<QueryVariant>,
        should: Vec<QueryVariant>,
        must_not: Vec<QueryVariant>,
        minimum_should_match: Option<u32>,
    },
}

impl QueryVariant {
    /// Exact match on a keyword field.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
            boost: None,
        }
    }

    /// Exact match against any of several values.
    pub fn terms<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Analyzed full-text match on one field.
    pub fn match_field(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Match {
            field: field.into(),
            value: value.into(),
            boost: None,
            fuzziness: None,
            operator: None,
        }
    }

    /// Inclusive range (`gte`/`lte`). Either bound may be open.
    pub fn range(field: impl Into<String>, lower: Option<Value>, upper: Option<Value>) -> Self {
        Self::Range {
            field: field.into(),
            lower,
            upper,
            inclusive: true,
        }
    }

    /// Exclusive range (`gt`/`lt`), used for numeric windows.
    pub fn range_exclusive(
        field: impl Into<String>,
        lower: Option<Value>,
        upper: Option<Value>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            lower,
            upper,
            inclusive: false,
        }
    }

    /// Full-text match over several fields.
    pub fn multi_match<S: Into<String>>(
        value: impl Into<Value>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::MultiMatch {
            fields: fields.into_iter().map(Into::into).collect(),
            value: value.into(),
            field_boosts: BTreeMap::new(),
            fuzziness: None,
        }
    }

    /// Wildcard pattern on one field. An empty pattern matches everything.
    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self::Wildcard {
            field: field.into(),
            pattern: if pattern.is_empty() {
                MATCH_ALL.to_string()
            } else {
                pattern
            },
        }
    }

    /// Free-text query string.
    ///
    /// The text is tokenized and classified: a list made only of ids is
    /// joined with `OR`, anything else with `AND`. Empty text and `*` match
    /// every document.
    pub fn string_query<S: Into<String>>(text: &str, fields: impl IntoIterator<Item = S>) -> Self {
        let classified = classify(text);
        Self::StringQuery {
            text: classified.text,
            all_tokens_are_ids: classified.all_ids,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Query string with an explicit join, bypassing classification.
    pub fn string_query_raw<S: Into<String>>(
        text: impl Into<String>,
        all_tokens_are_ids: bool,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::StringQuery {
            text: text.into(),
            all_tokens_are_ids,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Boolean combination. With should clauses present at least one of
    /// them has to match.
    pub fn bool_query(must: Vec<QueryVariant>, should: Vec<QueryVariant>) -> Self {
        let minimum_should_match = if should.is_empty() { None } else { Some(1) };
        Self::Bool {
            must,
            should,
            must_not: Vec::new(),
            minimum_should_match,
        }
    }

    /// Documents matching none of the clauses.
    pub fn must_not(clauses: Vec<QueryVariant>) -> Self {
        Self::Bool {
            must: Vec::new(),
            should: Vec::new(),
            must_not: clauses,
            minimum_should_match: None,
        }
    }

    /// Set the relevance boost on term and match queries.
    pub fn with_boost(mut self, new_boost: f64) -> Self {
        match &mut self {
            Self::Term { boost, .. } | Self::Match { boost, .. } => *boost = Some(new_boost),
            _ => {}
        }
        self
    }

    /// Set the fuzziness on match and multi-match queries.
    pub fn with_fuzziness(mut self, new_fuzziness: Fuzziness) -> Self {
        match &mut self {
            Self::Match { fuzziness, .. } | Self::MultiMatch { fuzziness, .. } => {
                *fuzziness = Some(new_fuzziness)
            }
            _ => {}
        }
        self
    }

    /// Set the term join on match queries.
    pub fn with_operator(mut self, new_operator: Operator) -> Self {
        if let Self::Match { operator, .. } = &mut self {
            *operator = Some(new_operator);
        }
        self
    }

    /// Add per-field boosts to a multi-match query.
    pub fn with_field_boosts(mut self, boosts: impl IntoIterator<Item = (String, f64)>) -> Self {
        if let Self::MultiMatch { field_boosts, .. } = &mut self {
            field_boosts.extend(boosts);
        }
        self
    }

    /// Override the minimum number of should clauses on a bool query.
    pub fn with_minimum_should_match(mut self, minimum: u32) -> Self {
        if let Self::Bool {
            minimum_should_match,
            ..
        } = &mut self
        {
            *minimum_should_match = Some(minimum);
        }
        self
    }

    /// Render the query as engine query DSL.
    pub fn to_dsl(&self) -> Value {
        match self {
            Self::Term {
                field,
                value,
                boost,
            } => match boost {
                Some(boost) => json!({ "term": { field: { "value": value, "boost": boost } } }),
                None => json!({ "term": { field: value } }),
            },
            Self::Terms { field, values } => json!({ "terms": { field: values } }),
            Self::Match {
                field,
                value,
                boost,
                fuzziness,
                operator,
            } => {
                let mut body = Map::new();
                body.insert("query".into(), value.clone());
                body.insert("minimum_should_match".into(), json!(MINIMUM_SHOULD_MATCH));
                body.insert("lenient".into(), json!(true));
                if let Some(boost) = boost {
                    body.insert("boost".into(), json!(boost));
                }
                if let Some(fuzziness) = fuzziness {
                    body.insert("fuzziness".into(), fuzziness.to_dsl());
                }
                if let Some(operator) = operator {
                    body.insert("operator".into(), json!(operator.as_str()));
                }
                json!({ "match": { field: body } })
            }
            Self::Range {
                field,
                lower,
                upper,
                inclusive,
            } => {
                let (lower_key, upper_key) = if *inclusive { ("gte", "lte") } else { ("gt", "lt") };
                let mut bounds = Map::new();
                if let Some(lower) = lower {
                    bounds.insert(lower_key.into(), lower.clone());
                }
                if let Some(upper) = upper {
                    bounds.insert(upper_key.into(), upper.clone());
                }
                json!({ "range": { field: bounds } })
            }
            Self::MultiMatch {
                fields,
                value,
                field_boosts,
                fuzziness,
            } => {
                let mut rendered: Vec<String> = fields
                    .iter()
                    .map(|field| match field_boosts.get(field) {
                        Some(boost) => format!("{}^{}", field, boost),
                        None => field.clone(),
                    })
                    .collect();
                rendered.extend(
                    field_boosts
                        .iter()
                        .filter(|(field, _)| !fields.contains(field))
                        .map(|(field, boost)| format!("{}^{}", field, boost)),
                );
                let mut body = Map::new();
                body.insert("query".into(), value.clone());
                body.insert("fields".into(), json!(rendered));
                body.insert("tie_breaker".into(), json!(TIE_BREAKER));
                body.insert("minimum_should_match".into(), json!(MINIMUM_SHOULD_MATCH));
                if let Some(fuzziness) = fuzziness {
                    body.insert("fuzziness".into(), fuzziness.to_dsl());
                }
                json!({ "multi_match": body })
            }
            Self::Wildcard { field, pattern } => {
                json!({ "wildcard": { field: { "wildcard": pattern } } })
            }
            Self::StringQuery {
                text,
                all_tokens_are_ids,
                fields,
            } => {
                let operator = if *all_tokens_are_ids {
                    Operator::Or
                } else {
                    Operator::And
                };
                let mut body = Map::new();
                body.insert("query".into(), json!(text));
                if !fields.is_empty() {
                    body.insert("fields".into(), json!(fields));
                }
                body.insert("default_operator".into(), json!(operator.as_str()));
                body.insert("tie_breaker".into(), json!(TIE_BREAKER));
                body.insert("minimum_should_match".into(), json!(MINIMUM_SHOULD_MATCH));
                body.insert("analyze_wildcard".into(), json!(true));
                json!({ "query_string": body })
            }
            Self::Bool {
                must,
                should,
                must_not,
                minimum_should_match,
            } => {
                let mut body = Map::new();
                for (key, clauses) in [("must", must), ("should", should), ("must_not", must_not)] {
                    if !clauses.is_empty() {
                        let rendered: Vec<Value> =
                            clauses.iter().map(QueryVariant::to_dsl).collect();
                        body.insert(key.into(), Value::Array(rendered));
                    }
                }
                if let Some(minimum) = minimum_should_match {
                    body.insert("minimum_should_match".into(), json!(minimum));
                }
                json!({ "bool": body })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_with_and_without_boost() {
        let query = QueryVariant::term("t_track_Fstatus", 1);
        assert_eq!(query.to_dsl(), json!({ "term": { "t_track_Fstatus": 1 } }));

        let query = QueryVariant::term("t_track_Fstatus", 1).with_boost(2.0);
        assert_eq!(
            query.to_dsl(),
            json!({ "term": { "t_track_Fstatus": { "value": 1, "boost": 2.0 } } })
        );
    }

    #[test]
    fn test_match_defaults() {
        let dsl = QueryVariant::match_field("name", "hello").to_dsl();
        assert_eq!(dsl["match"]["name"]["query"], "hello");
        assert_eq!(dsl["match"]["name"]["minimum_should_match"], "95%");
        assert_eq!(dsl["match"]["name"]["lenient"], true);
        assert!(dsl["match"]["name"].get("fuzziness").is_none());
    }

    #[test]
    fn test_match_with_options() {
        let dsl = QueryVariant::match_field("name", "helo")
            .with_fuzziness(Fuzziness::Auto)
            .with_operator(Operator::And)
            .with_boost(1.5)
            .to_dsl();
        assert_eq!(dsl["match"]["name"]["fuzziness"], "AUTO");
        assert_eq!(dsl["match"]["name"]["operator"], "AND");
        assert_eq!(dsl["match"]["name"]["boost"], 1.5);
    }

    #[test]
    fn test_range_bounds() {
        let dsl = QueryVariant::range("upload_time", Some(json!(10)), Some(json!(20))).to_dsl();
        assert_eq!(dsl, json!({ "range": { "upload_time": { "gte": 10, "lte": 20 } } }));

        let dsl = QueryVariant::range_exclusive("score", Some(json!(1)), None).to_dsl();
        assert_eq!(dsl, json!({ "range": { "score": { "gt": 1 } } }));
    }

    #[test]
    fn test_multi_match_boosts() {
        let dsl = QueryVariant::multi_match("jay", ["name", "alias"])
            .with_field_boosts([("name".to_string(), 2.0), ("lyric".to_string(), 0.5)])
            .with_fuzziness(Fuzziness::Edits(1))
            .to_dsl();

        assert_eq!(dsl["multi_match"]["fields"], json!(["name^2", "alias", "lyric^0.5"]));
        assert_eq!(dsl["multi_match"]["tie_breaker"], 0.3);
        assert_eq!(dsl["multi_match"]["minimum_should_match"], "95%");
        assert_eq!(dsl["multi_match"]["fuzziness"], 1);
    }

    #[test]
    fn test_wildcard_defaults_to_match_all() {
        assert_eq!(
            QueryVariant::wildcard("name", "").to_dsl(),
            json!({ "wildcard": { "name": { "wildcard": "*" } } })
        );
        assert_eq!(
            QueryVariant::wildcard("name", "ja*").to_dsl(),
            json!({ "wildcard": { "name": { "wildcard": "ja*" } } })
        );
    }

    #[test]
    fn test_string_query_operator() {
        let dsl = QueryVariant::string_query("123, 456", Vec::<String>::new()).to_dsl();
        assert_eq!(dsl["query_string"]["default_operator"], "OR");
        assert!(dsl["query_string"].get("fields").is_none());

        let dsl = QueryVariant::string_query("love song", ["name"]).to_dsl();
        assert_eq!(dsl["query_string"]["default_operator"], "AND");
        assert_eq!(dsl["query_string"]["fields"], json!(["name"]));
        assert_eq!(dsl["query_string"]["analyze_wildcard"], true);
    }

    #[test]
    fn test_bool_query() {
        let dsl = QueryVariant::bool_query(
            vec![QueryVariant::term("status", 1)],
            vec![QueryVariant::term("region", 2), QueryVariant::term("region", 3)],
        )
        .to_dsl();

        assert_eq!(dsl["bool"]["must"].as_array().unwrap().len(), 1);
        assert_eq!(dsl["bool"]["should"].as_array().unwrap().len(), 2);
        assert_eq!(dsl["bool"]["minimum_should_match"], 1);
        assert!(dsl["bool"].get("must_not").is_none());
    }

    #[test]
    fn test_bool_without_should_has_no_minimum() {
        let dsl = QueryVariant::bool_query(vec![QueryVariant::term("status", 1)], vec![]).to_dsl();
        assert!(dsl["bool"].get("minimum_should_match").is_none());

        let dsl = QueryVariant::must_not(vec![QueryVariant::terms("id", [1, 2])]).to_dsl();
        assert_eq!(dsl["bool"]["must_not"][0], json!({ "terms": { "id": [1, 2] } }));
    }

    #[test]
    fn test_inapplicable_combinators_are_ignored() {
        let query = QueryVariant::wildcard("name", "a*");
        assert_eq!(query.clone().with_boost(3.0), query);
        assert_eq!(query.clone().with_fuzziness(Fuzziness::Auto), query);
    }
}
