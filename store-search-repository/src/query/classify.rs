//! Tokenizing and classifying free-text query strings.

use std::sync::LazyLock;

use regex::Regex;

/// Query text that matches every document.
pub const MATCH_ALL: &str = "*";

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;|,\n\t]|\s{2,}").expect("separator pattern is valid"));

static ID_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+").expect("id pattern is valid"));

/// A query string ready to send, with its boolean join decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedText {
    pub text: String,
    pub all_ids: bool,
}

impl ClassifiedText {
    fn match_all() -> Self {
        Self {
            text: MATCH_ALL.to_string(),
            all_ids: true,
        }
    }
}

/// Split free text into tokens on list separators and whitespace.
pub fn tokenize(text: &str) -> Vec<&str> {
    SEPARATORS
        .split(text)
        .flat_map(str::split_whitespace)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Whether a token looks like a catalog id.
pub fn is_id_token(token: &str) -> bool {
    ID_TOKEN.is_match(token)
}

/// Tokenize `text`, quote each token and decide the join.
pub fn classify(text: &str) -> ClassifiedText {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == MATCH_ALL {
        return ClassifiedText::match_all();
    }

    let tokens = tokenize(trimmed);
    if tokens.is_empty() {
        return ClassifiedText::match_all();
    }

    let all_ids = tokens.iter().all(|token| is_id_token(token));
    let text = tokens
        .iter()
        .map(|token| format!("\"{}\"", token.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(" ");

    ClassifiedText { text, all_ids }
}
