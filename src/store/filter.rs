//! Structured scalar filters over stored rows
//!
//! A [`FilterExpr`] is built by callers instead of splicing user input into a
//! query string. The same expression can be rendered as a boolean expression
//! for a remote store ([`FilterExpr::to_expression`]) or evaluated in process
//! against a row ([`FilterExpr::matches`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{FIELD_ID, FIELD_META, FIELD_TEXT};

/// A filterable field. `Meta` addresses a top-level key of the JSON metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Id,
    Text,
    Meta(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpr {
    Eq { field: FilterField, value: Value },
    /// Case-insensitive substring match
    Contains { field: FilterField, needle: String },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn like_pattern(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("\"%{}%\"", escaped)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn meta_value(meta: &str, key: &str) -> Option<Value> {
    let parsed: Value = serde_json::from_str(meta).ok()?;
    parsed.get(key).cloned()
}

impl FilterExpr {
    pub fn eq(field: FilterField, value: impl Into<Value>) -> Self {
        FilterExpr::Eq {
            field,
            value: value.into(),
        }
    }

    pub fn contains(field: FilterField, needle: impl Into<String>) -> Self {
        FilterExpr::Contains {
            field,
            needle: needle.into(),
        }
    }

    /// Conjunction, flattening nested `And`s
    pub fn and(self, other: FilterExpr) -> Self {
        let mut parts = match self {
            FilterExpr::And(parts) => parts,
            expr => vec![expr],
        };
        match other {
            FilterExpr::And(more) => parts.extend(more),
            expr => parts.push(expr),
        }
        FilterExpr::And(parts)
    }

    /// Matches every row
    pub fn all() -> Self {
        FilterExpr::And(Vec::new())
    }

    pub fn any_of(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::Or(exprs)
    }

    /// Render as a store boolean expression with all literals quoted
    pub fn to_expression(&self) -> String {
        match self {
            FilterExpr::Eq { field, value } => match field {
                FilterField::Id => format!("{} == {}", FIELD_ID, quote(&value_text(value))),
                FilterField::Text => format!("{} == {}", FIELD_TEXT, quote(&value_text(value))),
                FilterField::Meta(key) => {
                    let fragment = format!("{}:{}", Value::String(key.clone()), value);
                    format!("{} like {}", FIELD_META, like_pattern(&fragment))
                }
            },
            FilterExpr::Contains { field, needle } => {
                let name = match field {
                    FilterField::Id => FIELD_ID,
                    FilterField::Text => FIELD_TEXT,
                    FilterField::Meta(_) => FIELD_META,
                };
                format!("{} like {}", name, like_pattern(needle))
            }
            FilterExpr::And(parts) if parts.is_empty() => format!("{} != \"\"", FIELD_ID),
            FilterExpr::Or(parts) if parts.is_empty() => format!("{} == \"\"", FIELD_ID),
            FilterExpr::And(parts) => join(parts, " and "),
            FilterExpr::Or(parts) => join(parts, " or "),
        }
    }

    /// Evaluate against a stored row's scalar fields
    pub fn matches(&self, id: &str, text: &str, meta: &str) -> bool {
        match self {
            FilterExpr::Eq { field, value } => match field {
                FilterField::Id => value.as_str() == Some(id),
                FilterField::Text => value.as_str() == Some(text),
                FilterField::Meta(key) => meta_value(meta, key).as_ref() == Some(value),
            },
            FilterExpr::Contains { field, needle } => {
                let needle = needle.to_lowercase();
                let haystack = match field {
                    FilterField::Id => id.to_lowercase(),
                    FilterField::Text => text.to_lowercase(),
                    FilterField::Meta(key) => match meta_value(meta, key) {
                        Some(v) => value_text(&v).to_lowercase(),
                        None => return false,
                    },
                };
                haystack.contains(&needle)
            }
            FilterExpr::And(parts) => parts.iter().all(|p| p.matches(id, text, meta)),
            FilterExpr::Or(parts) => parts.iter().any(|p| p.matches(id, text, meta)),
        }
    }
}

fn join(parts: &[FilterExpr], sep: &str) -> String {
    parts
        .iter()
        .map(|p| format!("({})", p.to_expression()))
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const META: &str = r#"{"memoryId":"m-1","sourceLang":"en","targetLang":"zh"}"#;

    #[test]
    fn test_eq_on_meta_key() {
        let f = FilterExpr::eq(FilterField::Meta("sourceLang".into()), "en");
        assert!(f.matches("a", "hello", META));
        let f = FilterExpr::eq(FilterField::Meta("sourceLang".into()), "de");
        assert!(!f.matches("a", "hello", META));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let f = FilterExpr::contains(FilterField::Text, "CAT");
        assert!(f.matches("a", "the cat sat", "{}"));
        assert!(!f.matches("a", "the dog sat", "{}"));
    }

    #[test]
    fn test_and_or_composition() {
        let f = FilterExpr::eq(FilterField::Meta("targetLang".into()), "zh")
            .and(FilterExpr::contains(FilterField::Id, "a"));
        match &f {
            FilterExpr::And(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected And, got {:?}", other),
        }
        assert!(f.matches("abc", "", META));
        assert!(!f.matches("xyz", "", META));

        let any = FilterExpr::any_of(vec![
            FilterExpr::eq(FilterField::Id, "x"),
            FilterExpr::eq(FilterField::Id, "y"),
        ]);
        assert!(any.matches("y", "", "{}"));
        assert!(!FilterExpr::Or(vec![]).matches("y", "", "{}"));
        assert!(FilterExpr::And(vec![]).matches("y", "", "{}"));
    }

    #[test]
    fn test_malformed_meta_never_matches() {
        let f = FilterExpr::eq(FilterField::Meta("k".into()), json!(1));
        assert!(!f.matches("a", "", "not json"));
    }

    #[test]
    fn test_expression_quotes_literals() {
        let f = FilterExpr::eq(FilterField::Text, r#"say "hi""#);
        assert_eq!(f.to_expression(), r#"text == "say \"hi\"""#);

        let f = FilterExpr::contains(FilterField::Text, "50%")
            .and(FilterExpr::eq(FilterField::Id, "a"));
        assert_eq!(f.to_expression(), r#"(text like "%50\%%") and (id == "a")"#);
        assert_eq!(FilterExpr::all().to_expression(), r#"id != """#);
    }
}
