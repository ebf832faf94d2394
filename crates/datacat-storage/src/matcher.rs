//! Evaluation of a [`Filter`] against schema-free documents.
//!
//! Raw query operands are text, so matching applies its own coercion:
//! - field paths are dotted (`address.city`, `tags.0`); arrays are searched
//!   element-wise and a clause holds when any reached value satisfies it
//! - equality and membership compare strings exactly, numbers numerically and
//!   booleans by `true`/`false`
//! - comparisons against a date operand parse string fields as ISO-8601
//! - comparisons against a text operand are numeric for number fields and
//!   lexicographic for string fields
//! - `nin` holds for documents lacking the field
//! - patterns only match string values

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use datacat_core::{CoreError, CoreResult, Document, Filter, Predicate, Scalar};
use datacat_query::parse_iso8601;

/// A filter with its patterns compiled, ready to test documents.
#[derive(Debug)]
pub struct DocumentMatcher {
    clauses: Vec<Clause>,
}

#[derive(Debug)]
struct Clause {
    path: Vec<String>,
    test: Test,
}

#[derive(Debug)]
enum Test {
    Equals(String),
    Compare(Scalar, fn(Ordering) -> bool),
    In(Vec<String>),
    NotIn(Vec<String>),
    Range(Scalar, Scalar),
    Pattern(Regex),
}

impl DocumentMatcher {
    /// Prepares `filter` for evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPattern`] when a pattern does not compile.
    pub fn new(filter: &Filter) -> CoreResult<Self> {
        let clauses = filter
            .iter()
            .map(|(field, predicate)| {
                Ok(Clause {
                    path: field.split('.').map(str::to_string).collect(),
                    test: Test::from_predicate(field, predicate)?,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { clauses })
    }

    /// Returns true when every clause holds for `document`.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses.iter().all(|clause| {
            let mut values = Vec::new();
            resolve(document, &clause.path, &mut values);
            clause.test.holds(&values)
        })
    }
}

impl Test {
    fn from_predicate(field: &str, predicate: &Predicate) -> CoreResult<Self> {
        Ok(match predicate {
            Predicate::Equals { value } => Self::Equals(value.clone()),
            Predicate::GreaterThan { value } => Self::Compare(value.clone(), Ordering::is_gt),
            Predicate::GreaterOrEqual { value } => Self::Compare(value.clone(), Ordering::is_ge),
            Predicate::LessThan { value } => Self::Compare(value.clone(), Ordering::is_lt),
            Predicate::LessOrEqual { value } => Self::Compare(value.clone(), Ordering::is_le),
            Predicate::In { values } => Self::In(values.clone()),
            Predicate::NotIn { values } => Self::NotIn(values.clone()),
            Predicate::Range { low, high } => Self::Range(low.clone(), high.clone()),
            Predicate::Matches {
                pattern,
                case_insensitive,
            } => Self::Pattern(
                RegexBuilder::new(pattern)
                    .case_insensitive(*case_insensitive)
                    .build()
                    .map_err(|e| CoreError::InvalidPattern {
                        field: field.to_string(),
                        message: e.to_string(),
                    })?,
            ),
        })
    }

    fn holds(&self, values: &[&Value]) -> bool {
        match self {
            Self::Equals(raw) => values.iter().any(|v| equals_text(v, raw)),
            Self::Compare(scalar, accept) => values
                .iter()
                .any(|v| compare(v, scalar).is_some_and(accept)),
            Self::In(set) => values
                .iter()
                .any(|v| set.iter().any(|raw| equals_text(v, raw))),
            Self::NotIn(set) => !values
                .iter()
                .any(|v| set.iter().any(|raw| equals_text(v, raw))),
            Self::Range(low, high) => values.iter().any(|v| {
                compare(v, low).is_some_and(Ordering::is_ge)
                    && compare(v, high).is_some_and(Ordering::is_le)
            }),
            Self::Pattern(regex) => values
                .iter()
                .any(|v| v.as_str().is_some_and(|s| regex.is_match(s))),
        }
    }
}

/// Collects every value reachable through `path`, flattening arrays.
fn resolve<'a>(document: &'a Document, path: &[String], out: &mut Vec<&'a Value>) {
    if let Some((head, rest)) = path.split_first() {
        if let Some(value) = document.get(head) {
            descend(value, rest, out);
        }
    }
}

fn descend<'a>(value: &'a Value, path: &[String], out: &mut Vec<&'a Value>) {
    match (path.split_first(), value) {
        (None, Value::Array(items)) => out.extend(items.iter()),
        (None, other) => out.push(other),
        (Some((head, rest)), Value::Object(map)) => {
            if let Some(child) = map.get(head) {
                descend(child, rest, out);
            }
        }
        (Some((head, rest)), Value::Array(items)) => {
            if let Some(item) = head.parse::<usize>().ok().and_then(|i| items.get(i)) {
                descend(item, rest, out);
            }
            for item in items.iter().filter(|item| item.is_object()) {
                descend(item, path, out);
            }
        }
        (Some(_), _) => {}
    }
}

fn equals_text(value: &Value, raw: &str) -> bool {
    match value {
        Value::String(s) => s == raw,
        Value::Number(n) => match (n.as_f64(), raw.trim().parse::<f64>()) {
            (Some(field), Ok(operand)) => field == operand,
            _ => false,
        },
        Value::Bool(b) => raw == if *b { "true" } else { "false" },
        _ => false,
    }
}

/// Orders a field value relative to an operand, if they are comparable.
fn compare(value: &Value, scalar: &Scalar) -> Option<Ordering> {
    match (value, scalar) {
        (Value::String(s), Scalar::Date(operand)) => Some(parse_iso8601(s)?.cmp(operand)),
        (Value::String(s), Scalar::Text(operand)) => Some(s.as_str().cmp(operand.as_str())),
        (Value::Number(n), Scalar::Text(operand)) => {
            n.as_f64()?.partial_cmp(&operand.trim().parse::<f64>().ok()?)
        }
        _ => None,
    }
}
