//! Store-agnostic filter tree produced by the query compiler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comparison operand after classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Scalar {
    /// Raw text, compared using the store's own coercion rules.
    Text(String),
    /// An ISO-8601 date or date-time.
    Date(DateTime<Utc>),
}

impl Scalar {
    /// Returns the date value, if any.
    #[must_use]
    pub const fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Date(date) => Some(date),
            Self::Text(_) => None,
        }
    }
}

/// Constraint applied to a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Equals { value: String },
    GreaterThan { value: Scalar },
    GreaterOrEqual { value: Scalar },
    LessThan { value: Scalar },
    LessOrEqual { value: Scalar },
    In { values: Vec<String> },
    NotIn { values: Vec<String> },
    /// Closed interval `low <= field <= high`.
    Range { low: Scalar, high: Scalar },
    /// Unanchored pattern match.
    Matches { pattern: String, case_insensitive: bool },
}

/// Immutable conjunction of per-field predicates.
///
/// Fields are unique and kept in lexical order, so two filters built from the
/// same parameters compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    clauses: BTreeMap<String, Predicate>,
}

impl Filter {
    /// Filter matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Returns the predicate constraining `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Predicate> {
        self.clauses.get(field)
    }

    /// Iterates clauses in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.clauses.iter().map(|(field, predicate)| (field.as_str(), predicate))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl FromIterator<(String, Predicate)> for Filter {
    fn from_iter<I: IntoIterator<Item = (String, Predicate)>>(iter: I) -> Self {
        Self {
            clauses: iter.into_iter().collect(),
        }
    }
}
