//! Compiles raw query parameters into a [`Filter`].
//!
//! Every parameter other than `page` and `pageSize` names a document field.
//! A value shaped like `[operator:payload]` is an operator expression, any
//! other value is an equality test on the raw text:
//!
//! | operator | payload | predicate |
//! |---|---|---|
//! | `gt`, `gte`, `lt`, `lte` | scalar | comparison, operand classified as date or text |
//! | `in`, `nin` | `a,b,c` | (negated) membership in the literal values |
//! | `range` | `low\|high` | `low <= field <= high`, bounds classified |
//! | `text`, `regex` | pattern | unanchored, case-insensitive match |
//!
//! Unknown operators drop the field from the filter.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use datacat_core::{CollectionName, CoreResult, Filter, Predicate};

use crate::classify::classify;
use crate::pagination::{PageRequest, PAGE_PARAM, PAGE_SIZE_PARAM};

static OPERATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([A-Za-z0-9_]*):(.*)\]").expect("operator grammar must compile")
});

/// A guarded collection, its page selection and its filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub collection: CollectionName,
    pub page: PageRequest,
    pub filter: Filter,
}

/// Stateless compiler from parameter maps to filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCompiler;

impl FilterCompiler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compiles a whole query: namespace guard, then page, then filter.
    ///
    /// # Errors
    ///
    /// Returns `RestrictedCollection` for reserved collections before any
    /// parameter is looked at.
    pub fn compile_query<I, K, V>(&self, collection: &str, params: I) -> CoreResult<CompiledQuery>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let collection = CollectionName::parse(collection)?;

        let mut page = None;
        let mut page_size = None;
        let mut fields = Vec::new();
        for (key, value) in params {
            match key.as_ref() {
                PAGE_PARAM => page = Some(value.as_ref().to_string()),
                PAGE_SIZE_PARAM => page_size = Some(value.as_ref().to_string()),
                field => fields.push((field.to_string(), value)),
            }
        }

        let page = PageRequest::from_params(page.as_deref(), page_size.as_deref());
        let filter = fields
            .into_iter()
            .filter_map(|(field, value)| {
                compile_value(value.as_ref()).map(|predicate| (field, predicate))
            })
            .collect();

        debug!(collection = %collection, filter = ?filter, "Compiled query");
        Ok(CompiledQuery {
            collection,
            page,
            filter,
        })
    }

    /// Compiles field parameters into a filter, ignoring pagination keys.
    pub fn compile<I, K, V>(&self, params: I) -> Filter
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        params
            .into_iter()
            .filter(|(key, _)| !matches!(key.as_ref(), PAGE_PARAM | PAGE_SIZE_PARAM))
            .filter_map(|(key, value)| {
                compile_value(value.as_ref()).map(|predicate| (key.as_ref().to_string(), predicate))
            })
            .collect()
    }
}

/// Compiles one raw value. `None` means the field is left unconstrained.
#[must_use]
pub fn compile_value(raw: &str) -> Option<Predicate> {
    let Some(captures) = OPERATOR.captures(raw) else {
        return Some(Predicate::Equals {
            value: raw.to_string(),
        });
    };
    let operator = captures.get(1).map_or("", |m| m.as_str());
    let payload = captures.get(2).map_or("", |m| m.as_str());

    let predicate = match operator {
        "gt" => Predicate::GreaterThan {
            value: classify(payload),
        },
        "gte" => Predicate::GreaterOrEqual {
            value: classify(payload),
        },
        "lt" => Predicate::LessThan {
            value: classify(payload),
        },
        "lte" => Predicate::LessOrEqual {
            value: classify(payload),
        },
        "in" => Predicate::In {
            values: split_list(payload),
        },
        "nin" => Predicate::NotIn {
            values: split_list(payload),
        },
        "range" => {
            let mut bounds = payload.split('|');
            let (low, high) = (bounds.next()?, bounds.next()?);
            Predicate::Range {
                low: classify(low),
                high: classify(high),
            }
        }
        "text" | "regex" => Predicate::Matches {
            pattern: payload.to_string(),
            case_insensitive: true,
        },
        _ => return None,
    };
    Some(predicate)
}

fn split_list(payload: &str) -> Vec<String> {
    payload.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use datacat_core::Scalar;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_plain_value_is_equality() {
        let filter = FilterCompiler::new().compile(&params(&[("color", "red")]));
        assert_eq!(
            filter.get("color"),
            Some(&Predicate::Equals {
                value: "red".into()
            })
        );
    }

    #[test]
    fn test_comparison_keeps_numbers_as_text() {
        assert_eq!(
            compile_value("[gt:5]"),
            Some(Predicate::GreaterThan {
                value: Scalar::Text("5".into())
            })
        );
        assert!(matches!(
            compile_value("[lte:2021-03-04]"),
            Some(Predicate::LessOrEqual {
                value: Scalar::Date(_)
            })
        ));
    }

    #[test]
    fn test_range_with_date_bounds() {
        let Some(Predicate::Range { low, high }) = compile_value("[range:2020-01-01|2020-12-31]")
        else {
            panic!("expected a range predicate");
        };
        assert_eq!(
            low.as_date().map(|d| d.to_rfc3339()),
            Some("2020-01-01T00:00:00+00:00".to_string())
        );
        assert_eq!(
            high.as_date().map(|d| d.to_rfc3339()),
            Some("2020-12-31T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_range_without_separator_is_dropped() {
        assert_eq!(compile_value("[range:10]"), None);
        assert_eq!(
            compile_value("[range:10|20|30]"),
            Some(Predicate::Range {
                low: Scalar::Text("10".into()),
                high: Scalar::Text("20".into()),
            })
        );
    }

    #[test]
    fn test_membership_lists_are_literal() {
        assert_eq!(
            compile_value("[in:a,b,c]"),
            Some(Predicate::In {
                values: vec!["a".into(), "b".into(), "c".into()]
            })
        );
        assert_eq!(
            compile_value("[nin:2020-01-01]"),
            Some(Predicate::NotIn {
                values: vec!["2020-01-01".into()]
            })
        );
    }

    #[test]
    fn test_text_and_regex_are_synonyms() {
        let expected = Some(Predicate::Matches {
            pattern: "^wid.*".into(),
            case_insensitive: true,
        });
        assert_eq!(compile_value("[text:^wid.*]"), expected);
        assert_eq!(compile_value("[regex:^wid.*]"), expected);
    }

    #[test]
    fn test_unknown_operator_drops_field() {
        let compiler = FilterCompiler::new();
        let with_unknown = compiler.compile(&params(&[("x", "[foo:bar]"), ("y", "1")]));
        let without = compiler.compile(&params(&[("y", "1")]));
        assert_eq!(with_unknown, without);
        assert!(with_unknown.get("x").is_none());
    }

    #[test]
    fn test_operator_match_is_unanchored_and_greedy() {
        assert_eq!(
            compile_value("price [gt:5] please"),
            Some(Predicate::GreaterThan {
                value: Scalar::Text("5".into())
            })
        );
        assert_eq!(
            compile_value("[text:a]b]"),
            Some(Predicate::Matches {
                pattern: "a]b".into(),
                case_insensitive: true,
            })
        );
        assert_eq!(
            compile_value("[gt]"),
            Some(Predicate::Equals {
                value: "[gt]".into()
            })
        );
    }

    #[test]
    fn test_pagination_keys_are_not_fields() {
        let filter = FilterCompiler::new().compile(&params(&[
            ("page", "2"),
            ("pageSize", "5"),
            ("kind", "widget"),
        ]));
        assert_eq!(filter.len(), 1);
        assert!(filter.get("page").is_none());
    }

    #[test]
    fn test_compile_query_guards_before_anything_else() {
        let compiler = FilterCompiler::new();
        for collection in ["sys.keys", "system.users"] {
            let err = compiler
                .compile_query(collection, &params(&[("x", "[text:(]")]))
                .unwrap_err();
            assert_eq!(err.code(), "RESTRICTED_DATA_COLLECTION");
        }
    }

    #[test]
    fn test_compile_query_reads_page_and_filter() {
        let raw: HashMap<String, String> = [
            ("price", "[range:10|20]"),
            ("page", "2"),
            ("pageSize", "5"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let before = raw.clone();

        let query = FilterCompiler::new().compile_query("widgets", &raw).unwrap();

        assert_eq!(query.collection.as_str(), "widgets");
        assert_eq!(query.page.page(), 2);
        assert_eq!(query.page.page_size(), 5);
        assert_eq!(query.filter.len(), 1);
        assert_eq!(raw, before);
    }
}
