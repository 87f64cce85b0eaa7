use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::error::FilterError;
use super::types::{ListQuery, SortDirection};
use crate::config::ListConfig;
use crate::database::resource::{FilterKind, ResourceSpec};

pub const MAX_SEARCH_LEN: usize = 200;

/// Derive a [`ListQuery`] from the raw query-string map of a list request.
///
/// Unknown keys are ignored. An unrecognized `sortBy` falls back to the
/// resource default instead of failing, since it is usually stale client state.
pub fn parse_list_query(
    raw: &HashMap<String, String>,
    spec: &'static ResourceSpec,
    limits: &ListConfig,
) -> Result<ListQuery, FilterError> {
    let mut errors: HashMap<String, String> = HashMap::new();

    let page = match param(raw, &["page"]) {
        None => 1,
        Some(v) => match v.parse::<i64>() {
            Ok(p) if p >= 1 => p,
            _ => {
                errors.insert("page".into(), "page must be a positive integer".into());
                1
            }
        },
    };

    let limit = match param(raw, &["limit"]) {
        None => limits.default_limit,
        Some(v) => match v.parse::<i64>() {
            Ok(l) if l >= 1 => {
                if l > limits.max_limit {
                    tracing::debug!("Limit {} exceeds max {}, capping to max", l, limits.max_limit);
                    limits.max_limit
                } else {
                    l
                }
            }
            _ => {
                errors.insert("limit".into(), "limit must be a positive integer".into());
                limits.default_limit
            }
        },
    };

    let order = match param(raw, &["order"]) {
        None => SortDirection::Desc,
        Some(v) => SortDirection::parse(v).unwrap_or_else(|| {
            errors.insert("order".into(), "order must be 'asc' or 'desc'".into());
            SortDirection::Desc
        }),
    };

    let sort_by = match param(raw, &["sortBy", "sort_by"]) {
        None => spec.default_sort,
        Some(v) => spec.is_sortable(v).unwrap_or_else(|| {
            tracing::debug!("Ignoring unknown sort column '{}' for {}", v, spec.name);
            spec.default_sort
        }),
    };

    let search = match param(raw, &["search", "q"]) {
        Some(term) if term.chars().count() > MAX_SEARCH_LEN => {
            errors.insert(
                "search".into(),
                format!("search must be at most {} characters", MAX_SEARCH_LEN),
            );
            None
        }
        Some(term) => Some(term.to_string()),
        None => None,
    };

    let mut filters = BTreeMap::new();
    for column in spec.filterable {
        let Some(raw_value) = param(raw, &[column.name]) else {
            continue;
        };
        match parse_filter_value(column.kind, raw_value) {
            Ok(value) => {
                filters.insert(column.name, value);
            }
            Err(message) => {
                errors.entry(column.name.to_string()).or_insert(message);
            }
        }
    }

    if !errors.is_empty() {
        return Err(FilterError::InvalidParams(errors));
    }

    Ok(ListQuery {
        page,
        limit,
        sort_by,
        order,
        search,
        filters,
    })
}

/// First non-empty trimmed value among the accepted key spellings
fn param<'a>(raw: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| raw.get(*k))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

fn parse_filter_value(kind: FilterKind, raw: &str) -> Result<Value, String> {
    match kind {
        FilterKind::Text => Ok(Value::String(raw.to_string())),
        FilterKind::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| "must be an integer".to_string()),
        FilterKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err("must be true or false".to_string()),
        },
        FilterKind::OneOf(allowed) => {
            if allowed.contains(&raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(format!("must be one of: {}", allowed.join(", ")))
            }
        }
    }
}
