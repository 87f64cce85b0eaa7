use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if value.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

/// Normalized, validated list request.
///
/// `sort_by` and the filter keys are `'static` because they are always copied
/// out of a resource's allow-lists, never from request text.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: i64,
    pub limit: i64,
    pub sort_by: &'static str,
    pub order: SortDirection,
    pub search: Option<String>,
    pub filters: BTreeMap<&'static str, Value>,
}

impl ListQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total <= 0 || limit <= 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total: total.max(0),
            total_pages,
        }
    }
}

/// One page of rows plus its pagination block
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub rows: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 23).total_pages, 3);
        assert_eq!(Pagination::new(1, 10, 20).total_pages, 2);
        assert_eq!(Pagination::new(1, 10, 1).total_pages, 1);
    }

    #[test]
    fn zero_total_means_zero_pages_for_any_limit() {
        for limit in [1, 10, 25, 100] {
            assert_eq!(Pagination::new(1, limit, 0).total_pages, 0);
        }
    }

    #[test]
    fn pagination_serializes_camel_case() {
        let value = serde_json::to_value(Pagination::new(2, 10, 23)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "page": 2, "limit": 10, "total": 23, "totalPages": 3 })
        );
    }

    #[test]
    fn sort_direction_is_case_insensitive() {
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("desc"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("sideways"), None);
    }
}
