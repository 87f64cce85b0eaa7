use serde_json::Value;

use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{ListQuery, SqlResult};
use crate::database::resource::{Resource, ResourceSpec};

/// Count + select statement pair for one list request against one resource.
///
/// Both statements share the same WHERE clause and positional parameters.
pub struct ListFilter {
    spec: &'static ResourceSpec,
    query: ListQuery,
    where_clause: FilterWhere,
}

impl ListFilter {
    pub fn new(resource: Resource, query: ListQuery) -> Self {
        let spec = resource.spec();
        let mut where_clause = FilterWhere::new();
        where_clause.soft_delete(spec);

        for (column, value) in &query.filters {
            where_clause.eq(*column, value.clone());
        }
        if let Some(term) = query.search.as_deref() {
            where_clause.search(spec.searchable, term);
        }

        Self {
            spec,
            query,
            where_clause,
        }
    }

    /// Limit to rows the public site may show
    pub fn public_only(mut self) -> Self {
        match self.spec.public_scope {
            Some(scope) => {
                self.where_clause.fragment(scope);
            }
            None => {
                self.where_clause.fragment("FALSE");
            }
        }
        self
    }

    /// Pin a registry column to a server-side value (e.g. the notification recipient)
    pub fn restrict(mut self, column: &'static str, value: Value) -> Self {
        self.where_clause.eq(column, value);
        self
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn spec(&self) -> &'static ResourceSpec {
        self.spec
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let query = [
            format!("SELECT COUNT(*) FROM \"{}\"", self.spec.table),
            self.where_clause.to_sql(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult {
            query,
            params: self.where_clause.params().to_vec(),
        }
    }

    pub fn to_select_sql(&self) -> SqlResult {
        let limit_index = self.where_clause.next_index();
        let offset_index = limit_index + 1;

        let query = [
            format!("SELECT {} AS data", self.build_row_object()),
            format!("FROM \"{}\"", self.spec.table),
            self.where_clause.to_sql(),
            FilterOrder::generate(self.query.sort_by, self.query.order),
            format!("LIMIT ${} OFFSET ${}", limit_index, offset_index),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        let mut params = self.where_clause.params().to_vec();
        params.push(Value::from(self.query.limit));
        params.push(Value::from(self.query.offset()));

        SqlResult { query, params }
    }

    fn build_row_object(&self) -> String {
        let pairs: Vec<String> = self
            .spec
            .columns
            .iter()
            .map(|c| format!("'{}', \"{}\"", c, c))
            .collect();
        format!("jsonb_build_object({})", pairs.join(", "))
    }
}
