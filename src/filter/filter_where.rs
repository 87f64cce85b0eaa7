use serde_json::Value;

use crate::database::resource::ResourceSpec;

/// Accumulates WHERE predicates and their positional parameters.
///
/// Identifiers passed in are `'static` and come from the resource registry;
/// every value goes through [`FilterWhere::param`] and is bound, never inlined.
#[derive(Debug, Default)]
pub struct FilterWhere {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self::default()
    }

    /// Soft-delete exclusion, applied first and unconditionally for aware resources
    pub fn soft_delete(&mut self, spec: &ResourceSpec) -> &mut Self {
        if spec.soft_delete {
            self.conditions.push("\"deleted_at\" IS NULL".to_string());
        }
        self
    }

    /// Static predicate from the registry (e.g. the public scope)
    pub fn fragment(&mut self, sql: &'static str) -> &mut Self {
        self.conditions.push(format!("({})", sql));
        self
    }

    pub fn eq(&mut self, column: &'static str, value: Value) -> &mut Self {
        let condition = if value.is_null() {
            format!("\"{}\" IS NULL", column)
        } else {
            format!("\"{}\" = {}", column, self.param(value))
        };
        self.conditions.push(condition);
        self
    }

    /// Case-insensitive partial match of one term across several columns, OR-combined
    pub fn search(&mut self, columns: &[&'static str], term: &str) -> &mut Self {
        if columns.is_empty() || term.is_empty() {
            return self;
        }
        let placeholder = self.param(Value::String(format!("%{}%", escape_like(term))));
        let parts: Vec<String> = columns
            .iter()
            .map(|c| format!("\"{}\" ILIKE {}", c, placeholder))
            .collect();
        self.conditions.push(format!("({})", parts.join(" OR ")));
        self
    }

    /// Bind a value and return its placeholder
    pub fn param(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub fn next_index(&self) -> usize {
        self.params.len() + 1
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// `WHERE …` clause, or an empty string when there are no predicates
    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// Escape LIKE metacharacters so user text only matches literally
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
