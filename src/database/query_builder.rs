use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Postgres};

use crate::database::manager::DatabaseError;
use crate::filter::{ListFilter, ListPage, Pagination, SqlResult};

/// Run a list request: one COUNT(*) and one page SELECT over the same WHERE clause
pub async fn fetch_page(pool: &PgPool, filter: &ListFilter) -> Result<ListPage<Value>, DatabaseError> {
    let count_sql = filter.to_count_sql();
    let select_sql = filter.to_select_sql();
    tracing::debug!(table = filter.spec().table, sql = %select_sql.query, "list query");

    let total: i64 = bind_all(sqlx::query_scalar::<_, i64>(&count_sql.query), &count_sql)
        .fetch_one(pool)
        .await?;

    let rows: Vec<Value> = bind_all(sqlx::query_scalar::<_, Value>(&select_sql.query), &select_sql)
        .fetch_all(pool)
        .await?;

    let query = filter.query();
    Ok(ListPage {
        rows,
        pagination: Pagination::new(query.page, query.limit, total),
    })
}

fn bind_all<'q, O>(
    mut q: sqlx::query::QueryScalar<'q, Postgres, O, PgArguments>,
    sql: &'q SqlResult,
) -> sqlx::query::QueryScalar<'q, Postgres, O, PgArguments> {
    for p in sql.params.iter() {
        q = bind_param(q, p);
    }
    q
}

fn bind_param<'q, O>(
    q: sqlx::query::QueryScalar<'q, Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryScalar<'q, Postgres, O, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v), // JSONB
    }
}
