//! PostgreSQL table repository: compiles descriptors into parameterized SQL.
//!
//! Column paths come from caller-supplied settings, so every path is resolved
//! against the table's static allowlist before anything reaches the SQL text.
//! Only allowlisted identifiers are interpolated; values are always bound.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::services::query_builder::{
    ColumnPath, Condition, CountQuery, FilterKind, FilterValue, QueryDescriptor,
};
use crate::services::table_data::TableRepository;

/// A one-level relation joined into a table's rows.
#[derive(Debug)]
pub struct Relation {
    /// Name used in column paths and in the row JSON, e.g. `gradeLevel`.
    pub name: &'static str,
    pub table: &'static str,
    /// Foreign key column on the base table.
    pub local_key: &'static str,
    /// Referenced column on the related table.
    pub foreign_key: &'static str,
    pub columns: &'static [&'static str],
}

/// Allowlist describing one list endpoint's backing table.
#[derive(Debug)]
pub struct TableSource {
    pub key: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [&'static str],
    pub relations: &'static [Relation],
}

#[derive(Debug, Clone, Copy)]
enum Resolved {
    Base(&'static str),
    Related(&'static Relation, &'static str),
}

impl TableSource {
    fn resolve(&self, path: &ColumnPath) -> Result<Resolved, AppError> {
        let resolved = match path.segments() {
            [column] => self
                .columns
                .iter()
                .find(|c| **c == column.as_str())
                .map(|c| Resolved::Base(*c)),
            [relation, column] => self
                .relations
                .iter()
                .find(|r| r.name == relation.as_str())
                .and_then(|r| {
                    r.columns
                        .iter()
                        .find(|c| **c == column.as_str())
                        .map(|c| Resolved::Related(r, *c))
                }),
            _ => None,
        };

        resolved.ok_or_else(|| {
            AppError::Validation(format!("Unknown column for table {}: {path}", self.key))
        })
    }
}

fn push_column(builder: &mut QueryBuilder<'static, Postgres>, column: Resolved) {
    match column {
        Resolved::Base(c) => builder.push(format!("base.\"{c}\"")),
        Resolved::Related(r, c) => builder.push(format!("\"{}\".\"{c}\"", r.name)),
    };
}

fn push_from(builder: &mut QueryBuilder<'static, Postgres>, source: &TableSource) {
    builder.push(format!(" FROM \"{}\" AS base", source.table));
    for r in source.relations {
        builder.push(format!(
            " LEFT JOIN \"{table}\" AS \"{name}\" ON \"{name}\".\"{fk}\" = base.\"{lk}\"",
            table = r.table,
            name = r.name,
            fk = r.foreign_key,
            lk = r.local_key,
        ));
    }
}

fn push_where(
    builder: &mut QueryBuilder<'static, Postgres>,
    source: &TableSource,
    conditions: &[Condition],
) -> Result<(), AppError> {
    let resolved = conditions
        .iter()
        .map(|c| source.resolve(&c.path).map(|column| (column, c)))
        .collect::<Result<Vec<_>, AppError>>()?;

    for (i, (column, condition)) in resolved.into_iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        push_column(builder, column);
        match (condition.kind, &condition.value) {
            (FilterKind::Text, value) => {
                builder.push("::text = ").push_bind(text_value(value));
            }
            (FilterKind::Number, FilterValue::Number(n)) => {
                builder.push(" = ");
                match n.as_i64() {
                    Some(i) => builder.push_bind(i),
                    None => builder.push_bind(n.as_f64().unwrap_or_default()),
                };
            }
            (FilterKind::Number, value) => {
                builder.push("::text = ").push_bind(text_value(value));
            }
        }
    }

    Ok(())
}

fn text_value(value: &FilterValue) -> String {
    match value {
        FilterValue::Text(s) => s.clone(),
        FilterValue::Number(n) => n.to_string(),
        FilterValue::Bool(b) => b.to_string(),
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Page query: each row is the base record as JSON with relations nested by name.
pub fn rows_query(
    source: &TableSource,
    query: &QueryDescriptor,
) -> Result<QueryBuilder<'static, Postgres>, AppError> {
    let order_column = source.resolve(&query.order_by.path)?;

    let mut builder = QueryBuilder::new("SELECT to_jsonb(base)");
    for r in source.relations {
        builder.push(format!(
            " || jsonb_build_object('{name}', CASE WHEN \"{name}\".\"{fk}\" IS NULL THEN NULL ELSE to_jsonb(\"{name}\") END)",
            name = r.name,
            fk = r.foreign_key,
        ));
    }
    builder.push(" AS data");
    push_from(&mut builder, source);
    push_where(&mut builder, source, &query.conditions)?;

    builder.push(" ORDER BY ");
    push_column(&mut builder, order_column);
    builder.push(" ").push(query.order_by.direction.as_sql());
    if !matches!(order_column, Resolved::Base(c) if c == source.primary_key) {
        builder.push(format!(", base.\"{}\" ASC", source.primary_key));
    }

    builder
        .push(" LIMIT ")
        .push_bind(to_i64(query.take))
        .push(" OFFSET ")
        .push_bind(to_i64(query.skip));

    Ok(builder)
}

/// Count query over the same joins and conditions. Ordering is irrelevant to a
/// count and is left out.
pub fn count_query(
    source: &TableSource,
    query: &CountQuery,
) -> Result<QueryBuilder<'static, Postgres>, AppError> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*)");
    push_from(&mut builder, source);
    push_where(&mut builder, source, &query.conditions)?;
    Ok(builder)
}

/// [`TableRepository`] over one allowlisted PostgreSQL table.
#[derive(Debug, Clone)]
pub struct PgTableRepository {
    pool: PgPool,
    source: &'static TableSource,
}

impl PgTableRepository {
    pub fn new(pool: PgPool, source: &'static TableSource) -> Self {
        Self { pool, source }
    }
}

#[async_trait]
impl TableRepository for PgTableRepository {
    type Row = Value;
    type Error = AppError;

    async fn find_many(&self, query: &QueryDescriptor) -> Result<Vec<Value>, AppError> {
        let mut builder = rows_query(self.source, query)?;
        let rows = builder
            .build_query_scalar::<Value>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, AppError> {
        let mut builder = count_query(self.source, query)?;
        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}
