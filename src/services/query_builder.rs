//! Per-request table query construction.
//!
//! A [`TableContext`] is built once per request from the query string and the
//! body settings, then turned into a backend-agnostic [`QueryDescriptor`].
//! Nothing here fails: malformed input degrades to defaults, and filter keys
//! without a configured column are dropped instead of reaching the store.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::models::table::{FilterSetting, TableBody, TableQuery};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 10;

/// Ordering used when neither the caller nor the settings name a usable column.
pub const FALLBACK_ORDER_COLUMN: &str = "id";

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles")
});

/// A column reference split on `.`; `role.name` addresses `name` on relation `role`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnPath(Vec<String>);

impl ColumnPath {
    /// Split a dotted column, rejecting empty or non-identifier segments.
    pub fn parse(column: &str) -> Option<Self> {
        let segments: Vec<String> = column.trim().split('.').map(str::to_string).collect();
        if segments.iter().all(|s| IDENTIFIER.is_match(s)) {
            Some(Self(segments))
        } else {
            None
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive `asc` / `desc`; anything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// How a raw filter value is coerced before it is placed in the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Strings, numbers and booleans pass through; blank strings are skipped.
    Text,
    /// Numbers and numeric strings become JSON numbers; anything else is skipped.
    Number,
}

impl FilterKind {
    pub fn coerce(&self, value: &Value) -> Option<FilterValue> {
        match (self, value) {
            (Self::Text, Value::String(s)) if !s.trim().is_empty() => {
                Some(FilterValue::Text(s.clone()))
            }
            (Self::Text, Value::Number(n)) => Some(FilterValue::Number(n.clone())),
            (Self::Text, Value::Bool(b)) => Some(FilterValue::Bool(*b)),
            (Self::Number, Value::Number(n)) => {
                let n = match n.as_f64() {
                    Some(f) if !n.is_i64() && !n.is_u64() => number_from_f64(f)?,
                    _ => n.clone(),
                };
                Some(FilterValue::Number(n))
            }
            (Self::Number, Value::String(s)) => {
                let s = s.trim();
                let n = match s.parse::<i64>() {
                    Ok(i) => Number::from(i),
                    Err(_) => number_from_f64(s.parse::<f64>().ok()?)?,
                };
                Some(FilterValue::Number(n))
            }
            _ => None,
        }
    }
}

/// Integral floats collapse to integers so `"25"` and `25.0` both compare as `25`.
fn number_from_f64(f: f64) -> Option<Number> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() <= MAX_EXACT {
        Some(Number::from(f as i64))
    } else {
        Number::from_f64(f)
    }
}

/// A coerced filter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl FilterValue {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Bool(b) => Value::Bool(*b),
        }
    }
}

/// A configured filter column with its coercion resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterColumn {
    pub path: ColumnPath,
    pub kind: FilterKind,
}

impl FilterColumn {
    fn from_setting(setting: &FilterSetting) -> Option<Self> {
        let kind = if setting.is_number {
            FilterKind::Number
        } else {
            FilterKind::Text
        };
        Some(Self {
            path: ColumnPath::parse(&setting.column)?,
            kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub path: ColumnPath,
    pub direction: SortDirection,
}

/// Equality condition on one column.
///
/// `kind` is kept so a store can compare text filters as text even when the
/// caller sent a number or boolean.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: ColumnPath,
    pub kind: FilterKind,
    pub value: FilterValue,
}

/// `{ take, skip, orderBy, where }` handed to a table repository.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub take: u64,
    pub skip: u64,
    pub order_by: OrderBy,
    pub conditions: Vec<Condition>,
}

/// The descriptor without pagination, used to count the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub order_by: OrderBy,
    pub conditions: Vec<Condition>,
}

impl QueryDescriptor {
    pub fn count_query(&self) -> CountQuery {
        CountQuery {
            order_by: self.order_by.clone(),
            conditions: self.conditions.clone(),
        }
    }

    /// Nested order object, e.g. `{ "role": { "name": "asc" } }`.
    pub fn order_by_value(&self) -> Value {
        order_value(&self.order_by)
    }

    /// Nested where object, e.g. `{ "role": { "name": "admin" } }`.
    pub fn where_value(&self) -> Value {
        where_value(&self.conditions)
    }
}

impl CountQuery {
    pub fn order_by_value(&self) -> Value {
        order_value(&self.order_by)
    }

    pub fn where_value(&self) -> Value {
        where_value(&self.conditions)
    }
}

impl Serialize for QueryDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("QueryDescriptor", 4)?;
        s.serialize_field("take", &self.take)?;
        s.serialize_field("skip", &self.skip)?;
        s.serialize_field("orderBy", &self.order_by_value())?;
        s.serialize_field("where", &self.where_value())?;
        s.end()
    }
}

fn order_value(order_by: &OrderBy) -> Value {
    let mut root = Map::new();
    insert_nested(
        &mut root,
        order_by.path.segments(),
        Value::String(order_by.direction.as_str().to_string()),
    );
    Value::Object(root)
}

fn where_value(conditions: &[Condition]) -> Value {
    let mut root = Map::new();
    for condition in conditions {
        insert_nested(&mut root, condition.path.segments(), condition.value.to_value());
    }
    Value::Object(root)
}

fn insert_nested(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let child = target
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_nested(map, rest, value);
            }
        }
    }
}

/// Immutable state for one table request.
#[derive(Debug, Clone)]
pub struct TableContext {
    table_key: String,
    page: u64,
    per_page: u64,
    sort: Option<String>,
    sort_type: Option<SortDirection>,
    sort_columns: HashMap<String, ColumnPath>,
    filter_columns: HashMap<String, FilterColumn>,
    default_order: OrderBy,
    filters: Vec<Map<String, Value>>,
}

impl TableContext {
    /// Capture a request's query and body, indexing the sort and filter
    /// settings by key. The first setting for a key wins; settings whose
    /// column is not a valid path are dropped.
    pub fn initialize(query: TableQuery, body: TableBody, table_key: impl Into<String>) -> Self {
        let table_key = table_key.into();
        let settings = body.settings;

        let mut sort_columns = HashMap::new();
        for setting in &settings.sort {
            if sort_columns.contains_key(&setting.key) {
                continue;
            }
            match ColumnPath::parse(&setting.column) {
                Some(path) => {
                    sort_columns.insert(setting.key.clone(), path);
                }
                None => tracing::warn!(
                    table = %table_key,
                    key = %setting.key,
                    column = %setting.column,
                    "Dropping sort setting with invalid column"
                ),
            }
        }

        let mut filter_columns = HashMap::new();
        for setting in &settings.filter {
            if filter_columns.contains_key(&setting.key) {
                continue;
            }
            match FilterColumn::from_setting(setting) {
                Some(column) => {
                    filter_columns.insert(setting.key.clone(), column);
                }
                None => tracing::warn!(
                    table = %table_key,
                    key = %setting.key,
                    column = %setting.column,
                    "Dropping filter setting with invalid column"
                ),
            }
        }

        let default_order = match settings
            .default_order_by
            .as_deref()
            .and_then(ColumnPath::parse)
        {
            Some(path) => OrderBy {
                path,
                direction: settings
                    .default_order_type
                    .as_deref()
                    .and_then(SortDirection::parse)
                    .unwrap_or_default(),
            },
            None => OrderBy {
                path: ColumnPath(vec![FALLBACK_ORDER_COLUMN.to_string()]),
                direction: SortDirection::Asc,
            },
        };

        Self {
            table_key,
            page: query.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE),
            per_page: query.per_page.filter(|p| *p > 0).unwrap_or(DEFAULT_PER_PAGE),
            sort: query.sort,
            sort_type: query.sort_type.as_deref().and_then(SortDirection::parse),
            sort_columns,
            filter_columns,
            default_order,
            filters: body.filters,
        }
    }

    pub fn table_key(&self) -> &str {
        &self.table_key
    }

    /// Effective 1-based page.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Effective page size.
    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn construct_query(&self) -> QueryDescriptor {
        let take = self.per_page;
        let skip = (self.page - 1).saturating_mul(take);
        let order_by = self.order_by();
        let conditions = self.conditions();

        tracing::debug!(
            table = %self.table_key,
            take,
            skip,
            order_by = %order_by.path,
            conditions = conditions.len(),
            "Constructed table query"
        );

        QueryDescriptor {
            take,
            skip,
            order_by,
            conditions,
        }
    }

    fn order_by(&self) -> OrderBy {
        match self
            .sort
            .as_deref()
            .and_then(|key| self.sort_columns.get(key))
        {
            Some(path) => OrderBy {
                path: path.clone(),
                direction: self.sort_type.unwrap_or_default(),
            },
            None => self.default_order.clone(),
        }
    }

    fn conditions(&self) -> Vec<Condition> {
        let mut conditions: Vec<Condition> = Vec::new();

        for row in &self.filters {
            for (key, raw) in row {
                let Some(column) = self.filter_columns.get(key) else {
                    tracing::debug!(table = %self.table_key, key = %key, "Ignoring unmapped filter key");
                    continue;
                };
                let Some(value) = column.kind.coerce(raw) else {
                    tracing::debug!(table = %self.table_key, key = %key, "Skipping filter value that does not coerce");
                    continue;
                };

                match conditions.iter_mut().find(|c| c.path == column.path) {
                    Some(existing) => {
                        existing.kind = column.kind;
                        existing.value = value;
                    }
                    None => conditions.push(Condition {
                        path: column.path.clone(),
                        kind: column.kind,
                        value,
                    }),
                }
            }
        }

        conditions
    }
}
