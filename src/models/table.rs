//! Request shapes for the generic table list endpoints.
//!
//! Both shapes are parsed leniently: a bad `page`, a `settings.sort` that is
//! not an array or a filter row that is not an object never rejects the
//! request, it just falls back to the default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Query string parameters of a table request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    #[serde(default, deserialize_with = "lenient_positive")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_positive")]
    pub per_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sort: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sort_type: Option<String>,
}

/// Filter rows and column settings sent in the request body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct TableBody {
    pub filters: Vec<Map<String, Value>>,
    pub settings: TableSettings,
}

/// Per-table ordering and filter column configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSettings {
    pub default_order_by: Option<String>,
    pub default_order_type: Option<String>,
    pub sort: Vec<SortSetting>,
    pub filter: Vec<FilterSetting>,
}

/// Maps a caller-facing sort key onto a backing column path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortSetting {
    pub key: String,
    pub column: String,
}

/// Maps a caller-facing filter key onto a backing column path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSetting {
    pub key: String,
    pub column: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_number: bool,
}

impl From<Value> for TableBody {
    fn from(value: Value) -> Self {
        let Value::Object(mut body) = value else {
            return Self::default();
        };

        let filters = match body.remove("filters") {
            Some(Value::Array(rows)) => rows
                .into_iter()
                .filter_map(|row| match row {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        let settings = body
            .remove("settings")
            .map(TableSettings::from)
            .unwrap_or_default();

        Self { filters, settings }
    }
}

impl From<Value> for TableSettings {
    fn from(value: Value) -> Self {
        let Value::Object(mut settings) = value else {
            return Self::default();
        };

        Self {
            default_order_by: non_empty_string(settings.remove("defaultOrderBy")),
            default_order_type: non_empty_string(settings.remove("defaultOrderType")),
            sort: entries(settings.remove("sort")),
            filter: entries(settings.remove("filter")),
        }
    }
}

/// Parse a positive integer from a JSON number or a numeric string.
///
/// Integral floats such as `3.0` are accepted; zero, negatives, fractions
/// and anything non-numeric yield `None`.
pub fn positive_integer(value: &Value) -> Option<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    };
    parsed.filter(|n| *n > 0)
}

fn integral_f64(f: f64) -> Option<u64> {
    if f.is_finite() && f >= 1.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

fn non_empty_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// Collect the well-formed entries of an array, dropping the rest.
fn entries<T: DeserializeOwned>(value: Option<Value>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn lenient_positive<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(positive_integer))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(non_empty_string(value))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(matches!(value, Some(Value::Bool(true))))
}
