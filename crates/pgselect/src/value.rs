//! Parameter values and column types.
//!
//! Unlike a `Box<dyn ToSql>`, a [`Value`] can be inspected, compared and
//! coerced before it is bound, so a compiled query's parameter list can be
//! asserted on and reused as a cache key.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A parameter value carried by a fragment's parameter marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    /// Bound as one array-typed parameter.
    Array(Vec<Value>),
}

impl Value {
    /// Short type name, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
        }
    }

    /// Convert a configuration/JSON value. Objects stay JSON documents.
    pub fn from_json(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Json(obj),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Timestamp(t) => write!(f, "{t}"),
            Value::TimestampTz(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Json(j) => write!(f, "{j}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

type BoxError = Box<dyn std::error::Error + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => {
                if *ty == Type::INT2 {
                    i16::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::INT8 {
                    i.to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*i as f64).to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*i as f32).to_sql(ty, out)
                } else {
                    Err(format!("cannot encode integer as {ty}").into())
                }
            }
            Value::Float(x) => {
                if *ty == Type::FLOAT4 {
                    (*x as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    x.to_sql(ty, out)
                } else {
                    Err(format!("cannot encode float as {ty}").into())
                }
            }
            Value::Text(s) => s.to_sql(ty, out),
            Value::Date(d) => d.to_sql(ty, out),
            Value::Timestamp(t) => t.to_sql(ty, out),
            Value::TimestampTz(t) => t.to_sql(ty, out),
            Value::Uuid(u) => u.to_sql(ty, out),
            Value::Json(j) => j.to_sql(ty, out),
            Value::Array(items) => match ty.kind() {
                Kind::Array(_) => items.to_sql(ty, out),
                _ => Err(format!("cannot encode array as non-array type {ty}").into()),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// SQL scalar type tag of a column.
///
/// Parsed from configuration strings such as `"integer"`, `"timestamptz"` or
/// `"text[]"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SqlType {
    Integer,
    Float,
    Boolean,
    Text,
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
    Array(Box<SqlType>),
}

impl FromStr for SqlType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_suffix("[]") {
            return Ok(SqlType::Array(Box::new(inner.parse()?)));
        }
        Ok(match s.to_ascii_lowercase().as_str() {
            "integer" | "int" | "bigint" | "smallint" | "int2" | "int4" | "int8" | "serial" => {
                SqlType::Integer
            }
            "float" | "double" | "real" | "float4" | "float8" | "double precision" => {
                SqlType::Float
            }
            "boolean" | "bool" => SqlType::Boolean,
            "text" | "string" | "varchar" | "char" | "citext" => SqlType::Text,
            "date" => SqlType::Date,
            "timestamp" | "naive_datetime" => SqlType::Timestamp,
            "timestamptz" | "utc_datetime" => SqlType::TimestampTz,
            "uuid" => SqlType::Uuid,
            "json" | "jsonb" | "map" => SqlType::Json,
            other => return Err(format!("unknown column type '{other}'")),
        })
    }
}

impl TryFrom<String> for SqlType {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Integer => f.write_str("integer"),
            SqlType::Float => f.write_str("float"),
            SqlType::Boolean => f.write_str("boolean"),
            SqlType::Text => f.write_str("text"),
            SqlType::Date => f.write_str("date"),
            SqlType::Timestamp => f.write_str("timestamp"),
            SqlType::TimestampTz => f.write_str("timestamptz"),
            SqlType::Uuid => f.write_str("uuid"),
            SqlType::Json => f.write_str("json"),
            SqlType::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

impl From<SqlType> for String {
    fn from(t: SqlType) -> Self {
        t.to_string()
    }
}

/// Coerce `value` to `ty`, the type of column `field`.
pub(crate) fn coerce(field: &str, value: Value, ty: &SqlType) -> Result<Value> {
    let mismatch = |value: &Value| {
        Error::invalid_value(
            field,
            format!("cannot use {} value {value} as {ty}", value.kind_name()),
        )
    };

    match (ty, value) {
        (_, Value::Null) => Ok(Value::Null),

        (SqlType::Array(inner), Value::Array(items)) => Ok(Value::Array(
            items
                .into_iter()
                .map(|item| coerce(field, item, inner))
                .collect::<Result<_>>()?,
        )),

        (SqlType::Integer, v @ Value::Int(_)) => Ok(v),
        (SqlType::Integer, Value::Float(x)) if x.is_finite() && x.fract() == 0.0 => {
            // 2^63 is exactly representable, i64::MAX is not
            if x < i64::MIN as f64 || x >= i64::MAX as f64 {
                return Err(Error::invalid_value(
                    field,
                    format!("{x} is out of range for an integer"),
                ));
            }
            Ok(Value::Int(x as i64))
        }
        (SqlType::Integer, Value::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::invalid_value(field, format!("'{s}' is not an integer"))),

        (SqlType::Float, v @ Value::Float(_)) => Ok(v),
        (SqlType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (SqlType::Float, Value::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::invalid_value(field, format!("'{s}' is not a number"))),

        (SqlType::Boolean, v @ Value::Bool(_)) => Ok(v),
        (SqlType::Boolean, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(Error::invalid_value(field, format!("'{s}' is not a boolean"))),
        },

        (SqlType::Text, v @ Value::Text(_)) => Ok(v),
        (SqlType::Text, v @ (Value::Int(_) | Value::Float(_) | Value::Bool(_))) => {
            Ok(Value::Text(v.to_string()))
        }

        (SqlType::Date, v @ Value::Date(_)) => Ok(v),
        (SqlType::Date, Value::Text(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| Error::invalid_value(field, format!("'{s}' is not a date: {e}"))),

        (SqlType::Timestamp, v @ Value::Timestamp(_)) => Ok(v),
        (SqlType::Timestamp, Value::Date(d)) => Ok(Value::Timestamp(d.and_time(Default::default()))),
        (SqlType::Timestamp, Value::Text(s)) => parse_naive_datetime(s.trim())
            .map(Value::Timestamp)
            .ok_or_else(|| Error::invalid_value(field, format!("'{s}' is not a timestamp"))),

        (SqlType::TimestampTz, v @ Value::TimestampTz(_)) => Ok(v),
        (SqlType::TimestampTz, Value::Timestamp(t)) => Ok(Value::TimestampTz(t.and_utc())),
        (SqlType::TimestampTz, Value::Text(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|t| Value::TimestampTz(t.with_timezone(&Utc)))
            .or_else(|_| {
                parse_naive_datetime(s.trim())
                    .map(|t| Value::TimestampTz(t.and_utc()))
                    .ok_or(())
            })
            .map_err(|_| Error::invalid_value(field, format!("'{s}' is not a timestamp"))),

        (SqlType::Uuid, v @ Value::Uuid(_)) => Ok(v),
        (SqlType::Uuid, Value::Text(s)) => Uuid::parse_str(s.trim())
            .map(Value::Uuid)
            .map_err(|e| Error::invalid_value(field, format!("'{s}' is not a uuid: {e}"))),

        (SqlType::Json, v @ Value::Json(_)) => Ok(v),
        (SqlType::Json, Value::Text(s)) => serde_json::from_str(&s)
            .map(Value::Json)
            .map_err(|e| Error::invalid_value(field, format!("invalid json: {e}"))),

        (_, value) => Err(mismatch(&value)),
    }
}

/// Coerce every element of a membership list to the column's element type.
pub(crate) fn coerce_list(field: &str, values: Vec<Value>, ty: &SqlType) -> Result<Value> {
    let element = match ty {
        SqlType::Array(inner) => inner.as_ref(),
        other => other,
    };
    Ok(Value::Array(
        values
            .into_iter()
            .map(|v| coerce(field, v, element))
            .collect::<Result<_>>()?,
    ))
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(Default::default()))
        })
}
