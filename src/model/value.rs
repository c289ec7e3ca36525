//! Cell values and feature identifiers.

use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::Serialize;

/// A single attribute cell, mirroring the SQLite storage classes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Interpret this cell as a feature identifier.
    ///
    /// Returns `None` for missing values (null, blob, NaN).
    #[must_use]
    pub fn feature_id(&self) -> Option<FeatureId> {
        match self {
            Self::Null | Self::Blob(_) => None,
            Self::Integer(value) => Some(FeatureId::Integer(*value)),
            Self::Real(value) => FeatureId::from_real(*value),
            Self::Text(value) => Some(FeatureId::Text(value.clone())),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(v) => Self::Integer(v),
            ValueRef::Real(v) => Self::Real(v),
            ValueRef::Text(v) => Self::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Self::Blob(v.to_vec()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Integer(v) => ToSqlOutput::from(*v),
            Self::Real(v) => ToSqlOutput::from(*v),
            Self::Text(v) => ToSqlOutput::from(v.as_str()),
            Self::Blob(v) => ToSqlOutput::from(v.as_slice()),
        })
    }
}

/// A normalized identifier value used for cross-layer matching.
///
/// Integral reals compare equal to integers so that a `COMID` stored as
/// `REAL` in one layer matches the same `COMID` stored as `INTEGER` in another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureId {
    Integer(i64),
    /// Non-integral real, stored as its bit pattern.
    Real(u64),
    Text(String),
}

impl FeatureId {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_real(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        let integral = value.is_finite()
            && value.fract() == 0.0
            && value >= i64::MIN as f64
            && value < i64::MAX as f64;
        if integral {
            Some(Self::Integer(value as i64))
        } else {
            // -0.0 and 0.0 never reach here, so bit equality is value equality.
            Some(Self::Real(value.to_bits()))
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::Text(v) => f.write_str(v),
        }
    }
}
