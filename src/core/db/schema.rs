/// Result Schema Module
///
/// Describes the shape of a query result: the ordered column descriptors taken
/// from a prepared statement and the typed values that fill each row.
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ValueRef;
use rusqlite::Statement;
use serde::{Serialize, Serializer};
use std::str::FromStr;

/// How a column's values should be interpreted, derived from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Plain SQLite storage class, no reinterpretation
    Plain,
    /// `BOOLEAN` columns stored as integers
    Bool,
    /// `DATE` columns stored as `YYYY-MM-DD` text
    Date,
    /// `DATETIME` / `TIMESTAMP` columns stored as text or unix seconds
    DateTime,
    /// `DECIMAL` / `NUMERIC` columns stored as text
    Decimal,
    /// `JSON` columns stored as text
    Json,
}

impl ColumnKind {
    /// Classifies a declared column type. Expression columns have no declared
    /// type and are treated as plain.
    pub fn from_decl_type(decl_type: Option<&str>) -> Self {
        let Some(decl) = decl_type else {
            return ColumnKind::Plain;
        };
        let decl = decl.trim().to_uppercase();

        if decl.contains("DATETIME") || decl.contains("TIMESTAMP") {
            ColumnKind::DateTime
        } else if decl.starts_with("DATE") {
            ColumnKind::Date
        } else if decl.contains("DECIMAL") || decl.contains("NUMERIC") {
            ColumnKind::Decimal
        } else if decl.contains("BOOL") {
            ColumnKind::Bool
        } else if decl.contains("JSON") {
            ColumnKind::Json
        } else {
            ColumnKind::Plain
        }
    }
}

/// Represents a result column with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name as reported by the statement (after any `AS` alias)
    pub name: String,
    /// How values in this column are interpreted
    pub kind: ColumnKind,
}

/// Ordered column descriptors for a result set, matching row positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns(Vec<Column>);

impl Columns {
    /// Reads the column descriptors of a prepared statement.
    pub fn from_statement(stmt: &Statement<'_>) -> Self {
        Columns(
            stmt.columns()
                .into_iter()
                .map(|col| Column {
                    name: col.name().to_string(),
                    kind: ColumnKind::from_decl_type(col.decl_type()),
                })
                .collect(),
        )
    }

    /// Builds plain descriptors from bare column names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Columns(
            names
                .into_iter()
                .map(|name| Column {
                    name: name.into(),
                    kind: ColumnKind::Plain,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Column> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.0.iter()
    }

    /// Column names in result order
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A single cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Decimal(BigDecimal),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Json(serde_json::Value),
    Blob(Vec<u8>),
}

/// One database record; position `i` matches `Columns` position `i`.
pub type Row = Vec<Value>;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

impl Value {
    /// Converts a raw SQLite value using the column's interpretation.
    ///
    /// Text that does not parse as the declared type is kept as text.
    pub fn from_sql(value: ValueRef<'_>, kind: ColumnKind) -> Self {
        match (value, kind) {
            (ValueRef::Null, _) => Value::Null,
            (ValueRef::Integer(i), ColumnKind::Bool) => Value::Bool(i != 0),
            (ValueRef::Integer(secs), ColumnKind::DateTime) => {
                match chrono::DateTime::from_timestamp(secs, 0) {
                    Some(ts) => Value::DateTime(ts.naive_utc()),
                    None => Value::Integer(secs),
                }
            }
            (ValueRef::Integer(i), _) => Value::Integer(i),
            (ValueRef::Real(f), _) => Value::Real(f),
            (ValueRef::Text(t), kind) => {
                let text = String::from_utf8_lossy(t).to_string();
                parse_text(text, kind)
            }
            (ValueRef::Blob(b), _) => Value::Blob(b.to_vec()),
        }
    }
}

fn parse_text(text: String, kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::Date => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Value::Date)
            .unwrap_or(Value::Text(text)),
        ColumnKind::DateTime => DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
            .map(Value::DateTime)
            .unwrap_or(Value::Text(text)),
        ColumnKind::Decimal => BigDecimal::from_str(text.trim())
            .map(Value::Decimal)
            .unwrap_or(Value::Text(text)),
        ColumnKind::Json => serde_json::from_str(&text)
            .map(Value::Json)
            .unwrap_or(Value::Text(text)),
        ColumnKind::Plain | ColumnKind::Bool => Value::Text(text),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Real(_) => serializer.serialize_unit(),
            // Decimals go out as floats; precision loss is accepted
            Value::Decimal(d) => match d.to_f64().filter(|f| f.is_finite()) {
                Some(f) => serializer.serialize_f64(f),
                None => serializer.serialize_unit(),
            },
            Value::Text(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::DateTime(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Json(v) => v.serialize(serializer),
            Value::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
                serializer.serialize_str(&hex)
            }
        }
    }
}
