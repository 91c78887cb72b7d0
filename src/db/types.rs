//! Row decoding into column-name → JSON maps.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the declared column type into a logical category
//! 2. Backend-specific decoders extract the value for that category
//!
//! Values that cannot be decoded for their category become `null` and are
//! logged at error level rather than failing the whole row.

use crate::models::{DatabaseType, Row};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row as _, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // Checked before integers: TINYTEXT contains "tiny"
    if lower.contains("char") || lower.contains("text") || lower == "name" {
        return TypeCategory::Text;
    }

    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    // SQLite stores temporal values as TEXT/INTEGER/REAL; read them verbatim.
    if db != DatabaseType::SQLite {
        match lower.as_str() {
            "timestamptz" => return TypeCategory::TimestampTz,
            // MySQL TIMESTAMP is stored in UTC
            "timestamp" if db == DatabaseType::MySQL => return TypeCategory::TimestampTz,
            "timestamp" | "datetime" => return TypeCategory::Timestamp,
            "date" => return TypeCategory::Date,
            "time" => return TypeCategory::Time,
            _ => {}
        }
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Value helpers
// =============================================================================

/// Encode binary column data as base64.
pub fn encode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    JsonValue::String(STANDARD.encode(bytes))
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Fold a `try_get` outcome into a JSON value, logging decode failures.
fn decoded<T>(
    result: Result<Option<T>, sqlx::Error>,
    column: &str,
    into: impl FnOnce(T) -> JsonValue,
) -> JsonValue {
    match result {
        Ok(Some(v)) => into(v),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::error!(column = %column, error = %e, "Failed to decode column");
            JsonValue::Null
        }
    }
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> Row;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> Row {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), DatabaseType::MySQL);
                let value = mysql::decode_column(self, idx, col.name(), category);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> Row {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), DatabaseType::PostgreSQL);
                let value = postgres::decode_column(self, idx, col.name(), category);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

impl RowToJson for SqliteRow {
    fn to_json_map(&self) -> Row {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), DatabaseType::SQLite);
                let value = sqlite::decode_column(self, idx, col.name(), category);
                (col.name().to_string(), value)
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(row: &MySqlRow, idx: usize, name: &str, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => {
                decoded(row.try_get::<Option<RawDecimal>, _>(idx), name, |v| {
                    JsonValue::String(v.0)
                })
            }
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => {
                decoded(row.try_get::<Option<bool>, _>(idx), name, JsonValue::Bool)
            }
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decoded(row.try_get::<Option<Vec<u8>>, _>(idx), name, |v| {
                encode_binary_value(&v)
            }),
            TypeCategory::Json => decoded(
                row.try_get::<Option<JsonValue>, _>(idx),
                name,
                std::convert::identity,
            ),
            TypeCategory::TimestampTz => {
                decoded(row.try_get::<Option<DateTime<Utc>>, _>(idx), name, |v| {
                    JsonValue::String(v.to_rfc3339())
                })
            }
            TypeCategory::Timestamp => {
                decoded(row.try_get::<Option<NaiveDateTime>, _>(idx), name, |v| {
                    JsonValue::String(v.to_string())
                })
            }
            TypeCategory::Date => decoded(row.try_get::<Option<NaiveDate>, _>(idx), name, |v| {
                JsonValue::String(v.to_string())
            }),
            TypeCategory::Time => decoded(row.try_get::<Option<NaiveTime>, _>(idx), name, |v| {
                JsonValue::String(v.to_string())
            }),
            _ => decoded(row.try_get::<Option<String>, _>(idx), name, JsonValue::String),
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        // Unsigned columns only decode into unsigned types
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        JsonValue::Null
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return float_value(v as f64);
        }
        JsonValue::Null
    }
}

mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(row: &PgRow, idx: usize, name: &str, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => {
                decoded(row.try_get::<Option<RawDecimal>, _>(idx), name, |v| {
                    JsonValue::String(v.0)
                })
            }
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => {
                decoded(row.try_get::<Option<bool>, _>(idx), name, JsonValue::Bool)
            }
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decoded(row.try_get::<Option<Vec<u8>>, _>(idx), name, |v| {
                encode_binary_value(&v)
            }),
            TypeCategory::Json => decoded(
                row.try_get::<Option<JsonValue>, _>(idx),
                name,
                std::convert::identity,
            ),
            TypeCategory::TimestampTz => {
                decoded(row.try_get::<Option<DateTime<Utc>>, _>(idx), name, |v| {
                    JsonValue::String(v.to_rfc3339())
                })
            }
            TypeCategory::Timestamp => {
                decoded(row.try_get::<Option<NaiveDateTime>, _>(idx), name, |v| {
                    JsonValue::String(v.to_string())
                })
            }
            TypeCategory::Date => decoded(row.try_get::<Option<NaiveDate>, _>(idx), name, |v| {
                JsonValue::String(v.to_string())
            }),
            TypeCategory::Time => decoded(row.try_get::<Option<NaiveTime>, _>(idx), name, |v| {
                JsonValue::String(v.to_string())
            }),
            TypeCategory::Uuid => decoded(row.try_get::<Option<uuid::Uuid>, _>(idx), name, |v| {
                JsonValue::String(v.to_string())
            }),
            TypeCategory::Text => {
                decoded(row.try_get::<Option<String>, _>(idx), name, JsonValue::String)
            }
            // Enums and other custom types carry their label as text
            _ => decoded(row.try_get_unchecked::<Option<String>, _>(idx), name, JsonValue::String),
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        JsonValue::Null
    }

    fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return float_value(v as f64);
        }
        JsonValue::Null
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, name: &str, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => {
                decoded(row.try_get::<Option<i64>, _>(idx), name, |v| JsonValue::Number(v.into()))
            }
            TypeCategory::Boolean => {
                decoded(row.try_get::<Option<bool>, _>(idx), name, JsonValue::Bool)
            }
            TypeCategory::Float | TypeCategory::Decimal => {
                decoded(row.try_get::<Option<f64>, _>(idx), name, float_value)
            }
            TypeCategory::Binary => decoded(row.try_get::<Option<Vec<u8>>, _>(idx), name, |v| {
                encode_binary_value(&v)
            }),
            TypeCategory::Json => decoded(row.try_get::<Option<String>, _>(idx), name, |v| {
                serde_json::from_str(&v).unwrap_or(JsonValue::String(v))
            }),
            _ => decode_dynamic(row, idx, name),
        }
    }

    /// Columns without a usable declared type (expressions, untyped columns)
    /// are decoded by trying the storage classes in turn.
    fn decode_dynamic(row: &SqliteRow, idx: usize, name: &str) -> JsonValue {
        if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(idx) {
            if let Ok(Some(i)) = row.try_get::<Option<i64>, _>(idx) {
                return JsonValue::Number(i.into());
            }
            if let Ok(Some(f)) = row.try_get::<Option<f64>, _>(idx) {
                return float_value(f);
            }
            return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
        }
        decoded(row.try_get::<Option<Vec<u8>>, _>(idx), name, |v| {
            encode_binary_value(&v)
        })
    }
}
