use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Number, Value};
use sqlx::postgres::PgRow;
use sqlx::postgres::types::PgInterval;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use super::DbError;

/// One result row: column name → JSON value, in the column order of the query.
pub type Row = Map<String, Value>;

pub fn row_to_json(row: &PgRow) -> Result<Row, DbError> {
    let mut out = Row::with_capacity(row.columns().len());

    for column in row.columns() {
        let value = cell_to_json(row, column.ordinal(), column.type_info().name()).map_err(
            |message| DbError::Decode {
                column: column.name().to_string(),
                message,
            },
        )?;
        out.insert(column.name().to_string(), value);
    }

    Ok(out)
}

fn cell_to_json(row: &PgRow, idx: usize, pg_type_name: &str) -> Result<Value, String> {
    let raw = row.try_get_raw(idx).map_err(|e| e.to_string())?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    fn get<'r, T>(row: &'r PgRow, idx: usize) -> Result<T, String>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get::<T, _>(idx).map_err(|e| e.to_string())
    }

    let value = match pg_type_name {
        "BOOL" => Value::Bool(get::<bool>(row, idx)?),
        "INT2" => Value::from(get::<i16>(row, idx)?),
        "INT4" => Value::from(get::<i32>(row, idx)?),
        "INT8" => Value::from(get::<i64>(row, idx)?),
        "FLOAT4" => float_to_json(f64::from(get::<f32>(row, idx)?)),
        "FLOAT8" => float_to_json(get::<f64>(row, idx)?),
        "NUMERIC" => decimal_to_json(get::<Decimal>(row, idx)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::String(get::<String>(row, idx)?),
        "DATE" => to_json(get::<NaiveDate>(row, idx)?)?,
        "TIME" => to_json(get::<NaiveTime>(row, idx)?)?,
        "TIMESTAMP" => to_json(get::<NaiveDateTime>(row, idx)?)?,
        "TIMESTAMPTZ" => to_json(get::<DateTime<Utc>>(row, idx)?)?,
        "INTERVAL" => interval_to_json(&get::<PgInterval>(row, idx)?),
        "JSON" | "JSONB" => get::<Value>(row, idx)?,
        "BOOL[]" => array_to_json(get::<Vec<Option<bool>>>(row, idx)?, Value::Bool),
        "INT2[]" => array_to_json(get::<Vec<Option<i16>>>(row, idx)?, Value::from),
        "INT4[]" => array_to_json(get::<Vec<Option<i32>>>(row, idx)?, Value::from),
        "INT8[]" => array_to_json(get::<Vec<Option<i64>>>(row, idx)?, Value::from),
        "FLOAT4[]" => array_to_json(get::<Vec<Option<f32>>>(row, idx)?, |v| {
            float_to_json(f64::from(v))
        }),
        "FLOAT8[]" => array_to_json(get::<Vec<Option<f64>>>(row, idx)?, float_to_json),
        "NUMERIC[]" => array_to_json(get::<Vec<Option<Decimal>>>(row, idx)?, decimal_to_json),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            array_to_json(get::<Vec<Option<String>>>(row, idx)?, Value::String)
        }
        other => return Err(format!("unsupported column type {other}")),
    };

    Ok(value)
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn float_to_json(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Total seconds, counting a month as 30 days. Sub-second parts are kept.
fn interval_to_json(interval: &PgInterval) -> Value {
    let days = i64::from(interval.months) * 30 + i64::from(interval.days);
    let micros = days * 86_400_000_000 + interval.microseconds;
    float_to_json(micros as f64 / 1_000_000.0)
}

/// NULL elements stay `null`.
fn array_to_json<T>(items: Vec<Option<T>>, element: impl Fn(T) -> Value) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| item.map_or(Value::Null, &element))
            .collect(),
    )
}

/// Whole NUMERIC values (e.g. `SUM(bigint)`) become JSON integers, the rest floats.
pub fn decimal_to_json(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(whole) = value.to_i64() {
            return Value::from(whole);
        }
    }

    value
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}
