//! Typed column construction

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use chrono::{NaiveDate, NaiveDateTime};

use super::TransformError;
use crate::schema::{ColumnSpec, ColumnType};

/// Accepted date/time layouts, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Cast every value of a declared column; the first bad value aborts
pub(crate) fn cast_column<'a>(
    spec: &ColumnSpec,
    values: impl Iterator<Item = &'a str>,
) -> Result<ArrayRef, TransformError> {
    match spec.column_type {
        ColumnType::String => {
            let values = collect(spec, values, |v| Ok(v))?;
            Ok(Arc::new(StringArray::from(values)))
        }
        ColumnType::Int64 => {
            let values = collect(spec, values, parse_int)?;
            Ok(Arc::new(Int64Array::from(values)))
        }
        ColumnType::Float64 => {
            let values = collect(spec, values, parse_float)?;
            Ok(Arc::new(Float64Array::from(values)))
        }
        ColumnType::Timestamp => {
            let values = collect(spec, values, parse_timestamp)?;
            Ok(Arc::new(TimestampMicrosecondArray::from(values)))
        }
    }
}

fn collect<'a, T>(
    spec: &ColumnSpec,
    values: impl Iterator<Item = &'a str>,
    parse: impl Fn(&'a str) -> Result<T, String>,
) -> Result<Vec<Option<T>>, TransformError> {
    // int64 columns never hold nulls
    let nullable = !spec.required && spec.column_type != ColumnType::Int64;
    let mut out = Vec::new();
    for (row, value) in values.enumerate() {
        // text is kept verbatim, so only a truly empty field is missing
        let missing = match spec.column_type {
            ColumnType::String => value.is_empty(),
            _ => value.trim().is_empty(),
        };
        if missing {
            if nullable {
                out.push(None);
                continue;
            }
            return Err(cast_error(spec, row, value, "missing value".to_string()));
        }
        match parse(value) {
            Ok(v) => out.push(Some(v)),
            Err(reason) => return Err(cast_error(spec, row, value, reason)),
        }
    }
    Ok(out)
}

fn cast_error(spec: &ColumnSpec, row: usize, value: &str, reason: String) -> TransformError {
    TransformError::Cast {
        column: spec.name.clone(),
        row: row + 1,
        value: value.to_string(),
        reason,
    }
}

pub(crate) fn parse_int(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if !f.is_finite() => Err("not a finite number".to_string()),
        Ok(f) if f.fract() != 0.0 => Err("fractional value in integer column".to_string()),
        Ok(f) if f < i64::MIN as f64 || f >= i64::MAX as f64 => {
            Err("out of range for int64".to_string())
        }
        Ok(f) => Ok(f as i64),
        Err(_) => Err("not a number".to_string()),
    }
}

pub(crate) fn parse_float(value: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| "not a number".to_string())
}

pub(crate) fn parse_timestamp(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    let parsed = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| "not a recognized date/time".to_string())?;

    Ok(parsed.and_utc().timestamp_micros())
}

/// Pick int64, float64 or string for an undeclared column from its values
pub(crate) fn infer_column<'a>(values: impl Iterator<Item = &'a str> + Clone) -> ArrayRef {
    let non_empty = || values.clone().filter(|v| !v.trim().is_empty());
    let any = non_empty().next().is_some();

    let as_option = |v: &'a str| -> Option<&'a str> {
        if v.trim().is_empty() { None } else { Some(v) }
    };

    if any && non_empty().all(|v| v.trim().parse::<i64>().is_ok()) {
        let ints: Vec<Option<i64>> = values
            .map(|v| as_option(v).and_then(|v| v.trim().parse().ok()))
            .collect();
        return Arc::new(Int64Array::from(ints));
    }

    if any && non_empty().all(|v| v.trim().parse::<f64>().is_ok()) {
        let floats: Vec<Option<f64>> = values
            .map(|v| as_option(v).and_then(|v| v.trim().parse().ok()))
            .collect();
        return Arc::new(Float64Array::from(floats));
    }

    string_column(values)
}

/// Keep an undeclared column as text
pub(crate) fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    let strings: Vec<Option<&str>> = values
        .map(|v| if v.is_empty() { None } else { Some(v) })
        .collect();
    Arc::new(StringArray::from(strings))
}
