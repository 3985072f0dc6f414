use serde_json::Value;

use crate::models::export::{
    BaqRow, ColumnSource, ColumnSpec, ExportKind, ExportProfile, ExportRecord, FieldFormat, FieldValue,
};
use crate::utils::error_handling::{AppError, Result};
use crate::utils::value_parsing::{parse_decimal, parse_flexible_date};

/// Map every BAQ row, failing on the first row that does not fit the profile
pub fn map_rows(kind: ExportKind, profile: &ExportProfile, rows: &[BaqRow]) -> Result<Vec<ExportRecord>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            map_row(kind, profile, row).map_err(|e| match e {
                AppError::InvalidData(message) => {
                    AppError::InvalidData(format!("{} row {}: {}", kind, index + 1, message))
                }
                other => other,
            })
        })
        .collect()
}

pub fn map_row(kind: ExportKind, profile: &ExportProfile, row: &BaqRow) -> Result<ExportRecord> {
    let values = profile
        .columns
        .iter()
        .map(|column| map_column(kind, column, row))
        .collect::<Result<Vec<_>>>()?;

    Ok(ExportRecord { values })
}

fn map_column(kind: ExportKind, column: &ColumnSpec, row: &BaqRow) -> Result<FieldValue> {
    let raw = match column.source {
        ColumnSource::Blank => return Ok(FieldValue::Empty),
        ColumnSource::Required(name) => match row.get(name) {
            Some(value) => scalar_text(name, value)?,
            None => {
                return Err(AppError::MissingColumn {
                    export: kind.to_string(),
                    column: name.to_string(),
                })
            }
        },
        ColumnSource::Optional(name) => match row.get(name) {
            Some(value) => scalar_text(name, value)?,
            None => None,
        },
    };

    let Some(text) = raw.filter(|t| !t.trim().is_empty()) else {
        if column.allow_empty {
            return Ok(FieldValue::Empty);
        }
        return Err(AppError::InvalidData(format!("{} is empty", column.label)));
    };

    match column.format {
        FieldFormat::Text => Ok(FieldValue::Text(text)),
        FieldFormat::Amount => parse_decimal(&text)
            .map(FieldValue::Amount)
            .ok_or_else(|| AppError::InvalidData(format!("{} '{}' is not a number", column.label, text))),
        FieldFormat::Date => parse_flexible_date(&text)
            .map(FieldValue::Date)
            .ok_or_else(|| AppError::InvalidData(format!("{} '{}' is not a date", column.label, text))),
    }
}

/// Textual form of a BAQ cell; `None` for null
fn scalar_text(column: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(AppError::InvalidData(format!(
            "column {} holds a nested value",
            column
        ))),
    }
}
