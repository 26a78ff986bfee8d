//! Helpers for tidying a frame before it is loaded.

use chrono::NaiveDate;

use crate::libs::error::SchemaError;
use crate::libs::frame::{Cell, Column, Frame, SourceTag};

pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Text columns only: nulls become empty strings, values are trimmed and a
/// literal `Null` is blanked.
pub fn basic_clean(frame: &Frame) -> Frame {
    let columns = frame.columns().iter().map(|column| {
        if column.tag() == SourceTag::Text {
            let cells = column
                .values()
                .iter()
                .map(|cell| match cell {
                    Cell::Text(s) if s.trim() == "Null" => Cell::Text(String::new()),
                    Cell::Text(s) => Cell::Text(s.trim().to_string()),
                    _ => Cell::Text(String::new()),
                })
                .collect();
            Column::from_parts(column.name(), SourceTag::Text, cells)
        } else {
            column.clone()
        }
    });
    Frame::from_columns(columns.collect())
}

/// Parse `YYYY/MM/DD` text in each named column into midnight timestamps.
/// Blank cells become nulls.
pub fn conv_date_format(frame: &Frame, columns: &[&str]) -> Result<Frame, SchemaError> {
    for name in columns {
        frame.position(name)?;
    }

    let mut converted = Vec::with_capacity(frame.width());
    for column in frame.clone().into_columns() {
        if !columns.contains(&column.name()) || column.tag() == SourceTag::Temporal {
            converted.push(column);
            continue;
        }
        if column.tag() != SourceTag::Text {
            return Err(SchemaError::CellTypeMismatch {
                column: column.name().to_string(),
                tag: column.tag(),
                value: "a non-text column".to_string(),
            });
        }
        let cells = column
            .values()
            .iter()
            .map(|cell| parse_date(column.name(), cell))
            .collect::<Result<Vec<_>, _>>()?;
        converted.push(Column::new(column.name(), SourceTag::Temporal, cells)?);
    }
    Ok(Frame::from_columns(converted))
}

fn parse_date(column: &str, cell: &Cell) -> Result<Cell, SchemaError> {
    if cell.is_missing() {
        return Ok(Cell::Null);
    }
    let Cell::Text(s) = cell else {
        return Ok(cell.clone());
    };
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Cell::Timestamp)
        .ok_or_else(|| SchemaError::CellTypeMismatch {
            column: column.to_string(),
            tag: SourceTag::Temporal,
            value: s.clone(),
        })
}

/// Piece `index` of `value` split on `delimiter`, counting from the end when
/// negative. Values that do not split yield `replacement`; an index past
/// either end yields `value` unchanged.
pub fn split_field(value: &str, delimiter: &str, index: isize, replacement: &str) -> String {
    if delimiter.is_empty() {
        return value.to_string();
    }
    let parts: Vec<&str> = value.split(delimiter).collect();
    if parts.len() <= 1 {
        return replacement.to_string();
    }
    let resolved = if index < 0 {
        parts.len().checked_sub(index.unsigned_abs())
    } else {
        Some(index as usize)
    };
    resolved
        .and_then(|i| parts.get(i))
        .map_or_else(|| value.to_string(), |p| p.to_string())
}

/// Move `target` so that it sits directly before `adjacent`.
pub fn rearrange_col(frame: &Frame, target: &str, adjacent: &str) -> Result<Frame, SchemaError> {
    let mut columns = frame.clone().into_columns();
    let from = frame.position(target)?;
    frame.position(adjacent)?;

    let moved = columns.remove(from);
    let to = columns
        .iter()
        .position(|c| c.name() == adjacent)
        .unwrap_or(columns.len());
    columns.insert(to, moved);
    Ok(Frame::from_columns(columns))
}
