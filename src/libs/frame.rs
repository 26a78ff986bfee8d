//! A small typed, column-oriented table used as the source of every
//! generated statement.
//!
//! Each column carries a [`SourceTag`] fixed when the column is built.
//! Cells are checked against the tag once, so nothing downstream has to
//! guess what a column holds.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::libs::error::SchemaError;

/// Classification of a column before it is mapped to a SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    Integer,
    Float,
    Text,
    Temporal,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Bool(bool),
}

impl Cell {
    pub fn tag(&self) -> Option<SourceTag> {
        match self {
            Cell::Null => None,
            Cell::Int(_) => Some(SourceTag::Integer),
            Cell::Float(_) => Some(SourceTag::Float),
            Cell::Text(_) => Some(SourceTag::Text),
            Cell::Timestamp(_) => Some(SourceTag::Temporal),
            Cell::Bool(_) => Some(SourceTag::Other),
        }
    }

    /// Null, or text that is blank once trimmed.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<i32> for Cell {
    fn from(v: i32) -> Self {
        Cell::Int(v.into())
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(v: NaiveDateTime) -> Self {
        Cell::Timestamp(v)
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Cell::Bool(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    tag: SourceTag,
    values: Vec<Cell>,
}

impl Column {
    pub fn new(name: &str, tag: SourceTag, values: Vec<Cell>) -> Result<Self, SchemaError> {
        if let Some(bad) = values.iter().find(|c| c.tag().is_some_and(|t| t != tag)) {
            return Err(SchemaError::CellTypeMismatch {
                column: name.to_string(),
                tag,
                value: format!("{bad:?}"),
            });
        }
        Ok(Self {
            name: name.to_string(),
            tag,
            values,
        })
    }

    /// Build a column from plain values, tagging it from the first non-null
    /// value. A column with no values at all is tagged `Text`.
    pub fn infer<T, I>(name: &str, values: I) -> Result<Self, SchemaError>
    where
        T: Into<Cell>,
        I: IntoIterator<Item = T>,
    {
        let values: Vec<Cell> = values.into_iter().map(Into::into).collect();
        let tag = values
            .iter()
            .find_map(Cell::tag)
            .unwrap_or(SourceTag::Text);
        Self::new(name, tag, values)
    }

    /// Caller guarantees every cell matches `tag`.
    pub(crate) fn from_parts(name: &str, tag: SourceTag, values: Vec<Cell>) -> Self {
        Self {
            name: name.to_string(),
            tag,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> SourceTag {
        self.tag
    }

    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|c| c.is_missing()).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: Column) -> Result<Self, SchemaError> {
        self.push_column(column)?;
        Ok(self)
    }

    pub fn push_column(&mut self, column: Column) -> Result<(), SchemaError> {
        // engines fold unquoted names, so `id` and `ID` collide
        if self
            .columns
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&column.name))
        {
            return Err(SchemaError::DuplicateColumn(column.name));
        }
        if let Some(first) = self.columns.first() {
            if first.len() != column.len() {
                let found = column.len();
                return Err(SchemaError::LengthMismatch {
                    column: column.name,
                    expected: first.len(),
                    found,
                });
            }
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn position(&self, name: &str) -> Result<usize, SchemaError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
    }

    /// Caller guarantees unique names and equal lengths.
    pub(crate) fn from_columns(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub(crate) fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn null_count(&self, name: &str) -> Option<usize> {
        self.column(name).map(Column::null_count)
    }

    /// Rows in order, each with one cell per column in column order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.len()).map(move |i| self.columns.iter().map(|c| &c.values[i]).collect())
    }

    /// Build a frame from JSON objects. Columns follow the order keys are
    /// first seen; a key missing from a record is a null.
    pub fn from_json_records(records: &[Value]) -> Result<Self, SchemaError> {
        let mut names: Vec<&str> = Vec::new();
        for record in records {
            let obj = record
                .as_object()
                .ok_or_else(|| SchemaError::InvalidRecord(record.to_string()))?;
            for key in obj.keys() {
                if !names.contains(&key.as_str()) {
                    names.push(key);
                }
            }
        }

        let mut frame = Frame::new();
        for name in names {
            let cells = records
                .iter()
                .map(|r| json_cell(name, r.get(name).unwrap_or(&Value::Null)))
                .collect::<Result<Vec<_>, _>>()?;
            frame.push_column(json_column(name, cells)?)?;
        }
        Ok(frame)
    }
}

fn json_cell(column: &str, value: &Value) -> Result<Cell, SchemaError> {
    match value {
        Value::Null => Ok(Cell::Null),
        Value::Bool(b) => Ok(Cell::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Cell::Int(i)),
            None => n
                .as_f64()
                .map(Cell::Float)
                .ok_or_else(|| SchemaError::InvalidRecord(format!("{column}: {n}"))),
        },
        Value::String(s) => Ok(Cell::Text(s.clone())),
        other => Err(SchemaError::InvalidRecord(format!("{column}: {other}"))),
    }
}

// Integers mixed with floats are widened to floats.
fn json_column(name: &str, mut cells: Vec<Cell>) -> Result<Column, SchemaError> {
    let has_float = cells.iter().any(|c| matches!(c, Cell::Float(_)));
    if has_float {
        for cell in cells.iter_mut() {
            if let Cell::Int(i) = *cell {
                *cell = Cell::Float(i as f64);
            }
        }
    }
    Column::infer(name, cells)
}
