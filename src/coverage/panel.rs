// src/coverage/panel.rs

//! In-memory panel of time-series columns, as produced by a pull.
//!
//! Two shapes are supported:
//! - date-indexed: the row dates live outside the columns;
//! - long: one of the columns holds the row dates.
//!
//! Column labels are either flat strings (`"{series}_{field}"`) or a
//! two-level `(series, field)` pair. [`PanelLookup`] normalizes all of this
//! into one lookup.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::{PipedagError, Result};

/// One requested `(series, field)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesField {
    pub series: String,
    pub field: String,
}

impl SeriesField {
    pub fn new(series: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            field: field.into(),
        }
    }

    /// Flat column name under the `"{series}_{field}"` convention.
    pub fn flat_name(&self) -> String {
        format!("{}_{}", self.series, self.field)
    }
}

/// Every combination of `series × fields`, series-major.
pub fn pairs(series: &[String], fields: &[String]) -> Vec<SeriesField> {
    series
        .iter()
        .flat_map(|s| fields.iter().map(move |f| SeriesField::new(s.clone(), f.clone())))
        .collect()
}

/// Column label as found in the panel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnLabel {
    Flat(String),
    Pair(String, String),
}

impl ColumnLabel {
    pub fn flat(name: impl Into<String>) -> Self {
        ColumnLabel::Flat(name.into())
    }

    pub fn pair(series: impl Into<String>, field: impl Into<String>) -> Self {
        ColumnLabel::Pair(series.into(), field.into())
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// `NaN` counts as null, like a pandas float column.
    pub fn is_null(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Number(n) => n.is_nan(),
            Cell::Text(_) => false,
        }
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
            Value::String(s) => Cell::Text(s.clone()),
            Value::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Interpret the cell as a date: ISO `YYYY-MM-DD[...]` text or epoch
    /// milliseconds. Anything else is `None`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Text(s) => parse_date_str(s),
            Cell::Number(ms) if ms.is_finite() => {
                DateTime::from_timestamp_millis(*ms as i64).map(|dt| dt.date_naive())
            }
            _ => None,
        }
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Where the row dates come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DateSource {
    /// Date-indexed panel: one (possibly unparseable) date per row.
    Index(Vec<Option<NaiveDate>>),
    /// Long panel: dates are held in the named flat column.
    Column(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: ColumnLabel,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    dates: DateSource,
    columns: Vec<Column>,
}

impl Panel {
    /// Empty date-indexed panel with the given row dates.
    pub fn indexed(dates: Vec<Option<NaiveDate>>) -> Self {
        Self {
            dates: DateSource::Index(dates),
            columns: Vec::new(),
        }
    }

    /// Empty long panel whose dates live in `date_column`.
    pub fn long(date_column: impl Into<String>) -> Self {
        Self {
            dates: DateSource::Column(date_column.into()),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, label: ColumnLabel, cells: Vec<Cell>) -> Self {
        self.columns.push(Column { label, cells });
        self
    }

    /// Convenience for numeric columns where `None` is a missing value.
    pub fn with_values(self, label: ColumnLabel, values: Vec<Option<f64>>) -> Self {
        let cells = values
            .into_iter()
            .map(|v| v.map(Cell::Number).unwrap_or(Cell::Null))
            .collect();
        self.with_column(label, cells)
    }

    /// Number of rows. For long panels this is the longest column.
    pub fn row_count(&self) -> usize {
        match &self.dates {
            DateSource::Index(dates) => dates.len(),
            DateSource::Column(_) => self.columns.iter().map(|c| c.cells.len()).max().unwrap_or(0),
        }
    }

    /// Parse a pandas `DataFrame.to_json(orient="split")` document.
    ///
    /// With `date_column = None` the `index` array provides the dates;
    /// otherwise the named column does and the index is ignored. `data`
    /// decides the row count: rows without an index entry are undated.
    pub fn from_split_json(text: &str, date_column: Option<&str>) -> Result<Self> {
        #[derive(Deserialize)]
        struct SplitFrame {
            columns: Vec<ColumnLabel>,
            #[serde(default)]
            index: Vec<Value>,
            data: Vec<Vec<Value>>,
        }

        let frame: SplitFrame = serde_json::from_str(text)?;
        let width = frame.columns.len();

        for (row, values) in frame.data.iter().enumerate() {
            if values.len() != width {
                return Err(PipedagError::PanelError(format!(
                    "panel row {row} has {} values but there are {width} columns",
                    values.len()
                )));
            }
        }

        let mut panel = match date_column {
            Some(name) => Panel::long(name),
            None => {
                if frame.index.len() != frame.data.len() {
                    warn!(
                        index_len = frame.index.len(),
                        rows = frame.data.len(),
                        "panel index length differs from row count"
                    );
                }
                Panel::indexed(
                    (0..frame.data.len())
                        .map(|row| {
                            frame
                                .index
                                .get(row)
                                .and_then(|v| Cell::from_json(v).as_date())
                        })
                        .collect(),
                )
            }
        };

        for (col, label) in frame.columns.into_iter().enumerate() {
            let cells = frame.data.iter().map(|row| Cell::from_json(&row[col])).collect();
            panel = panel.with_column(label, cells);
        }

        Ok(panel)
    }
}

/// Normalized view of a [`Panel`]: row dates plus a `(series, field)` lookup
/// that understands both naming conventions.
#[derive(Debug)]
pub struct PanelLookup<'a> {
    dates: Vec<Option<NaiveDate>>,
    flat: HashMap<&'a str, &'a Column>,
    pairs: HashMap<(String, String), &'a Column>,
}

impl<'a> PanelLookup<'a> {
    pub fn new(panel: &'a Panel) -> Self {
        let date_column = match &panel.dates {
            DateSource::Column(name) => Some(name.as_str()),
            DateSource::Index(_) => None,
        };

        let mut flat = HashMap::new();
        let mut pairs = HashMap::new();
        let mut date_cells: Option<&Column> = None;

        for column in &panel.columns {
            match &column.label {
                ColumnLabel::Flat(name) if Some(name.as_str()) == date_column => {
                    date_cells = Some(column);
                }
                ColumnLabel::Flat(name) => {
                    flat.entry(name.as_str()).or_insert(column);
                }
                ColumnLabel::Pair(series, field) => {
                    pairs.entry((series.clone(), field.clone())).or_insert(column);
                }
            }
        }

        let rows = panel.row_count();
        let dates = match &panel.dates {
            DateSource::Index(dates) => dates.clone(),
            DateSource::Column(name) => match date_cells {
                Some(col) => (0..rows)
                    .map(|i| col.cells.get(i).and_then(Cell::as_date))
                    .collect(),
                None => {
                    warn!(date_column = %name, "date column not found in panel; no row is dated");
                    vec![None; rows]
                }
            },
        };

        Self { dates, flat, pairs }
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn dates(&self) -> &[Option<NaiveDate>] {
        &self.dates
    }

    /// Find the column for `pair`, trying the two-level label first and the
    /// flat `"{series}_{field}"` name second.
    pub fn column(&self, pair: &SeriesField) -> Option<&'a Column> {
        self.pairs
            .get(&(pair.series.clone(), pair.field.clone()))
            .or_else(|| self.flat.get(pair.flat_name().as_str()))
            .copied()
    }
}
