//! Macroeconomic indicator tables read from CSV (ifo business climate)

use crate::error::{DataLoadError, Result};
use crate::metrics::parse_number;
use crate::period::Period;
use comfy_table::{CellAlignment, Table, presets};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, instrument};

/// One dated row of indicator values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroRow {
    pub period: Period,
    pub values: Vec<Option<f64>>,
}

/// Dated rows with named indicator columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSeries {
    index_name: String,
    columns: Vec<String>,
    rows: Vec<MacroRow>,
}

impl MacroSeries {
    /// Assemble a series; every row must have one value per column
    pub fn new(index_name: impl Into<String>, columns: Vec<String>, rows: Vec<MacroRow>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.values.resize(width, None);
                row
            })
            .collect();
        Self {
            index_name: index_name.into(),
            columns,
            rows,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[MacroRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, compared case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name.trim()))
    }

    /// `(period, value)` pairs of one column in file order
    pub fn column(&self, index: usize) -> impl Iterator<Item = (&Period, Option<f64>)> {
        self.rows
            .iter()
            .map(move |row| (&row.period, row.values.get(index).copied().flatten()))
    }

    /// Fixed-width text rendering with the period index as first column
    pub fn to_text_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(presets::NOTHING);

        let mut header = vec![self.index_name.clone()];
        header.extend(self.columns.iter().cloned());
        table.set_header(header);

        for row in &self.rows {
            let mut cells = vec![row.period.label().to_string()];
            cells.extend(row.values.iter().map(|v| match v {
                Some(n) => format_value(*n),
                None => "-".to_string(),
            }));
            table.add_row(cells);
        }

        for index in 1..=self.columns.len() {
            if let Some(column) = table.column_mut(index) {
                column.set_cell_alignment(CellAlignment::Right);
            }
        }

        table.to_string()
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        let text = format!("{value:.4}");
        text.trim_end_matches('0').to_string()
    }
}

/// Pick `;` when the header line carries more semicolons than commas
fn sniff_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas { b';' } else { b',' }
}

/// Read a macro indicator CSV
///
/// The first column holds the period; every other column is an indicator.
/// Rows whose period does not parse are skipped.
#[instrument]
pub fn load_macro_series(path: &Path) -> Result<MacroSeries> {
    let file = File::open(path).map_err(|e| DataLoadError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut header_line = String::new();
    reader
        .read_line(&mut header_line)
        .map_err(|e| DataLoadError::io(path, e))?;
    let header_line = header_line.trim_start_matches('\u{feff}').to_string();
    if header_line.trim().is_empty() {
        return Err(DataLoadError::malformed(path, "missing header row"));
    }

    let delimiter = sniff_delimiter(&header_line);
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(header_line.as_bytes().chain(reader));

    let headers = csv_reader
        .headers()
        .map_err(|source| DataLoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let index_name = headers.get(0).unwrap_or_default().to_string();
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    if columns.is_empty() {
        return Err(DataLoadError::malformed(path, "no indicator columns"));
    }

    let mut rows = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|source| DataLoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let Some(period) = record.get(0).and_then(Period::parse) else {
            debug!(line = line + 2, "skipping row without a recognised period");
            continue;
        };

        let values = (1..=columns.len())
            .map(|i| record.get(i).and_then(parse_number))
            .collect();
        rows.push(MacroRow { period, values });
    }

    if rows.is_empty() {
        return Err(DataLoadError::malformed(path, "no dated rows"));
    }

    debug!(
        rows = rows.len(),
        columns = columns.len(),
        delimiter = %char::from(delimiter),
        "loaded macro series"
    );
    Ok(MacroSeries::new(index_name, columns, rows))
}
