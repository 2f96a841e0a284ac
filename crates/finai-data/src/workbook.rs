//! Segment workbook extraction
//!
//! Each sheet named after a segment (display name or code) holds one metric
//! per row. The first row whose cells are mostly periods is the header; the
//! rows below it are `caption, value, value, ...`.

use crate::error::{DataLoadError, Result};
use crate::metrics::{MetricTable, MetricValue, SegmentMetrics, normalize_metric_name};
use crate::period::Period;
use calamine::{Data, DataType, Reader, open_workbook_auto};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Maps sheet names onto segment display names
#[derive(Debug, Clone, Default)]
pub struct SheetMatcher {
    aliases: Vec<(String, String)>,
}

impl SheetMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept sheets named `code` or `display_name`, case-insensitively
    pub fn with_segment(mut self, code: &str, display_name: &str) -> Self {
        for alias in [code, display_name] {
            self.aliases
                .push((alias.trim().to_lowercase(), display_name.to_string()));
        }
        self
    }

    /// Display name of the segment a sheet belongs to
    pub fn resolve(&self, sheet_name: &str) -> Option<&str> {
        let wanted = sheet_name.trim().to_lowercase();
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == wanted)
            .map(|(_, display)| display.as_str())
    }
}

/// Workbook cell reduced to what metric extraction needs
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::String(s) if s.trim().is_empty() => Self::Empty,
            Data::String(s) => Self::Text(s.trim().to_string()),
            Data::Bool(b) => Self::Text(b.to_string()),
            Data::DateTime(_) | Data::DateTimeIso(_) => {
                data.as_date().map_or(Self::Empty, Self::Date)
            }
            Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Error(_) | Data::Empty => Self::Empty,
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    fn as_period(&self) -> Option<Period> {
        match self {
            Self::Number(n) if n.fract() == 0.0 => Period::parse(&format!("{n:.0}")),
            Self::Text(text) => Period::parse(text),
            Self::Date(date) => Some(Period::from_date(*date)),
            Self::Number(_) | Self::Empty => None,
        }
    }

    fn as_value(&self) -> Option<MetricValue> {
        match self {
            Self::Number(n) => Some(MetricValue::Number(*n)),
            Self::Text(text) => Some(MetricValue::Text(text.clone())),
            Self::Date(date) => Some(MetricValue::Text(date.to_string())),
            Self::Empty => None,
        }
    }
}

/// Period per column of a header row, when the row qualifies as a header
fn header_periods(row: &[Cell]) -> Option<Vec<Option<Period>>> {
    let cells = row.get(1..)?;
    let filled = cells.iter().filter(|c| !c.is_empty()).count();
    let periods: Vec<Option<Period>> = cells.iter().map(Cell::as_period).collect();
    let found = periods.iter().flatten().count();

    (found > 0 && found * 2 >= filled).then_some(periods)
}

/// Flatten one sheet's rows into metric series
///
/// Rows above the header are ignored, as are rows without a caption or without
/// any value. A repeated caption replaces the earlier row.
pub fn flatten_sheet(rows: &[Vec<Cell>]) -> Option<SegmentMetrics> {
    let header_at = rows.iter().position(|row| header_periods(row).is_some())?;
    let header = header_periods(&rows[header_at])?;

    let mut metrics = SegmentMetrics::new();
    for row in &rows[header_at + 1..] {
        let Some(Cell::Text(caption)) = row.first() else {
            continue;
        };
        let key = normalize_metric_name(caption);
        if key.is_empty() {
            continue;
        }

        let series: crate::metrics::MetricSeries = header
            .iter()
            .enumerate()
            .filter_map(|(i, period)| {
                let period = period.as_ref()?;
                let value = row.get(i + 1)?.as_value()?;
                Some((period.clone(), value))
            })
            .collect();

        if !series.is_empty() {
            metrics.insert(key, series);
        }
    }

    Some(metrics)
}

/// Read every segment sheet of a workbook (`xlsx`, `xlsb`, `xls`, `ods`)
#[instrument(skip(matcher))]
pub fn extract_metrics(path: &Path, matcher: &SheetMatcher) -> Result<MetricTable> {
    std::fs::metadata(path).map_err(|e| DataLoadError::io(path, e))?;

    let workbook_error = |detail: String| DataLoadError::Workbook {
        path: path.to_path_buf(),
        detail,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(e.to_string()))?;

    let mut table = MetricTable::new();
    for sheet in workbook.sheet_names() {
        let Some(segment) = matcher.resolve(&sheet) else {
            debug!(sheet = %sheet, "skipping sheet without a segment");
            continue;
        };

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| workbook_error(format!("sheet '{sheet}': {e}")))?;
        let rows: Vec<Vec<Cell>> = range
            .rows()
            .map(|row| row.iter().map(Cell::from_data).collect())
            .collect();

        match flatten_sheet(&rows) {
            Some(metrics) => {
                debug!(sheet = %sheet, segment, metrics = metrics.len(), "extracted sheet");
                table.extend_segment(segment, metrics);
            }
            None => debug!(sheet = %sheet, "no period header row, sheet skipped"),
        }
    }

    info!(segments = table.len(), "workbook loaded");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn sheet() -> Vec<Vec<Cell>> {
        vec![
            vec![text("Investment Bank"), Cell::Empty, Cell::Empty],
            vec![text("in EUR m"), text("Q3 2024"), text("Q4 2024"), text("FY 2024 vs. 2023")],
            vec![text("Net revenues"), Cell::Number(2380.0), Cell::Number(2090.0), Cell::Empty],
            vec![Cell::Empty, Cell::Number(1.0), Cell::Number(2.0)],
            vec![text("Balance sheet"), Cell::Empty, Cell::Empty],
            vec![
                text("Provision for credit losses (in bps of average loans)"),
                Cell::Number(38.0),
                text("n.m."),
            ],
        ]
    }

    #[test]
    fn test_flatten_sheet() {
        let metrics = flatten_sheet(&sheet()).unwrap();

        assert_eq!(metrics.len(), 2);
        let revenues = &metrics["net_revenues"];
        let q4 = Period::parse("Q4 2024").unwrap();
        assert_eq!(revenues.get(&q4), Some(&MetricValue::Number(2090.0)));
        assert_eq!(revenues.len(), 2);

        let provisions = &metrics["provision_for_credit_losses_bps_avg_loans"];
        assert_eq!(
            provisions.get(&q4),
            Some(&MetricValue::Text("n.m.".to_string()))
        );
        assert!(!metrics.contains_key("balance_sheet"));
    }

    #[test]
    fn test_numeric_and_date_headers() {
        let rows = vec![
            vec![Cell::Empty, Cell::Number(2023.0), Cell::Number(2024.0)],
            vec![text("Loans"), Cell::Number(1.0), Cell::Number(2.0)],
        ];
        let metrics = flatten_sheet(&rows).unwrap();
        assert_eq!(metrics["loans"].len(), 2);

        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let rows = vec![
            vec![Cell::Empty, Cell::Date(date)],
            vec![text("Deposits"), Cell::Number(7.5)],
        ];
        let metrics = flatten_sheet(&rows).unwrap();
        assert_eq!(
            metrics["deposits"].get(&Period::from_date(date)),
            Some(&MetricValue::Number(7.5))
        );
    }

    #[test]
    fn test_sheet_without_header() {
        let rows = vec![vec![text("Notes"), text("see appendix")]];
        assert!(flatten_sheet(&rows).is_none());
        assert!(flatten_sheet(&[]).is_none());
    }

    #[test]
    fn test_sheet_matcher() {
        let matcher = SheetMatcher::new()
            .with_segment("IB", "Investment Bank")
            .with_segment("PB", "Private Bank");

        assert_eq!(matcher.resolve("ib"), Some("Investment Bank"));
        assert_eq!(matcher.resolve(" Private Bank "), Some("Private Bank"));
        assert_eq!(matcher.resolve("Cover"), None);
    }

    /// Workbook with a cover sheet, a quarterly `PB` sheet and an `IB` sheet
    /// whose header row holds real date cells
    fn write_workbook(path: &Path) {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();

        let cover = workbook.add_worksheet().set_name("Cover").unwrap();
        cover.write_string(0, 0, "Financial Data Supplement").unwrap();

        let pb = workbook.add_worksheet().set_name("PB").unwrap();
        pb.write_string(0, 0, "Private Bank").unwrap();
        for (col, label) in ["Q3 2024", "Q4 2024", "Q1 2025"].into_iter().enumerate() {
            pb.write_string(1, col as u16 + 1, label).unwrap();
        }
        pb.write_string(1, 0, "in EUR m").unwrap();
        pb.write_string(2, 0, "Net revenues").unwrap();
        for (col, value) in [2380.0, 2090.0, 2150.0].into_iter().enumerate() {
            pb.write_number(2, col as u16 + 1, value).unwrap();
        }
        pb.write_string(3, 0, "Cost/income ratio").unwrap();
        pb.write_number(3, 1, 71.5).unwrap();
        pb.write_string(3, 2, "n.m.").unwrap();

        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let ib = workbook.add_worksheet().set_name("Investment Bank").unwrap();
        ib.write_string(0, 0, "in EUR bn").unwrap();
        for (col, (month, day)) in [(9, 30), (12, 31)].into_iter().enumerate() {
            let date = ExcelDateTime::from_ymd(2024, month, day).unwrap();
            ib.write_datetime_with_format(0, col as u16 + 1, &date, &date_format)
                .unwrap();
        }
        ib.write_string(1, 0, "Deposits").unwrap();
        ib.write_number(1, 1, 7.5).unwrap();
        ib.write_number(1, 2, 8.0).unwrap();

        workbook.save(path).unwrap();
    }

    fn matcher() -> SheetMatcher {
        SheetMatcher::new()
            .with_segment("IB", "Investment Bank")
            .with_segment("PB", "Private Bank")
    }

    #[test]
    fn test_extract_metrics_from_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fds.xlsx");
        write_workbook(&path);

        let table = extract_metrics(&path, &matcher()).unwrap();
        assert_eq!(table.len(), 2);

        let revenues = table.series("Private Bank", "net_revenues").unwrap();
        let labels: Vec<&str> = revenues.periods().map(Period::label).collect();
        assert_eq!(labels, ["Q3 2024", "Q4 2024", "Q1 2025"]);
        assert_eq!(
            revenues.get(&Period::parse("Q1 2025").unwrap()),
            Some(&MetricValue::Number(2150.0))
        );

        let ratio = table.series("Private Bank", "cost_income_ratio").unwrap();
        assert_eq!(
            ratio.get(&Period::parse("Q4 2024").unwrap()),
            Some(&MetricValue::Text("n.m.".to_string()))
        );

        let deposits = table.series("Investment Bank", "deposits").unwrap();
        let year_end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(
            deposits.get(&Period::from_date(year_end)),
            Some(&MetricValue::Number(8.0))
        );
        assert_eq!(deposits.len(), 2);
    }

    #[test]
    fn test_extract_metrics_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fds.xlsx");
        write_workbook(&path);

        let first = extract_metrics(&path, &matcher()).unwrap();
        let second = extract_metrics(&path, &matcher()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_workbook() {
        let err = extract_metrics(Path::new("/nonexistent/fds.xlsb"), &SheetMatcher::new())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_corrupt_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();

        let err = extract_metrics(&path, &SheetMatcher::new()).unwrap_err();
        assert!(matches!(err, DataLoadError::Workbook { .. }));
    }
}
