// src/coverage/validator.rs

use std::fmt;

use chrono::NaiveDate;

use crate::coverage::panel::{Panel, PanelLookup, SeriesField};

/// Inclusive date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} and {}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageStatus {
    Ok,
    Missing,
    OutOfRange,
    LowCoverage,
}

/// Verdict for one requested `(series, field)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub pair: SeriesField,
    pub status: CoverageStatus,
    /// Share of non-null values among in-range rows, when computed.
    pub coverage_ratio: Option<f64>,
    pub range: DateRange,
}

impl CoverageReport {
    fn new(pair: &SeriesField, status: CoverageStatus, ratio: Option<f64>, range: DateRange) -> Self {
        Self {
            pair: pair.clone(),
            status,
            coverage_ratio: ratio,
            range,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CoverageStatus::Ok
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let SeriesField { series, field } = &self.pair;
        match self.status {
            CoverageStatus::Ok => write!(
                f,
                "ok ({:.1}%) for series='{series}', field='{field}'",
                self.coverage_ratio.unwrap_or(1.0) * 100.0
            ),
            CoverageStatus::Missing => {
                write!(f, "series missing from result: series='{series}', field='{field}'")
            }
            CoverageStatus::OutOfRange => write!(
                f,
                "no rows in requested date range for series='{series}', field='{field}' between {}",
                self.range
            ),
            CoverageStatus::LowCoverage => write!(
                f,
                "low coverage ({:.1}%) for series='{series}', field='{field}' between {}",
                self.coverage_ratio.unwrap_or(0.0) * 100.0,
                self.range
            ),
        }
    }
}

/// Audit `panel` for every requested pair.
///
/// Never fails: problems are reported, not raised, and the caller keeps
/// using the panel as pulled.
pub fn validate(
    panel: &Panel,
    requested: &[SeriesField],
    range: &DateRange,
    threshold: f64,
) -> Vec<CoverageReport> {
    let lookup = PanelLookup::new(panel);

    if lookup.row_count() == 0 {
        return requested
            .iter()
            .map(|pair| CoverageReport::new(pair, CoverageStatus::Missing, None, *range))
            .collect();
    }

    let in_range: Vec<usize> = lookup
        .dates()
        .iter()
        .enumerate()
        .filter_map(|(i, date)| date.filter(|d| range.contains(*d)).map(|_| i))
        .collect();

    requested
        .iter()
        .map(|pair| {
            let Some(column) = lookup.column(pair) else {
                return CoverageReport::new(pair, CoverageStatus::Missing, None, *range);
            };

            if in_range.is_empty() {
                return CoverageReport::new(pair, CoverageStatus::OutOfRange, None, *range);
            }

            let non_null = in_range
                .iter()
                .filter(|&&row| column.cells.get(row).is_some_and(|c| !c.is_null()))
                .count();
            let ratio = non_null as f64 / in_range.len() as f64;

            let status = if ratio < threshold {
                CoverageStatus::LowCoverage
            } else {
                CoverageStatus::Ok
            };
            CoverageReport::new(pair, status, Some(ratio), *range)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::DEFAULT_THRESHOLD;
    use crate::coverage::panel::{Cell, ColumnLabel};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn four_days() -> Vec<Option<NaiveDate>> {
        ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"]
            .iter()
            .map(|s| Some(d(s)))
            .collect()
    }

    fn range() -> DateRange {
        DateRange::new(d("2024-01-01"), d("2024-01-04"))
    }

    fn statuses(reports: &[CoverageReport]) -> Vec<CoverageStatus> {
        reports.iter().map(|r| r.status).collect()
    }

    #[test]
    fn ten_pairs_yield_seven_ok_two_low_one_missing() {
        let mut panel = Panel::indexed(four_days());
        let mut requested = Vec::new();

        for i in 0..7 {
            let series = format!("FULL{i}");
            panel = panel.with_values(
                ColumnLabel::flat(format!("{series}_PX_LAST")),
                vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            );
            requested.push(SeriesField::new(series, "PX_LAST"));
        }
        for i in 0..2 {
            let series = format!("HALF{i}");
            panel = panel.with_values(
                ColumnLabel::pair(series.clone(), "PX_LAST"),
                vec![Some(1.0), None, Some(3.0), None],
            );
            requested.push(SeriesField::new(series, "PX_LAST"));
        }
        requested.push(SeriesField::new("ABSENT", "PX_LAST"));

        let reports = validate(&panel, &requested, &range(), DEFAULT_THRESHOLD);
        let count = |s| reports.iter().filter(|r| r.status == s).count();

        assert_eq!(reports.len(), 10);
        assert_eq!(count(CoverageStatus::Ok), 7);
        assert_eq!(count(CoverageStatus::LowCoverage), 2);
        assert_eq!(count(CoverageStatus::Missing), 1);

        let half = reports.iter().find(|r| r.pair.series == "HALF0").unwrap();
        assert_eq!(half.coverage_ratio, Some(0.5));
    }

    #[test]
    fn empty_panel_reports_every_pair_missing() {
        let panel = Panel::indexed(Vec::new()).with_values(ColumnLabel::flat("A_X"), Vec::new());
        let requested = vec![SeriesField::new("A", "X"), SeriesField::new("B", "X")];

        let reports = validate(&panel, &requested, &range(), DEFAULT_THRESHOLD);
        assert_eq!(statuses(&reports), vec![CoverageStatus::Missing; 2]);
    }

    #[test]
    fn rows_outside_range_are_out_of_range() {
        let panel = Panel::indexed(four_days())
            .with_values(ColumnLabel::flat("A_X"), vec![Some(1.0); 4]);
        let later = DateRange::new(d("2025-01-01"), d("2025-12-31"));

        let reports = validate(&panel, &[SeriesField::new("A", "X")], &later, DEFAULT_THRESHOLD);
        assert_eq!(statuses(&reports), vec![CoverageStatus::OutOfRange]);
        assert_eq!(reports[0].coverage_ratio, None);
    }

    #[test]
    fn missing_column_wins_over_out_of_range() {
        let panel = Panel::indexed(four_days())
            .with_values(ColumnLabel::flat("A_X"), vec![Some(1.0); 4]);
        let later = DateRange::new(d("2025-01-01"), d("2025-12-31"));

        let reports = validate(&panel, &[SeriesField::new("B", "X")], &later, DEFAULT_THRESHOLD);
        assert_eq!(statuses(&reports), vec![CoverageStatus::Missing]);
    }

    #[test]
    fn range_bounds_are_inclusive_and_restrict_the_ratio() {
        // Only the first two days are in range, both populated.
        let panel = Panel::indexed(four_days())
            .with_values(ColumnLabel::flat("A_X"), vec![Some(1.0), Some(2.0), None, None]);
        let first_two = DateRange::new(d("2024-01-01"), d("2024-01-02"));

        let reports = validate(&panel, &[SeriesField::new("A", "X")], &first_two, DEFAULT_THRESHOLD);
        assert_eq!(statuses(&reports), vec![CoverageStatus::Ok]);
        assert_eq!(reports[0].coverage_ratio, Some(1.0));
    }

    #[test]
    fn ratio_equal_to_threshold_is_ok() {
        let panel = Panel::indexed(four_days())
            .with_values(ColumnLabel::flat("A_X"), vec![Some(1.0), None, Some(3.0), None]);

        let reports = validate(&panel, &[SeriesField::new("A", "X")], &range(), 0.5);
        assert_eq!(statuses(&reports), vec![CoverageStatus::Ok]);
    }

    #[test]
    fn long_panel_uses_its_date_column() {
        let panel = Panel::long("date")
            .with_column(
                ColumnLabel::flat("date"),
                vec![
                    Cell::Text("2024-01-01".into()),
                    Cell::Text("2024-01-02".into()),
                    Cell::Text("garbage".into()),
                ],
            )
            .with_values(ColumnLabel::flat("A_X"), vec![None, Some(2.0), Some(3.0)]);

        let reports = validate(&panel, &[SeriesField::new("A", "X")], &range(), DEFAULT_THRESHOLD);
        // The undated third row is out of range, leaving 1 of 2 populated.
        assert_eq!(statuses(&reports), vec![CoverageStatus::LowCoverage]);
        assert_eq!(reports[0].coverage_ratio, Some(0.5));
    }

    #[test]
    fn nan_counts_as_null() {
        let panel = Panel::indexed(four_days()).with_column(
            ColumnLabel::flat("A_X"),
            vec![Cell::Number(f64::NAN); 4],
        );

        let reports = validate(&panel, &[SeriesField::new("A", "X")], &range(), DEFAULT_THRESHOLD);
        assert_eq!(statuses(&reports), vec![CoverageStatus::LowCoverage]);
        assert_eq!(reports[0].coverage_ratio, Some(0.0));
    }
}
