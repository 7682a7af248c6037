//! Revenue reporting for the admin dashboard.
//!
//! The loosely typed chart query (`type`, `year`, `month`, `start`, `end`) is
//! resolved once into a [`ReportRequest`]; everything past that point works
//! with the tagged [`ReportWindow`] only.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::{AppError, FieldErrors};
use thiserror::Error;

use crate::models::RevenueRow;

/// Raw chart query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartQuery {
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportWindow {
    ByYear { year: i32 },
    ByMonth { year: i32, month: u32 },
    /// Both dates inclusive.
    ByRange { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
    Yearly,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("either year, year and month, or start and end is required")]
    MissingWindow,
    #[error("start and end must be given together")]
    IncompleteRange,
    #[error("start must not be after end")]
    InvertedRange,
    #[error("month requires a year")]
    MonthWithoutYear,
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("year {0} is out of range")]
    InvalidYear(i32),
    #[error("end {0} is out of range")]
    EndOutOfRange(NaiveDate),
    #[error("unknown report type '{0}', expected daily, monthly or yearly")]
    UnknownType(String),
}

impl WindowError {
    fn field(&self) -> &'static str {
        match self {
            Self::MissingWindow => "year",
            Self::IncompleteRange | Self::InvertedRange | Self::EndOutOfRange(_) => "end",
            Self::MonthWithoutYear => "year",
            Self::InvalidMonth(_) => "month",
            Self::InvalidYear(_) => "year",
            Self::UnknownType(_) => "type",
        }
    }
}

impl From<WindowError> for AppError {
    fn from(err: WindowError) -> Self {
        AppError::ValidationError(FieldErrors::single(err.field(), err.to_string()))
    }
}

impl Granularity {
    fn parse(raw: &str) -> Result<Self, WindowError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" => Ok(Self::Yearly),
            other => Err(WindowError::UnknownType(other.to_string())),
        }
    }

    /// First day of the bucket containing `date`.
    fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        let (year, month, day) = match self {
            Self::Daily => (date.year(), date.month(), date.day()),
            Self::Monthly => (date.year(), date.month(), 1),
            Self::Yearly => (date.year(), 1, 1),
        };
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
    }

    fn label(self, bucket_start: NaiveDate) -> String {
        match self {
            Self::Daily => bucket_start.format("%Y-%m-%d").to_string(),
            Self::Monthly => bucket_start.format("%Y-%m").to_string(),
            Self::Yearly => bucket_start.format("%Y").to_string(),
        }
    }
}

impl ReportWindow {
    /// First included day and first excluded day.
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            Self::ByYear { year } => (
                first_of_month(year, 1),
                first_of_month(year.saturating_add(1), 1),
            ),
            Self::ByMonth { year, month } => {
                let (next_year, next_month) = if month == 12 {
                    (year.saturating_add(1), 1)
                } else {
                    (year, month + 1)
                };
                (
                    first_of_month(year, month),
                    first_of_month(next_year, next_month),
                )
            }
            Self::ByRange { start, end } => (start, end.succ_opt().unwrap_or(NaiveDate::MAX)),
        }
    }

    /// Bounds as UTC instants, `[from, until)`.
    pub fn utc_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let (from, until) = self.bounds();
        (
            from.and_time(NaiveTime::MIN).and_utc(),
            until.and_time(NaiveTime::MIN).and_utc(),
        )
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let (from, until) = self.utc_bounds();
        at >= from && at < until
    }

    fn default_granularity(&self) -> Granularity {
        match self {
            Self::ByYear { .. } => Granularity::Monthly,
            Self::ByMonth { .. } | Self::ByRange { .. } => Granularity::Daily,
        }
    }
}

// Callers validate year and month before building windows.
fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub window: ReportWindow,
    pub granularity: Granularity,
}

impl ReportRequest {
    /// Resolve the query: an explicit range wins, then year + month, then
    /// year alone.
    pub fn resolve(query: &ChartQuery) -> Result<Self, WindowError> {
        let window = match (query.start, query.end, query.year, query.month) {
            (Some(start), Some(end), _, _) => {
                if start > end {
                    return Err(WindowError::InvertedRange);
                }
                // The exclusive bound is the day after end.
                if end.succ_opt().is_none() {
                    return Err(WindowError::EndOutOfRange(end));
                }
                ReportWindow::ByRange { start, end }
            }
            (Some(_), None, _, _) | (None, Some(_), _, _) => {
                return Err(WindowError::IncompleteRange)
            }
            (None, None, Some(year), Some(month)) => {
                check_year(year)?;
                if !(1..=12).contains(&month) {
                    return Err(WindowError::InvalidMonth(month));
                }
                ReportWindow::ByMonth { year, month }
            }
            (None, None, Some(year), None) => {
                check_year(year)?;
                ReportWindow::ByYear { year }
            }
            (None, None, None, Some(_)) => return Err(WindowError::MonthWithoutYear),
            (None, None, None, None) => return Err(WindowError::MissingWindow),
        };

        let granularity = match query.report_type.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Granularity::parse(raw)?,
            _ => window.default_granularity(),
        };

        Ok(Self {
            window,
            granularity,
        })
    }
}

fn check_year(year: i32) -> Result<(), WindowError> {
    // The window's exclusive end is in the following year, which must exist too.
    let next = year.checked_add(1).and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    if NaiveDate::from_ymd_opt(year, 1, 1).is_none() || next.is_none() {
        return Err(WindowError::InvalidYear(year));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueBucket {
    pub label: String,
    pub revenue: Decimal,
    pub payments: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Nothing in the window. Not an error.
    Empty,
    Data(Vec<RevenueBucket>),
}

/// Group the rows inside the window into ascending revenue buckets.
pub fn build_report(request: &ReportRequest, rows: &[RevenueRow]) -> ReportOutcome {
    let mut buckets: BTreeMap<NaiveDate, (Decimal, u64)> = BTreeMap::new();

    for row in rows.iter().filter(|r| request.window.contains(r.created_at)) {
        let key = request
            .granularity
            .bucket_start(row.created_at.date_naive());
        let entry = buckets.entry(key).or_insert((Decimal::ZERO, 0));
        entry.0 += row.total_amount;
        entry.1 += 1;
    }

    if buckets.is_empty() {
        return ReportOutcome::Empty;
    }

    ReportOutcome::Data(
        buckets
            .into_iter()
            .map(|(start, (revenue, payments))| RevenueBucket {
                label: request.granularity.label(start),
                revenue,
                payments,
            })
            .collect(),
    )
}
