//! Period keys parsed from workbook headers and CSV index columns
//!
//! A [`Period`] keeps the label it was parsed from, but compares, orders and
//! hashes on its [`PeriodKey`] only, so `Q4 2024` and `2024-Q4` are the same
//! period. Ordering is chronological by period start; at equal start the
//! coarser period sorts first.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

/// Resolution of a period, coarse to fine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Year,
    Quarter,
    Month,
    Day,
}

/// Normalised identity of a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKey {
    Year(i32),
    Quarter { year: i32, quarter: u32 },
    Month { year: i32, month: u32 },
    Day(NaiveDate),
}

impl PeriodKey {
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Year(_) => Granularity::Year,
            Self::Quarter { .. } => Granularity::Quarter,
            Self::Month { .. } => Granularity::Month,
            Self::Day(_) => Granularity::Day,
        }
    }

    /// (year, first month, first day, granularity) of the period
    fn sort_key(&self) -> (i32, u32, u32, Granularity) {
        match *self {
            Self::Year(year) => (year, 1, 1, Granularity::Year),
            Self::Quarter { year, quarter } => (year, quarter * 3 - 2, 1, Granularity::Quarter),
            Self::Month { year, month } => (year, month, 1, Granularity::Month),
            Self::Day(date) => (date.year(), date.month(), date.day(), Granularity::Day),
        }
    }

    /// Map this period onto the enclosing period of a coarser granularity
    ///
    /// Returns `None` when `target` is finer than the period itself.
    pub fn coarsen(&self, target: Granularity) -> Option<PeriodKey> {
        if target > self.granularity() {
            return None;
        }
        let (year, month, _, _) = self.sort_key();
        Some(match target {
            Granularity::Year => Self::Year(year),
            Granularity::Quarter => Self::Quarter {
                year,
                quarter: (month - 1) / 3 + 1,
            },
            Granularity::Month => Self::Month { year, month },
            Granularity::Day => *self,
        })
    }

    /// Canonical label for a key built without source text
    pub fn canonical_label(&self) -> String {
        match self {
            Self::Year(year) => year.to_string(),
            Self::Quarter { year, quarter } => format!("Q{quarter} {year}"),
            Self::Month { year, month } => format!("{year}-{month:02}"),
            Self::Day(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl Ord for PeriodKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for PeriodKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A parsed period together with its source label
#[derive(Debug, Clone)]
pub struct Period {
    key: PeriodKey,
    label: String,
}

#[derive(Clone, Copy)]
enum Form {
    Year,
    QuarterFirst,
    YearFirstQuarter,
    NumericQuarter,
    IsoDay,
    DottedDay,
    YearMonth,
    MonthYear,
    NamedMonth,
}

static PATTERNS: LazyLock<Vec<(Regex, Form)>> = LazyLock::new(|| {
    [
        (r"^(?:FY\s*)?(\d{4})$", Form::Year),
        (r"^Q([1-4])[\s\-/]*(\d{4}|\d{2})$", Form::QuarterFirst),
        (r"^(\d{4})[\s\-/]*Q([1-4])$", Form::YearFirstQuarter),
        (r"^([1-4])Q[\s\-/]*(\d{4}|\d{2})$", Form::NumericQuarter),
        (r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T\s].*)?$", Form::IsoDay),
        (r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$", Form::DottedDay),
        (r"^(\d{4})[-/](\d{1,2})$", Form::YearMonth),
        (r"^(\d{1,2})[/.](\d{4})$", Form::MonthYear),
        (r"^(\p{L}{3,9})\.?[\s\-]*(\d{4}|\d{2})$", Form::NamedMonth),
    ]
    .into_iter()
    .filter_map(|(pattern, form)| {
        Regex::new(&format!("(?i){pattern}"))
            .ok()
            .map(|re| (re, form))
    })
    .collect()
});

fn year_of(text: &str) -> Option<i32> {
    let year: i32 = text.parse().ok()?;
    let year = if text.len() == 2 { 2000 + year } else { year };
    (1900..=2200).contains(&year).then_some(year)
}

fn month_of(text: &str) -> Option<u32> {
    let month: u32 = text.parse().ok()?;
    (1..=12).contains(&month).then_some(month)
}

fn month_named(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" | "jän" => 1,
        "feb" => 2,
        "mar" | "mär" | "mrz" => 3,
        "apr" => 4,
        "may" | "mai" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" | "okt" => 10,
        "nov" => 11,
        "dec" | "dez" => 12,
        _ => return None,
    };
    Some(month)
}

fn key_from(form: Form, caps: &regex::Captures<'_>) -> Option<PeriodKey> {
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());
    let quarter = |text: &str| text.parse::<u32>().ok();

    match form {
        Form::Year => Some(PeriodKey::Year(year_of(group(1))?)),
        Form::QuarterFirst | Form::NumericQuarter => Some(PeriodKey::Quarter {
            year: year_of(group(2))?,
            quarter: quarter(group(1))?,
        }),
        Form::YearFirstQuarter => Some(PeriodKey::Quarter {
            year: year_of(group(1))?,
            quarter: quarter(group(2))?,
        }),
        Form::IsoDay => NaiveDate::from_ymd_opt(
            year_of(group(1))?,
            month_of(group(2))?,
            group(3).parse().ok()?,
        )
        .map(PeriodKey::Day),
        Form::DottedDay => NaiveDate::from_ymd_opt(
            year_of(group(3))?,
            month_of(group(2))?,
            group(1).parse().ok()?,
        )
        .map(PeriodKey::Day),
        Form::YearMonth => Some(PeriodKey::Month {
            year: year_of(group(1))?,
            month: month_of(group(2))?,
        }),
        Form::MonthYear => Some(PeriodKey::Month {
            year: year_of(group(2))?,
            month: month_of(group(1))?,
        }),
        Form::NamedMonth => Some(PeriodKey::Month {
            year: year_of(group(2))?,
            month: month_named(group(1))?,
        }),
    }
}

impl Period {
    /// Parse a period label; `None` when the text is not a recognised form
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        PATTERNS.iter().find_map(|(re, form)| {
            let caps = re.captures(trimmed)?;
            key_from(*form, &caps).map(|key| Self {
                key,
                label: trimmed.to_string(),
            })
        })
    }

    /// Build a period from a key, labelled canonically
    pub fn from_key(key: PeriodKey) -> Self {
        Self {
            label: key.canonical_label(),
            key,
        }
    }

    /// Build a period from a calendar date
    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_key(PeriodKey::Day(date))
    }

    pub fn key(&self) -> PeriodKey {
        self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn granularity(&self) -> Granularity {
        self.key.granularity()
    }

    /// The enclosing period at `target`, keeping the label when unchanged
    pub fn coarsen(&self, target: Granularity) -> Option<Period> {
        let key = self.key.coarsen(target)?;
        if key == self.key {
            Some(self.clone())
        } else {
            Some(Self::from_key(key))
        }
    }
}

impl PartialEq for Period {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Period {}

impl Hash for Period {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Period::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised period '{text}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> PeriodKey {
        Period::parse(text).unwrap().key()
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(PATTERNS.len(), 9);
    }

    #[test]
    fn test_quarter_forms_agree() {
        let expected = PeriodKey::Quarter {
            year: 2024,
            quarter: 4,
        };
        for text in ["Q4 2024", "2024 Q4", "4Q24", "2024-Q4", "q4-24", "4Q 2024"] {
            assert_eq!(key(text), expected, "{text}");
        }
    }

    #[test]
    fn test_month_and_day_forms() {
        let march = PeriodKey::Month {
            year: 2024,
            month: 3,
        };
        assert_eq!(key("2024-03"), march);
        assert_eq!(key("03/2024"), march);
        assert_eq!(key("Mar 2024"), march);
        assert_eq!(key("März 2024"), march);

        let day = PeriodKey::Day(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(key("2024-03-31"), day);
        assert_eq!(key("31.03.2024"), day);
        assert_eq!(key("2024-03-31 00:00:00"), day);
        assert_eq!(key("2024"), PeriodKey::Year(2024));
        assert_eq!(key("FY2024"), PeriodKey::Year(2024));
    }

    #[test]
    fn test_rejects_non_periods() {
        for text in [
            "",
            "Net revenues",
            "Q5 2024",
            "2024-13",
            "31.02.2024",
            "12345",
            "in EUR m",
        ] {
            assert!(Period::parse(text).is_none(), "{text}");
        }
    }

    #[test]
    fn test_chronological_order() {
        let mut periods: Vec<Period> = ["Q2 2024", "2023", "2024-01", "Q1 2024", "2024"]
            .iter()
            .map(|t| Period::parse(t).unwrap())
            .collect();
        periods.sort();

        let labels: Vec<&str> = periods.iter().map(Period::label).collect();
        assert_eq!(labels, ["2023", "2024", "Q1 2024", "2024-01", "Q2 2024"]);
    }

    #[test]
    fn test_equality_ignores_label() {
        assert_eq!(Period::parse("Q4 2024"), Period::parse("4Q24"));
        assert_eq!(Period::parse("Q4 2024").unwrap().label(), "Q4 2024");
    }

    #[test]
    fn test_coarsen() {
        let month = Period::parse("2024-11").unwrap();
        let quarter = month.coarsen(Granularity::Quarter).unwrap();
        assert_eq!(
            quarter.key(),
            PeriodKey::Quarter {
                year: 2024,
                quarter: 4
            }
        );
        assert_eq!(quarter.label(), "Q4 2024");
        assert_eq!(month.coarsen(Granularity::Year).unwrap().label(), "2024");
        assert!(month.coarsen(Granularity::Day).is_none());

        let same = Period::parse("Q1 2025").unwrap();
        assert_eq!(same.coarsen(Granularity::Quarter).unwrap().label(), "Q1 2025");
    }

    #[test]
    fn test_serde_as_label() {
        let period = Period::parse("Q3 2024").unwrap();
        assert_eq!(serde_json::to_string(&period).unwrap(), "\"Q3 2024\"");

        let back: Period = serde_json::from_str("\"2024-Q3\"").unwrap();
        assert_eq!(back, period);
        assert!(serde_json::from_str::<Period>("\"later\"").is_err());
    }
}
