//! Bank segments and macro KPI selections

use crate::error::ConfigError;
use finai_data::SheetMatcher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Business-line partition of the bank's figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "FinSum")]
    FinancialSummary,
    #[serde(rename = "IB")]
    InvestmentBank,
    #[serde(rename = "PB")]
    PrivateBank,
    #[serde(rename = "CB")]
    CorporateBank,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Self::FinancialSummary,
        Self::InvestmentBank,
        Self::PrivateBank,
        Self::CorporateBank,
    ];

    /// Short code used on the command line
    pub fn code(self) -> &'static str {
        match self {
            Self::FinancialSummary => "FinSum",
            Self::InvestmentBank => "IB",
            Self::PrivateBank => "PB",
            Self::CorporateBank => "CB",
        }
    }

    /// Name used for workbook sheets and in prompts
    pub fn display_name(self) -> &'static str {
        match self {
            Self::FinancialSummary => "Financial Summary",
            Self::InvestmentBank => "Investment Bank",
            Self::PrivateBank => "Private Bank",
            Self::CorporateBank => "Corporate Bank",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How an unrecognised segment name is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentResolution {
    /// Only codes are accepted; anything else is an error
    Strict,
    /// Front-end names and codes are accepted; anything else maps to the default segment
    Lenient,
}

/// Segment lookup owned by the configuration
#[derive(Debug, Clone)]
pub struct SegmentTable {
    segments: Vec<Segment>,
    aliases: Vec<(String, Segment)>,
    default: Segment,
}

impl Default for SegmentTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl SegmentTable {
    /// The four segments with the web front end's business-line names
    pub fn standard() -> Self {
        Self {
            segments: Segment::ALL.to_vec(),
            aliases: vec![
                ("Retail".to_string(), Segment::PrivateBank),
                ("Corporate".to_string(), Segment::CorporateBank),
                ("Investment".to_string(), Segment::InvestmentBank),
                ("Total".to_string(), Segment::FinancialSummary),
            ],
            default: Segment::FinancialSummary,
        }
    }

    /// Add or replace a front-end alias
    pub fn with_alias(mut self, alias: impl Into<String>, segment: Segment) -> Self {
        let alias = alias.into();
        self.aliases.retain(|(a, _)| *a != alias);
        self.aliases.push((alias, segment));
        self
    }

    pub fn with_default(mut self, segment: Segment) -> Self {
        self.default = segment;
        self
    }

    pub fn default_segment(&self) -> Segment {
        self.default
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment for an exact code (`FinSum`, `IB`, `PB`, `CB`)
    pub fn from_code(&self, code: &str) -> Option<Segment> {
        self.segments.iter().copied().find(|s| s.code() == code.trim())
    }

    fn from_alias(&self, name: &str) -> Option<Segment> {
        self.aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name.trim()))
            .map(|(_, segment)| *segment)
    }

    /// Resolve a user-supplied segment name
    pub fn resolve(&self, name: &str, mode: SegmentResolution) -> Result<Segment, ConfigError> {
        match mode {
            SegmentResolution::Strict => self
                .from_code(name)
                .ok_or_else(|| ConfigError::UnknownSegment(name.to_string())),
            SegmentResolution::Lenient => Ok(self
                .from_alias(name)
                .or_else(|| self.from_code(name))
                .unwrap_or_else(|| {
                    debug!(name, default = %self.default, "unknown segment, using default");
                    self.default
                })),
        }
    }

    /// Sheet matcher accepting each segment's code or display name
    pub fn sheet_matcher(&self) -> SheetMatcher {
        self.segments
            .iter()
            .fold(SheetMatcher::new(), |matcher, segment| {
                matcher.with_segment(segment.code(), segment.display_name())
            })
    }
}

/// Optional macroeconomic context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroKpi {
    /// ifo business climate index (CSV table in the prompt)
    Ifo,
    /// Purchasing managers' index (PDF attachment)
    Pmi,
}

impl MacroKpi {
    pub fn code(self) -> &'static str {
        match self {
            Self::Ifo => "ifo",
            Self::Pmi => "pmi",
        }
    }

    /// Parse a list of KPI names, dropping duplicates and keeping first-seen order
    ///
    /// In lenient mode unknown names are skipped; in strict mode they are an error.
    pub fn parse_list<I, S>(names: I, mode: SegmentResolution) -> Result<Vec<MacroKpi>, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kpis = Vec::new();
        for name in names {
            let name = name.as_ref();
            match (name.parse::<MacroKpi>(), mode) {
                (Ok(kpi), _) if !kpis.contains(&kpi) => kpis.push(kpi),
                (Ok(_), _) => {}
                (Err(err), SegmentResolution::Strict) => return Err(err),
                (Err(_), SegmentResolution::Lenient) => debug!(name, "ignoring unknown KPI"),
            }
        }
        Ok(kpis)
    }
}

impl FromStr for MacroKpi {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ifo" => Ok(Self::Ifo),
            "pmi" => Ok(Self::Pmi),
            _ => Err(ConfigError::UnknownKpi(s.to_string())),
        }
    }
}

impl fmt::Display for MacroKpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
