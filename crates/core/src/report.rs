//! Report content model.
//!
//! [`ReportContent`] is built section by section during a pipeline run and
//! handed to the document assembler. Only the rendered document is
//! persisted; flags and warnings also surface in the job record.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Section key for the AI-researched company overview.
pub const SECTION_COMPANY_OVERVIEW: &str = "companyOverview";

/// Section key for the AI-researched industry outlook.
pub const SECTION_INDUSTRY_OUTLOOK: &str = "industryOutlook";

/// Section key for parse-stage findings.
pub const SECTION_FINANCIAL_MODEL: &str = "financialModel";

/// Days a generated report stays downloadable.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Maximum number of warnings quoted in a success notification.
pub const MAX_NOTIFIED_WARNINGS: usize = 5;

// ---------------------------------------------------------------------------
// Valuation approaches
// ---------------------------------------------------------------------------

/// Valuation approach with its own narrative section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationApproach {
    Income,
    Market,
    Asset,
}

impl ValuationApproach {
    pub fn as_str(self) -> &'static str {
        match self {
            ValuationApproach::Income => "income",
            ValuationApproach::Market => "market",
            ValuationApproach::Asset => "asset",
        }
    }

    /// Key of the narrative section written for this approach.
    pub fn section_key(self) -> &'static str {
        match self {
            ValuationApproach::Income => "incomeApproach",
            ValuationApproach::Market => "marketApproach",
            ValuationApproach::Asset => "assetApproach",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ValuationApproach::Income => "Income Approach",
            ValuationApproach::Market => "Market Approach",
            ValuationApproach::Asset => "Asset Approach",
        }
    }

    /// Parse every entry of a stored approach list, failing on the first
    /// unknown name. Repeats are dropped; first occurrence wins the order.
    pub fn parse_all<S: AsRef<str>>(values: &[S]) -> Result<Vec<Self>, CoreError> {
        let mut approaches: Vec<Self> = Vec::with_capacity(values.len());
        for value in values {
            let approach = value.as_ref().parse()?;
            if !approaches.contains(&approach) {
                approaches.push(approach);
            }
        }
        Ok(approaches)
    }
}

impl FromStr for ValuationApproach {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" | "income_approach" => Ok(ValuationApproach::Income),
            "market" | "market_approach" => Ok(ValuationApproach::Market),
            "asset" | "asset_approach" => Ok(ValuationApproach::Asset),
            other => Err(CoreError::Validation(format!(
                "Unknown valuation approach '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    Error,
    Missing,
    Review,
}

/// A reviewer-facing marker attached to one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub section: String,
    pub message: String,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub key: String,
    pub title: String,
    pub body: String,
    /// True when `body` is a stand-in for content that failed to generate.
    pub placeholder: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportContent {
    pub company_name: String,
    pub report_type: String,
    pub valuation_date: NaiveDate,
    pub sections: Vec<Section>,
    pub flags: Vec<Flag>,
    pub warnings: Vec<String>,
    pub duration: Duration,
}

impl ReportContent {
    pub fn new(
        company_name: impl Into<String>,
        report_type: impl Into<String>,
        valuation_date: NaiveDate,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            report_type: report_type.into(),
            valuation_date,
            sections: Vec::new(),
            flags: Vec::new(),
            warnings: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn push_section(
        &mut self,
        key: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) {
        self.sections.push(Section {
            key: key.into(),
            title: title.into(),
            body: body.into(),
            placeholder: false,
        });
    }

    /// Fill a section whose generation failed with an explicit placeholder
    /// and record a flag plus a warning for it.
    pub fn push_placeholder(
        &mut self,
        key: &str,
        title: &str,
        flag_type: FlagType,
        message: impl Into<String>,
    ) {
        let message = message.into();
        self.sections.push(Section {
            key: key.to_string(),
            title: title.to_string(),
            body: format!(
                "[{title} could not be generated automatically. \
                 Please complete this section before issuing the report.]"
            ),
            placeholder: true,
        });
        self.flag(key, flag_type, message.clone());
        self.warnings.push(format!("{title}: {message}"));
    }

    pub fn flag(&mut self, section: &str, flag_type: FlagType, message: impl Into<String>) {
        self.flags.push(Flag {
            section: section.to_string(),
            message: message.into(),
            flag_type,
        });
    }

    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn flags_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Flag> + 'a {
        self.flags.iter().filter(move |f| f.section == key)
    }
}
