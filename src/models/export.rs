use std::fmt;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};

/// One BAQ result row, column name to JSON scalar
pub type BaqRow = Map<String, Value>;

// ============================================================================
// Export Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    ChartOfAccounts,
    Vendors,
    PurchaseOrders,
    Payments,
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportKind::ChartOfAccounts => write!(f, "Chart Of Accounts"),
            ExportKind::Vendors => write!(f, "Vendors"),
            ExportKind::PurchaseOrders => write!(f, "Purchase Orders"),
            ExportKind::Payments => write!(f, "Payments"),
        }
    }
}

// ============================================================================
// Column Layout
// ============================================================================

/// Where an output column takes its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// Column must be present in every row
    Required(&'static str),
    /// Column may be missing from the query definition; missing means empty
    Optional(&'static str),
    /// Literal blank filler column
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Text,
    /// Decimal written with exactly two places
    Amount,
    /// Date written as yyyyMMdd
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub label: &'static str,
    pub source: ColumnSource,
    pub format: FieldFormat,
    /// When false an empty value is rejected instead of written blank
    pub allow_empty: bool,
}

impl ColumnSpec {
    pub const fn text(label: &'static str, column: &'static str) -> Self {
        Self {
            label,
            source: ColumnSource::Required(column),
            format: FieldFormat::Text,
            allow_empty: true,
        }
    }

    pub const fn optional_text(label: &'static str, column: &'static str) -> Self {
        Self {
            label,
            source: ColumnSource::Optional(column),
            format: FieldFormat::Text,
            allow_empty: true,
        }
    }

    pub const fn blank() -> Self {
        Self {
            label: "",
            source: ColumnSource::Blank,
            format: FieldFormat::Text,
            allow_empty: true,
        }
    }

    pub const fn amount(label: &'static str, column: &'static str) -> Self {
        Self {
            label,
            source: ColumnSource::Required(column),
            format: FieldFormat::Amount,
            allow_empty: true,
        }
    }

    pub const fn date(label: &'static str, column: &'static str) -> Self {
        Self {
            label,
            source: ColumnSource::Required(column),
            format: FieldFormat::Date,
            allow_empty: true,
        }
    }

    pub const fn strict_amount(label: &'static str, column: &'static str) -> Self {
        Self {
            allow_empty: false,
            ..Self::amount(label, column)
        }
    }

    pub const fn strict_date(label: &'static str, column: &'static str) -> Self {
        Self {
            allow_empty: false,
            ..Self::date(label, column)
        }
    }
}

/// A named, ordered column layout for one export file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportProfile {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl ExportProfile {
    pub fn labels(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.label).collect()
    }
}

// ============================================================================
// Export Records
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Amount(Decimal),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn render(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Amount(amount) => {
                let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                format!("{:.2}", rounded)
            }
            FieldValue::Date(date) => date.format("%Y%m%d").to_string(),
        }
    }
}

/// One output row, values aligned with the profile's columns
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub values: Vec<FieldValue>,
}

impl ExportRecord {
    pub fn rendered(&self) -> Vec<String> {
        self.values.iter().map(FieldValue::render).collect()
    }
}

/// Optional two-line vendor preamble written before delimited data rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    pub version: String,
    pub header: Option<String>,
}

impl Preamble {
    /// Configured header text, or the tab-joined column labels
    pub fn header_text(&self, profile: &ExportProfile) -> String {
        match &self.header {
            Some(header) => header.clone(),
            None => profile.labels().join("\t"),
        }
    }
}
