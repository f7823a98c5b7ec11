//! Canonical data model shared by every pipeline stage.

use std::{collections::BTreeMap, fmt, str::FromStr};

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One decoded cell. Whitespace-only input is [`RawCell::Empty`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Text(String),
    Empty,
}

impl RawCell {
    pub fn from_field(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(trimmed.to_string())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawCell::Text(s) => Some(s.as_str()),
            RawCell::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawCell::Empty)
    }
}

impl From<Option<String>> for RawCell {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(text) => RawCell::from_field(&text),
            None => RawCell::Empty,
        }
    }
}

/// A data row with its 1-based line number in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub number: usize,
    pub cells: Vec<RawCell>,
}

impl RawRow {
    pub fn new(number: usize, cells: Vec<RawCell>) -> Self {
        Self { number, cells }
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(RawCell::as_text)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(RawCell::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Date,
    Description,
    Amount,
    Type,
    Category,
    Subcategory,
    Account,
    Reference,
    Counterparty,
    PaymentStatus,
    DueDate,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 11] = [
        CanonicalField::Date,
        CanonicalField::Description,
        CanonicalField::Amount,
        CanonicalField::Type,
        CanonicalField::Category,
        CanonicalField::Subcategory,
        CanonicalField::Account,
        CanonicalField::Reference,
        CanonicalField::Counterparty,
        CanonicalField::PaymentStatus,
        CanonicalField::DueDate,
    ];

    /// Greedy assignment order used by the column mapper.
    pub const PRIORITY: [CanonicalField; 11] = [
        CanonicalField::Date,
        CanonicalField::Amount,
        CanonicalField::Description,
        CanonicalField::Type,
        CanonicalField::Counterparty,
        CanonicalField::Reference,
        CanonicalField::Category,
        CanonicalField::Account,
        CanonicalField::DueDate,
        CanonicalField::PaymentStatus,
        CanonicalField::Subcategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Description => "description",
            CanonicalField::Amount => "amount",
            CanonicalField::Type => "type",
            CanonicalField::Category => "category",
            CanonicalField::Subcategory => "subcategory",
            CanonicalField::Account => "account",
            CanonicalField::Reference => "reference",
            CanonicalField::Counterparty => "counterparty",
            CanonicalField::PaymentStatus => "payment_status",
            CanonicalField::DueDate => "due_date",
        }
    }

    pub fn is_mandatory(&self) -> bool {
        matches!(self, CanonicalField::Date | CanonicalField::Amount)
    }

    pub fn shape(&self) -> ValueShape {
        match self {
            CanonicalField::Date | CanonicalField::DueDate => ValueShape::Date,
            CanonicalField::Amount => ValueShape::Numeric,
            CanonicalField::Type | CanonicalField::PaymentStatus => ValueShape::Token,
            CanonicalField::Account | CanonicalField::Reference => ValueShape::Code,
            CanonicalField::Description
            | CanonicalField::Category
            | CanonicalField::Subcategory
            | CanonicalField::Counterparty => ValueShape::Text,
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == normalized || normalized == field.as_str().replace('_', ""))
            .ok_or_else(|| anyhow!("Unknown canonical field '{value}'"))
    }
}

/// Expected appearance of the values in a column holding a given field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Date,
    Numeric,
    /// Short enumerable word such as `income` or `paid`.
    Token,
    /// Identifier-like value without inner whitespace, e.g. `VT-2024-001`.
    Code,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Picked on value shape alone.
    Shape,
    Substring,
    Exact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub column_index: usize,
    pub target_field: CanonicalField,
    pub confidence: f64,
    pub match_kind: MatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which ingestion path produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    CsvUpload,
    SpreadsheetUpload,
    ExternalRecord,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::CsvUpload => "csv_upload",
            SourceId::SpreadsheetUpload => "spreadsheet_upload",
            SourceId::ExternalRecord => "external_record",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRecord {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    pub confidence: f64,
    pub source_id: SourceId,
    pub raw_data: BTreeMap<String, RawCell>,
}

impl FinancialRecord {
    /// Amount signed by transaction type: income positive, expense negative.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionType::Income => self.amount.abs(),
            TransactionType::Expense => -self.amount.abs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RowError {
    pub fn new(row: usize, reason: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            row,
            reason: reason.into(),
            value: value.map(str::to_string),
        }
    }
}
