//! Record normalization: one raw row in, one record or one row error out.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use log::debug;
use uuid::Uuid;

use crate::{
    config::ConfidencePenalties,
    data::{NumberLocale, is_placeholder, parse_amount, parse_date, parse_transaction_type},
    mapper::MappingOutcome,
    model::{CanonicalField, FinancialRecord, RawCell, RawRow, RowError, SourceId, TransactionType},
};

pub const FALLBACK_DESCRIPTION: &str = "N/A";
pub const REASON_INVALID_DATE: &str = "invalid date";
pub const REASON_MISSING_DATE: &str = "missing date";

/// Batch-scoped id source. Ids combine the batch timestamp, a sequence number
/// and a random suffix, so two ids from one generator never collide.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    stamp: i64,
    sequence: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::starting_at(Utc::now().timestamp_millis())
    }

    pub fn starting_at(stamp: i64) -> Self {
        Self { stamp, sequence: 0 }
    }

    pub fn next_id(&mut self) -> String {
        self.sequence += 1;
        let random = Uuid::new_v4().simple().to_string();
        format!("{}-{:06}-{}", self.stamp, self.sequence, &random[..8])
    }

    pub fn issued(&self) -> u64 {
        self.sequence
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Record {
        record: FinancialRecord,
        /// Date and amount both parsed from their own cells.
        clean: bool,
    },
    Rejected(RowError),
}

/// Builds unique `raw_data` keys from header labels; a repeated label gets
/// its 1-based column position appended.
pub fn raw_data_keys(labels: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(labels.len());
    for (idx, label) in labels.iter().enumerate() {
        if keys.contains(label) {
            keys.push(format!("{label}#{}", idx + 1));
        } else {
            keys.push(label.clone());
        }
    }
    keys
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    columns: BTreeMap<CanonicalField, usize>,
    locale: NumberLocale,
    penalties: ConfidencePenalties,
    source_id: SourceId,
    raw_keys: Vec<String>,
    mandatory_missing: bool,
}

impl Normalizer {
    pub fn new(
        mapping: &MappingOutcome,
        labels: &[String],
        penalties: ConfidencePenalties,
        source_id: SourceId,
    ) -> Self {
        let columns = mapping
            .mappings
            .iter()
            .map(|m| (m.target_field, m.column_index))
            .collect();
        Self {
            columns,
            locale: mapping.amount_locale,
            penalties,
            source_id,
            raw_keys: raw_data_keys(labels),
            mandatory_missing: !mapping.missing_mandatory().is_empty(),
        }
    }

    fn cell<'r>(&self, row: &'r RawRow, field: CanonicalField) -> Option<&'r str> {
        self.columns.get(&field).and_then(|idx| row.cell(*idx))
    }

    /// Optional text field; placeholders count as absent.
    fn text(&self, row: &RawRow, field: CanonicalField) -> Option<String> {
        self.cell(row, field)
            .filter(|value| !is_placeholder(value))
            .map(str::to_string)
    }

    pub fn normalize(&self, row: &RawRow, ids: &mut IdGenerator) -> RowOutcome {
        let mut penalty = 0.0;
        let mut clean = true;

        let date_cell = self.cell(row, CanonicalField::Date);
        let due_date = self.cell(row, CanonicalField::DueDate).and_then(parse_date);
        let Some(date) = date_cell.and_then(parse_date) else {
            let reason = if date_cell.is_some() {
                REASON_INVALID_DATE
            } else {
                REASON_MISSING_DATE
            };
            debug!("Row {} rejected: {reason} ({date_cell:?})", row.number);
            return RowOutcome::Rejected(RowError::new(row.number, reason, date_cell));
        };

        let amount = match self
            .cell(row, CanonicalField::Amount)
            .and_then(|value| parse_amount(value, self.locale))
        {
            Some(amount) => amount,
            None => {
                penalty += self.penalties.coerced_amount;
                clean = false;
                0.0
            }
        };

        let counterparty = self.text(row, CanonicalField::Counterparty);
        let description = match self.text(row, CanonicalField::Description) {
            Some(description) => description,
            None => {
                penalty += self.penalties.fallback_description;
                counterparty
                    .clone()
                    .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string())
            }
        };

        let explicit_type = self
            .cell(row, CanonicalField::Type)
            .and_then(parse_transaction_type);
        let kind = match explicit_type {
            Some(kind) => kind,
            None => {
                penalty += self.penalties.inferred_type;
                infer_type(amount, self.columns.contains_key(&CanonicalField::Type))
            }
        };

        let mut confidence = (1.0 - penalty).max(0.0);
        if self.mandatory_missing {
            confidence = confidence.min(self.penalties.missing_mapping_cap);
        }

        let raw_data = self
            .raw_keys
            .iter()
            .zip(row.cells.iter())
            .map(|(key, cell)| (key.clone(), cell.clone()))
            .collect::<BTreeMap<String, RawCell>>();

        RowOutcome::Record {
            record: FinancialRecord {
                id: ids.next_id(),
                date,
                description,
                amount,
                kind,
                category: self.text(row, CanonicalField::Category),
                subcategory: self.text(row, CanonicalField::Subcategory),
                account: self.text(row, CanonicalField::Account),
                reference: self.text(row, CanonicalField::Reference),
                counterparty,
                due_date,
                payment_status: self.text(row, CanonicalField::PaymentStatus),
                confidence,
                source_id: self.source_id,
                raw_data,
            },
            clean,
        }
    }
}

/// Sign-based type when no explicit value could be read. A mapped type
/// column with an unrecognized value defaults to expense.
pub fn infer_type(amount: f64, type_column_mapped: bool) -> TransactionType {
    if !type_column_mapped && amount > 0.0 {
        TransactionType::Income
    } else {
        TransactionType::Expense
    }
}

/// Parses a date-like value for callers outside the tabular path.
pub fn coerce_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(parse_date)
}
