//! Single-pass KPI accumulation over normalized records.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::model::{FinancialRecord, TransactionType};

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyTotal {
    pub name: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotals {
    pub income: f64,
    pub expense: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiAggregate {
    pub total_income: f64,
    pub total_expense: f64,
    pub margin: f64,
    pub margin_percent: f64,
    pub record_count: usize,
    pub income_count: usize,
    pub expense_count: usize,
    /// Signed totals per category: income positive, expense negative.
    pub by_category: BTreeMap<String, f64>,
    pub top_counterparties: Vec<CounterpartyTotal>,
    /// Keyed by `YYYY-MM`.
    pub monthly: BTreeMap<String, MonthlyTotals>,
    /// Fraction of data rows whose date and amount parsed without fallback.
    pub data_quality: f64,
}

#[derive(Debug, Default)]
pub struct KpiAccumulator {
    total_income: f64,
    total_expense: f64,
    income_count: usize,
    expense_count: usize,
    by_category: BTreeMap<String, f64>,
    counterparties: HashMap<String, (f64, usize)>,
    monthly: BTreeMap<String, MonthlyTotals>,
    rows_seen: usize,
    clean_rows: usize,
}

impl KpiAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one data row toward the data-quality score, whether or not it
    /// produced a record.
    pub fn note_row(&mut self, clean: bool) {
        self.rows_seen += 1;
        if clean {
            self.clean_rows += 1;
        }
    }

    pub fn ingest(&mut self, record: &FinancialRecord) {
        let magnitude = record.amount.abs();
        let month = record.date.format("%Y-%m").to_string();
        let monthly = self.monthly.entry(month).or_default();
        match record.kind {
            TransactionType::Income => {
                self.total_income += magnitude;
                self.income_count += 1;
                monthly.income += magnitude;
            }
            TransactionType::Expense => {
                self.total_expense += magnitude;
                self.expense_count += 1;
                monthly.expense += magnitude;
            }
        }

        let category = record
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        *self.by_category.entry(category).or_insert(0.0) += record.signed_amount();

        if let Some(name) = &record.counterparty {
            let entry = self.counterparties.entry(name.clone()).or_insert((0.0, 0));
            entry.0 += magnitude;
            entry.1 += 1;
        }
    }

    pub fn finish(self, top_n: usize) -> KpiAggregate {
        let margin = self.total_income - self.total_expense;
        let margin_percent = if self.total_income > 0.0 {
            margin / self.total_income * 100.0
        } else {
            0.0
        };
        let top_counterparties = self
            .counterparties
            .into_iter()
            .sorted_by(|(name_a, (total_a, _)), (name_b, (total_b, _))| {
                total_b.total_cmp(total_a).then_with(|| name_a.cmp(name_b))
            })
            .take(top_n)
            .map(|(name, (total, count))| CounterpartyTotal { name, total, count })
            .collect();
        let data_quality = if self.rows_seen == 0 {
            0.0
        } else {
            self.clean_rows as f64 / self.rows_seen as f64
        };

        KpiAggregate {
            total_income: self.total_income,
            total_expense: self.total_expense,
            margin,
            margin_percent,
            record_count: self.income_count + self.expense_count,
            income_count: self.income_count,
            expense_count: self.expense_count,
            by_category: self.by_category,
            top_counterparties,
            monthly: self.monthly,
            data_quality,
        }
    }
}
