//! Conversion of loosely typed records from other systems (invoices, bank
//! feeds, JSON exports) into [`FinancialRecord`] values.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfidencePenalties,
    data::{NumberLocale, is_placeholder, parse_amount, parse_transaction_type},
    model::{FinancialRecord, RawCell, SourceId},
    normalize::{FALLBACK_DESCRIPTION, IdGenerator, coerce_date, infer_type},
};

/// Amount as sent by the other system: a JSON number or a formatted string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseAmount {
    Number(f64),
    Text(String),
}

impl LooseAmount {
    fn resolve(&self) -> Option<f64> {
        match self {
            LooseAmount::Number(value) => value.is_finite().then_some(*value),
            // No sample to vote on; an ambiguous `1,234` reads as grouping.
            LooseAmount::Text(text) => parse_amount(text, NumberLocale::DecimalPoint),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<LooseAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(alias = "status", skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !is_placeholder(v))
        .map(str::to_string)
}

impl ExternalRecord {
    /// Original fields as a `raw_data` map.
    fn raw_data(&self) -> BTreeMap<String, RawCell> {
        let Ok(serde_json::Value::Object(map)) = serde_json::to_value(self) else {
            return BTreeMap::new();
        };
        map.into_iter()
            .map(|(key, value)| {
                let cell = match value {
                    serde_json::Value::Null => RawCell::Empty,
                    serde_json::Value::String(text) => RawCell::from_field(&text),
                    other => RawCell::from_field(&other.to_string()),
                };
                (key, cell)
            })
            .collect()
    }

    /// Converts into a canonical record. The date falls back to the due date,
    /// then to `ingested_on`; each fallback costs confidence like in the
    /// tabular path. The flag is true when date and amount were both read
    /// from their own fields.
    pub fn into_record(
        self,
        ids: &mut IdGenerator,
        ingested_on: NaiveDate,
        penalties: &ConfidencePenalties,
    ) -> (FinancialRecord, bool) {
        let mut penalty = 0.0;
        let mut clean = true;
        let due_date = coerce_date(self.due_date.as_deref());
        let date = match coerce_date(self.date.as_deref()) {
            Some(date) => date,
            None => {
                penalty += penalties.missing_date;
                clean = false;
                due_date.unwrap_or(ingested_on)
            }
        };

        let amount = match self.amount.as_ref().and_then(LooseAmount::resolve) {
            Some(amount) => amount,
            None => {
                penalty += penalties.coerced_amount;
                clean = false;
                0.0
            }
        };

        let counterparty = present(&self.counterparty).or_else(|| present(&self.client_name));
        let description = match present(&self.description) {
            Some(description) => description,
            None => {
                penalty += penalties.fallback_description;
                counterparty
                    .clone()
                    .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string())
            }
        };

        let kind = match self.kind.as_deref().and_then(parse_transaction_type) {
            Some(kind) => kind,
            None => {
                penalty += penalties.inferred_type;
                infer_type(amount, false)
            }
        };

        let raw_data = self.raw_data();
        let id = present(&self.id).unwrap_or_else(|| ids.next_id());

        let record = FinancialRecord {
            id,
            date,
            description,
            amount,
            kind,
            category: present(&self.category),
            subcategory: present(&self.subcategory),
            account: present(&self.account),
            reference: present(&self.reference),
            counterparty,
            due_date,
            payment_status: present(&self.payment_status),
            confidence: (1.0 - penalty).max(0.0),
            source_id: SourceId::ExternalRecord,
            raw_data,
        };
        (record, clean)
    }
}
