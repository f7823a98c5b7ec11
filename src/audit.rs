//! Compact record projection for diagnostic logs. Never carries `raw_data`.

use log::{debug, log_enabled, Level};
use serde::Serialize;

use crate::model::{FinancialRecord, TransactionType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord<'a> {
    pub id: &'a str,
    pub date: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Option<&'a str>,
    pub counterparty: Option<&'a str>,
    pub description: &'a str,
}

impl<'a> From<&'a FinancialRecord> for AuditRecord<'a> {
    fn from(record: &'a FinancialRecord) -> Self {
        Self {
            id: &record.id,
            date: record.date.format("%Y-%m-%d").to_string(),
            amount: record.amount,
            kind: record.kind,
            category: record.category.as_deref(),
            counterparty: record.counterparty.as_deref(),
            description: &record.description,
        }
    }
}

impl AuditRecord<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub fn log_record(record: &FinancialRecord) {
    if !log_enabled!(Level::Debug) {
        return;
    }
    match AuditRecord::from(record).to_json() {
        Ok(json) => debug!("audit {json}"),
        Err(err) => debug!("audit projection for {} failed: {err}", record.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawCell, SourceId};
    use chrono::NaiveDate;

    #[test]
    fn projection_serializes_expected_keys_only() {
        let record = FinancialRecord {
            id: "1-000001-abcd1234".into(),
            date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            description: "Vente produit A".into(),
            amount: 1250.5,
            kind: TransactionType::Income,
            category: None,
            subcategory: Some("hidden".into()),
            account: Some("COMPTA001".into()),
            reference: None,
            counterparty: Some("ACME".into()),
            due_date: None,
            payment_status: None,
            confidence: 1.0,
            source_id: SourceId::CsvUpload,
            raw_data: [("Compte".to_string(), RawCell::Text("COMPTA001".into()))].into(),
        };
        let json = AuditRecord::from(&record).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["date"], "2024-10-01");
        assert_eq!(value["type"], "income");
        assert_eq!(value["counterparty"], "ACME");
        assert!(value["category"].is_null());
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 7);
        assert!(!json.contains("COMPTA001"));
    }
}
