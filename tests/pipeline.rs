mod common;

use chrono::NaiveDate;
use fin_ingest::{
    aliases::SourceSystem,
    model::{CanonicalField, MatchKind, SourceId, TransactionType},
    normalize::REASON_INVALID_DATE,
    pipeline::{IngestOptions, IngestionResult, TYPE_INFERRED_WARNING, ingest_path, ingest_text},
};

use common::{TestWorkspace, fixture_path, french_export};

fn ingest(text: &str) -> IngestionResult {
    ingest_text(text, &IngestOptions::default()).expect("ingest")
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn french_ledger_row_becomes_an_income_record() {
    let result = ingest(
        "Date,Description,Montant,Compte,Reference\n01/10/2024,\"Vente produit A\",1250.50,COMPTA001,VT-2024-001\n",
    );
    assert!(result.errors.is_empty());
    assert_eq!(result.records.len(), 1);
    let record = &result.records[0];
    assert_eq!(record.date, ymd(2024, 10, 1));
    assert_eq!(record.description, "Vente produit A");
    assert_eq!(record.amount, 1250.50);
    assert_eq!(record.kind, TransactionType::Income);
    assert_eq!(record.reference.as_deref(), Some("VT-2024-001"));
    assert_eq!(record.account.as_deref(), Some("COMPTA001"));
    assert_eq!(record.source_id, SourceId::CsvUpload);
    assert_eq!(result.kpis.total_income, 1250.50);
}

#[test]
fn accounting_parentheses_with_decimal_comma_are_an_expense() {
    let result = ingest("Date,Description,Montant\n02/10/2024,Achat fournitures,\"(450,00)\"\n");
    let record = &result.records[0];
    assert_eq!(record.amount, -450.0);
    assert_eq!(record.kind, TransactionType::Expense);
    assert_eq!(result.kpis.total_expense, 450.0);
    assert_eq!(result.kpis.margin, -450.0);
}

#[test]
fn placeholder_date_is_reported_and_excluded() {
    let result = ingest("Date,Description,Montant\nN/A,Vente,100\n01/10/2024,Vente,50\n");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].reason, REASON_INVALID_DATE);
    assert_eq!(result.errors[0].row, 2);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.kpis.total_income, 50.0);
    assert_eq!(result.quality_metrics.rejected_rows, 1);
}

#[test]
fn due_date_column_does_not_rescue_an_invalid_date() {
    let result = ingest("Date,Description,Montant,Echeance\nN/A,Vente,100,15/11/2024\n01/10/2024,Vente,50,\n");
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].reason, REASON_INVALID_DATE);
    assert_eq!(result.errors[0].row, 2);
    assert_eq!(result.records[0].date, ymd(2024, 10, 1));
    assert_eq!(result.kpis.total_income, 50.0);
    assert_eq!(result.quality_metrics.completeness, 0.5);
}

#[test]
fn sign_inferred_types_are_flagged_in_warnings() {
    let result = ingest(
        "Date,Description,Montant,Compte,Reference\n01/10/2024,\"Vente produit A\",1250.50,COMPTA001,VT-2024-001\n",
    );
    assert!(result.warnings.iter().any(|w| w == TYPE_INFERRED_WARNING));
    assert_eq!(result.records[0].confidence, 0.9);
    assert_eq!(result.quality_metrics.accuracy, 0.0);
    assert_eq!(result.quality_metrics.completeness, 1.0);

    let typed = ingest("Date,Description,Montant,Type\n01/10/2024,Vente produit A,1250.50,Recette\n");
    assert!(!typed.warnings.iter().any(|w| w == TYPE_INFERRED_WARNING));
    assert_eq!(typed.records[0].confidence, 1.0);
    assert_eq!(typed.quality_metrics.accuracy, 1.0);
}

#[test]
fn missing_amount_column_zeroes_amounts_and_lowers_accuracy() {
    let result = ingest("Date,Description,Client\n01/10/2024,Vente,ACME\n02/10/2024,Achat,Fournil\n");
    assert!(!result.mappings.iter().any(|m| m.target_field == CanonicalField::Amount));
    assert!(result.warnings.iter().any(|w| w.contains("amount")));
    assert!(result.records.iter().all(|r| r.amount == 0.0));
    assert!(result.records.iter().all(|r| r.confidence <= 0.5));
    assert!(result.quality_metrics.accuracy < 1.0);
    assert_eq!(result.quality_metrics.completeness, 0.0);
}

#[test]
fn undated_rows_are_kept_out_of_records_and_totals() {
    let result = ingest(&french_export(100, &[10, 50, 90]));
    assert_eq!(result.errors.len(), 3);
    assert_eq!(result.records.len(), 97);
    assert_eq!(result.quality_metrics.total_rows, 100);
    assert_eq!(result.kpis.total_income, 5000.0);
    assert!((result.kpis.total_expense - 47.0 * 40.0).abs() < 1e-6);
    assert!((result.quality_metrics.accuracy - 0.97).abs() < 1e-9);
    let rows: Vec<usize> = result.errors.iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![11, 51, 91]);
}

#[test]
fn ingestion_is_idempotent_apart_from_ids() {
    let text = french_export(40, &[3]);
    let first = ingest(&text);
    let second = ingest(&text);
    assert_eq!(first.kpis, second.kpis);
    assert_eq!(first.errors, second.errors);
    assert_eq!(first.mappings, second.mappings);
    assert_eq!(first.quality_metrics, second.quality_metrics);
    for (a, b) in first.records.iter().zip(&second.records) {
        let mut b = b.clone();
        b.id = a.id.clone();
        assert_eq!(a, &b);
    }
}

#[test]
fn ids_are_unique_within_a_batch() {
    let result = ingest(&french_export(250, &[]));
    let mut ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 250);
}

#[test]
fn categories_reconcile_with_margin() {
    let result = ingest(&french_export(60, &[2, 7]));
    let kpis = &result.kpis;
    assert!((kpis.total_income - kpis.total_expense - kpis.margin).abs() < 1e-6);
    let by_category: f64 = kpis.by_category.values().sum();
    assert!((by_category - kpis.margin).abs() < 1e-6);
    assert_eq!(kpis.income_count + kpis.expense_count, result.records.len());
    assert!(kpis.top_counterparties.len() <= 10);
    let monthly_income: f64 = kpis.monthly.values().map(|m| m.income).sum();
    assert!((monthly_income - kpis.total_income).abs() < 1e-6);
}

#[test]
fn sage_hint_upgrades_system_specific_headers() {
    let text = "Date pièce;N° pièce;Libellé;Intitulé tiers;Montant\n15/10/2024;FA0001;Facture;ACME;1 200,00\n";
    let generic = ingest(text);
    let sage = ingest_text(
        text,
        &IngestOptions {
            source: SourceSystem::Sage,
            ..IngestOptions::default()
        },
    )
    .expect("ingest");

    let generic_date = generic.mappings.iter().find(|m| m.target_field == CanonicalField::Date).unwrap();
    let sage_date = sage.mappings.iter().find(|m| m.target_field == CanonicalField::Date).unwrap();
    assert_eq!(generic_date.match_kind, MatchKind::Substring);
    assert_eq!(sage_date.match_kind, MatchKind::Exact);
    assert!(sage_date.confidence > generic_date.confidence);
    assert_eq!(sage.records[0].counterparty.as_deref(), Some("ACME"));
    assert_eq!(sage.records[0].amount, 1200.0);
}

#[test]
fn duplicate_headers_are_never_mapped() {
    let result = ingest("Montant,Date,Montant\n10,2024-01-01,99\n");
    let amount = result.mappings.iter().find(|m| m.target_field == CanonicalField::Amount).unwrap();
    assert_eq!(amount.column_index, 0);
    assert!(result.mappings.iter().all(|m| m.column_index != 2));
    assert_eq!(result.records[0].amount, 10.0);
    assert!(result.records[0].raw_data.contains_key("Montant#3"));
}

#[test]
fn fixture_export_round_trips_through_the_file_path() {
    let result = ingest_path(&fixture_path("sage_export.csv"), &IngestOptions::default()).expect("ingest");
    assert_eq!(result.quality_metrics.total_rows, 6);
    assert_eq!(result.records.len() + result.errors.len(), 6);
    assert_eq!(result.errors.len(), 1);
    assert!(result.kpis.by_category.contains_key("Ventes"));
}

#[test]
fn file_level_failures_are_distinguishable() {
    let workspace = TestWorkspace::new();
    let empty = workspace.write("empty.csv", "");
    let header_only = workspace.write("header.csv", "Date;Montant\n");

    let err = ingest_path(&empty, &IngestOptions::default()).unwrap_err();
    let ingest_err = err.downcast_ref::<fin_ingest::IngestError>().expect("typed error");
    assert!(matches!(ingest_err, fin_ingest::IngestError::EmptyFile));

    let err = ingest_path(&header_only, &IngestOptions::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<fin_ingest::IngestError>(),
        Some(fin_ingest::IngestError::NoDataRows)
    ));
}

#[test]
fn explicit_encoding_label_is_applied() {
    let workspace = TestWorkspace::new();
    let (bytes, _, _) = encoding_rs::ISO_8859_15.encode("Date;Libellé;Montant\n01/10/2024;Café;3,50\n");
    let path = workspace.write_bytes("latin9.csv", &bytes);
    let options = IngestOptions {
        encoding: Some("iso-8859-15".to_string()),
        ..IngestOptions::default()
    };
    let result = ingest_path(&path, &options).expect("ingest");
    assert_eq!(result.records[0].description, "Café");
    assert_eq!(result.records[0].amount, 3.5);
}
