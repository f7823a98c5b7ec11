mod common;

use std::fs;

use fin_ingest::{
    decoder::{decode_text, sniff_delimiter},
    error::IngestError,
    io_utils::decode_input,
    model::SourceId,
    pipeline::{IngestOptions, decode_bytes},
};

use common::fixture_path;

#[test]
fn fixture_export_decodes_with_sniffed_semicolon() {
    let text = fs::read_to_string(fixture_path("sage_export.csv")).expect("read fixture");
    assert_eq!(sniff_delimiter(&text), b';');
    let table = decode_text(&text, None).expect("decode");
    assert_eq!(table.header.len(), 8);
    assert_eq!(table.rows.len(), 6);
    assert_eq!(table.rows[2].cell(2), Some("Vente produit B; lot de 3"));
    assert_eq!(table.rows[1].cell(7), None);
    assert_eq!(table.delimiter, Some(b';'));
}

#[test]
fn crlf_and_bom_are_transparent() {
    let bytes = b"\xEF\xBB\xBFDate\tMontant\r\n2024-10-01\t12\r\n";
    let text = decode_input(bytes, None).expect("decode bytes");
    let table = decode_text(&text, None).expect("decode");
    assert_eq!(table.header, vec!["Date", "Montant"]);
    assert_eq!(table.rows[0].cell(1), Some("12"));
    assert_eq!(table.rows[0].number, 2);
}

#[test]
fn forced_delimiter_overrides_sniffing() {
    let table = decode_text("a;b,c\n1;2,3\n", Some(b',')).expect("decode");
    assert_eq!(table.header, vec!["a;b", "c"]);
}

#[test]
fn blank_header_cells_get_positional_labels() {
    let table = decode_text("Date,,Montant\n2024-10-01,x,1\n", None).expect("decode");
    assert_eq!(table.column_label(1), "column_2");
    assert!(table.ignored_columns.is_empty());
}

#[test]
fn blank_rows_are_skipped_but_keep_line_numbers() {
    let table = decode_text("Date,Montant\n2024-10-01,1\n,\n2024-10-03,3\n", None).expect("decode");
    assert_eq!(table.rows.len(), 2);
    let numbers: Vec<usize> = table.rows.iter().map(|row| row.number).collect();
    assert_eq!(numbers, vec![2, 4]);
}

#[test]
fn csv_bytes_are_tagged_as_csv_uploads() {
    let (table, source) =
        decode_bytes(b"Date,Montant\n2024-10-01,1\n", None, &IngestOptions::default()).expect("decode");
    assert_eq!(source, SourceId::CsvUpload);
    assert_eq!(table.rows.len(), 1);
}

#[cfg(not(feature = "xlsx"))]
#[test]
fn workbook_bytes_without_spreadsheet_support_fail_cleanly() {
    let err = decode_bytes(b"PK\x03\x04garbage", None, &IngestOptions::default()).unwrap_err();
    assert!(matches!(err, IngestError::Spreadsheet(_)));
}

#[cfg(feature = "xlsx")]
#[test]
fn corrupt_workbook_is_a_spreadsheet_error() {
    let err = decode_bytes(b"PK\x03\x04garbage", None, &IngestOptions::default()).unwrap_err();
    assert!(matches!(err, IngestError::Spreadsheet(_)));
}
