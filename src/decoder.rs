//! Tabular decoder: delimited text to a header plus rectangular raw rows.

use std::collections::HashSet;

use log::debug;

use crate::{
    data::normalize_header,
    error::IngestError,
    io_utils::printable_delimiter,
    model::{RawCell, RawRow},
};

pub const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];
pub const DEFAULT_DELIMITER: u8 = b',';
const MIN_DELIMITER_HITS: usize = 1;

#[derive(Debug, Clone)]
pub struct DecodedTable {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
    /// `None` when the table came from a workbook.
    pub delimiter: Option<u8>,
    /// Repeated header names after their first occurrence. Never mapped.
    pub ignored_columns: Vec<usize>,
}

impl DecodedTable {
    /// Pads or truncates every row to the header width and tags duplicate headers.
    pub fn from_grid(mut header: Vec<String>, mut rows: Vec<RawRow>, delimiter: Option<u8>) -> Self {
        if let Some(first) = header.first_mut() {
            *first = first.trim_start_matches('\u{feff}').trim().to_string();
        }
        let width = header.len();
        for row in &mut rows {
            if row.cells.len() > width {
                let dropped = row.cells[width..].iter().filter(|c| !c.is_empty()).count();
                if dropped > 0 {
                    debug!(
                        "Row {} has {} value(s) beyond the {} header column(s); ignoring them",
                        row.number, dropped, width
                    );
                }
            }
            row.cells.resize(width, RawCell::Empty);
        }

        let mut seen = HashSet::new();
        let mut ignored_columns = Vec::new();
        for (idx, name) in header.iter().enumerate() {
            let key = normalize_header(name);
            let key = if key.is_empty() {
                name.trim().to_lowercase()
            } else {
                key
            };
            if key.is_empty() {
                continue;
            }
            if !seen.insert(key) {
                debug!("Column {} ('{}') repeats an earlier header; ignoring it", idx + 1, name);
                ignored_columns.push(idx);
            }
        }

        Self {
            header,
            rows,
            delimiter,
            ignored_columns,
        }
    }

    pub fn is_ignored(&self, column: usize) -> bool {
        self.ignored_columns.contains(&column)
    }

    /// Header text, or a positional label for blank header cells.
    pub fn column_label(&self, column: usize) -> String {
        match self.header.get(column).map(|h| h.trim()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("column_{}", column + 1),
        }
    }
}

/// Picks the candidate delimiter appearing most often outside quotes on the
/// first non-empty line. Falls back to a comma.
pub fn sniff_delimiter(text: &str) -> u8 {
    let Some(line) = text.lines().find(|line| !line.trim().is_empty()) else {
        return DEFAULT_DELIMITER;
    };
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes
            && let Some(pos) = CANDIDATE_DELIMITERS.iter().position(|c| *c == byte)
        {
            counts[pos] += 1;
        }
    }

    let mut best = DEFAULT_DELIMITER;
    let mut best_count = MIN_DELIMITER_HITS - 1;
    for (candidate, count) in CANDIDATE_DELIMITERS.iter().zip(counts) {
        if count >= MIN_DELIMITER_HITS && count > best_count {
            best = *candidate;
            best_count = count;
        }
    }
    best
}

pub fn decode_text(text: &str, delimiter: Option<u8>) -> Result<DecodedTable, IngestError> {
    if text.trim().is_empty() {
        return Err(IngestError::EmptyFile);
    }
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(text));
    debug!("Decoding delimited text with '{}'", printable_delimiter(delimiter));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(rows.len() + 2);
        if header.is_none() {
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            header = Some(record.iter().map(|field| field.trim().to_string()).collect());
            continue;
        }
        let row = RawRow::new(line, record.iter().map(RawCell::from_field).collect());
        if row.is_blank() {
            debug!("Skipping blank row {}", row.number);
        } else {
            rows.push(row);
        }
    }

    let header = header.ok_or(IngestError::EmptyFile)?;
    Ok(DecodedTable::from_grid(header, rows, Some(delimiter)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_prefers_most_frequent_unquoted_candidate() {
        assert_eq!(sniff_delimiter("Date;Libellé;Montant\n01/10/2024;x;1,5"), b';');
        assert_eq!(sniff_delimiter("Date\tMontant\n"), b'\t');
        assert_eq!(sniff_delimiter("\n\n\"a;b;c\",d\n"), b',');
        assert_eq!(sniff_delimiter("single"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn decode_handles_quotes_newlines_and_doubled_quotes() {
        let text = "Date,Description,Montant\n01/10/2024,\"Vente, \"\"lot\"\"\nA\",12\n02/10/2024,B,3\n";
        let table = decode_text(text, None).expect("decode");
        assert_eq!(table.header, vec!["Date", "Description", "Montant"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cell(1), Some("Vente, \"lot\"\nA"));
        assert_eq!(table.rows[0].number, 2);
        assert_eq!(table.rows[1].number, 4);
    }

    #[test]
    fn decode_pads_ragged_rows_and_skips_blank_lines() {
        let text = "a,b,c\n1,2\n,,\n4,5,6,7\n";
        let table = decode_text(text, Some(b',')).expect("decode");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cells.len(), 3);
        assert!(table.rows[0].cells[2].is_empty());
        assert_eq!(table.rows[1].cells.len(), 3);
    }

    #[test]
    fn duplicate_headers_keep_first_occurrence() {
        let table = decode_text("Montant,Date,montant\n1,2024-01-01,2\n", None).expect("decode");
        assert_eq!(table.ignored_columns, vec![2]);
        assert!(!table.is_ignored(0));
    }

    #[test]
    fn empty_input_is_a_file_level_error() {
        assert!(matches!(decode_text("", None), Err(IngestError::EmptyFile)));
        assert!(matches!(decode_text(" \n\n", None), Err(IngestError::EmptyFile)));
    }

    #[test]
    fn header_only_input_has_zero_rows() {
        let table = decode_text("Date,Montant\n", None).expect("decode");
        assert!(table.rows.is_empty());
        assert_eq!(table.column_label(1), "Montant");
    }
}
