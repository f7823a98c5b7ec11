//! Workbook decoding for spreadsheet uploads (first worksheet only).

use chrono::{Duration, NaiveDate};

use crate::error::IngestError;
#[cfg(feature = "xlsx")]
use crate::{
    decoder::DecodedTable,
    model::{RawCell, RawRow},
};

/// Converts an Excel serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Epoch is 1899-12-30 to absorb the 1900 leap-year bug.
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Renders a numeric cell without float noise (`12.0` becomes `12`).
pub fn render_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(feature = "xlsx")]
pub fn decode_workbook(bytes: &[u8]) -> Result<DecodedTable, IngestError> {
    use std::io::Cursor;

    use calamine::{Data, Reader, open_workbook_auto_from_rs};
    use log::debug;

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::Spreadsheet(format!("Failed to open workbook: {e}")))?;
    let sheet_name = workbook.sheet_names().first().cloned().unwrap_or_default();
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::EmptyFile)?
        .map_err(|e| IngestError::Spreadsheet(format!("Failed to read worksheet: {e}")))?;
    debug!("Decoding worksheet '{sheet_name}'");

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for (offset, cells) in range.rows().enumerate() {
        let number = first_row + offset + 1;
        let rendered: Vec<Option<String>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Empty | Data::Error(_) => None,
                Data::String(s) => Some(s.clone()),
                Data::Float(f) => Some(render_number(*f)),
                Data::Int(i) => Some(i.to_string()),
                Data::Bool(b) => Some(b.to_string()),
                Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
                    .map(|d| d.format("%Y-%m-%d").to_string()),
                Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
            })
            .collect();
        if header.is_none() {
            if rendered.iter().all(|v| v.as_deref().is_none_or(|s| s.trim().is_empty())) {
                continue;
            }
            header = Some(
                rendered
                    .into_iter()
                    .map(|v| v.unwrap_or_default().trim().to_string())
                    .collect(),
            );
            continue;
        }
        let row = RawRow::new(number, rendered.into_iter().map(RawCell::from).collect());
        if row.is_blank() {
            debug!("Skipping blank row {}", row.number);
        } else {
            rows.push(row);
        }
    }

    let header = header.ok_or(IngestError::EmptyFile)?;
    Ok(DecodedTable::from_grid(header, rows, None))
}

#[cfg(not(feature = "xlsx"))]
pub fn decode_workbook(_bytes: &[u8]) -> Result<crate::decoder::DecodedTable, IngestError> {
    Err(IngestError::Spreadsheet(
        "spreadsheet support is not compiled in (enable the `xlsx` feature)".to_string(),
    ))
}
