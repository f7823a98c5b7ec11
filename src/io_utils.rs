//! Input acquisition: reading uploads, resolving encodings and telling
//! spreadsheets apart from delimited text.
//!
//! - **Encoding**: explicit labels go through `encoding_rs`; without a label
//!   a BOM wins, then strict UTF-8, then Windows-1252 (the usual encoding of
//!   Excel and Sage exports).
//! - **stdin**: the `-` path convention reads the upload from standard input.

use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::warn;

use crate::error::IngestError;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<Option<&'static Encoding>, IngestError> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .map(Some)
            .ok_or_else(|| IngestError::UnknownEncoding(value.to_string())),
        None => Ok(None),
    }
}

pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    if is_dash(path) {
        let mut buffer = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .context("Reading upload from stdin")?;
        return Ok(buffer);
    }
    fs::read(path).with_context(|| format!("Opening input file {path:?}"))
}

/// Decodes upload bytes to text.
pub fn decode_input(
    bytes: &[u8],
    encoding: Option<&'static Encoding>,
) -> Result<String, IngestError> {
    if let Some(encoding) = encoding {
        let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
        if had_errors {
            return Err(IngestError::Decode {
                encoding: encoding.name(),
            });
        }
        return Ok(text.into_owned());
    }

    if let Some((bom_encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) =
            bom_encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            return Err(IngestError::Decode {
                encoding: bom_encoding.name(),
            });
        }
        return Ok(text.into_owned());
    }

    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return Ok(text.into_owned());
    }
    warn!("Input is not valid UTF-8; decoding as {}", WINDOWS_1252.name());
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    Ok(text.into_owned())
}

/// True when the path extension or the leading bytes identify a workbook.
pub fn looks_like_spreadsheet(path: Option<&Path>, bytes: &[u8]) -> bool {
    let by_extension = path
        .and_then(|p| p.extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        });
    by_extension || bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
