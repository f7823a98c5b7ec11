//! End-to-end ingestion: decode, map, then normalize and aggregate in one pass.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    adapter::ExternalRecord,
    aliases::SourceSystem,
    audit,
    config::IngestConfig,
    decoder::{self, DecodedTable},
    error::IngestError,
    io_utils,
    kpi::{KpiAccumulator, KpiAggregate},
    mapper::{ColumnMapper, MappingOutcome},
    model::{CanonicalField, ColumnMapping, FinancialRecord, RowError, SourceId},
    normalize::{IdGenerator, Normalizer, RowOutcome},
    spreadsheet,
};

pub const TYPE_INFERRED_WARNING: &str =
    "no type column mapped: income and expense were inferred from the amount sign, so those records stay below full confidence";

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Forces a delimiter instead of sniffing one.
    pub delimiter: Option<u8>,
    /// `encoding_rs` label; `None` means UTF-8 with a Windows-1252 fallback.
    pub encoding: Option<String>,
    pub source: SourceSystem,
    pub config: IngestConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// Records kept at full confidence over all data rows.
    pub accuracy: f64,
    /// Rows whose date and amount parsed without fallback over all data rows.
    pub completeness: f64,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub rejected_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub records: Vec<FinancialRecord>,
    pub kpis: KpiAggregate,
    pub quality_metrics: QualityMetrics,
    pub errors: Vec<RowError>,
    pub warnings: Vec<String>,
    pub mappings: Vec<ColumnMapping>,
}

/// Decodes upload bytes into a table, routing workbooks to the spreadsheet
/// reader and everything else through text decoding.
pub fn decode_bytes(
    bytes: &[u8],
    path_hint: Option<&Path>,
    options: &IngestOptions,
) -> Result<(DecodedTable, SourceId), IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    if io_utils::looks_like_spreadsheet(path_hint, bytes) {
        debug!("Input recognised as a workbook");
        return Ok((spreadsheet::decode_workbook(bytes)?, SourceId::SpreadsheetUpload));
    }
    let encoding = io_utils::resolve_encoding(options.encoding.as_deref())?;
    let text = io_utils::decode_input(bytes, encoding)?;
    Ok((decoder::decode_text(&text, options.delimiter)?, SourceId::CsvUpload))
}

/// Runs the column mapper over the table's leading sample rows.
pub fn map_table(table: &DecodedTable, options: &IngestOptions) -> MappingOutcome {
    let config = &options.config;
    let mapper = ColumnMapper::new(&config.alias_table(), options.source, config.scoring.clone());
    let sample_len = config.sample_rows.min(table.rows.len());
    mapper.map_columns(&table.header, &table.rows[..sample_len], &table.ignored_columns)
}

pub fn ingest_table(
    table: &DecodedTable,
    source_id: SourceId,
    options: &IngestOptions,
    ids: &mut IdGenerator,
) -> Result<IngestionResult, IngestError> {
    if table.rows.is_empty() {
        return Err(IngestError::NoDataRows);
    }
    let mapping = map_table(table, options);
    let labels: Vec<String> = (0..table.header.len())
        .map(|column| table.column_label(column))
        .collect();
    let normalizer = Normalizer::new(
        &mapping,
        &labels,
        options.config.penalties.clone(),
        source_id,
    );

    let mut kpis = KpiAccumulator::new();
    let mut records = Vec::with_capacity(table.rows.len());
    let mut errors = Vec::new();
    for row in &table.rows {
        match normalizer.normalize(row, ids) {
            RowOutcome::Record { record, clean } => {
                kpis.note_row(clean);
                kpis.ingest(&record);
                audit::log_record(&record);
                records.push(record);
            }
            RowOutcome::Rejected(error) => {
                kpis.note_row(false);
                errors.push(error);
            }
        }
    }

    let kpis = kpis.finish(options.config.top_counterparties);
    let total_rows = table.rows.len();
    let confident = records.iter().filter(|r| r.confidence >= 1.0).count();
    let quality_metrics = QualityMetrics {
        accuracy: confident as f64 / total_rows as f64,
        completeness: kpis.data_quality,
        total_rows,
        valid_rows: records.len(),
        rejected_rows: errors.len(),
    };
    if !errors.is_empty() {
        warn!("{} row(s) rejected during normalization", errors.len());
    }
    let mut warnings = mapping.warnings.clone();
    if !mapping.is_mapped(CanonicalField::Type) && !records.is_empty() {
        warnings.push(TYPE_INFERRED_WARNING.to_string());
    }
    info!(
        "Ingested {} record(s) from {} row(s): income {:.2}, expense {:.2}, accuracy {:.1}%",
        records.len(),
        total_rows,
        kpis.total_income,
        kpis.total_expense,
        quality_metrics.accuracy * 100.0
    );

    Ok(IngestionResult {
        records,
        kpis,
        quality_metrics,
        errors,
        warnings,
        mappings: mapping.mappings,
    })
}

pub fn ingest_text(text: &str, options: &IngestOptions) -> Result<IngestionResult, IngestError> {
    let table = decoder::decode_text(text, options.delimiter)?;
    ingest_table(&table, SourceId::CsvUpload, options, &mut IdGenerator::new())
}

pub fn ingest_bytes(
    bytes: &[u8],
    path_hint: Option<&Path>,
    options: &IngestOptions,
) -> Result<IngestionResult, IngestError> {
    let (table, source_id) = decode_bytes(bytes, path_hint, options)?;
    ingest_table(&table, source_id, options, &mut IdGenerator::new())
}

pub fn ingest_path(path: &Path, options: &IngestOptions) -> Result<IngestionResult> {
    let bytes = io_utils::read_input(path)?;
    let hint = (!io_utils::is_dash(path)).then_some(path);
    ingest_bytes(&bytes, hint, options).with_context(|| format!("Ingesting {path:?}"))
}

/// Aggregates records handed over by another system. Nothing is rejected:
/// undated entries fall back to their due date or `ingested_on`. A carried id
/// already seen in the batch is replaced by a generated one.
pub fn ingest_external(
    external: Vec<ExternalRecord>,
    ingested_on: NaiveDate,
    config: &IngestConfig,
    ids: &mut IdGenerator,
) -> IngestionResult {
    let mut kpis = KpiAccumulator::new();
    let mut seen = HashSet::new();
    let records: Vec<FinancialRecord> = external
        .into_iter()
        .map(|item| {
            let (mut record, clean) = item.into_record(ids, ingested_on, &config.penalties);
            while !seen.insert(record.id.clone()) {
                let fresh = ids.next_id();
                debug!("Duplicate external id {:?} replaced by {fresh}", record.id);
                record.id = fresh;
            }
            kpis.note_row(clean);
            kpis.ingest(&record);
            audit::log_record(&record);
            record
        })
        .collect();
    let kpis = kpis.finish(config.top_counterparties);
    let total_rows = records.len();
    let confident = records.iter().filter(|r| r.confidence >= 1.0).count();
    let accuracy = if total_rows == 0 {
        0.0
    } else {
        confident as f64 / total_rows as f64
    };
    IngestionResult {
        quality_metrics: QualityMetrics {
            accuracy,
            completeness: kpis.data_quality,
            total_rows,
            valid_rows: total_rows,
            rejected_rows: 0,
        },
        records,
        kpis,
        errors: Vec::new(),
        warnings: Vec::new(),
        mappings: Vec::new(),
    }
}

/// Reads a JSON array of external records and aggregates them as of today.
pub fn ingest_external_path(path: &Path, config: &IngestConfig) -> Result<IngestionResult> {
    let bytes = io_utils::read_input(path)?;
    let external: Vec<ExternalRecord> = serde_json::from_slice(&bytes)
        .with_context(|| format!("Parsing external records from {path:?}"))?;
    Ok(ingest_external(
        external,
        Utc::now().date_naive(),
        config,
        &mut IdGenerator::new(),
    ))
}
