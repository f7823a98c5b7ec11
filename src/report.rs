//! Plain-text rendering of ingestion results for terminal output.

use std::fmt::Write as _;

use crate::{
    kpi::KpiAggregate,
    model::{ColumnMapping, FinancialRecord, RowError},
    pipeline::{IngestionResult, QualityMetrics},
};

/// Left-aligned columns separated by two spaces; control characters in cells
/// are flattened so every row stays on one line.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| flatten(cell)).collect())
        .collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let _ = writeln!(output, "{}", join_padded(&header_cells, &widths));
    let rules: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let _ = writeln!(output, "{}", join_padded(&rules, &widths));
    for row in &rows {
        let _ = writeln!(output, "{}", join_padded(row, &widths));
    }
    output
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn flatten(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

pub fn render_mappings(mappings: &[ColumnMapping]) -> String {
    let rows: Vec<Vec<String>> = mappings
        .iter()
        .map(|m| {
            vec![
                m.target_field.to_string(),
                m.source_column.clone(),
                (m.column_index + 1).to_string(),
                format!("{:.2}", m.confidence),
                format!("{:?}", m.match_kind).to_lowercase(),
            ]
        })
        .collect();
    render_table(&["field", "column", "position", "confidence", "match"], &rows)
}

pub fn render_kpis(kpis: &KpiAggregate) -> String {
    let mut output = render_table(
        &["metric", "value"],
        &[
            vec!["total income".into(), money(kpis.total_income)],
            vec!["total expense".into(), money(kpis.total_expense)],
            vec!["margin".into(), money(kpis.margin)],
            vec!["margin %".into(), format!("{:.1}", kpis.margin_percent)],
            vec!["records".into(), kpis.record_count.to_string()],
            vec!["income records".into(), kpis.income_count.to_string()],
            vec!["expense records".into(), kpis.expense_count.to_string()],
        ],
    );

    if !kpis.by_category.is_empty() {
        let rows: Vec<Vec<String>> = kpis
            .by_category
            .iter()
            .map(|(name, total)| vec![name.clone(), money(*total)])
            .collect();
        output.push('\n');
        output.push_str(&render_table(&["category", "net"], &rows));
    }
    if !kpis.top_counterparties.is_empty() {
        let rows: Vec<Vec<String>> = kpis
            .top_counterparties
            .iter()
            .map(|c| vec![c.name.clone(), money(c.total), c.count.to_string()])
            .collect();
        output.push('\n');
        output.push_str(&render_table(&["counterparty", "total", "records"], &rows));
    }
    if !kpis.monthly.is_empty() {
        let rows: Vec<Vec<String>> = kpis
            .monthly
            .iter()
            .map(|(month, t)| vec![month.clone(), money(t.income), money(t.expense)])
            .collect();
        output.push('\n');
        output.push_str(&render_table(&["month", "income", "expense"], &rows));
    }
    output
}

pub fn render_quality(metrics: &QualityMetrics) -> String {
    render_table(
        &["quality", "value"],
        &[
            vec!["accuracy".into(), format!("{:.1}%", metrics.accuracy * 100.0)],
            vec!["completeness".into(), format!("{:.1}%", metrics.completeness * 100.0)],
            vec!["rows".into(), metrics.total_rows.to_string()],
            vec!["valid".into(), metrics.valid_rows.to_string()],
            vec!["rejected".into(), metrics.rejected_rows.to_string()],
        ],
    )
}

pub fn render_records(records: &[FinancialRecord]) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.date.format("%Y-%m-%d").to_string(),
                r.kind.to_string(),
                money(r.amount),
                r.description.clone(),
                r.category.clone().unwrap_or_default(),
                r.counterparty.clone().unwrap_or_default(),
                format!("{:.2}", r.confidence),
            ]
        })
        .collect();
    render_table(
        &["date", "type", "amount", "description", "category", "counterparty", "confidence"],
        &rows,
    )
}

pub fn render_errors(errors: &[RowError]) -> String {
    let rows: Vec<Vec<String>> = errors
        .iter()
        .map(|e| vec![e.row.to_string(), e.reason.clone(), e.value.clone().unwrap_or_default()])
        .collect();
    render_table(&["row", "reason", "value"], &rows)
}

/// Full human-readable report; `limit` bounds the record listing.
pub fn render_result(result: &IngestionResult, limit: usize) -> String {
    let mut sections = vec![render_mappings(&result.mappings)];
    if !result.warnings.is_empty() {
        sections.push(
            result
                .warnings
                .iter()
                .map(|w| format!("warning: {w}\n"))
                .collect(),
        );
    }
    if limit > 0 && !result.records.is_empty() {
        let shown = limit.min(result.records.len());
        let mut listing = render_records(&result.records[..shown]);
        if shown < result.records.len() {
            let _ = writeln!(listing, "... {} more record(s)", result.records.len() - shown);
        }
        sections.push(listing);
    }
    sections.push(render_kpis(&result.kpis));
    sections.push(render_quality(&result.quality_metrics));
    if !result.errors.is_empty() {
        sections.push(render_errors(&result.errors));
    }
    sections.join("\n")
}
