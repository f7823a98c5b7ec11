//! Tunable ingestion policy, loadable from a YAML file.
//!
//! ```yaml
//! sample_rows: 20
//! top_counterparties: 10
//! scoring:
//!   header_weight: 0.7
//!   shape_weight: 0.3
//! penalties:
//!   coerced_amount: 0.3
//! aliases:
//!   fields:
//!     amount: [betrag]
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::aliases::AliasTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub header_weight: f64,
    pub shape_weight: f64,
    /// Share of an exact match credited when an alias only appears inside the header.
    pub substring_credit: f64,
    /// Combined score a column must exceed to be mapped.
    pub threshold: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            header_weight: 0.7,
            shape_weight: 0.3,
            substring_credit: 0.6,
            threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidencePenalties {
    pub missing_date: f64,
    pub coerced_amount: f64,
    pub inferred_type: f64,
    pub fallback_description: f64,
    /// Ceiling applied to every record when `date` or `amount` has no column.
    pub missing_mapping_cap: f64,
}

impl Default for ConfidencePenalties {
    fn default() -> Self {
        Self {
            missing_date: 0.4,
            coerced_amount: 0.3,
            inferred_type: 0.1,
            fallback_description: 0.1,
            missing_mapping_cap: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub sample_rows: usize,
    pub top_counterparties: usize,
    pub scoring: ScoringWeights,
    pub penalties: ConfidencePenalties,
    /// Aliases added on top of the built-in table.
    pub aliases: AliasTable,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sample_rows: 20,
            top_counterparties: 10,
            scoring: ScoringWeights::default(),
            penalties: ConfidencePenalties::default(),
            aliases: AliasTable::default(),
        }
    }
}

impl IngestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: IngestConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: IngestConfig = serde_yaml::from_str(text).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.sample_rows > 0, "sample_rows must be positive");
        let weights = &self.scoring;
        ensure!(
            weights.header_weight >= 0.0 && weights.shape_weight >= 0.0,
            "scoring weights cannot be negative"
        );
        ensure!(
            (weights.header_weight + weights.shape_weight - 1.0).abs() < 1e-9,
            "header_weight + shape_weight must equal 1.0"
        );
        ensure!(
            (0.0..=1.0).contains(&weights.substring_credit),
            "substring_credit must be within [0, 1]"
        );
        ensure!(
            (0.0..1.0).contains(&weights.threshold),
            "threshold must be within [0, 1)"
        );
        let p = &self.penalties;
        for (name, value) in [
            ("missing_date", p.missing_date),
            ("coerced_amount", p.coerced_amount),
            ("inferred_type", p.inferred_type),
            ("fallback_description", p.fallback_description),
            ("missing_mapping_cap", p.missing_mapping_cap),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "penalty {name} must be within [0, 1]"
            );
        }
        Ok(())
    }

    /// Built-in aliases extended with the configured ones.
    pub fn alias_table(&self) -> AliasTable {
        let mut table = AliasTable::builtin();
        table.merge(&self.aliases);
        table
    }
}
