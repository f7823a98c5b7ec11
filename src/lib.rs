pub mod adapter;
pub mod aliases;
pub mod audit;
pub mod cli;
pub mod config;
pub mod data;
pub mod decoder;
pub mod error;
pub mod io_utils;
pub mod kpi;
pub mod mapper;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod spreadsheet;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{AliasesArgs, AnalyzeArgs, Cli, Commands, ExternalArgs, InputArgs, MapArgs, OutputFormat},
    config::IngestConfig,
    pipeline::{IngestOptions, IngestionResult},
};

pub use crate::{
    error::IngestError,
    model::{FinancialRecord, RowError},
    pipeline::{ingest_bytes, ingest_path, ingest_text},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("fin_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Map(args) => handle_map(&args),
        Commands::Aliases(args) => handle_aliases(&args),
        Commands::External(args) => handle_external(&args),
    }
}

fn load_config(path: Option<&Path>) -> Result<IngestConfig> {
    match path {
        Some(path) => {
            IngestConfig::load(path).with_context(|| format!("Loading config from {path:?}"))
        }
        None => Ok(IngestConfig::default()),
    }
}

fn build_options(args: &InputArgs) -> Result<IngestOptions> {
    Ok(IngestOptions {
        delimiter: args.delimiter,
        encoding: args.input_encoding.clone(),
        source: args.source,
        config: load_config(args.config.as_deref())?,
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Serializing output as JSON")?;
    println!("{json}");
    Ok(())
}

fn emit_result(result: &IngestionResult, format: OutputFormat, limit: usize) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            print!("{}", report::render_result(result, limit));
            Ok(())
        }
    }
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<()> {
    info!(
        "Analyzing '{}' (source {:?})",
        args.input.input.display(),
        args.input.source
    );
    let options = build_options(&args.input)?;
    let result = pipeline::ingest_path(&args.input.input, &options)?;
    emit_result(&result, args.format, args.limit)
}

fn handle_map(args: &MapArgs) -> Result<()> {
    let options = build_options(&args.input)?;
    let bytes = io_utils::read_input(&args.input.input)?;
    let hint = (!io_utils::is_dash(&args.input.input)).then_some(args.input.input.as_path());
    let (table, source_id) = pipeline::decode_bytes(&bytes, hint, &options)
        .with_context(|| format!("Decoding {:?}", args.input.input))?;
    debug!(
        "Decoded {} column(s) and {} row(s) as {}",
        table.header.len(),
        table.rows.len(),
        source_id.as_str()
    );
    let outcome = pipeline::map_table(&table, &options);
    match args.format {
        OutputFormat::Json => print_json(&outcome.mappings),
        OutputFormat::Table => {
            print!("{}", report::render_mappings(&outcome.mappings));
            for warning in &outcome.warnings {
                println!("warning: {warning}");
            }
            Ok(())
        }
    }
}

fn handle_aliases(args: &AliasesArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let yaml = serde_yaml::to_string(&config.alias_table()).context("Serializing alias table")?;
    print!("{yaml}");
    Ok(())
}

fn handle_external(args: &ExternalArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let result = pipeline::ingest_external_path(&args.input, &config)?;
    emit_result(&result, args.format, 20)
}
