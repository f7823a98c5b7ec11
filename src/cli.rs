use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::aliases::SourceSystem;

#[derive(Debug, Parser)]
#[command(author, version, about = "Ingest accounting exports into normalized financial records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize an export and report KPIs, quality metrics and row errors
    Analyze(AnalyzeArgs),
    /// Show which columns map to which canonical fields
    Map(MapArgs),
    /// Print the effective alias table as YAML
    Aliases(AliasesArgs),
    /// Aggregate a JSON array of records produced by another system
    External(ExternalArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Input options shared by the commands that read an export.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Export to ingest (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Field delimiter (supports ',', ';', 'tab', '|'); sniffed when omitted
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input (defaults to utf-8, falling back to windows-1252)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Accounting system that produced the export
    #[arg(long, value_enum, default_value_t = SourceSystem::Generic)]
    pub source: SourceSystem,
    /// YAML file overriding scoring weights, penalties and aliases
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    /// Number of records listed in table output (0 hides the listing)
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct AliasesArgs {
    /// Include the aliases configured in this YAML file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExternalArgs {
    /// JSON array of records (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML file overriding penalties and top-N
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "semicolon" | ";" => Ok(b';'),
        "pipe" | "|" => Ok(b'|'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() || first == '"' {
                return Err("Delimiter must be an ASCII character other than '\"'".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn delimiter_names_and_characters_parse() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("|"), Ok(b'|'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("\"").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_accepts_source_hint() {
        let cli = Cli::try_parse_from([
            "fin-ingest", "analyze", "-i", "export.csv", "--source", "sage", "--format", "json",
        ])
        .expect("parse args");
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.input.source, SourceSystem::Sage);
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.limit, 20);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
