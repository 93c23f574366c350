//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    cache::CacheCommands, completions::CompletionsArgs, config::ConfigCommands,
    crop::CropCommands, field::FieldCommands, work::WorkCommands,
};

#[derive(Parser)]
#[command(name = "fieldbook")]
#[command(author, version, about = "Farm records from the command line")]
#[command(
    long_about = "Keep track of fields, the crops planted on them and the field work done for each crop, against a fieldbook REST backend."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Backend base URL (overrides config and FIELDBOOK_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Bypass the local query cache
    #[arg(long, global = true)]
    pub no_cache: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Field management
    #[command(subcommand)]
    Field(FieldCommands),

    /// Crop management
    #[command(subcommand)]
    Crop(CropCommands),

    /// Field work management
    #[command(subcommand)]
    Work(WorkCommands),

    /// Manage the local query cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Show or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl OutputFormat {
    /// Resolve `auto` against the configured default, then the command's own
    pub fn resolve(self, configured: Option<&str>, fallback: OutputFormat) -> OutputFormat {
        if self != OutputFormat::Auto {
            return self;
        }
        configured
            .and_then(|name| OutputFormat::from_str(name, true).ok())
            .filter(|f| *f != OutputFormat::Auto)
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            OutputFormat::Auto.resolve(None, OutputFormat::Tsv),
            OutputFormat::Tsv
        );
        assert_eq!(
            OutputFormat::Auto.resolve(Some("json"), OutputFormat::Tsv),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::Csv.resolve(Some("json"), OutputFormat::Tsv),
            OutputFormat::Csv
        );
        assert_eq!(
            OutputFormat::Auto.resolve(Some("bogus"), OutputFormat::Yaml),
            OutputFormat::Yaml
        );
    }

    #[test]
    fn test_parse_crop_delete() {
        let cli = Cli::try_parse_from(["fieldbook", "crop", "delete", "7", "--yes", "--no-cache"])
            .unwrap();
        assert!(cli.global.no_cache);
        assert!(matches!(cli.command, Commands::Crop(_)));
    }
}
