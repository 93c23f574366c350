//! `fieldbook config` command - Configuration management
//!
//! Values come from, in increasing priority: built-in defaults, the global
//! config file, environment variables and command-line flags. `set` and
//! `unset` edit the global config file.

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_yml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::utils::{load_config, print_document};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a value in the global config file
    Set(SetArgs),

    /// Remove a value from the global config file
    Unset(UnsetArgs),

    /// Show the path to the config file
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., api_url, cache.enabled)
    pub key: String,

    /// Value to set
    pub value: String,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("api_url", "Base URL of the records backend"),
    ("timeout_secs", "Per-request timeout in seconds"),
    ("cache.enabled", "Use the local query cache (true/false)"),
    ("cache.max_age_secs", "Refetch cached responses older than this"),
    (
        "default_format",
        "Default output format (yaml, json, tsv, etc.)",
    ),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args),
        ConfigCommands::Unset(args) => run_unset(args),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let effective = load_config(global).effective();

    if let Some(key) = &args.key {
        check_key(key)?;
        match get_config_value(&effective, key) {
            Some(v) => println!("{}", v),
            None => return Err(miette::miette!("Key '{}' is not set", key)),
        }
        return Ok(());
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_document(&effective, global.format),
        _ => {}
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        print_config_value(key, get_config_value(&effective, key).as_deref());
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Command-line flags (--api-url, --no-cache)");
    println!("  2. Environment variables (FIELDBOOK_API_URL, FIELDBOOK_TIMEOUT)");
    println!("  3. Global config (~/.config/fieldbook/config.yaml)");

    Ok(())
}

fn run_set(args: SetArgs) -> Result<()> {
    check_key(&args.key)?;
    let config_path = get_global_config_path()?;

    let mut root = read_mapping(&config_path)?;
    set_value(&mut root, &args.key, typed_value(&args.key, &args.value)?);

    let yaml = serde_yml::to_string(&root).into_diagnostic()?;
    Config::from_yaml(&yaml)
        .map_err(|e| miette::miette!("'{}' is not valid for {}: {}", args.value, args.key, e))?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    fs::write(&config_path, yaml).into_diagnostic()?;

    println!(
        "{} Set {} {} {}",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow()
    );

    Ok(())
}

fn run_unset(args: UnsetArgs) -> Result<()> {
    check_key(&args.key)?;
    let config_path = get_global_config_path()?;

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut root = read_mapping(&config_path)?;
    if !unset_value(&mut root, &args.key) {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&root).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    println!("{} Removed {}", style("✓").green(), style(&args.key).cyan());

    Ok(())
}

fn run_path() -> Result<()> {
    let path = get_global_config_path()?;
    println!("{}", path.display());
    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'fieldbook config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

// Helper functions

fn get_global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        let keys: Vec<&str> = VALID_KEYS.iter().map(|(k, _)| *k).collect();
        Err(miette::miette!(
            help = format!("Valid keys: {}", keys.join(", ")),
            "Unknown configuration key '{}'",
            key
        ))
    }
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "api_url" => config.api_url.clone(),
        "timeout_secs" => config.timeout_secs.map(|v| v.to_string()),
        "cache.enabled" => config.cache.enabled.map(|v| v.to_string()),
        "cache.max_age_secs" => config.cache.max_age_secs.map(|v| v.to_string()),
        "default_format" => config.default_format.clone(),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

/// Parse the command-line value into the YAML type the key expects
fn typed_value(key: &str, raw: &str) -> Result<Value> {
    match key {
        "timeout_secs" | "cache.max_age_secs" => raw
            .trim()
            .parse::<u64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| miette::miette!("{} must be a whole number of seconds", key)),
        "cache.enabled" => raw
            .trim()
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| miette::miette!("{} must be true or false", key)),
        "default_format" => OutputFormat::from_str(raw.trim(), true)
            .map(|_| Value::String(raw.trim().to_lowercase()))
            .map_err(|_| miette::miette!("Unknown output format '{}'", raw)),
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn read_mapping(path: &Path) -> Result<Mapping> {
    if !path.exists() {
        return Ok(Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<Value>(&content).into_diagnostic()? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(miette::miette!(
            "{} is not a YAML mapping",
            path.display()
        )),
    }
}

/// Set a value, creating the section for dotted keys like `cache.enabled`
fn set_value(root: &mut Mapping, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            root.insert(Value::String(key.to_string()), value);
        }
        Some((section, leaf)) => {
            let section_key = Value::String(section.to_string());
            let mut table = match root.remove(&section_key) {
                Some(Value::Mapping(map)) => map,
                _ => Mapping::new(),
            };
            table.insert(Value::String(leaf.to_string()), value);
            root.insert(section_key, Value::Mapping(table));
        }
    }
}

/// Remove a value; an emptied section goes too
fn unset_value(root: &mut Mapping, key: &str) -> bool {
    match key.split_once('.') {
        None => root.remove(&Value::String(key.to_string())).is_some(),
        Some((section, leaf)) => {
            let section_key = Value::String(section.to_string());
            let Some(Value::Mapping(mut table)) = root.remove(&section_key) else {
                return false;
            };
            let removed = table.remove(&Value::String(leaf.to_string())).is_some();
            if !table.is_empty() {
                root.insert(section_key, Value::Mapping(table));
            }
            removed
        }
    }
}
