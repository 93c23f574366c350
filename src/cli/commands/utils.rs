//! Shared utilities for CLI commands

use console::{style, Term};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cascade::DeletePlan;
use crate::core::{Config, HttpTransport, QueryCache, RecordStore, StoreError};
use crate::schema::ValidationError;

/// Load the layered config with this invocation's flags applied
pub fn load_config(global: &GlobalOpts) -> Config {
    let mut config = Config::load();
    config.apply_flags(global.api_url.as_deref(), global.no_cache);
    config
}

/// Open the record store for this invocation.
///
/// A cache that can't be opened is skipped with a warning; every read then
/// goes to the backend.
pub fn open_store(config: &Config) -> Result<RecordStore> {
    let transport = HttpTransport::new(config.api_url(), config.timeout())?;

    let cache = if config.cache_enabled() {
        match Config::cache_path() {
            Some(path) => match QueryCache::open(&path, config.cache_max_age()) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    log::warn!("Query cache disabled: {}", e);
                    None
                }
            },
            None => {
                log::warn!("Query cache disabled: no cache directory");
                None
            }
        }
    } else {
        None
    };

    Ok(RecordStore::new(transport, cache))
}

/// Resolve `--format auto` for this command
pub fn output_format(global: &GlobalOpts, config: &Config, fallback: OutputFormat) -> OutputFormat {
    global
        .format
        .resolve(config.default_format.as_deref(), fallback)
}

/// Ask before a destructive action. `--yes` answers for the user.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !Term::stderr().is_term() {
        return Err(miette::miette!(
            help = "Pass --yes to confirm without a prompt",
            "Refusing to delete without confirmation"
        ));
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}

/// Print a record (or anything serializable) in a document format
pub fn print_document<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
        }
        _ => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

/// Render a delete plan as a numbered table
pub fn plan_table(plan: &DeletePlan) -> String {
    let mut builder = Builder::default();
    builder.push_record(["#", "Kind", "Key"]);
    for (i, step) in plan.steps().iter().enumerate() {
        builder.push_record([
            (i + 1).to_string(),
            step.kind().noun().to_string(),
            step.key(),
        ]);
    }
    builder.build().with(Style::markdown()).to_string()
}

/// Print the plan and what would happen, without deleting anything
pub fn print_dry_run(plan: &DeletePlan) {
    println!(
        "{} delete {} ({} dependent record(s)):",
        style("Would").yellow(),
        style(plan.target()).cyan(),
        plan.dependents().len()
    );
    println!("{}", plan_table(plan));
    println!();
    println!("{}", style("Dry run - no changes made").dim());
}

/// Turn a 404 on a keyed read into a friendlier message
pub fn not_found(err: StoreError, noun: &str, key: &str) -> miette::Report {
    if err.status() == Some(404) {
        miette::miette!("No {} found with key '{}'", noun, key)
    } else {
        err.into()
    }
}

/// Report validation failures, one line per member, then fail
pub fn validation_failed(err: ValidationError) -> miette::Report {
    if let Some(message) = err.form_error() {
        eprintln!("{} {}", style("✗").red(), message);
    }
    for violation in err.violations() {
        eprintln!(
            "{} {}: {}",
            style("✗").red(),
            style(&violation.field).yellow(),
            violation.message
        );
        if let Some(help) = violation.help() {
            eprintln!("  {}", style(help).dim());
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cascade::{CropRef, WorkRef};

    #[test]
    fn test_plan_table_lists_steps_in_order() {
        let works = vec![WorkRef {
            work_id: 501,
            crop_id: 7,
        }];
        let crops = vec![CropRef {
            crop_id: 7,
            field_name: "North-40".to_string(),
        }];
        let plan = DeletePlan::field("North-40", &crops, &works);
        let table = plan_table(&plan);

        let lines: Vec<&str> = table.lines().collect();
        let row_of = |needle: &str| lines.iter().position(|l| l.contains(needle)).unwrap();
        assert!(row_of("501") < row_of(" crop "));
        assert!(row_of(" crop ") < row_of("North-40"));
    }
}
