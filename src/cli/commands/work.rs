//! `fieldbook work` command - Field work management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{
    confirm, load_config, not_found, open_store, output_format, print_document, print_dry_run,
    validation_failed,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cascade::{execute, DeletePlan};
use crate::core::ReadOptions;
use crate::entities::{FieldWork, WorkType};
use crate::schema::{FormInput, FormValidator};

#[derive(Subcommand, Debug)]
pub enum WorkCommands {
    /// List field works, sorted by id
    List(ListArgs),

    /// Show one field work
    Show(ShowArgs),

    /// Record a new field work
    New(NewArgs),

    /// Change an existing field work
    Edit(EditArgs),

    /// Delete a field work
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only works for this crop
    #[arg(long)]
    pub crop: Option<u64>,

    /// Include related records
    #[arg(long)]
    pub with_relations: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Field work id
    pub id: u64,

    /// Include related records
    #[arg(long)]
    pub with_relations: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Crop the work is done for
    #[arg(long)]
    pub crop: Option<String>,

    /// Employee id
    #[arg(long)]
    pub employee: Option<String>,

    /// Machinery id
    #[arg(long)]
    pub machinery: Option<String>,

    /// Kind of work (e.g. plowing, spraying, harvesting)
    #[arg(long = "type")]
    pub work_type: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Field work id
    pub id: u64,

    #[arg(long)]
    pub crop: Option<String>,

    #[arg(long)]
    pub employee: Option<String>,

    #[arg(long)]
    pub machinery: Option<String>,

    #[arg(long = "type")]
    pub work_type: Option<String>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Field work id
    pub id: u64,

    /// Don't ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,
}

const WORK_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 8),
    ColumnDef::new("crop", "CROP", 8),
    ColumnDef::new("type", "TYPE", 30),
    ColumnDef::new("employee", "EMPLOYEE", 10),
    ColumnDef::new("machinery", "MACHINE", 10),
    ColumnDef::new("start", "START", 12),
    ColumnDef::new("end", "END", 12),
];

pub fn run(cmd: WorkCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        WorkCommands::List(args) => run_list(args, global),
        WorkCommands::Show(args) => run_show(args, global),
        WorkCommands::New(args) => run_new(args, global),
        WorkCommands::Edit(args) => run_edit(args, global),
        WorkCommands::Delete(args) => run_delete(args, global),
    }
}

fn work_type_wire(input: &str) -> Option<&'static str> {
    WorkType::parse_input(input).map(|t| t.wire())
}

fn form(
    crop: Option<&str>,
    employee: Option<&str>,
    machinery: Option<&str>,
    work_type: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> FormInput {
    FormInput::new()
        .number("crop_id", crop)
        .number("employee_id", employee)
        .number("machinery_id", machinery)
        .choice("work_type", work_type, work_type_wire)
        .text("work_start_date", start)
        .text("work_end_date", end)
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let store = open_store(&config)?;

    let mut works = store.list::<FieldWork>(args.with_relations)?;
    if let Some(crop_id) = args.crop {
        works.retain(|w| w.crop_id == crop_id);
    }
    works.sort_by_key(|w| w.work_id);
    if let Some(limit) = args.limit {
        works.truncate(limit);
    }

    if args.count {
        println!("{}", works.len());
        return Ok(());
    }

    let format = output_format(global, &config, OutputFormat::Tsv);
    if works.is_empty() && !matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        if !global.quiet {
            println!("No field works found.");
        }
        return Ok(());
    }

    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_document(&works, format)?,
        _ => {
            let rows = works.iter().map(|w| {
                TableRow::new(w.work_id)
                    .cell("id", CellValue::Id(w.work_id.to_string()))
                    .cell("crop", CellValue::Number(w.crop_id))
                    .cell("type", CellValue::Choice(w.work_type.to_string()))
                    .cell("employee", CellValue::Number(w.employee_id))
                    .cell("machinery", CellValue::Number(w.machinery_id))
                    .cell("start", CellValue::Date(w.work_start_date.clone()))
                    .cell("end", CellValue::Date(w.work_end_date.clone()))
            });
            let mut formatter =
                TableFormatter::new(WORK_COLUMNS, "field work").with_plural("field works");
            if global.quiet {
                formatter = formatter.without_summary();
            }
            formatter.output(rows, format);
        }
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let store = open_store(&config)?;

    let key = args.id.to_string();
    let work = store
        .get::<FieldWork>(&args.id, ReadOptions::with_relations(args.with_relations))
        .map_err(|e| not_found(e, "field work", &key))?
        .ok_or_else(|| miette::miette!("No field work found with key '{}'", key))?;

    match output_format(global, &config, OutputFormat::Yaml) {
        OutputFormat::Id => println!("{}", work.work_id),
        OutputFormat::Json => print_document(&work, OutputFormat::Json)?,
        _ => print_document(&work, OutputFormat::Yaml)?,
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let input = form(
        args.crop.as_deref(),
        args.employee.as_deref(),
        args.machinery.as_deref(),
        args.work_type.as_deref(),
        args.start.as_deref(),
        args.end.as_deref(),
    );
    let draft = FormValidator::default()
        .draft::<FieldWork>(&input)
        .map_err(validation_failed)?;

    let config = load_config(global);
    let store = open_store(&config)?;
    let created = store.create::<FieldWork>(&draft)?;
    let work_id = created.map(|work| work.work_id);

    if global.quiet {
        if let Some(id) = work_id {
            println!("{}", id);
        }
    } else {
        match work_id {
            Some(id) => println!(
                "{} Created field work {}",
                style("✓").green(),
                style(id).cyan()
            ),
            None => println!("{} Created field work", style("✓").green()),
        }
        println!(
            "   {} for crop {}",
            style(draft.work_type).yellow(),
            draft.crop_id
        );
    }

    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let input = form(
        args.crop.as_deref(),
        args.employee.as_deref(),
        args.machinery.as_deref(),
        args.work_type.as_deref(),
        args.start.as_deref(),
        args.end.as_deref(),
    );
    let patch = FormValidator::default()
        .patch::<FieldWork>(&input)
        .map_err(validation_failed)?;

    if args.id == 0 {
        return Err(miette::miette!("No field work found with key '0'"));
    }

    let config = load_config(global);
    let store = open_store(&config)?;
    store
        .update::<FieldWork>(&args.id, &patch)
        .map_err(|e| not_found(e, "field work", &args.id.to_string()))?;

    if !global.quiet {
        println!(
            "{} Updated field work {}",
            style("✓").green(),
            style(args.id).cyan()
        );
    }

    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    if args.id == 0 {
        return Err(miette::miette!("No field work found with key '0'"));
    }

    let plan = DeletePlan::field_work(args.id);
    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    if !confirm(&format!("Delete field work {}?", args.id), args.yes)? {
        println!("{}", style("Cancelled").dim());
        return Ok(());
    }

    let config = load_config(global);
    let store = open_store(&config)?;
    let summary = execute(&store, &plan)?;
    println!("{} {}", style("✓").green(), summary.message());

    Ok(())
}
