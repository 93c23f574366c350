//! `fieldbook crop` command - Crop management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{
    confirm, load_config, not_found, open_store, output_format, print_document, print_dry_run,
    validation_failed,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cascade::{execute, plan_crop_delete};
use crate::core::ReadOptions;
use crate::entities::{Crop, CropStatus};
use crate::schema::{FormInput, FormValidator};

#[derive(Subcommand, Debug)]
pub enum CropCommands {
    /// List crops, sorted by id
    List(ListArgs),

    /// Show one crop
    Show(ShowArgs),

    /// Record a new crop
    New(NewArgs),

    /// Change an existing crop
    Edit(EditArgs),

    /// Delete a crop together with its field works
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only crops on this field
    #[arg(long)]
    pub field: Option<String>,

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
    /// Crop id
    pub id: u64,

    /// Include related records
    #[arg(long)]
    pub with_relations: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Field the crop is planted on
    #[arg(long)]
    pub field: Option<String>,

    /// Name of the cultivated plant
    #[arg(long)]
    pub plant: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Planned harvest date (YYYY-MM-DD)
    #[arg(long)]
    pub harvest: Option<String>,

    /// Harvest in tons
    #[arg(long)]
    pub tons: Option<String>,

    /// Lifecycle stage (e.g. sowing, active, completed)
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Crop id
    pub id: u64,

    /// Move the crop to another field
    #[arg(long)]
    pub field: Option<String>,

    #[arg(long)]
    pub plant: Option<String>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub harvest: Option<String>,

    #[arg(long)]
    pub tons: Option<String>,

    #[arg(long)]
    pub status: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Crop id
    pub id: u64,

    /// Don't ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,
}

const CROP_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 8),
    ColumnDef::new("field", "FIELD", 24),
    ColumnDef::new("plant", "PLANT", 24),
    ColumnDef::new("start", "START", 12),
    ColumnDef::new("harvest", "HARVEST", 12),
    ColumnDef::new("tons", "TONS", 8),
    ColumnDef::new("status", "STATUS", 22),
];

pub fn run(cmd: CropCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CropCommands::List(args) => run_list(args, global),
        CropCommands::Show(args) => run_show(args, global),
        CropCommands::New(args) => run_new(args, global),
        CropCommands::Edit(args) => run_edit(args, global),
        CropCommands::Delete(args) => run_delete(args, global),
    }
}

fn status_wire(input: &str) -> Option<&'static str> {
    CropStatus::parse_input(input).map(|s| s.wire())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let store = open_store(&config)?;

    let mut crops = store.list::<Crop>(args.with_relations)?;
    if let Some(field) = &args.field {
        crops.retain(|c| &c.field_name == field);
    }
    crops.sort_by_key(|c| c.crop_id);
    if let Some(limit) = args.limit {
        crops.truncate(limit);
    }

    if args.count {
        println!("{}", crops.len());
        return Ok(());
    }

    let format = output_format(global, &config, OutputFormat::Tsv);
    if crops.is_empty() && !matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        if !global.quiet {
            println!("No crops found.");
        }
        return Ok(());
    }

    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_document(&crops, format)?,
        _ => {
            let rows = crops.iter().map(|c| {
                TableRow::new(c.crop_id)
                    .cell("id", CellValue::Id(c.crop_id.to_string()))
                    .cell("field", CellValue::Text(c.field_name.clone()))
                    .cell("plant", CellValue::Text(c.cultivated_plant_name.clone()))
                    .cell("start", CellValue::Date(c.crop_start_date.clone()))
                    .cell("harvest", CellValue::Date(c.crop_harvest_date.clone()))
                    .cell("tons", CellValue::Number(c.actual_harvest_tons))
                    .cell("status", CellValue::Status(c.crop_status))
            });
            let mut formatter = TableFormatter::new(CROP_COLUMNS, "crop").with_plural("crops");
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
    let crop = store
        .get::<Crop>(&args.id, ReadOptions::with_relations(args.with_relations))
        .map_err(|e| not_found(e, "crop", &key))?
        .ok_or_else(|| miette::miette!("No crop found with key '{}'", key))?;

    match output_format(global, &config, OutputFormat::Yaml) {
        OutputFormat::Id => println!("{}", crop.crop_id),
        OutputFormat::Json => print_document(&crop, OutputFormat::Json)?,
        _ => print_document(&crop, OutputFormat::Yaml)?,
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let input = FormInput::new()
        .text("field_name", args.field.as_deref())
        .text("cultivated_plant_name", args.plant.as_deref())
        .text("crop_start_date", args.start.as_deref())
        .text("crop_harvest_date", args.harvest.as_deref())
        .number("actual_harvest_tons", args.tons.as_deref())
        .choice("crop_status", args.status.as_deref(), status_wire);
    let draft = FormValidator::default()
        .draft::<Crop>(&input)
        .map_err(validation_failed)?;

    let config = load_config(global);
    let store = open_store(&config)?;
    let created = store.create::<Crop>(&draft)?;
    let crop_id = created.map(|crop| crop.crop_id);

    if global.quiet {
        if let Some(id) = crop_id {
            println!("{}", id);
        }
    } else {
        match crop_id {
            Some(id) => println!("{} Created crop {}", style("✓").green(), style(id).cyan()),
            None => println!("{} Created crop", style("✓").green()),
        }
        println!(
            "   {} on {} ({})",
            style(&draft.cultivated_plant_name).white(),
            style(&draft.field_name).yellow(),
            draft.crop_status
        );
    }

    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let input = FormInput::new()
        .text("field_name", args.field.as_deref())
        .text("cultivated_plant_name", args.plant.as_deref())
        .text("crop_start_date", args.start.as_deref())
        .text("crop_harvest_date", args.harvest.as_deref())
        .number("actual_harvest_tons", args.tons.as_deref())
        .choice("crop_status", args.status.as_deref(), status_wire);
    let patch = FormValidator::default()
        .patch::<Crop>(&input)
        .map_err(validation_failed)?;

    if args.id == 0 {
        return Err(miette::miette!("No crop found with key '0'"));
    }

    let config = load_config(global);
    let store = open_store(&config)?;
    store
        .update::<Crop>(&args.id, &patch)
        .map_err(|e| not_found(e, "crop", &args.id.to_string()))?;

    if !global.quiet {
        println!("{} Updated crop {}", style("✓").green(), style(args.id).cyan());
    }

    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    if args.id == 0 {
        return Err(miette::miette!("No crop found with key '0'"));
    }

    let config = load_config(global);
    let store = open_store(&config)?;
    let plan = plan_crop_delete(&store, args.id)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    let prompt = format!(
        "Delete crop {} and {} field work(s)?",
        args.id,
        plan.dependents().len()
    );
    if !confirm(&prompt, args.yes)? {
        println!("{}", style("Cancelled").dim());
        return Ok(());
    }

    let summary = execute(&store, &plan)?;
    println!("{} {}", style("✓").green(), summary.message());

    Ok(())
}
