//! `fieldbook field` command - Field management

use clap::Subcommand;
use console::style;
use miette::Result;
use serde_json::Value;

use crate::cli::commands::utils::{
    confirm, load_config, not_found, open_store, output_format, print_document, print_dry_run,
    validation_failed,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cascade::{execute, plan_field_delete};
use crate::core::ReadOptions;
use crate::entities::field::sort_by_name;
use crate::entities::{Field, SoilType};
use crate::schema::{FormInput, FormValidator};

#[derive(Subcommand, Debug)]
pub enum FieldCommands {
    /// List fields, sorted by name
    List(ListArgs),

    /// Show one field
    Show(ShowArgs),

    /// Create a new field
    New(NewArgs),

    /// Change an existing field
    Edit(EditArgs),

    /// Delete a field together with its crops and their field works
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include each field's crops
    #[arg(long)]
    pub with_crops: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Field name
    pub name: String,

    /// Include the field's crops
    #[arg(long)]
    pub with_crops: bool,

    /// Read the field as an edit form would
    #[arg(long)]
    pub for_update: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Unique field name
    #[arg(long)]
    pub name: Option<String>,

    /// Area in hectares
    #[arg(long)]
    pub area: Option<String>,

    /// Soil type (e.g. chernozem, sandy-loam, clay)
    #[arg(long)]
    pub soil: Option<String>,

    /// Where the field is
    #[arg(long)]
    pub location: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Field name
    pub name: String,

    /// New area in hectares
    #[arg(long)]
    pub area: Option<String>,

    /// New soil type
    #[arg(long)]
    pub soil: Option<String>,

    /// New location
    #[arg(long)]
    pub location: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Field name
    pub name: String,

    /// Don't ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,
}

const FIELD_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("name", "NAME", 30),
    ColumnDef::new("area", "AREA (HA)", 12),
    ColumnDef::new("soil", "SOIL", 16),
    ColumnDef::new("location", "LOCATION", 36),
    ColumnDef::new("crops", "CROPS", 8),
];

pub fn run(cmd: FieldCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        FieldCommands::List(args) => run_list(args, global),
        FieldCommands::Show(args) => run_show(args, global),
        FieldCommands::New(args) => run_new(args, global),
        FieldCommands::Edit(args) => run_edit(args, global),
        FieldCommands::Delete(args) => run_delete(args, global),
    }
}

fn soil_wire(input: &str) -> Option<&'static str> {
    SoilType::parse_input(input).map(|s| s.wire())
}

fn crop_count(field: &Field) -> Option<usize> {
    field
        .extra
        .get("crops")
        .and_then(Value::as_array)
        .map(Vec::len)
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let store = open_store(&config)?;

    let mut fields = store.list::<Field>(args.with_crops)?;
    sort_by_name(&mut fields);
    if let Some(limit) = args.limit {
        fields.truncate(limit);
    }

    if args.count {
        println!("{}", fields.len());
        return Ok(());
    }

    let format = output_format(global, &config, OutputFormat::Tsv);
    if fields.is_empty() && !matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        if !global.quiet {
            println!("No fields found.");
        }
        return Ok(());
    }

    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_document(&fields, format)?,
        _ => {
            let columns = if args.with_crops {
                FIELD_COLUMNS
            } else {
                &FIELD_COLUMNS[..4]
            };
            let rows = fields.iter().map(|f| {
                let crops = match crop_count(f) {
                    Some(n) => CellValue::Number(n as u64),
                    None => CellValue::Empty,
                };
                TableRow::new(&f.field_name)
                    .cell("name", CellValue::Id(f.field_name.clone()))
                    .cell("area", CellValue::Float(f.area_hectares, 2))
                    .cell("soil", CellValue::Choice(f.soil_type.to_string()))
                    .cell("location", CellValue::Text(f.field_location.clone()))
                    .cell("crops", crops)
            });
            let mut formatter = TableFormatter::new(columns, "field").with_plural("fields");
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

    let options = ReadOptions {
        with_relations: args.with_crops,
        for_update: args.for_update,
    };
    let field = store
        .get::<Field>(&args.name, options)
        .map_err(|e| not_found(e, "field", &args.name))?
        .ok_or_else(|| miette::miette!("Field name must not be empty"))?;

    match output_format(global, &config, OutputFormat::Yaml) {
        OutputFormat::Id => println!("{}", field.field_name),
        OutputFormat::Json => print_document(&field, OutputFormat::Json)?,
        _ => print_document(&field, OutputFormat::Yaml)?,
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let input = FormInput::new()
        .text("field_name", args.name.as_deref())
        .number("area_hectares", args.area.as_deref())
        .choice("soil_type", args.soil.as_deref(), soil_wire)
        .text("field_location", args.location.as_deref());
    let draft = FormValidator::default()
        .draft::<Field>(&input)
        .map_err(validation_failed)?;

    let config = load_config(global);
    let store = open_store(&config)?;
    // The name is the key, so the draft says everything the echo would.
    store.create::<Field>(&draft)?;

    if global.quiet {
        println!("{}", draft.field_name);
    } else {
        println!(
            "{} Created field {}",
            style("✓").green(),
            style(&draft.field_name).cyan()
        );
        println!(
            "   {} ha, {}, {}",
            draft.area_hectares,
            style(draft.soil_type).yellow(),
            style(&draft.field_location).dim()
        );
    }

    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    if args.name.is_empty() {
        return Err(miette::miette!("Field name must not be empty"));
    }

    let input = FormInput::new()
        .number("area_hectares", args.area.as_deref())
        .choice("soil_type", args.soil.as_deref(), soil_wire)
        .text("field_location", args.location.as_deref());
    let patch = FormValidator::default()
        .patch::<Field>(&input)
        .map_err(validation_failed)?;

    let config = load_config(global);
    let store = open_store(&config)?;
    store
        .update::<Field>(&args.name, &patch)
        .map_err(|e| not_found(e, "field", &args.name))?;

    if !global.quiet {
        println!(
            "{} Updated field {}",
            style("✓").green(),
            style(&args.name).cyan()
        );
    }

    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    if args.name.is_empty() {
        return Err(miette::miette!("Field name must not be empty"));
    }

    let config = load_config(global);
    let store = open_store(&config)?;
    let plan = plan_field_delete(&store, &args.name)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    let expected = plan.summary();
    let prompt = format!(
        "Delete field '{}' with {} crop(s) and {} field work(s)?",
        args.name, expected.crops_deleted, expected.works_deleted
    );
    if !confirm(&prompt, args.yes)? {
        println!("{}", style("Cancelled").dim());
        return Ok(());
    }

    let summary = execute(&store, &plan)?;
    println!("{} {}", style("✓").green(), summary.message());

    Ok(())
}
