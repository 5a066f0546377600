//! The `report` command: runs the whole pipeline for one upload.
//!
//! The command composes the session handlers in order (upload, select
//! columns, set window, report) and prints the result as text tables or JSON.

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::{OutputFormat, ReportArgs},
    data::DateOrder,
    dataset::UploadOptions,
    filter::parse_window_bound,
    load_upload,
    mapping::RoleSelection,
    normalize::NormalizeOptions,
    report::DEFAULT_TITLE,
    session::{Session, SessionSettings},
};

pub fn execute(args: &ReportArgs) -> Result<()> {
    let (filename, bytes, upload) = load_upload(&args.input, args.input_encoding.as_deref())?;
    let selection = resolve_selection(args)?;
    let date_order = if args.day_first {
        DateOrder::DayFirst
    } else {
        DateOrder::MonthFirst
    };

    let mut session = Session::new(settings(args, upload, date_order));
    session
        .upload(&filename, &bytes)
        .with_context(|| format!("Reading upload {:?}", args.input))?;
    session.select_columns(&selection)?;

    let start = args
        .start
        .as_deref()
        .map(|value| parse_window_bound(value, date_order))
        .transpose()?;
    let end = args
        .end
        .as_deref()
        .map(|value| parse_window_bound(value, date_order))
        .transpose()?;
    session.set_window(start, end);

    let report = session.report()?;
    if !report.has_data() {
        info!("No rows left to chart for {:?}", args.input);
    }
    match args.format {
        OutputFormat::Table => print!("{}", report.render_text()),
        OutputFormat::Json => println!(
            "{}",
            report.to_json().context("Serializing report as JSON")?
        ),
    }
    Ok(())
}

fn settings(args: &ReportArgs, upload: UploadOptions, date_order: DateOrder) -> SessionSettings {
    SessionSettings {
        title: args
            .company
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        upload,
        normalize: NormalizeOptions { date_order },
    }
}

fn resolve_selection(args: &ReportArgs) -> Result<RoleSelection> {
    let from_file = match &args.mapping {
        Some(path) => RoleSelection::load(path)
            .with_context(|| format!("Loading mapping from {path:?}"))?,
        None => RoleSelection::default(),
    };
    let overrides = RoleSelection {
        product: args.product.clone(),
        date: args.date.clone(),
        amount: args.amount.clone(),
        category: args.category.clone(),
        region: args.region.clone(),
        staff: args.staff.clone(),
    };
    Ok(from_file.merged_with(overrides))
}
