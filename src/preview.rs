use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, read_dataset, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let dataset = read_dataset(&args.input, args.input_encoding.as_deref())?;
    let rows = dataset
        .rows()
        .iter()
        .take(args.rows)
        .map(|row| row.iter().map(|cell| cell.as_display()).collect())
        .collect::<Vec<Vec<String>>>();

    print!("{}", table::render_table(dataset.headers(), &rows, &[]));
    info!(
        "Displayed {} of {} row(s) from {:?}",
        rows.len(),
        dataset.len(),
        args.input
    );
    Ok(())
}
