//! Column listing for an upload.
//!
//! Prints every header with its position and the first non-blank value so
//! the user can decide which column plays which role.

use anyhow::Result;
use log::info;

use crate::{cli::ColumnsArgs, read_dataset, table};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let dataset = read_dataset(&args.input, args.input_encoding.as_deref())?;

    let rows = dataset
        .headers()
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let sample = dataset
                .rows()
                .iter()
                .map(|row| &row[idx])
                .find(|cell| !cell.is_blank())
                .map(|cell| cell.as_display())
                .unwrap_or_default();
            vec![(idx + 1).to_string(), header.clone(), sample]
        })
        .collect::<Vec<_>>();

    let headers = vec!["#".to_string(), "column".to_string(), "sample".to_string()];
    print!("{}", table::render_table(&headers, &rows, &[]));
    info!(
        "Listed {} column(s) from {:?}",
        dataset.headers().len(),
        args.input
    );
    Ok(())
}
