pub mod aggregate;
pub mod cli;
pub mod columns;
pub mod data;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod io_utils;
pub mod mapping;
pub mod normalize;
pub mod preview;
pub mod report;
pub mod report_cmd;
pub mod session;
pub mod table;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use crate::{
    cli::{Cli, Commands},
    dataset::{Dataset, UploadOptions},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("salesboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Columns(args) => columns::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Report(args) => report_cmd::execute(&args),
    }
}

/// Reads a file from disk and hands its bytes to the upload parser, the way
/// an upload widget would.
pub(crate) fn load_upload(path: &Path, encoding: Option<&str>) -> Result<(String, Vec<u8>, UploadOptions)> {
    let options = UploadOptions {
        encoding: io_utils::resolve_encoding(encoding)?,
    };
    let bytes = fs::read(path).with_context(|| format!("Opening input file {path:?}"))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((filename, bytes, options))
}

pub(crate) fn read_dataset(path: &Path, encoding: Option<&str>) -> Result<Dataset> {
    let (filename, bytes, options) = load_upload(path, encoding)?;
    dataset::read_upload(&filename, &bytes, &options)
        .with_context(|| format!("Reading upload {path:?}"))
}
