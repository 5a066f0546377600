use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Turn sales spreadsheets into chart-ready summary tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the columns of a .csv/.xlsx upload so they can be assigned to roles
    Columns(ColumnsArgs),
    /// Preview the first few rows of an upload in a formatted table
    Preview(PreviewArgs),
    /// Map columns to roles and print the dashboard summary and chart tables
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Uploaded file (.csv, .tsv, .xlsx, .xlsm, .xls, .ods)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Character encoding of delimited text (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Uploaded file (.csv, .tsv, .xlsx, .xlsm, .xls, .ods)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Character encoding of delimited text (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Uploaded file (.csv, .tsv, .xlsx, .xlsm, .xls, .ods)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML file assigning columns to roles (flags below override it)
    #[arg(short, long)]
    pub mapping: Option<PathBuf>,
    /// Column holding the product name
    #[arg(long)]
    pub product: Option<String>,
    /// Column holding the sale date
    #[arg(long)]
    pub date: Option<String>,
    /// Column holding the sale amount
    #[arg(long)]
    pub amount: Option<String>,
    /// Optional column holding the product category ('-' for none)
    #[arg(long)]
    pub category: Option<String>,
    /// Optional column holding the sales region ('-' for none)
    #[arg(long)]
    pub region: Option<String>,
    /// Optional column holding the sales staff member ('-' for none)
    #[arg(long)]
    pub staff: Option<String>,
    /// First day of the date filter (defaults to the earliest sale)
    #[arg(long)]
    pub start: Option<String>,
    /// Last day of the date filter (defaults to the latest sale)
    #[arg(long)]
    pub end: Option<String>,
    /// Read ambiguous dates such as 03/04/2024 as day/month/year
    #[arg(long = "day-first")]
    pub day_first: bool,
    /// Company name shown as the report title
    #[arg(long)]
    pub company: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Character encoding of delimited text (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
