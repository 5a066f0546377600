//! Error taxonomy for the upload → mapping → normalization pipeline.
//!
//! Only validation failures are errors. Rows whose amount or date cannot be
//! coerced are dropped and counted (see [`crate::normalize::DropSummary`]),
//! and an empty result is a valid "no data" state rather than an error.

use std::fmt;

use thiserror::Error;

use crate::mapping::Role;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported file format for '{filename}'; upload a .csv, .tsv, .xlsx, .xlsm, .xls or .ods file")]
    UnsupportedFileFormat { filename: String },
    #[error("Upload '{filename}' does not contain a header row")]
    EmptyUpload { filename: String },
    #[error("Failed to decode upload using encoding {encoding}")]
    Decode { encoding: &'static str },
    #[error("Invalid column mapping: {0}")]
    InvalidMapping(MappingProblem),
    #[error("Failed to load mapping file: {0}")]
    MappingFile(String),
    #[error("No dataset has been uploaded in this session")]
    NoDataset,
    #[error("Columns have not been selected for the uploaded dataset")]
    MappingNotSelected,
    #[error("Row on line {line} has {fields} field(s) but the header has {expected}")]
    WideRow {
        line: u64,
        fields: usize,
        expected: usize,
    },
    #[error("Malformed delimited text: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingProblem {
    MissingRole(Role),
    UnknownColumn { role: Role, column: String },
}

impl fmt::Display for MappingProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingProblem::MissingRole(role) => {
                write!(f, "choose a column for the {role} role")
            }
            MappingProblem::UnknownColumn { role, column } => write!(
                f,
                "column '{column}' selected for the {role} role does not exist in the upload"
            ),
        }
    }
}

impl PipelineError {
    pub fn is_invalid_mapping(&self) -> bool {
        matches!(self, PipelineError::InvalidMapping(_))
    }
}
