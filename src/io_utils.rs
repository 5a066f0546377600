//! Upload format detection, text decoding, and CSV reader construction.
//!
//! The core never touches the filesystem for uploads: callers hand over the
//! raw bytes together with the declared filename, and the extension decides
//! how those bytes are parsed.
//!
//! - **Format detection**: `.csv` → comma, `.tsv` → tab, `.xlsx`/`.xlsm`/
//!   `.xls`/`.ods` → first worksheet of a workbook.
//! - **Encoding**: delimited text is decoded via `encoding_rs`, defaulting to
//!   UTF-8.

use std::{io::Read, path::Path};

use anyhow::{Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Delimited(u8),
    Workbook,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> PipelineResult<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("csv") => Ok(FileFormat::Delimited(DEFAULT_CSV_DELIMITER)),
            Some("tsv") => Ok(FileFormat::Delimited(DEFAULT_TSV_DELIMITER)),
            Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(FileFormat::Workbook),
            _ => Err(PipelineError::UnsupportedFileFormat {
                filename: filename.to_string(),
            }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FileFormat::Delimited(delimiter) => {
                format!("delimited text ('{}')", printable_delimiter(*delimiter))
            }
            FileFormat::Workbook => "spreadsheet workbook".to_string(),
        }
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Short records are accepted here; callers pad them to the header width.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> PipelineResult<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(PipelineError::Decode {
            encoding: encoding.name(),
        })
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> PipelineResult<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(
            FileFormat::from_filename("Sales.CSV").unwrap(),
            FileFormat::Delimited(b',')
        );
        assert_eq!(
            FileFormat::from_filename("sales.tsv").unwrap(),
            FileFormat::Delimited(b'\t')
        );
        assert_eq!(
            FileFormat::from_filename("report.XLSX").unwrap(),
            FileFormat::Workbook
        );
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        for name in ["sales.json", "sales", "archive.csv.gz"] {
            let err = FileFormat::from_filename(name).unwrap_err();
            assert!(matches!(err, PipelineError::UnsupportedFileFormat { .. }));
        }
    }

    #[test]
    fn resolve_encoding_defaults_to_utf8() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(
            resolve_encoding(Some("windows-1252")).unwrap().name(),
            "windows-1252"
        );
        assert!(resolve_encoding(Some("klingon")).is_err());
    }

    #[test]
    fn decode_bytes_reports_invalid_input() {
        let err = decode_bytes(&[b'a', 0xc3], UTF_8).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { encoding: "UTF-8" }));
        assert_eq!(decode_bytes("café".as_bytes(), UTF_8).unwrap(), "café");
    }
}
