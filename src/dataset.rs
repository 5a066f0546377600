//! Parsed uploads.
//!
//! A [`Dataset`] is rectangular: every row holds exactly one cell per header.
//! It is never mutated after parsing; later stages derive new values from it.

use std::{
    collections::{HashMap, HashSet},
    io::Cursor,
};

use calamine::{Data, DataType, Reader, open_workbook_auto_from_rs};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    data::Cell,
    error::{PipelineError, PipelineResult},
    io_utils::{self, FileFormat},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Builds a dataset, padding short rows with blanks. Rows wider than the
    /// header grow the header with synthetic `column_<n>` names.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut headers = headers;
        let width = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(headers.len());
        while headers.len() < width {
            headers.push(synthetic_header(headers.len()));
        }
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn from_text_rows<H, R, S>(headers: H, rows: R) -> Self
    where
        H: IntoIterator<Item = S>,
        R: IntoIterator<Item = Vec<S>>,
        S: AsRef<str>,
    {
        let headers = headers
            .into_iter()
            .map(|h| h.as_ref().to_string())
            .collect();
        let rows = rows
            .into_iter()
            .map(|row| row.iter().map(|v| Cell::from_text(v.as_ref())).collect())
            .collect();
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    pub encoding: &'static Encoding,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
        }
    }
}

/// Parses uploaded bytes according to the declared filename's extension.
pub fn read_upload(
    filename: &str,
    bytes: &[u8],
    options: &UploadOptions,
) -> PipelineResult<Dataset> {
    let format = FileFormat::from_filename(filename)?;
    debug!("Reading '{filename}' as {}", format.describe());
    let dataset = match format {
        FileFormat::Delimited(delimiter) => {
            read_delimited(filename, bytes, delimiter, options.encoding)?
        }
        FileFormat::Workbook => read_workbook(filename, bytes)?,
    };
    info!(
        "Loaded {} row(s) across {} column(s) from '{filename}'",
        dataset.len(),
        dataset.headers().len()
    );
    Ok(dataset)
}

fn read_delimited(
    filename: &str,
    bytes: &[u8],
    delimiter: u8,
    encoding: &'static Encoding,
) -> PipelineResult<Dataset> {
    let mut reader = io_utils::open_csv_reader(bytes, delimiter);
    let raw_headers = reader.byte_headers()?.clone();
    let headers = io_utils::decode_record(&raw_headers, encoding)?;
    if headers.iter().all(|h| clean_header(h).is_empty()) {
        return Err(PipelineError::EmptyUpload {
            filename: filename.to_string(),
        });
    }
    let headers = name_headers(headers.iter().map(String::as_str));

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(PipelineError::WideRow {
                line: record.position().map_or(0, |pos| pos.line()),
                fields: record.len(),
                expected: headers.len(),
            });
        }
        let decoded = io_utils::decode_record(&record, encoding)?;
        rows.push(decoded.iter().map(|v| Cell::from_text(v)).collect());
    }
    Ok(Dataset::new(headers, rows))
}

fn read_workbook(filename: &str, bytes: &[u8]) -> PipelineResult<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::EmptyUpload {
            filename: filename.to_string(),
        })??;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Err(PipelineError::EmptyUpload {
            filename: filename.to_string(),
        });
    };
    let header_text = header_row
        .iter()
        .map(|cell| workbook_cell(cell).as_display())
        .collect::<Vec<_>>();
    if header_text.iter().all(|h| clean_header(h).is_empty()) {
        return Err(PipelineError::EmptyUpload {
            filename: filename.to_string(),
        });
    }
    let headers = name_headers(header_text.iter().map(String::as_str));
    let rows = sheet_rows
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect();
    Ok(Dataset::new(headers, rows))
}

fn workbook_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from_text(s),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        other => match other.as_datetime() {
            Some(dt) => Cell::DateTime(dt),
            None => Cell::from_text(&other.to_string()),
        },
    }
}

fn clean_header(raw: &str) -> &str {
    raw.trim_start_matches('\u{feff}').trim()
}

/// Cleans header names and makes them unique: repeats of `amt` become
/// `amt.1`, `amt.2`, skipping any suffix already taken.
fn name_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let cleaned = raw
        .enumerate()
        .map(|(idx, header)| {
            let cleaned = clean_header(header);
            if cleaned.is_empty() {
                synthetic_header(idx)
            } else {
                cleaned.to_string()
            }
        })
        .collect::<Vec<_>>();

    let mut taken = cleaned.iter().cloned().collect::<HashSet<_>>();
    let mut seen = HashSet::new();
    let mut repeats: HashMap<String, usize> = HashMap::new();
    cleaned
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let counter = repeats.entry(name.clone()).or_insert(0);
            loop {
                *counter += 1;
                let candidate = format!("{name}.{counter}");
                if taken.insert(candidate.clone()) {
                    debug!("Renamed duplicate header '{name}' to '{candidate}'");
                    return candidate;
                }
            }
        })
        .collect()
}

fn synthetic_header(idx: usize) -> String {
    format!("column_{}", idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_csv(text: &str) -> PipelineResult<Dataset> {
        read_upload("sales.csv", text.as_bytes(), &UploadOptions::default())
    }

    #[test]
    fn csv_upload_uses_first_row_as_header() {
        let dataset = read_csv("product,date,amount\nA,2024-01-01,10\nB,,5\n").unwrap();
        assert_eq!(dataset.headers(), ["product", "date", "amount"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows()[1][1], Cell::Empty);
        assert_eq!(dataset.rows()[0][0], Cell::Text("A".into()));
    }

    #[test]
    fn headers_are_trimmed_and_blank_headers_named() {
        let dataset = read_csv("\u{feff} product ,,amount\nA,x,1\n").unwrap();
        assert_eq!(dataset.headers(), ["product", "column_2", "amount"]);
    }

    #[test]
    fn empty_upload_is_reported() {
        let err = read_csv("").unwrap_err();
        assert!(matches!(err, PipelineError::EmptyUpload { .. }));
    }

    #[test]
    fn short_rows_are_padded_and_left_to_normalization() {
        use crate::{
            mapping::{OptionalRole, RoleSelection},
            normalize::{NormalizeOptions, normalize},
        };

        let dataset =
            read_csv("p,d,amt,region\nA,2024-01-01,10,Jawa\nB,2024-01-02,5\nC,2024-01-03\n")
                .unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.rows()[1][3], Cell::Empty);
        assert_eq!(dataset.rows()[2][2], Cell::Empty);

        let mapping = RoleSelection::new("p", "d", "amt")
            .with(OptionalRole::Region, "region")
            .validate(&dataset)
            .unwrap();
        let data = normalize(&dataset, &mapping, &NormalizeOptions::default());
        assert_eq!(data.len(), 2);
        assert_eq!(data.records()[1].region, None);
        assert_eq!(data.drop_summary().invalid_amount, 1);
    }

    #[test]
    fn rows_wider_than_the_header_are_rejected() {
        let err = read_csv("a,b\n1,2\n1,2,3\n").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::WideRow {
                line: 3,
                fields: 3,
                expected: 2
            }
        ));
    }

    #[test]
    fn duplicate_headers_get_numbered_suffixes() {
        let dataset = read_csv("p,d,amt,amt,amt.1,amt\nA,2024-01-01,x,10,y,z\n").unwrap();
        assert_eq!(
            dataset.headers(),
            ["p", "d", "amt", "amt.2", "amt.1", "amt.3"]
        );
    }

    #[test]
    fn renamed_duplicate_column_can_be_mapped() {
        use crate::{
            mapping::RoleSelection,
            normalize::{NormalizeOptions, normalize},
        };
        use rust_decimal::Decimal;

        let dataset = read_csv("p,d,amt,amt\nA,2024-01-01,x,10\n").unwrap();
        assert_eq!(dataset.headers(), ["p", "d", "amt", "amt.1"]);
        let mapping = RoleSelection::new("p", "d", "amt.1")
            .validate(&dataset)
            .unwrap();
        let data = normalize(&dataset, &mapping, &NormalizeOptions::default());
        assert_eq!(data.len(), 1);
        assert_eq!(data.records()[0].amount, Decimal::from(10));
    }

    #[test]
    fn new_keeps_rows_rectangular() {
        let dataset = Dataset::new(
            vec!["a".into()],
            vec![vec![], vec![Cell::Text("x".into()), Cell::Number(1.0)]],
        );
        assert_eq!(dataset.headers(), ["a", "column_2"]);
        assert!(dataset.rows().iter().all(|row| row.len() == 2));
    }

    #[test]
    fn corrupt_workbook_is_an_error() {
        let err = read_upload("sales.xlsx", b"not a zip", &UploadOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Workbook(_)));
    }
}
