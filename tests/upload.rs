mod common;

use common::{TestWorkspace, fixture_bytes, ymd};
use salesboard::{
    data::Cell,
    dataset::{UploadOptions, read_upload},
    error::PipelineError,
    io_utils::resolve_encoding,
};

#[test]
fn csv_upload_keeps_headers_and_raw_cells() {
    let dataset = read_upload(
        "sales.csv",
        &fixture_bytes("sales.csv"),
        &UploadOptions::default(),
    )
    .expect("parse csv");
    assert_eq!(
        dataset.headers(),
        ["Produk", "Tanggal", "Jumlah", "Kategori", "Wilayah", "Staf"]
    );
    assert_eq!(dataset.len(), 6);
    assert_eq!(dataset.rows()[2][2], Cell::Text("n/a".to_string()));
}

#[test]
fn tsv_upload_uses_tab_delimiter() {
    let bytes = b"Produk\tTanggal\tJumlah\nKopi\t2024-01-01\t1,5\n";
    let dataset = read_upload("sales.TSV", bytes, &UploadOptions::default()).expect("parse tsv");
    assert_eq!(dataset.headers(), ["Produk", "Tanggal", "Jumlah"]);
    assert_eq!(dataset.rows()[0][2], Cell::Text("1,5".to_string()));
}

#[test]
fn workbook_upload_reads_first_sheet_with_typed_cells() {
    let dataset = read_upload(
        "sales.xlsx",
        &fixture_bytes("sales.xlsx"),
        &UploadOptions::default(),
    )
    .expect("parse xlsx");
    assert_eq!(
        dataset.headers(),
        ["Produk", "Tanggal", "Jumlah", "Kategori", "Wilayah", "Staf"]
    );
    assert_eq!(dataset.len(), 4);
    assert_eq!(dataset.rows()[0][0], Cell::Text("Kopi".to_string()));
    assert_eq!(dataset.rows()[0][2], Cell::Number(10.0));
    match &dataset.rows()[0][1] {
        Cell::DateTime(value) => assert_eq!(value.date(), ymd(2024, 1, 1)),
        Cell::Date(value) => assert_eq!(*value, ymd(2024, 1, 1)),
        other => panic!("expected a date cell, got {other:?}"),
    }
    assert_eq!(dataset.rows()[1][1], Cell::Text("2024-01-02".to_string()));
}

#[test]
fn unknown_extension_is_rejected() {
    let err = read_upload("sales.pdf", b"%PDF-1.7", &UploadOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFileFormat { ref filename } if filename == "sales.pdf"));
}

#[test]
fn missing_extension_is_rejected() {
    let err = read_upload("sales", b"a,b\n1,2\n", &UploadOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFileFormat { .. }));
}

#[test]
fn header_only_upload_is_an_empty_dataset() {
    let dataset = read_upload(
        "sales.csv",
        b"Produk,Tanggal,Jumlah\n",
        &UploadOptions::default(),
    )
    .expect("parse header-only csv");
    assert_eq!(dataset.headers().len(), 3);
    assert!(dataset.is_empty());
}

#[test]
fn declared_encoding_decodes_legacy_bytes() {
    let workspace = TestWorkspace::new();
    // "Caf\xe9" is "Café" in windows-1252
    let path = workspace.write("legacy.csv", b"Produk,Tanggal,Jumlah\nCaf\xe9,2024-01-01,3\n");
    let bytes = std::fs::read(&path).expect("read legacy csv");
    let options = UploadOptions {
        encoding: resolve_encoding(Some("windows-1252")).expect("known encoding"),
    };
    let dataset = read_upload("legacy.csv", &bytes, &options).expect("parse legacy csv");
    assert_eq!(dataset.rows()[0][0], Cell::Text("Café".to_string()));
}

#[test]
fn undecodable_bytes_report_the_encoding() {
    let err = read_upload(
        "sales.csv",
        b"Produk,Tanggal,Jumlah\nCaf\xe9,2024-01-01,3\n",
        &UploadOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Decode { encoding: "UTF-8" }));
}
