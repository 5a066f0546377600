use std::fmt::Write as _;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use salesboard::aggregate::aggregate;
use salesboard::dataset::{UploadOptions, read_upload};
use salesboard::filter::{DateWindow, filter_by_window};
use salesboard::mapping::{OptionalRole, RoleSelection};
use salesboard::normalize::{NormalizeOptions, normalize};

fn generate_sales(rows: usize) -> Vec<u8> {
    let mut csv = String::from("product,date,amount,category,region,staff\n");
    for i in 0..rows {
        let product = format!("SKU-{:03}", i % 250);
        let category = ["drinks", "snacks", "bakery"][i % 3];
        let region = ["north", "south", "east", "west"][i % 4];
        let staff = format!("staff-{:02}", i % 40);
        let month = (i % 12) + 1;
        let day = (i % 28) + 1;
        // every 97th row carries an amount that must be dropped
        let amount = if i % 97 == 0 {
            "n/a".to_string()
        } else {
            format!("{}.{:02}", i % 500, i % 100)
        };
        writeln!(
            csv,
            "{product},2024-{month:02}-{day:02},{amount},{category},{region},{staff}"
        )
        .expect("row");
    }
    csv.into_bytes()
}

fn bench_pipeline(c: &mut Criterion) {
    let bytes = generate_sales(50_000);
    let options = UploadOptions::default();
    let dataset = read_upload("sales.csv", &bytes, &options).expect("parse sales");
    let mapping = RoleSelection::new("product", "date", "amount")
        .with(OptionalRole::Category, "category")
        .with(OptionalRole::Region, "region")
        .with(OptionalRole::Staff, "staff")
        .validate(&dataset)
        .expect("valid mapping");
    let normalized = normalize(&dataset, &mapping, &NormalizeOptions::default());
    let window = DateWindow::observed(&normalized).expect("non-empty data");

    let mut group = c.benchmark_group("pipeline");

    group.bench_function("read_upload_csv", |b| {
        b.iter(|| read_upload("sales.csv", &bytes, &options).expect("parse sales"));
    });

    group.bench_function("normalize", |b| {
        b.iter(|| normalize(&dataset, &mapping, &NormalizeOptions::default()));
    });

    group.bench_function("filter_and_aggregate", |b| {
        b.iter_batched(
            || window,
            |window| aggregate(&filter_by_window(&normalized, &window), &mapping),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
