//! Type Normalizer: coerces amounts and dates, dropping rows that fail.
//!
//! Normalization never fails as a whole. A row whose amount is not a number
//! or whose date is not a calendar date is left out and counted in
//! [`DropSummary`]; zero surviving rows is a valid, empty result.

use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;

use crate::{
    data::{Cell, DateOrder, GroupKey, coerce_amount, coerce_date},
    dataset::Dataset,
    mapping::{OptionalRole, RoleMapping},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub date_order: DateOrder,
}

/// One surviving row, reduced to the roles the mapping assigns.
///
/// Key fields are `None` when the cell was blank or the role is unassigned;
/// such rows are left out of that role's table but still count toward totals.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub product: Option<GroupKey>,
    pub category: Option<GroupKey>,
    pub region: Option<GroupKey>,
    pub staff: Option<GroupKey>,
}

impl SalesRecord {
    pub fn dimension(&self, role: OptionalRole) -> Option<&GroupKey> {
        match role {
            OptionalRole::Category => self.category.as_ref(),
            OptionalRole::Region => self.region.as_ref(),
            OptionalRole::Staff => self.staff.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropSummary {
    pub total_rows: usize,
    /// Rows whose amount failed to parse (whatever their date).
    pub invalid_amount: usize,
    /// Rows with a valid amount but an unparseable date.
    pub invalid_date: usize,
}

impl DropSummary {
    pub fn dropped(&self) -> usize {
        self.invalid_amount + self.invalid_date
    }

    pub fn kept(&self) -> usize {
        self.total_rows - self.dropped()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDataset {
    headers: Vec<String>,
    records: Vec<SalesRecord>,
    dropped: DropSummary,
}

impl NormalizedDataset {
    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn drop_summary(&self) -> DropSummary {
        self.dropped
    }

    /// Observed `(min, max)` of the date column, `None` when empty.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().map(|record| record.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), date| {
            (lo.min(date), hi.max(date))
        }))
    }

    pub(crate) fn subset<F>(&self, keep: F) -> NormalizedDataset
    where
        F: Fn(&SalesRecord) -> bool,
    {
        NormalizedDataset {
            headers: self.headers.clone(),
            records: self
                .records
                .iter()
                .filter(|record| keep(record))
                .cloned()
                .collect(),
            dropped: self.dropped,
        }
    }

    /// Re-materialises the records as a [`Dataset`] with the original
    /// headers. Columns without a role come back blank.
    ///
    /// `mapping` must be the one this dataset was normalized with; roles
    /// pointing past the header width are skipped.
    pub fn to_dataset(&self, mapping: &RoleMapping) -> Dataset {
        let width = self.headers.len();
        let rows = self
            .records
            .iter()
            .map(|record| {
                let mut row = vec![Cell::Empty; width];
                let mut put = |index: usize, cell: Cell| {
                    if let Some(slot) = row.get_mut(index) {
                        *slot = cell;
                    }
                };
                put(mapping.date().index, Cell::Date(record.date));
                put(mapping.amount().index, Cell::Text(record.amount.to_string()));
                // keys last: a column shared with date/amount keeps its raw cell
                let keys = [
                    (Some(mapping.product()), record.product.as_ref()),
                    (
                        mapping.optional(OptionalRole::Category),
                        record.category.as_ref(),
                    ),
                    (mapping.optional(OptionalRole::Region), record.region.as_ref()),
                    (mapping.optional(OptionalRole::Staff), record.staff.as_ref()),
                ];
                for (column, key) in keys {
                    if let (Some(column), Some(key)) = (column, key) {
                        put(column.index, key.cell().clone());
                    }
                }
                row
            })
            .collect();
        Dataset::new(self.headers.clone(), rows)
    }
}

/// Coerces the amount and date columns of `dataset`, dropping failing rows.
///
/// `mapping` is expected to come from [`RoleSelection::validate`] on this
/// same `dataset`. A column index outside a row reads as a blank cell, so a
/// mismatched mapping drops rows rather than panicking.
///
/// [`RoleSelection::validate`]: crate::mapping::RoleSelection::validate
pub fn normalize(
    dataset: &Dataset,
    mapping: &RoleMapping,
    options: &NormalizeOptions,
) -> NormalizedDataset {
    let mut dropped = DropSummary {
        total_rows: dataset.len(),
        ..DropSummary::default()
    };
    let key = |row: &[Cell], role: OptionalRole| -> Option<GroupKey> {
        mapping
            .optional(role)
            .and_then(|column| group_key(cell_at(row, column.index)))
    };

    let mut records = Vec::with_capacity(dataset.len());
    for row in dataset.rows() {
        let Some(amount) = coerce_amount(cell_at(row, mapping.amount().index)) else {
            dropped.invalid_amount += 1;
            continue;
        };
        let Some(date) = coerce_date(cell_at(row, mapping.date().index), options.date_order) else {
            dropped.invalid_date += 1;
            continue;
        };
        records.push(SalesRecord {
            date,
            amount,
            product: group_key(cell_at(row, mapping.product().index)),
            category: key(row, OptionalRole::Category),
            region: key(row, OptionalRole::Region),
            staff: key(row, OptionalRole::Staff),
        });
    }

    if dropped.dropped() > 0 {
        debug!(
            "Dropped {} row(s): {} with an invalid amount, {} with an invalid date",
            dropped.dropped(),
            dropped.invalid_amount,
            dropped.invalid_date
        );
    }
    info!(
        "Normalized {} of {} row(s) using amount column '{}' and date column '{}'",
        records.len(),
        dropped.total_rows,
        mapping.amount().name,
        mapping.date().name
    );

    NormalizedDataset {
        headers: dataset.headers().to_vec(),
        records,
        dropped,
    }
}

static BLANK: Cell = Cell::Empty;

fn cell_at(row: &[Cell], index: usize) -> &Cell {
    row.get(index).unwrap_or(&BLANK)
}

fn group_key(cell: &Cell) -> Option<GroupKey> {
    if cell.is_blank() {
        None
    } else {
        Some(GroupKey::new(cell.clone()))
    }
}
