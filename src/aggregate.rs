//! Aggregation Engine: grouped-and-summed tables plus headline scalars.
//!
//! Every table is built by its own function from the filtered records; none
//! shares state with another. Ordering rules:
//!
//! - `time_series`: ascending by date.
//! - `top_products`, `by_region`, `by_staff`, `staff_region_crosstab`:
//!   descending by sum, ties ascending by key.
//! - `by_category`: ascending by key.
//!
//! Rows with a blank key are left out of that key's table only.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    data::GroupKey,
    mapping::{OptionalRole, RoleMapping},
    normalize::{NormalizedDataset, SalesRecord},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry<K> {
    pub key: K,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AggregateTable<K> {
    entries: Vec<Entry<K>>,
}

impl<K> AggregateTable<K> {
    pub fn entries(&self) -> &[Entry<K>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.entries
            .iter()
            .fold(Decimal::ZERO, |acc, entry| add_amount(acc, entry.amount))
    }

    fn ascending(groups: BTreeMap<K, Decimal>) -> Self {
        Self {
            entries: groups
                .into_iter()
                .map(|(key, amount)| Entry { key, amount })
                .collect(),
        }
    }

    fn descending(groups: BTreeMap<K, Decimal>) -> Self {
        // stable sort over key-ordered input: equal sums stay key-ascending
        Self {
            entries: groups
                .into_iter()
                .map(|(key, amount)| Entry { key, amount })
                .sorted_by(|a, b| b.amount.cmp(&a.amount))
                .collect(),
        }
    }
}

/// Adds two amounts, clamping to the `Decimal` range with a warning when the
/// exact sum cannot be represented.
fn add_amount(total: Decimal, amount: Decimal) -> Decimal {
    total.checked_add(amount).unwrap_or_else(|| {
        warn!("Sum overflowed the decimal range ({total} + {amount}); clamping");
        total.saturating_add(amount)
    })
}

fn sum_by<K, F>(records: &[SalesRecord], key: F) -> BTreeMap<K, Decimal>
where
    K: Ord,
    F: Fn(&SalesRecord) -> Option<K>,
{
    let mut groups = BTreeMap::new();
    for record in records {
        if let Some(k) = key(record) {
            let slot = groups.entry(k).or_insert(Decimal::ZERO);
            *slot = add_amount(*slot, record.amount);
        }
    }
    groups
}

pub fn time_series(data: &NormalizedDataset) -> AggregateTable<NaiveDate> {
    AggregateTable::ascending(sum_by(data.records(), |record| Some(record.date)))
}

pub fn top_products(data: &NormalizedDataset) -> AggregateTable<GroupKey> {
    AggregateTable::descending(sum_by(data.records(), |record| record.product.clone()))
}

pub fn by_region(data: &NormalizedDataset) -> AggregateTable<GroupKey> {
    AggregateTable::descending(sum_by(data.records(), |record| {
        record.dimension(OptionalRole::Region).cloned()
    }))
}

pub fn by_staff(data: &NormalizedDataset) -> AggregateTable<GroupKey> {
    AggregateTable::descending(sum_by(data.records(), |record| {
        record.dimension(OptionalRole::Staff).cloned()
    }))
}

pub fn by_category(data: &NormalizedDataset) -> AggregateTable<GroupKey> {
    AggregateTable::ascending(sum_by(data.records(), |record| {
        record.dimension(OptionalRole::Category).cloned()
    }))
}

pub fn staff_region_crosstab(data: &NormalizedDataset) -> AggregateTable<(GroupKey, GroupKey)> {
    AggregateTable::descending(sum_by(data.records(), |record| {
        Some((record.staff.clone()?, record.region.clone()?))
    }))
}

/// Headline metrics, computed straight from the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_amount: Decimal,
    pub distinct_products: usize,
    pub period: Option<(NaiveDate, NaiveDate)>,
}

pub fn summarize(data: &NormalizedDataset) -> Summary {
    let total_amount = data
        .records()
        .iter()
        .fold(Decimal::ZERO, |acc, record| add_amount(acc, record.amount));
    let distinct_products = data
        .records()
        .iter()
        .filter_map(|record| record.product.as_ref())
        .collect::<BTreeSet<_>>()
        .len();
    Summary {
        total_amount,
        distinct_products,
        period: data.date_range(),
    }
}

/// All tables the mapping's capabilities allow. Absent roles leave their
/// tables as `None`, never as empty tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    pub summary: Summary,
    pub time_series: AggregateTable<NaiveDate>,
    pub top_products: AggregateTable<GroupKey>,
    pub by_region: Option<AggregateTable<GroupKey>>,
    pub by_staff: Option<AggregateTable<GroupKey>>,
    pub by_category: Option<AggregateTable<GroupKey>>,
    pub staff_region_crosstab: Option<AggregateTable<(GroupKey, GroupKey)>>,
}

pub fn aggregate(data: &NormalizedDataset, mapping: &RoleMapping) -> Aggregates {
    let caps = mapping.capabilities();
    let has_region = caps.contains(OptionalRole::Region);
    let has_staff = caps.contains(OptionalRole::Staff);
    debug!(
        "Aggregating {} row(s) with optional roles {:?}",
        data.len(),
        caps.iter().collect::<Vec<_>>()
    );
    Aggregates {
        summary: summarize(data),
        time_series: time_series(data),
        top_products: top_products(data),
        by_region: has_region.then(|| by_region(data)),
        by_staff: has_staff.then(|| by_staff(data)),
        by_category: caps
            .contains(OptionalRole::Category)
            .then(|| by_category(data)),
        staff_region_crosstab: (has_staff && has_region).then(|| staff_region_crosstab(data)),
    }
}
