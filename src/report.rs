//! Hand-off to the presentation layer.
//!
//! A [`Report`] bundles the headline [`Summary`], the date window used, the
//! drop diagnostics and every aggregate table the mapping enables, keyed by
//! [`ChartRole`]. It renders either as plain-text tables or as a JSON
//! document an external chart renderer can consume.

use std::fmt::Write as _;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    aggregate::{AggregateTable, Aggregates, Summary},
    data::GroupKey,
    filter::DateWindow,
    mapping::{OptionalRole, RoleMapping},
    normalize::DropSummary,
    table::{self, Align},
};

pub const DEFAULT_TITLE: &str = "Sales Dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartRole {
    TimeSeries,
    TopProducts,
    ByRegion,
    ByStaff,
    ByCategory,
    StaffRegionCrosstab,
}

impl ChartRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartRole::TimeSeries => "time_series",
            ChartRole::TopProducts => "top_products",
            ChartRole::ByRegion => "by_region",
            ChartRole::ByStaff => "by_staff",
            ChartRole::ByCategory => "by_category",
            ChartRole::StaffRegionCrosstab => "staff_region_crosstab",
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            ChartRole::TimeSeries => "Sales over time",
            ChartRole::TopProducts => "Best-selling products",
            ChartRole::ByRegion => "Sales by region",
            ChartRole::ByStaff => "Sales by staff",
            ChartRole::ByCategory => "Sales by category",
            ChartRole::StaffRegionCrosstab => "Staff performance by region",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    title: String,
    mapping: RoleMapping,
    window: Option<DateWindow>,
    dropped: DropSummary,
    aggregates: Aggregates,
}

impl Report {
    pub fn new(
        title: &str,
        mapping: &RoleMapping,
        window: Option<DateWindow>,
        dropped: DropSummary,
        aggregates: Aggregates,
    ) -> Self {
        Self {
            title: title.to_string(),
            mapping: mapping.clone(),
            window,
            dropped,
            aggregates,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &Summary {
        &self.aggregates.summary
    }

    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    pub fn window(&self) -> Option<DateWindow> {
        self.window
    }

    pub fn drop_summary(&self) -> DropSummary {
        self.dropped
    }

    /// `false` when the filtered data holds no rows ("no data" state).
    pub fn has_data(&self) -> bool {
        self.aggregates.summary.period.is_some()
    }

    /// Chart roles present in this report, in display order.
    pub fn chart_roles(&self) -> Vec<ChartRole> {
        let a = &self.aggregates;
        let mut roles = vec![ChartRole::TimeSeries, ChartRole::TopProducts];
        for (role, present) in [
            (ChartRole::ByRegion, a.by_region.is_some()),
            (ChartRole::ByStaff, a.by_staff.is_some()),
            (ChartRole::ByCategory, a.by_category.is_some()),
            (
                ChartRole::StaffRegionCrosstab,
                a.staff_region_crosstab.is_some(),
            ),
        ] {
            if present {
                roles.push(role);
            }
        }
        roles
    }

    /// Headers and stringified rows for one chart, `None` if not present.
    pub fn chart_rows(&self, role: ChartRole) -> Option<(Vec<String>, Vec<Vec<String>>)> {
        let a = &self.aggregates;
        let amount = self.mapping.amount().name.clone();
        let column = |role: OptionalRole| {
            self.mapping
                .optional(role)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| role.role().to_string())
        };
        match role {
            ChartRole::TimeSeries => Some((
                vec![self.mapping.date().name.clone(), amount],
                date_rows(&a.time_series),
            )),
            ChartRole::TopProducts => Some((
                vec![self.mapping.product().name.clone(), amount],
                key_rows(&a.top_products),
            )),
            ChartRole::ByRegion => a
                .by_region
                .as_ref()
                .map(|t| (vec![column(OptionalRole::Region), amount], key_rows(t))),
            ChartRole::ByStaff => a
                .by_staff
                .as_ref()
                .map(|t| (vec![column(OptionalRole::Staff), amount], key_rows(t))),
            ChartRole::ByCategory => a
                .by_category
                .as_ref()
                .map(|t| (vec![column(OptionalRole::Category), amount], key_rows(t))),
            ChartRole::StaffRegionCrosstab => a.staff_region_crosstab.as_ref().map(|t| {
                let rows = t
                    .entries()
                    .iter()
                    .map(|e| vec![e.key.0.to_string(), e.key.1.to_string(), format_amount(e.amount)])
                    .collect();
                (
                    vec![
                        column(OptionalRole::Staff),
                        column(OptionalRole::Region),
                        amount,
                    ],
                    rows,
                )
            }),
        }
    }

    pub fn render_text(&self) -> String {
        let summary = self.summary();
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{}", "=".repeat(self.title.chars().count().max(3)));
        let _ = writeln!(out, "Total sales    : {}", summary.total_amount.trunc().normalize());
        let _ = writeln!(out, "Product types  : {}", summary.distinct_products);
        let period = summary
            .period
            .map(|(lo, hi)| format!("{lo} -> {hi}"))
            .unwrap_or_else(|| "no data".to_string());
        let _ = writeln!(out, "Period         : {period}");
        if let Some(window) = self.window {
            let _ = writeln!(out, "Date filter    : {window}");
        }
        if self.dropped.dropped() > 0 {
            let _ = writeln!(
                out,
                "Skipped rows   : {} ({} invalid amount, {} invalid date)",
                self.dropped.dropped(),
                self.dropped.invalid_amount,
                self.dropped.invalid_date
            );
        }

        for role in self.chart_roles() {
            let Some((headers, rows)) = self.chart_rows(role) else {
                continue;
            };
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", role.heading());
            if rows.is_empty() {
                let _ = writeln!(out, "(no data)");
                continue;
            }
            let mut align = vec![Align::Left; headers.len()];
            if let Some(last) = align.last_mut() {
                *last = Align::Right;
            }
            out.push_str(&table::render_table(&headers, &rows, &align));
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let a = &self.aggregates;
        let document = ReportDocument {
            title: &self.title,
            summary: &a.summary,
            window: self.window.as_ref(),
            dropped_rows: DroppedDocument {
                total: self.dropped.dropped(),
                invalid_amount: self.dropped.invalid_amount,
                invalid_date: self.dropped.invalid_date,
            },
            tables: TablesDocument {
                time_series: &a.time_series,
                top_products: &a.top_products,
                by_region: a.by_region.as_ref(),
                by_staff: a.by_staff.as_ref(),
                by_category: a.by_category.as_ref(),
                staff_region_crosstab: a.staff_region_crosstab.as_ref(),
            },
        };
        serde_json::to_string_pretty(&document)
    }
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    title: &'a str,
    summary: &'a Summary,
    window: Option<&'a DateWindow>,
    dropped_rows: DroppedDocument,
    tables: TablesDocument<'a>,
}

#[derive(Serialize)]
struct DroppedDocument {
    total: usize,
    invalid_amount: usize,
    invalid_date: usize,
}

#[derive(Serialize)]
struct TablesDocument<'a> {
    time_series: &'a AggregateTable<NaiveDate>,
    top_products: &'a AggregateTable<GroupKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    by_region: Option<&'a AggregateTable<GroupKey>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    by_staff: Option<&'a AggregateTable<GroupKey>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    by_category: Option<&'a AggregateTable<GroupKey>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    staff_region_crosstab: Option<&'a AggregateTable<(GroupKey, GroupKey)>>,
}

fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

fn date_rows(table: &AggregateTable<NaiveDate>) -> Vec<Vec<String>> {
    table
        .entries()
        .iter()
        .map(|e| vec![e.key.format("%Y-%m-%d").to_string(), format_amount(e.amount)])
        .collect()
}

fn key_rows(table: &AggregateTable<GroupKey>) -> Vec<Vec<String>> {
    table
        .entries()
        .iter()
        .map(|e| vec![e.key.to_string(), format_amount(e.amount)])
        .collect()
}
