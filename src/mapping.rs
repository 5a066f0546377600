//! Schema Mapper: assigns semantic roles to dataset columns.
//!
//! A [`RoleSelection`] is what the user picked (six column names, each
//! possibly absent). [`RoleSelection::validate`] checks it against a
//! [`Dataset`] and yields a [`RoleMapping`] whose column references are
//! guaranteed to exist. Optional roles surface as a [`Capabilities`] set so
//! later stages ask "is `region` enabled" once instead of checking nullable
//! fields.

use std::{collections::BTreeMap, fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    dataset::Dataset,
    error::{MappingProblem, PipelineError, PipelineResult},
};

/// Placeholder the column pickers use for "not assigned".
pub const UNASSIGNED: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Product,
    Date,
    Amount,
    Category,
    Region,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Product => "product",
            Role::Date => "date",
            Role::Amount => "amount",
            Role::Category => "category",
            Role::Region => "region",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalRole {
    Category,
    Region,
    Staff,
}

impl OptionalRole {
    pub const ALL: [OptionalRole; 3] = [
        OptionalRole::Category,
        OptionalRole::Region,
        OptionalRole::Staff,
    ];

    pub fn role(&self) -> Role {
        match self {
            OptionalRole::Category => Role::Category,
            OptionalRole::Region => Role::Region,
            OptionalRole::Staff => Role::Staff,
        }
    }
}

/// The user's column picks, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSelection {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub staff: Option<String>,
}

impl RoleSelection {
    pub fn new(product: &str, date: &str, amount: &str) -> Self {
        Self {
            product: Some(product.to_string()),
            date: Some(date.to_string()),
            amount: Some(amount.to_string()),
            ..Self::default()
        }
    }

    pub fn with(mut self, role: OptionalRole, column: &str) -> Self {
        *self.slot_mut(role.role()) = Some(column.to_string());
        self
    }

    pub fn load(path: &Path) -> PipelineResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| PipelineError::MappingFile(format!("{path:?}: {err}")))?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> PipelineResult<Self> {
        serde_yaml::from_str(text).map_err(|err| PipelineError::MappingFile(err.to_string()))
    }

    /// Returns a selection where every role set in `overrides` replaces ours.
    pub fn merged_with(mut self, overrides: RoleSelection) -> Self {
        for role in [
            Role::Product,
            Role::Date,
            Role::Amount,
            Role::Category,
            Role::Region,
            Role::Staff,
        ] {
            if let Some(value) = overrides.slot(role).clone() {
                *self.slot_mut(role) = Some(value);
            }
        }
        self
    }

    pub fn column(&self, role: Role) -> Option<&str> {
        self.slot(role)
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != UNASSIGNED)
    }

    /// Checks every assigned column against `dataset`.
    pub fn validate(&self, dataset: &Dataset) -> PipelineResult<RoleMapping> {
        let resolve = |role: Role, column: &str| -> PipelineResult<ColumnRef> {
            dataset
                .column_index(column)
                .map(|index| ColumnRef {
                    name: column.to_string(),
                    index,
                })
                .ok_or_else(|| {
                    PipelineError::InvalidMapping(MappingProblem::UnknownColumn {
                        role,
                        column: column.to_string(),
                    })
                })
        };
        let mandatory = |role: Role| -> PipelineResult<ColumnRef> {
            let column = self
                .column(role)
                .ok_or(PipelineError::InvalidMapping(MappingProblem::MissingRole(
                    role,
                )))?;
            resolve(role, column)
        };

        let product = mandatory(Role::Product)?;
        let date = mandatory(Role::Date)?;
        let amount = mandatory(Role::Amount)?;

        let mut optional = BTreeMap::new();
        for role in OptionalRole::ALL {
            if let Some(column) = self.column(role.role()) {
                optional.insert(role, resolve(role.role(), column)?);
            }
        }

        Ok(RoleMapping {
            product,
            date,
            amount,
            optional,
        })
    }

    fn slot(&self, role: Role) -> &Option<String> {
        match role {
            Role::Product => &self.product,
            Role::Date => &self.date,
            Role::Amount => &self.amount,
            Role::Category => &self.category,
            Role::Region => &self.region,
            Role::Staff => &self.staff,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<String> {
        match role {
            Role::Product => &mut self.product,
            Role::Date => &mut self.date,
            Role::Amount => &mut self.amount,
            Role::Category => &mut self.category,
            Role::Region => &mut self.region,
            Role::Staff => &mut self.staff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub name: String,
    pub index: usize,
}

/// A validated role assignment. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMapping {
    product: ColumnRef,
    date: ColumnRef,
    amount: ColumnRef,
    optional: BTreeMap<OptionalRole, ColumnRef>,
}

impl RoleMapping {
    pub fn product(&self) -> &ColumnRef {
        &self.product
    }

    pub fn date(&self) -> &ColumnRef {
        &self.date
    }

    pub fn amount(&self) -> &ColumnRef {
        &self.amount
    }

    pub fn optional(&self, role: OptionalRole) -> Option<&ColumnRef> {
        self.optional.get(&role)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities(self.optional.keys().fold(0, |bits, role| bits | role_bit(*role)))
    }
}

/// The set of optional roles a mapping enables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities(u8);

impl Capabilities {
    pub fn contains(&self, role: OptionalRole) -> bool {
        self.0 & role_bit(role) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = OptionalRole> + '_ {
        OptionalRole::ALL
            .into_iter()
            .filter(move |role| self.contains(*role))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

fn role_bit(role: OptionalRole) -> u8 {
    match role {
        OptionalRole::Category => 0b001,
        OptionalRole::Region => 0b010,
        OptionalRole::Staff => 0b100,
    }
}
