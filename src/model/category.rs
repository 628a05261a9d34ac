use crate::model::Month;
use crate::Result;
use anyhow::{bail, ensure};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a category can receive new budget activity.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    #[default]
    Active,
    Inactive,
}

serde_plain::derive_display_from_serialize!(CategoryStatus);
serde_plain::derive_fromstr_from_deserialize!(CategoryStatus);

/// A user-defined budget bucket, e.g. "Groceries", with an optional active month range.
///
/// Balances and distributions refer to categories by `name`, not by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Category {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) available_from: Option<Month>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) available_until: Option<Month>,
    #[serde(default)]
    pub(crate) initial_budget: Decimal,
    #[serde(default)]
    pub(crate) status: CategoryStatus,
}

impl Category {
    /// Creates an active category with no month restrictions and a fresh id.
    pub fn new(name: impl Into<String>, initial_budget: Decimal) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            available_from: None,
            available_until: None,
            initial_budget,
            status: CategoryStatus::Active,
        }
    }

    pub fn with_range(mut self, from: Option<Month>, until: Option<Month>) -> Self {
        self.available_from = from;
        self.available_until = until;
        self
    }

    pub fn with_status(mut self, status: CategoryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available_from(&self) -> Option<Month> {
        self.available_from
    }

    pub fn available_until(&self) -> Option<Month> {
        self.available_until
    }

    pub fn initial_budget(&self) -> Decimal {
        self.initial_budget
    }

    pub fn status(&self) -> CategoryStatus {
        self.status
    }

    /// A category is valid for `month` when it is active and `month` falls inside its optional
    /// `available_from..=available_until` range.
    pub fn is_valid_for(&self, month: Month) -> bool {
        self.status == CategoryStatus::Active
            && self.available_from.map_or(true, |from| month >= from)
            && self.available_until.map_or(true, |until| month <= until)
    }
}

/// The input for creating a category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub initial_budget: Decimal,
    pub available_from: Option<Month>,
    pub available_until: Option<Month>,
}

/// The ordered list of categories, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories(Vec<Category>);

impl Categories {
    pub fn new(data: Vec<Category>) -> Self {
        Self(data)
    }

    pub fn data(&self) -> &[Category] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.0.iter()
    }

    pub fn find(&self, name: &str) -> Option<&Category> {
        self.0.iter().find(|c| c.name == name)
    }

    pub(crate) fn find_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.0.iter_mut().find(|c| c.name == name)
    }

    /// The categories valid for `month`, in list order.
    pub fn valid_for(&self, month: Month) -> impl Iterator<Item = &Category> {
        self.0.iter().filter(move |c| c.is_valid_for(month))
    }

    /// Appends a category after checking that its name is non-empty and unique and that its range
    /// is not inverted.
    pub fn push(&mut self, category: Category) -> Result<()> {
        ensure!(
            !category.name.trim().is_empty(),
            "A category name cannot be empty"
        );
        if self.find(&category.name).is_some() {
            bail!("A category named '{}' already exists", category.name);
        }
        if let (Some(from), Some(until)) = (category.available_from, category.available_until) {
            ensure!(
                from <= until,
                "Category '{}' has available_from {from} after available_until {until}",
                category.name
            );
        }
        self.0.push(category);
        Ok(())
    }
}
