use crate::model::Month;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The kind of a transaction. Only income and expense move category balances.
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
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
    Transfer,
}

serde_plain::derive_display_from_serialize!(TransactionKind);
serde_plain::derive_fromstr_from_deserialize!(TransactionKind);

impl TransactionKind {
    /// Whether transactions of this kind change a category balance.
    pub fn affects_categories(&self) -> bool {
        !matches!(self, TransactionKind::Transfer)
    }

    /// The kind whose posting cancels this one. Transfers have none.
    pub fn opposite(&self) -> Option<Self> {
        match self {
            TransactionKind::Income => Some(TransactionKind::Expense),
            TransactionKind::Expense => Some(TransactionKind::Income),
            TransactionKind::Transfer => None,
        }
    }
}

/// A single recorded income, expense or transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub(crate) id: String,
    pub(crate) month: Month,
    pub(crate) description: String,
    pub(crate) amount: Decimal,
    #[serde(alias = "transaction_type")]
    pub(crate) kind: TransactionKind,
    #[serde(default)]
    pub(crate) category: String,
    #[serde(default)]
    pub(crate) account: String,
    pub(crate) timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Creates a transaction from user input, assigning a fresh id and the current time.
    pub fn new(input: NewTransaction) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            month: input.month,
            description: input.description,
            amount: input.amount,
            kind: input.kind,
            category: input.category,
            account: input.account,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// A copy with `edit` applied. The id and timestamp are kept.
    pub(crate) fn edited(&self, edit: TransactionEdit) -> Self {
        Self {
            id: self.id.clone(),
            month: edit.month.unwrap_or(self.month),
            description: edit.description.unwrap_or_else(|| self.description.clone()),
            amount: edit.amount.unwrap_or(self.amount),
            kind: edit.kind.unwrap_or(self.kind),
            category: edit.category.unwrap_or_else(|| self.category.clone()),
            account: edit.account.unwrap_or_else(|| self.account.clone()),
            timestamp: self.timestamp,
        }
    }
}

/// Changes to an existing transaction. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionEdit {
    pub month: Option<Month>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub account: Option<String>,
}

/// The user-supplied fields of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub month: Month,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category: String,
    pub account: String,
}
