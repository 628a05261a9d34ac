use crate::model::Month;
use rust_decimal::Decimal;

/// The ways a ledger operation can fail.
///
/// A missing balance or distribution is not an error; lookups return `Option`.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid month '{0}', expected the format YYYY-MM")]
    InvalidMonth(String),

    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    #[error("Transfers do not affect category balances")]
    TransferNotAllowed,

    /// Applying the change would take a balance or allocation out of the representable range.
    /// Nothing was changed.
    #[error("The change to '{category}' in {month} is too large to apply")]
    Overflow { category: String, month: Month },

    /// The in-memory change was kept, but writing `collection` to the store failed. The ledger is
    /// dirty until `flush` succeeds.
    #[error("Failed to persist the '{collection}' collection")]
    Persistence {
        collection: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl LedgerError {
    /// True when the ledger kept the change in memory and only the write failed. Every other
    /// error means the ledger was left as it was.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }

    pub(crate) fn overflow(category: &str, month: Month) -> Self {
        Self::Overflow {
            category: category.to_string(),
            month,
        }
    }

    pub(crate) fn persistence(collection: &'static str, e: anyhow::Error) -> Self {
        Self::Persistence {
            collection,
            source: e.into(),
        }
    }
}

impl From<crate::model::MonthError> for LedgerError {
    fn from(e: crate::model::MonthError) -> Self {
        Self::InvalidMonth(e.input().to_string())
    }
}
