//! Types that represent the core data model, such as `Transaction`, `Category` and the per-month
//! ledger records.
mod amount;
mod balance;
mod category;
mod month;
mod rollup;
mod transaction;

pub use amount::{Amount, AmountError};
pub use balance::{CategoryBalance, CategoryDistribution};
pub use category::{Categories, Category, CategoryStatus, NewCategory};
pub use month::{previous_month, Month, MonthError};
pub use rollup::{MonthRollup, RollupRow, RollupTotals};
pub use transaction::{NewTransaction, Transaction, TransactionEdit, TransactionKind};
