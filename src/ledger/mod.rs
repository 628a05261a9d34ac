//! The monthly category-balance ledger.
//!
//! For every (category, month) pair the ledger keeps at most one `CategoryBalance` and at most one
//! `CategoryDistribution`. Balances are never recomputed from the transaction history. They are
//! seeded when a month is first touched, by carrying the previous month's balance forward or by
//! using the category's initial budget, and then moved incrementally by each posted transaction
//! and each distribution edit.
//!
//! Every mutating call writes the affected collections to the store before returning. When a write
//! fails, the in-memory change is kept, the ledger is marked dirty and
//! `LedgerError::Persistence` is returned. `flush` writes everything again.

mod error;
mod records;

pub use error::LedgerError;

use crate::model::{
    CategoryBalance, CategoryDistribution, Categories, Category, Month, TransactionKind,
};
use crate::store::{self, CollectionStore, CATEGORY_BALANCES, CATEGORY_DISTRIBUTIONS};
use crate::Result;
use records::Records;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Returns the calendar month before `month`, both as "YYYY-MM".
pub fn previous_month(month: &str) -> std::result::Result<String, LedgerError> {
    Ok(crate::model::previous_month(month)?)
}

/// Parses a "YYYY-MM" month key.
pub fn parse_month(month: &str) -> std::result::Result<Month, LedgerError> {
    Ok(Month::from_str(month)?)
}

/// The outcome of one distribution edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionChange {
    pub category: String,
    /// The allocation before the edit, zero when there was none.
    pub previous: Decimal,
    pub allocation: Decimal,
    pub delta: Decimal,
    /// The balance after the delta was applied, or `None` when the month has no balance for this
    /// category and the balance was left alone.
    pub balance: Option<Decimal>,
}

pub struct CategoryLedger {
    store: Arc<dyn CollectionStore>,
    balances: Records<CategoryBalance>,
    distributions: Records<CategoryDistribution>,
    dirty: bool,
}

impl std::fmt::Debug for CategoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryLedger")
            .field("balances", &self.balances.len())
            .field("distributions", &self.distributions.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl CategoryLedger {
    /// An empty ledger that persists to `store`.
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self {
            store,
            balances: Records::default(),
            distributions: Records::default(),
            dirty: false,
        }
    }

    /// Reads both collections from `store`. Duplicate (category, month) records in the stored data
    /// are collapsed, keeping the last one.
    pub async fn load(store: Arc<dyn CollectionStore>) -> Result<Self> {
        let balances: Vec<CategoryBalance> =
            store::load_records(store.as_ref(), CATEGORY_BALANCES).await?;
        let distributions: Vec<CategoryDistribution> =
            store::load_records(store.as_ref(), CATEGORY_DISTRIBUTIONS).await?;
        debug!(
            "Loaded {} balances and {} distributions",
            balances.len(),
            distributions.len()
        );
        Ok(Self {
            store,
            balances: Records::from_vec(CATEGORY_BALANCES, balances),
            distributions: Records::from_vec(CATEGORY_DISTRIBUTIONS, distributions),
            dirty: false,
        })
    }

    pub fn balance(&self, category: &str, month: Month) -> Option<Decimal> {
        self.balances.get(category, month).map(|b| b.balance)
    }

    pub fn distribution(&self, category: &str, month: Month) -> Option<Decimal> {
        self.distributions.get(category, month).map(|d| d.allocation)
    }

    pub fn balances(&self) -> &[CategoryBalance] {
        self.balances.as_slice()
    }

    pub fn distributions(&self) -> &[CategoryDistribution] {
        self.distributions.as_slice()
    }

    pub fn balances_for_month(&self, month: Month) -> impl Iterator<Item = &CategoryBalance> {
        self.balances.iter().filter(move |b| b.month == month)
    }

    pub fn distributions_for_month(
        &self,
        month: Month,
    ) -> impl Iterator<Item = &CategoryDistribution> {
        self.distributions.iter().filter(move |d| d.month == month)
    }

    /// Whether any category has a balance in `month`.
    pub fn is_month_initialized(&self, month: Month) -> bool {
        self.balances.any_in_month(month)
    }

    /// True when an in-memory change has not reached the store.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Posts an income or expense against a category and returns the new balance.
    ///
    /// The first posting into a month initializes that month for every valid category. A category
    /// with no balance in the month afterwards (for example one that is not valid in it) is seeded
    /// with its initial budget, or zero when `categories` does not know it.
    pub async fn record_transaction(
        &mut self,
        category: &str,
        month: Month,
        amount: Decimal,
        kind: TransactionKind,
        categories: &Categories,
    ) -> std::result::Result<Decimal, LedgerError> {
        let change = match kind {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
            TransactionKind::Transfer => return Err(LedgerError::TransferNotAllowed),
        };
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let balance = self
            .opening_balance(category, month, categories)
            .checked_add(change)
            .ok_or_else(|| LedgerError::overflow(category, month))?;

        let initialized = if self.balances.any_in_month(month) {
            false
        } else {
            self.fill_month(month, categories) > 0
        };

        let record = self.balances.get_or_insert_with(category, month, || {
            let seed = match categories.find(category) {
                Some(c) => c.initial_budget,
                None => {
                    warn!("Posting to unknown category '{category}' in {month}, starting from zero");
                    Decimal::ZERO
                }
            };
            CategoryBalance::new(category, month, seed)
        });
        record.balance = balance;
        trace!("{kind} of {amount} to '{category}' in {month}, balance now {balance}");

        self.persist(true, initialized).await?;
        Ok(balance)
    }

    /// Undoes a previous `record_transaction` by posting the opposite kind.
    pub async fn reverse_transaction(
        &mut self,
        category: &str,
        month: Month,
        amount: Decimal,
        kind: TransactionKind,
        categories: &Categories,
    ) -> std::result::Result<Decimal, LedgerError> {
        let opposite = kind.opposite().ok_or(LedgerError::TransferNotAllowed)?;
        self.record_transaction(category, month, amount, opposite, categories)
            .await
    }

    /// Creates the missing balance and distribution records for every category valid in `month`
    /// and returns how many records were created. Existing records are never changed.
    pub async fn initialize_month(
        &mut self,
        month: Month,
        categories: &Categories,
    ) -> std::result::Result<usize, LedgerError> {
        let created = self.fill_month(month, categories);
        if created > 0 || self.dirty {
            self.persist(true, true).await?;
        }
        Ok(created)
    }

    /// Sets a single category's allocation. See `set_distributions`.
    pub async fn set_distribution(
        &mut self,
        category: &str,
        month: Month,
        allocation: Decimal,
    ) -> std::result::Result<DistributionChange, LedgerError> {
        let mut changes = self
            .set_distributions(month, [(category.to_string(), allocation)])
            .await?;
        // One edit in, one change out.
        Ok(changes.remove(0))
    }

    /// Applies a batch of allocation edits for `month`, then persists once.
    ///
    /// Each edit moves the category's balance by the difference between the new and the old
    /// allocation. When the category has no balance in `month` the allocation is still recorded
    /// and the balance is not created, so the two disagree until the month is re-seeded by hand.
    pub async fn set_distributions<I>(
        &mut self,
        month: Month,
        edits: I,
    ) -> std::result::Result<Vec<DistributionChange>, LedgerError>
    where
        I: IntoIterator<Item = (String, Decimal)>,
    {
        // Every change is worked out before any record is touched, so a batch that would overflow
        // is rejected as a whole.
        let mut planned: HashMap<String, (Decimal, Option<Decimal>)> = HashMap::new();
        let mut changes = Vec::new();
        for (category, allocation) in edits {
            let (previous, balance) = match planned.get(&category) {
                Some(&state) => state,
                None => (
                    self.distribution(&category, month).unwrap_or_default(),
                    self.balance(&category, month),
                ),
            };
            let overflow = || LedgerError::overflow(&category, month);
            let delta = allocation.checked_sub(previous).ok_or_else(overflow)?;
            let balance = match balance {
                Some(b) => Some(b.checked_add(delta).ok_or_else(overflow)?),
                None => None,
            };
            planned.insert(category.clone(), (allocation, balance));
            changes.push(DistributionChange {
                category,
                previous,
                allocation,
                delta,
                balance,
            });
        }

        let mut balances_changed = false;
        for change in &changes {
            let record = self
                .distributions
                .get_or_insert_with(&change.category, month, || {
                    CategoryDistribution::new(change.category.as_str(), month, Decimal::ZERO)
                });
            record.allocation = change.allocation;

            match (change.balance, self.balances.get_mut(&change.category, month)) {
                (Some(balance), Some(record)) => {
                    record.balance = balance;
                    balances_changed |= !change.delta.is_zero();
                }
                _ => debug!(
                    "'{}' has no balance in {month}, recording the distribution only",
                    change.category
                ),
            }
        }
        if !changes.is_empty() || self.dirty {
            self.persist(balances_changed, true).await?;
        }
        Ok(changes)
    }

    /// Writes both collections if an earlier write failed.
    pub async fn flush(&mut self) -> std::result::Result<(), LedgerError> {
        if self.dirty {
            self.persist(true, true).await?;
        }
        Ok(())
    }

    /// The balance `record_transaction` starts from: the existing record, else what `fill_month`
    /// would seed for a month nothing has touched yet, else the category's initial budget.
    fn opening_balance(&self, category: &str, month: Month, categories: &Categories) -> Decimal {
        if let Some(balance) = self.balance(category, month) {
            return balance;
        }
        let known = categories.find(category);
        let carried = match known {
            Some(c) if !self.balances.any_in_month(month) && c.is_valid_for(month) => month
                .previous()
                .and_then(|p| self.balance(category, p)),
            _ => None,
        };
        carried
            .or(known.map(|c| c.initial_budget))
            .unwrap_or(Decimal::ZERO)
    }

    /// Adds the records `initialize_month` would add without persisting them.
    fn fill_month(&mut self, month: Month, categories: &Categories) -> usize {
        let previous = month.previous();
        let valid: Vec<&Category> = categories.valid_for(month).collect();
        let mut created = 0;
        for category in &valid {
            if self.balances.contains(&category.name, month) {
                continue;
            }
            let carried = previous.and_then(|p| self.balance(&category.name, p));
            let seed = carried.unwrap_or(category.initial_budget);
            self.balances
                .upsert(CategoryBalance::new(category.name.as_str(), month, seed));
            created += 1;
        }
        for category in &valid {
            if self.distributions.contains(&category.name, month) {
                continue;
            }
            self.distributions.upsert(CategoryDistribution::new(
                category.name.as_str(),
                month,
                Decimal::ZERO,
            ));
            created += 1;
        }
        if created > 0 {
            debug!("Initialized {month} with {created} new records");
        }
        created
    }

    /// Writes the requested collections, or both when an earlier write failed. Every requested
    /// collection is attempted, the first failure is returned and any failure leaves the ledger
    /// dirty.
    async fn persist(
        &mut self,
        balances: bool,
        distributions: bool,
    ) -> std::result::Result<(), LedgerError> {
        let (balances, distributions) = if self.dirty {
            (true, true)
        } else {
            (balances, distributions)
        };
        let mut failure = None;
        if balances {
            if let Err(e) =
                store::save_records(self.store.as_ref(), CATEGORY_BALANCES, self.balances.as_slice())
                    .await
            {
                failure = Some(LedgerError::persistence(CATEGORY_BALANCES, e));
            }
        }
        if distributions {
            if let Err(e) = store::save_records(
                self.store.as_ref(),
                CATEGORY_DISTRIBUTIONS,
                self.distributions.as_slice(),
            )
            .await
            {
                failure.get_or_insert(LedgerError::persistence(CATEGORY_DISTRIBUTIONS, e));
            }
        }
        self.dirty = failure.is_some();
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
