//! The `Book` is everything the user has recorded: transactions, categories and the ledger, all
//! loaded from and saved to one `CollectionStore`. Commands go through it rather than touching the
//! ledger directly, so that transfers skip the ledger and edits and deletes reverse their postings.

use crate::ledger::{CategoryLedger, DistributionChange, LedgerError};
use crate::model::{
    Categories, Category, CategoryStatus, Month, MonthRollup, NewCategory, NewTransaction,
    RollupRow, Transaction, TransactionEdit, TransactionKind,
};
use crate::store::{self, CollectionStore, CATEGORIES, TRANSACTIONS};
use crate::Result;
use anyhow::{bail, ensure, Context};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Book {
    store: Arc<dyn CollectionStore>,
    transactions: Vec<Transaction>,
    categories: Categories,
    ledger: CategoryLedger,
    /// Set when writing transactions or categories failed. Cleared by `flush`.
    dirty: bool,
}

impl Book {
    pub async fn load(store: Arc<dyn CollectionStore>) -> Result<Self> {
        let transactions: Vec<Transaction> =
            store::load_records(store.as_ref(), TRANSACTIONS).await?;
        let categories: Vec<Category> = store::load_records(store.as_ref(), CATEGORIES).await?;
        let ledger = CategoryLedger::load(store.clone()).await?;
        debug!(
            "Loaded {} transactions and {} categories",
            transactions.len(),
            categories.len()
        );
        Ok(Self {
            store,
            transactions,
            categories: Categories::new(categories),
            ledger,
            dirty: false,
        })
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn ledger(&self) -> &CategoryLedger {
        &self.ledger
    }

    /// Transactions in the order they were recorded, optionally only those in `month`.
    pub fn transactions(&self, month: Option<Month>) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| month.map_or(true, |m| t.month == m))
            .collect()
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Records a transaction and, unless it is a transfer, posts it to its category.
    ///
    /// A posting the ledger rejects leaves nothing recorded. Once the posting is accepted the
    /// transaction is kept even if a write fails, and the write errors are returned together
    /// after both collections have been attempted.
    pub async fn add_transaction(&mut self, new: NewTransaction) -> Result<Transaction> {
        let transaction = Transaction::new(NewTransaction {
            category: new.category.trim().to_string(),
            ..new
        });
        self.check(&transaction)?;

        let posted = match self.post(&transaction).await {
            Err(e) if !e.is_persistence() => {
                return Err(e).context("The transaction was not recorded");
            }
            other => other,
        };
        self.transactions.push(transaction.clone());
        let saved = self.save_transactions().await;
        info!(
            "Recorded {} {} of {} in {}",
            transaction.kind, transaction.id, transaction.amount, transaction.month
        );
        report_writes(
            saved,
            posted,
            format!("Transaction {} was recorded", transaction.id),
        )?;
        Ok(transaction)
    }

    /// Changes a transaction in place: its old posting is reversed and the new one is made. Moving
    /// to or from a transfer only does the half that applies.
    pub async fn edit_transaction(&mut self, id: &str, edit: TransactionEdit) -> Result<Transaction> {
        let position = self.position(id)?;
        let old = self.transactions[position].clone();
        let mut updated = old.edited(edit);
        updated.category = updated.category.trim().to_string();
        self.check(&updated)?;
        if updated == old {
            debug!("Transaction {id} is unchanged");
            return Ok(old);
        }

        let reversed = match self.unpost(&old).await {
            Err(e) if !e.is_persistence() => {
                return Err(e).with_context(|| format!("Transaction {id} was not changed"));
            }
            other => other,
        };
        let posted = match self.post(&updated).await {
            Err(e) if !e.is_persistence() => {
                // Put the old posting back so the ledger still matches the unchanged transaction.
                if let Err(undo) = self.post(&old).await {
                    warn!("Unable to restore the posting of transaction {id}: {undo}");
                }
                return Err(e).with_context(|| format!("Transaction {id} was not changed"));
            }
            other => other,
        };
        self.transactions[position] = updated.clone();
        let saved = self.save_transactions().await;
        info!("Edited transaction {id}");
        report_writes(
            saved,
            reversed.and(posted),
            format!("Transaction {id} was changed"),
        )?;
        Ok(updated)
    }

    /// Removes a transaction and reverses its posting.
    pub async fn delete_transaction(&mut self, id: &str) -> Result<Transaction> {
        let position = self.position(id)?;
        let transaction = self.transactions[position].clone();
        let reversed = match self.unpost(&transaction).await {
            Err(e) if !e.is_persistence() => {
                return Err(e).with_context(|| format!("Transaction {id} was not deleted"));
            }
            other => other,
        };
        self.transactions.remove(position);
        let saved = self.save_transactions().await;
        info!("Deleted transaction {id}");
        report_writes(saved, reversed, format!("Transaction {id} was deleted"))?;
        Ok(transaction)
    }

    pub async fn add_category(&mut self, new: NewCategory) -> Result<Category> {
        let category = Category::new(new.name.trim(), new.initial_budget)
            .with_range(new.available_from, new.available_until);
        self.categories.push(category.clone())?;
        self.save_categories().await?;
        info!("Added category '{}'", category.name);
        Ok(category)
    }

    pub async fn set_category_status(&mut self, name: &str, status: CategoryStatus) -> Result<()> {
        let Some(category) = self.categories.find_mut(name) else {
            bail!("There is no category named '{name}'");
        };
        if category.status == status {
            debug!("Category '{name}' is already {status}");
            return Ok(());
        }
        category.status = status;
        self.save_categories().await?;
        info!("Category '{name}' is now {status}");
        Ok(())
    }

    /// Renames the category record only. Balances and distributions stay under the old name and no
    /// longer join to the category.
    pub async fn rename_category(&mut self, old: &str, new: &str) -> Result<()> {
        let new = new.trim();
        ensure!(!new.is_empty(), "A category name cannot be empty");
        if old == new {
            return Ok(());
        }
        if self.categories.find(new).is_some() {
            bail!("A category named '{new}' already exists");
        }
        let Some(category) = self.categories.find_mut(old) else {
            bail!("There is no category named '{old}'");
        };
        category.name = new.to_string();
        self.save_categories().await?;
        if self.ledger.balances().iter().any(|b| b.category_name == old) {
            warn!("History recorded under '{old}' is not carried over to '{new}'");
        }
        info!("Renamed category '{old}' to '{new}'");
        Ok(())
    }

    pub async fn initialize_month(&mut self, month: Month) -> Result<usize> {
        Ok(self.ledger.initialize_month(month, &self.categories).await?)
    }

    pub async fn set_distributions(
        &mut self,
        month: Month,
        edits: Vec<(String, Decimal)>,
    ) -> Result<Vec<DistributionChange>> {
        for (name, _) in &edits {
            if self.categories.find(name).is_none() {
                warn!("'{name}' is not a known category");
            }
        }
        Ok(self.ledger.set_distributions(month, edits).await?)
    }

    /// True when a change has been made in memory that an earlier write failed to store.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.ledger.is_dirty()
    }

    /// Writes again everything an earlier write failed to store.
    pub async fn flush(&mut self) -> Result<()> {
        if self.dirty {
            store::save_records(self.store.as_ref(), TRANSACTIONS, &self.transactions).await?;
            store::save_records(self.store.as_ref(), CATEGORIES, self.categories.data()).await?;
            self.dirty = false;
        }
        Ok(self.ledger.flush().await?)
    }

    /// One row per category that is valid in `month` or has a balance in it, in category order
    /// followed by names that no longer match a category. Transfers are not counted.
    pub fn rollup(&self, month: Month) -> MonthRollup {
        let mut names: Vec<&str> = self
            .categories
            .iter()
            .filter(|c| c.is_valid_for(month) || self.ledger.balance(&c.name, month).is_some())
            .map(|c| c.name.as_str())
            .collect();
        for balance in self.ledger.balances_for_month(month) {
            if !names.contains(&balance.category_name.as_str()) {
                names.push(&balance.category_name);
            }
        }

        let mut flows: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();
        for t in self.transactions.iter().filter(|t| t.month == month) {
            let entry = flows.entry(t.category.as_str()).or_default();
            match t.kind {
                TransactionKind::Income => entry.0 = entry.0.saturating_add(t.amount),
                TransactionKind::Expense => entry.1 = entry.1.saturating_add(t.amount),
                TransactionKind::Transfer => {}
            }
        }

        let rows = names
            .into_iter()
            .map(|name| {
                let (income, expense) = flows.get(name).copied().unwrap_or_default();
                RollupRow {
                    category: name.to_string(),
                    distribution: self.ledger.distribution(name, month).unwrap_or_default(),
                    income,
                    expense,
                    balance: self.ledger.balance(name, month),
                }
            })
            .collect();
        MonthRollup::new(month, rows)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.transactions
            .iter()
            .position(|t| t.id == id)
            .with_context(|| format!("There is no transaction with id '{id}'"))
    }

    fn check(&self, transaction: &Transaction) -> Result<()> {
        ensure!(
            transaction.amount > Decimal::ZERO,
            "The amount must be greater than zero, got {}",
            transaction.amount
        );
        if transaction.kind.affects_categories() {
            ensure!(
                !transaction.category.is_empty(),
                "An {} needs a category",
                transaction.kind
            );
            if self.categories.find(&transaction.category).is_none() {
                warn!("'{}' is not a known category", transaction.category);
            }
        }
        Ok(())
    }

    /// Posts `transaction` to its category. Transfers are not posted.
    async fn post(&mut self, transaction: &Transaction) -> std::result::Result<(), LedgerError> {
        if !transaction.kind.affects_categories() {
            return Ok(());
        }
        self.ledger
            .record_transaction(
                &transaction.category,
                transaction.month,
                transaction.amount,
                transaction.kind,
                &self.categories,
            )
            .await
            .map(|_| ())
    }

    /// Reverses the posting of `transaction`. Transfers were never posted.
    async fn unpost(&mut self, transaction: &Transaction) -> std::result::Result<(), LedgerError> {
        if !transaction.kind.affects_categories() {
            return Ok(());
        }
        self.ledger
            .reverse_transaction(
                &transaction.category,
                transaction.month,
                transaction.amount,
                transaction.kind,
                &self.categories,
            )
            .await
            .map(|_| ())
    }

    async fn save_transactions(&mut self) -> Result<()> {
        let saved =
            store::save_records(self.store.as_ref(), TRANSACTIONS, &self.transactions).await;
        self.dirty |= saved.is_err();
        saved
    }

    async fn save_categories(&mut self) -> Result<()> {
        let saved =
            store::save_records(self.store.as_ref(), CATEGORIES, self.categories.data()).await;
        self.dirty |= saved.is_err();
        saved
    }
}

/// Turns the write outcomes of a change that was applied in memory into one result.
fn report_writes(
    saved: Result<()>,
    posted: std::result::Result<(), LedgerError>,
    change: String,
) -> Result<()> {
    match (saved, posted) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) => Err(e.context(format!("{change} but the transactions were not saved"))),
        (Ok(()), Err(e)) => {
            Err(anyhow::Error::from(e).context(format!("{change} but the balances were not saved")))
        }
        (Err(e), Err(ledger)) => Err(e.context(format!(
            "{change} but neither the transactions nor the balances were saved ({ledger})"
        ))),
    }
}
