//! An ordered collection of records with at most one record per (category, month).

use crate::model::{CategoryBalance, CategoryDistribution, Month};
use std::collections::HashMap;
use tracing::warn;

/// A record that is identified by the category it belongs to and a month.
pub(crate) trait Keyed {
    fn category(&self) -> &str;
    fn month(&self) -> Month;

    fn key(&self) -> (String, Month) {
        (self.category().to_string(), self.month())
    }
}

impl Keyed for CategoryBalance {
    fn category(&self) -> &str {
        &self.category_name
    }

    fn month(&self) -> Month {
        self.month
    }
}

impl Keyed for CategoryDistribution {
    fn category(&self) -> &str {
        &self.category_name
    }

    fn month(&self) -> Month {
        self.month
    }
}

/// Records in insertion order plus an index by key. Inserting a record whose key already exists
/// replaces the existing record in place.
#[derive(Debug, Clone)]
pub(crate) struct Records<R: Keyed> {
    items: Vec<R>,
    index: HashMap<(String, Month), usize>,
}

impl<R: Keyed> Default for Records<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<R: Keyed> Records<R> {
    /// Builds the collection from stored data. When the data holds more than one record for a key,
    /// the later one wins and keeps the position of the first.
    pub(crate) fn from_vec(collection: &str, records: Vec<R>) -> Self {
        let mut out = Self::default();
        for record in records {
            if let Some(existing) = out.get(record.category(), record.month()) {
                warn!(
                    "Collection '{collection}' has more than one record for '{}' in {}, keeping the last one",
                    existing.category(),
                    existing.month()
                );
            }
            out.upsert(record);
        }
        out
    }

    pub(crate) fn get(&self, category: &str, month: Month) -> Option<&R> {
        self.position(category, month).map(|i| &self.items[i])
    }

    pub(crate) fn get_mut(&mut self, category: &str, month: Month) -> Option<&mut R> {
        self.position(category, month).map(|i| &mut self.items[i])
    }

    pub(crate) fn contains(&self, category: &str, month: Month) -> bool {
        self.position(category, month).is_some()
    }

    /// Inserts `record`, replacing any record with the same key.
    pub(crate) fn upsert(&mut self, record: R) {
        match self.index.get(&record.key()) {
            Some(&i) => self.items[i] = record,
            None => {
                self.index.insert(record.key(), self.items.len());
                self.items.push(record);
            }
        }
    }

    /// Returns the record for the key, inserting the one built by `make` when there is none.
    pub(crate) fn get_or_insert_with<F>(&mut self, category: &str, month: Month, make: F) -> &mut R
    where
        F: FnOnce() -> R,
    {
        let i = match self.position(category, month) {
            Some(i) => i,
            None => {
                let record = make();
                debug_assert_eq!(record.key(), (category.to_string(), month));
                let i = self.items.len();
                self.index.insert(record.key(), i);
                self.items.push(record);
                i
            }
        };
        &mut self.items[i]
    }

    /// Whether any category has a record in `month`.
    pub(crate) fn any_in_month(&self, month: Month) -> bool {
        self.items.iter().any(|r| r.month() == month)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &R> {
        self.items.iter()
    }

    pub(crate) fn as_slice(&self) -> &[R] {
        &self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    fn position(&self, category: &str, month: Month) -> Option<usize> {
        // Allocating the key keeps the index a plain HashMap; these collections are small.
        self.index.get(&(category.to_string(), month)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn m(s: &str) -> Month {
        Month::from_str(s).unwrap()
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut records = Records::default();
        records.upsert(CategoryBalance::new("Groceries", m("2024-01"), Decimal::from(10)));
        records.upsert(CategoryBalance::new("Rent", m("2024-01"), Decimal::from(20)));
        records.upsert(CategoryBalance::new("Groceries", m("2024-01"), Decimal::from(30)));

        assert_eq!(records.len(), 2);
        assert_eq!(records.as_slice()[0].balance(), Decimal::from(30));
        assert_eq!(records.as_slice()[1].category_name(), "Rent");
    }

    #[test]
    fn test_from_vec_collapses_duplicates() {
        let records = Records::from_vec(
            "category_balances",
            vec![
                CategoryBalance::new("Groceries", m("2024-01"), Decimal::from(1)),
                CategoryBalance::new("Groceries", m("2024-02"), Decimal::from(2)),
                CategoryBalance::new("Groceries", m("2024-01"), Decimal::from(3)),
            ],
        );
        assert_eq!(records.len(), 2);
        let jan = records.get("Groceries", m("2024-01")).unwrap();
        assert_eq!(jan.balance(), Decimal::from(3));
        assert!(records.any_in_month(m("2024-02")));
        assert!(!records.any_in_month(m("2024-03")));
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut records: Records<CategoryDistribution> = Records::default();
        let month = m("2024-05");
        records
            .get_or_insert_with("Fun", month, || {
                CategoryDistribution::new("Fun", month, Decimal::ZERO)
            })
            .allocation = Decimal::from(5);
        let again = records.get_or_insert_with("Fun", month, || {
            CategoryDistribution::new("Fun", month, Decimal::from(99))
        });
        assert_eq!(again.allocation(), Decimal::from(5));
        assert_eq!(records.len(), 1);
        assert!(records.contains("Fun", month));
        assert!(records.get_mut("Other", month).is_none());
    }
}
