use crate::model::{Amount, Month};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// The month-end view of every category touched by, or valid in, a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthRollup {
    pub month: Month,
    pub rows: Vec<RollupRow>,
    pub totals: RollupTotals,
}

/// One category's line in a `MonthRollup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollupRow {
    pub category: String,
    pub distribution: Decimal,
    pub income: Decimal,
    pub expense: Decimal,
    /// `None` when the month has not been initialized for this category yet.
    pub balance: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollupTotals {
    pub distribution: Decimal,
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

impl MonthRollup {
    pub fn new(month: Month, rows: Vec<RollupRow>) -> Self {
        let mut totals = RollupTotals::default();
        for row in &rows {
            // Totals clamp at the Decimal bounds rather than overflow.
            totals.distribution = totals.distribution.saturating_add(row.distribution);
            totals.income = totals.income.saturating_add(row.income);
            totals.expense = totals.expense.saturating_add(row.expense);
            totals.balance = totals
                .balance
                .saturating_add(row.balance.unwrap_or_default());
        }
        Self {
            month,
            rows,
            totals,
        }
    }

    pub fn row(&self, category: &str) -> Option<&RollupRow> {
        self.rows.iter().find(|r| r.category == category)
    }
}

impl fmt::Display for MonthRollup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Budget for {}", self.month)?;
        writeln!(
            f,
            "{:<24}{:>16}{:>16}{:>16}{:>16}",
            "Category", "Distribution", "Income", "Expense", "Balance"
        )?;
        for row in &self.rows {
            let balance = row
                .balance
                .map(|b| Amount::new(b).to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "{:<24}{:>16}{:>16}{:>16}{:>16}",
                row.category,
                Amount::new(row.distribution).to_string(),
                Amount::new(row.income).to_string(),
                Amount::new(row.expense).to_string(),
                balance
            )?;
        }
        write!(
            f,
            "{:<24}{:>16}{:>16}{:>16}{:>16}",
            "Total",
            Amount::new(self.totals.distribution).to_string(),
            Amount::new(self.totals.income).to_string(),
            Amount::new(self.totals.expense).to_string(),
            Amount::new(self.totals.balance).to_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_totals_skip_uninitialized_balances() {
        let rows = vec![
            RollupRow {
                category: "Groceries".into(),
                distribution: Decimal::from(50),
                income: Decimal::ZERO,
                expense: Decimal::from(30),
                balance: Some(Decimal::from(170)),
            },
            RollupRow {
                category: "Fun".into(),
                distribution: Decimal::ZERO,
                income: Decimal::from(5),
                expense: Decimal::ZERO,
                balance: None,
            },
        ];
        let rollup = MonthRollup::new(Month::from_str("2024-01").unwrap(), rows);
        assert_eq!(rollup.totals.balance, Decimal::from(170));
        assert_eq!(rollup.totals.income, Decimal::from(5));
        let text = rollup.to_string();
        assert!(text.starts_with("Budget for 2024-01"));
        assert!(text.contains("$170.00"));
        assert_eq!(rollup.row("Fun").unwrap().balance, None);
    }
}
