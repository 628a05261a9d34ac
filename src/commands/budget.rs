//! Month-level budget commands: initializing a month, distributing money to categories, and
//! reading balances back.

use crate::args::DistributionEdit;
use crate::commands::{finish, open_book, plural, Out};
use crate::model::{Amount, Month, MonthRollup};
use crate::{Config, DistributionChange, Mode, Result};
use anyhow::bail;
use rust_decimal::Decimal;
use tracing::warn;

pub async fn month_init(config: &Config, mode: Mode, month: Month) -> Result<Out<usize>> {
    let mut book = open_book(config, mode).await?;
    let result = book.initialize_month(month).await;
    let created = finish(config, &mut book, result).await?;
    let message = if created == 0 {
        format!("{month} was already initialized")
    } else {
        format!("Initialized {month}, {}", plural(created, "record", "records"))
    };
    Ok(Out::new(message, created))
}

/// Applies all edits for the month as one batch.
pub async fn distribute(
    config: &Config,
    mode: Mode,
    month: Month,
    edits: &[DistributionEdit],
) -> Result<Out<Vec<DistributionChange>>> {
    let mut book = open_book(config, mode).await?;
    let edits = edits
        .iter()
        .map(|e| (e.category().to_string(), e.amount().value()))
        .collect();
    let result = book.set_distributions(month, edits).await;
    let changes = finish(config, &mut book, result).await?;

    let mut message = format!(
        "Distributed to {} in {month}",
        plural(changes.len(), "category", "categories")
    );
    for change in &changes {
        let balance = match change.balance {
            Some(b) => Amount::new(b).to_string(),
            None => {
                warn!(
                    "'{}' has no balance in {month}, its balance was not changed",
                    change.category
                );
                "-".to_string()
            }
        };
        message.push_str(&format!(
            "\n  {}: {} -> {}, balance {balance}",
            change.category,
            Amount::new(change.previous),
            Amount::new(change.allocation)
        ));
    }
    Ok(Out::new(message, changes))
}

pub async fn balance(config: &Config, mode: Mode, category: &str, month: Month) -> Result<Out<Decimal>> {
    let book = open_book(config, mode).await?;
    match book.ledger().balance(category, month) {
        Some(balance) => Ok(Out::new(
            format!("'{category}' balance for {month}: {}", Amount::new(balance)),
            balance,
        )),
        None => bail!("'{category}' has no balance for {month}"),
    }
}

pub async fn rollup(config: &Config, mode: Mode, month: Option<Month>) -> Result<Out<MonthRollup>> {
    let book = open_book(config, mode).await?;
    let rollup = book.rollup(month.unwrap_or_else(Month::current));
    Ok(Out::new(rollup.to_string(), rollup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{CategoryAddArgs, TransactionAddArgs};
    use crate::commands::{category_add, transaction_add};
    use crate::model::TransactionKind;
    use crate::test::TestEnv;
    use std::str::FromStr;

    fn month(s: &str) -> Month {
        Month::from_str(s).unwrap()
    }

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_groceries_through_commands() {
        let env = TestEnv::sqlite().await;
        let config = env.config();
        category_add(
            &config,
            Mode::Test,
            &CategoryAddArgs::new("Groceries", amount("200"), Some(month("2024-01")), None),
        )
        .await
        .unwrap();
        transaction_add(
            &config,
            Mode::Test,
            &TransactionAddArgs::new(
                amount("30"),
                TransactionKind::Expense,
                "Groceries",
                Some(month("2024-01")),
            ),
        )
        .await
        .unwrap();

        let out = balance(&config, Mode::Test, "Groceries", month("2024-01"))
            .await
            .unwrap();
        assert_eq!(out.structure(), Some(&Decimal::from(170)));

        assert!(balance(&config, Mode::Test, "Groceries", month("2024-02"))
            .await
            .is_err());
        let out = month_init(&config, Mode::Test, month("2024-02")).await.unwrap();
        assert_eq!(out.structure(), Some(&2));
        let out = month_init(&config, Mode::Test, month("2024-02")).await.unwrap();
        assert!(out.message().contains("already"));

        let out = distribute(
            &config,
            Mode::Test,
            month("2024-02"),
            &[DistributionEdit::new("Groceries", amount("80"))],
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap()[0].balance, Some(Decimal::from(250)));

        let out = rollup(&config, Mode::Test, Some(month("2024-02")))
            .await
            .unwrap();
        let row = out.structure().unwrap().row("Groceries").unwrap();
        assert_eq!(row.distribution, Decimal::from(80));
        assert_eq!(row.balance, Some(Decimal::from(250)));
        assert!(out.message().contains("Budget for 2024-02"));
    }
}
