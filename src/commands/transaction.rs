//! Transaction command handlers.

use crate::args::{TransactionAddArgs, TransactionEditArgs};
use crate::commands::{finish, open_book, plural, Out};
use crate::model::{Amount, Month, NewTransaction, Transaction};
use crate::{Book, Config, Mode, Result};

/// Records a transaction in the given month, or the current one.
pub async fn transaction_add(
    config: &Config,
    mode: Mode,
    args: &TransactionAddArgs,
) -> Result<Out<Transaction>> {
    let mut book = open_book(config, mode).await?;
    let result = book
        .add_transaction(NewTransaction {
            month: args.month().unwrap_or_else(Month::current),
            description: args.description().to_string(),
            amount: args.amount().value(),
            kind: args.kind(),
            category: args.category().to_string(),
            account: args.account().to_string(),
        })
        .await;
    let transaction = finish(config, &mut book, result).await?;
    let message = describe(&book, "Recorded", &transaction);
    Ok(Out::new(message, transaction))
}

/// Changes the given fields of a transaction and moves its effect on category balances.
pub async fn transaction_edit(
    config: &Config,
    mode: Mode,
    args: &TransactionEditArgs,
) -> Result<Out<Transaction>> {
    let mut book = open_book(config, mode).await?;
    let result = book.edit_transaction(args.id(), args.edit()).await;
    let transaction = finish(config, &mut book, result).await?;
    let message = describe(&book, "Updated", &transaction);
    Ok(Out::new(message, transaction))
}

/// "Recorded expense <id> of $30.00 in 2024-01, 'Groceries' balance is now $170.00"
fn describe(book: &Book, verb: &str, transaction: &Transaction) -> String {
    let mut message = format!(
        "{verb} {} {} of {} in {}",
        transaction.kind(),
        transaction.id(),
        Amount::new(transaction.amount()),
        transaction.month()
    );
    if transaction.kind().affects_categories() {
        if let Some(balance) = book
            .ledger()
            .balance(transaction.category(), transaction.month())
        {
            message.push_str(&format!(
                ", '{}' balance is now {}",
                transaction.category(),
                Amount::new(balance)
            ));
        }
    }
    message
}

pub async fn transaction_list(
    config: &Config,
    mode: Mode,
    month: Option<Month>,
) -> Result<Out<Vec<Transaction>>> {
    let book = open_book(config, mode).await?;
    let transactions: Vec<Transaction> = book.transactions(month).into_iter().cloned().collect();
    let mut message = plural(transactions.len(), "transaction", "transactions");
    for t in &transactions {
        message.push_str(&format!(
            "\n  {} {} {:<8} {:>14} {} {}",
            t.id(),
            t.month(),
            t.kind(),
            Amount::new(t.amount()).to_string(),
            t.category(),
            t.description()
        ));
    }
    Ok(Out::new(message, transactions))
}

/// Deletes a transaction and undoes its effect on its category's balance.
pub async fn transaction_delete(config: &Config, mode: Mode, id: &str) -> Result<Out<Transaction>> {
    let mut book = open_book(config, mode).await?;
    let result = book.delete_transaction(id).await;
    let transaction = finish(config, &mut book, result).await?;
    Ok(Out::new(format!("Deleted transaction {id}"), transaction))
}
