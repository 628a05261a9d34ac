//! Category command handlers.

use crate::args::CategoryAddArgs;
use crate::commands::{finish, open_book, plural, Out};
use crate::model::{Category, CategoryStatus, NewCategory};
use crate::{Config, Mode, Result};

pub async fn category_add(config: &Config, mode: Mode, args: &CategoryAddArgs) -> Result<Out<Category>> {
    let mut book = open_book(config, mode).await?;
    let result = book
        .add_category(NewCategory {
            name: args.name().to_string(),
            initial_budget: args.budget().value(),
            available_from: args.from(),
            available_until: args.until(),
        })
        .await;
    let category = finish(config, &mut book, result).await?;
    Ok(Out::new(
        format!("Added category '{}' ({})", category.name(), category.id()),
        category,
    ))
}

pub async fn category_list(config: &Config, mode: Mode) -> Result<Out<Vec<Category>>> {
    let book = open_book(config, mode).await?;
    let categories = book.categories().data().to_vec();
    let mut message = plural(categories.len(), "category", "categories");
    for c in &categories {
        let range = match (c.available_from(), c.available_until()) {
            (None, None) => String::new(),
            (from, until) => format!(
                " {}..{}",
                from.map(|m| m.to_string()).unwrap_or_default(),
                until.map(|m| m.to_string()).unwrap_or_default()
            ),
        };
        message.push_str(&format!(
            "\n  {} [{}] initial {}{range}",
            c.name(),
            c.status(),
            crate::model::Amount::new(c.initial_budget())
        ));
    }
    Ok(Out::new(message, categories))
}

pub async fn category_set_status(
    config: &Config,
    mode: Mode,
    name: &str,
    status: CategoryStatus,
) -> Result<Out<()>> {
    let mut book = open_book(config, mode).await?;
    let result = book.set_category_status(name, status).await;
    finish(config, &mut book, result).await?;
    Ok(format!("Category '{name}' is {status}").into())
}

/// Only the category record changes. History recorded under the old name stays there.
pub async fn category_rename(config: &Config, mode: Mode, old: &str, new: &str) -> Result<Out<()>> {
    let mut book = open_book(config, mode).await?;
    let result = book.rename_category(old, new).await;
    finish(config, &mut book, result).await?;
    Ok(format!("Renamed category '{old}' to '{}'", new.trim()).into())
}
