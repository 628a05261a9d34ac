//! Command handlers for the fintrack CLI.
//!
//! Each handler loads what it needs from the `Config`, does its work and returns an `Out` with a
//! message for the user and, optionally, structured data.

mod auth;
mod budget;
mod category;
mod init;
mod sync;
mod transaction;

use crate::{store, Book, Config, Mode, Result, StorageKind};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use auth::auth;
pub use budget::{balance, distribute, month_init, rollup};
pub use category::{category_add, category_list, category_rename, category_set_status};
pub use init::init;
pub use sync::{sync_down, sync_up};
pub use transaction::{transaction_add, transaction_delete, transaction_edit, transaction_list};

/// The output type for a command: a consistent message and, optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Opens the configured store and loads everything recorded in it.
async fn open_book(config: &Config, mode: Mode) -> Result<Book> {
    let store = store::open(config, mode).await?;
    Book::load(store).await
}

/// Ends a command that changed the book. Whatever a failed write left unsaved is written once
/// more before the process exits, and anything that still could not be written is reported.
async fn finish<T>(config: &Config, book: &mut Book, result: Result<T>) -> Result<T> {
    if !book.is_dirty() {
        return result;
    }
    let retried = book.flush().await;
    let hint = match config.storage() {
        StorageKind::Drive => ". The local copy is up to date, run 'fintrack sync up' once Google \
            Drive can be reached",
        StorageKind::Local | StorageKind::Sqlite => "",
    };
    match (result, retried) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.context(format!("The change could not be saved{hint}"))),
        (Err(e), Ok(())) => {
            Err(e.context("The change was applied and has been saved on a second attempt"))
        }
        (Err(e), Err(retry)) => Err(e.context(format!(
            "Saving again also failed ({retry:#}){hint}"
        ))),
    }
}

/// "1 category", "3 categories"
fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, NewCategory};
    use crate::store::{MemoryStore, CATEGORIES};
    use crate::test::TestEnv;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_finish_writes_what_failed() {
        let env = TestEnv::new().await;
        let config = env.config();
        let store = Arc::new(MemoryStore::default());
        let mut book = Book::load(store.clone()).await.unwrap();

        store.set_fail_saves(true);
        let result = book
            .add_category(NewCategory {
                name: "Rent".to_string(),
                ..Default::default()
            })
            .await;
        assert!(book.is_dirty());
        let err = finish(&config, &mut book, result).await.unwrap_err();
        assert!(format!("{err:#}").contains("Saving again also failed"));
        assert!(book.is_dirty());

        store.set_fail_saves(false);
        let result = book
            .add_category(NewCategory {
                name: "Food".to_string(),
                ..Default::default()
            })
            .await;
        let category = finish(&config, &mut book, result).await.unwrap();
        assert_eq!(category.name(), "Food");
        assert!(!book.is_dirty());
        let saved: Vec<Category> = store::load_records(store.as_ref(), CATEGORIES)
            .await
            .unwrap();
        assert_eq!(saved.len(), 2);
    }
}
