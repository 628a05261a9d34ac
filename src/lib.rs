//! fintrack: a personal and family finance tracker.
//!
//! Transactions are recorded against user-defined budget categories. The `ledger` module keeps a
//! running balance and a distribution (allocation) for every (category, month) pair, carrying
//! balances forward as new months are touched. Data lives in named collections persisted to local
//! JSON files, a SQLite file, or Google Drive with a local cache.

mod api;
pub mod args;
mod backup;
mod book;
pub mod commands;
mod config;
mod db;
mod error;
pub mod ledger;
pub mod model;
pub mod store;
mod utils;

#[cfg(test)]
mod test;

pub use api::Mode;
pub use book::Book;
pub use config::{Config, StorageKind};
pub use error::Error;
pub use error::Result;
pub use ledger::{CategoryLedger, DistributionChange, LedgerError};
