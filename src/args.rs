//! These structs provide the CLI interface for the fintrack CLI.

use crate::model::{Amount, Month, TransactionEdit, TransactionKind};
use crate::StorageKind;
use anyhow::{ensure, Context};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// fintrack: a personal and family finance tracker.
///
/// Record income, expenses and transfers against budget categories, allocate money to categories
/// each month, and see how every category stands at the end of the month. Data is kept in local
/// JSON files, in a SQLite file, or in Google Drive with a local copy for offline use.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and the configuration file.
    ///
    /// This is the first command to run. Choose where data is kept with --storage. For Google
    /// Drive, pass the OAuth client credentials downloaded from Google Cloud Console as
    /// --client-secret and put an authorized token at .secrets/token.json in the home directory.
    Init(InitArgs),
    /// Check the Google OAuth token and refresh it if it is about to expire.
    Auth(AuthArgs),
    /// Add, list, activate, deactivate or rename budget categories.
    Category(CategoryArgs),
    /// Add, list or delete transactions.
    Transaction(TransactionArgs),
    /// Month-level operations.
    Month(MonthArgs),
    /// Set how much is allocated to categories in a month, e.g. `distribute 2024-03 Rent=1200`.
    Distribute(DistributeArgs),
    /// Show one category's balance for a month.
    Balance(BalanceArgs),
    /// Show every category's distribution, income, expense and balance for a month.
    Rollup(RollupArgs),
    /// Copy all collections between the local data directory and Google Drive.
    Sync(SyncArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where fintrack data and configuration is held. Defaults to ~/fintrack
    #[arg(long, env = "FINTRACK_HOME", default_value_t = default_fintrack_home())]
    fintrack_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, fintrack_home: PathBuf) -> Self {
        Self {
            log_level,
            fintrack_home: fintrack_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn fintrack_home(&self) -> &DisplayPath {
        &self.fintrack_home
    }
}

/// (Not shown): Args for the `fintrack init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Where to keep the data.
    #[arg(long, value_enum, default_value_t = StorageKind::Local)]
    storage: StorageKind,

    /// The id of the Google Drive folder to keep the data in. Without it, the hidden application
    /// data space of your Drive is used.
    #[arg(long)]
    drive_folder: Option<String>,

    /// The path to your downloaded OAuth client credentials. The file is copied into the home
    /// directory.
    #[arg(long)]
    client_secret: Option<PathBuf>,
}

impl InitArgs {
    pub fn new(
        storage: StorageKind,
        drive_folder: Option<String>,
        client_secret: Option<PathBuf>,
    ) -> Self {
        Self {
            storage,
            drive_folder,
            client_secret,
        }
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    pub fn drive_folder(&self) -> Option<&str> {
        self.drive_folder.as_deref()
    }

    pub fn client_secret(&self) -> Option<&Path> {
        self.client_secret.as_deref()
    }
}

/// (Not shown): Args for the `fintrack auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Refresh the token even if it has not expired.
    #[arg(long)]
    refresh: bool,
}

impl AuthArgs {
    pub fn new(refresh: bool) -> Self {
        Self { refresh }
    }

    pub fn refresh(&self) -> bool {
        self.refresh
    }
}

#[derive(Debug, Parser, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    command: CategoryCommand,
}

impl CategoryArgs {
    pub fn new(command: CategoryCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &CategoryCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// Add a category.
    Add(CategoryAddArgs),
    /// List all categories.
    List,
    /// Stop a category from taking part in new months.
    Deactivate(CategoryNameArgs),
    /// Let an inactive category take part in new months again.
    Activate(CategoryNameArgs),
    /// Rename a category. Balances and distributions already recorded keep the old name.
    Rename(CategoryRenameArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct CategoryAddArgs {
    /// The category name, e.g. Groceries.
    name: String,

    /// The balance the category starts with in its first month.
    #[arg(long, default_value = "0")]
    budget: Amount,

    /// The first month the category is used, YYYY-MM.
    #[arg(long)]
    from: Option<Month>,

    /// The last month the category is used, YYYY-MM.
    #[arg(long)]
    until: Option<Month>,
}

impl CategoryAddArgs {
    pub fn new(name: impl Into<String>, budget: Amount, from: Option<Month>, until: Option<Month>) -> Self {
        Self {
            name: name.into(),
            budget,
            from,
            until,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn budget(&self) -> Amount {
        self.budget
    }

    pub fn from(&self) -> Option<Month> {
        self.from
    }

    pub fn until(&self) -> Option<Month> {
        self.until
    }
}

#[derive(Debug, Parser, Clone)]
pub struct CategoryNameArgs {
    name: String,
}

impl CategoryNameArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Parser, Clone)]
pub struct CategoryRenameArgs {
    old: String,
    new: String,
}

impl CategoryRenameArgs {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    pub fn old(&self) -> &str {
        &self.old
    }

    pub fn new_name(&self) -> &str {
        &self.new
    }
}

#[derive(Debug, Parser, Clone)]
pub struct TransactionArgs {
    #[command(subcommand)]
    command: TransactionCommand,
}

impl TransactionArgs {
    pub fn new(command: TransactionCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &TransactionCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum TransactionCommand {
    /// Record a transaction. Income and expenses change the category balance, transfers do not.
    Add(TransactionAddArgs),
    /// List transactions, optionally only those in one month.
    List(TransactionListArgs),
    /// Change fields of a transaction. Its old effect on category balances is undone and the new
    /// one applied.
    Edit(TransactionEditArgs),
    /// Delete a transaction and undo its effect on the category balance.
    Delete(TransactionDeleteArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct TransactionAddArgs {
    /// The amount, greater than zero, e.g. 42.50 or $1,200
    amount: Amount,

    #[arg(long, value_enum, default_value_t = TransactionKind::Expense)]
    kind: TransactionKind,

    /// The category the transaction belongs to. Required for income and expenses.
    #[arg(long, default_value = "")]
    category: String,

    /// The month, YYYY-MM. Defaults to the current month.
    #[arg(long)]
    month: Option<Month>,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, default_value = "")]
    account: String,
}

impl TransactionAddArgs {
    pub fn new(
        amount: Amount,
        kind: TransactionKind,
        category: impl Into<String>,
        month: Option<Month>,
    ) -> Self {
        Self {
            amount,
            kind,
            category: category.into(),
            month,
            description: String::new(),
            account: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn month(&self) -> Option<Month> {
        self.month
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

#[derive(Debug, Parser, Clone, Default)]
pub struct TransactionListArgs {
    /// Only list transactions in this month, YYYY-MM.
    #[arg(long)]
    month: Option<Month>,
}

impl TransactionListArgs {
    pub fn new(month: Option<Month>) -> Self {
        Self { month }
    }

    pub fn month(&self) -> Option<Month> {
        self.month
    }
}

/// Only the options that are given change.
#[derive(Debug, Parser, Clone, Default)]
pub struct TransactionEditArgs {
    id: String,

    #[arg(long)]
    amount: Option<Amount>,

    #[arg(long, value_enum)]
    kind: Option<TransactionKind>,

    #[arg(long)]
    category: Option<String>,

    /// The month, YYYY-MM.
    #[arg(long)]
    month: Option<Month>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    account: Option<String>,
}

impl TransactionEditArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The requested changes.
    pub fn edit(&self) -> TransactionEdit {
        TransactionEdit {
            month: self.month,
            description: self.description.clone(),
            amount: self.amount.map(|a| a.value()),
            kind: self.kind,
            category: self.category.clone(),
            account: self.account.clone(),
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct TransactionDeleteArgs {
    id: String,
}

impl TransactionDeleteArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Parser, Clone)]
pub struct MonthArgs {
    #[command(subcommand)]
    command: MonthCommand,
}

impl MonthArgs {
    pub fn new(command: MonthCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &MonthCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum MonthCommand {
    /// Create the month's balances and distributions for every valid category. Balances carry
    /// forward from the previous month. Running it again only fills in what is missing.
    Init(MonthInitArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct MonthInitArgs {
    /// YYYY-MM
    month: Month,
}

impl MonthInitArgs {
    pub fn new(month: Month) -> Self {
        Self { month }
    }

    pub fn month(&self) -> Month {
        self.month
    }
}

/// (Not shown): Args for the `fintrack distribute` command.
#[derive(Debug, Parser, Clone)]
pub struct DistributeArgs {
    /// YYYY-MM
    month: Month,

    /// One or more CATEGORY=AMOUNT pairs.
    #[arg(required = true)]
    edits: Vec<DistributionEdit>,
}

impl DistributeArgs {
    pub fn new(month: Month, edits: Vec<DistributionEdit>) -> Self {
        Self { month, edits }
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn edits(&self) -> &[DistributionEdit] {
        &self.edits
    }
}

/// A `CATEGORY=AMOUNT` pair. The last `=` separates the two, so names may contain `=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionEdit {
    category: String,
    amount: Amount,
}

impl DistributionEdit {
    pub fn new(category: impl Into<String>, amount: Amount) -> Self {
        Self {
            category: category.into(),
            amount,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

impl FromStr for DistributionEdit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, amount) = s
            .rsplit_once('=')
            .with_context(|| format!("Expected CATEGORY=AMOUNT, got '{s}'"))?;
        let category = category.trim();
        ensure!(!category.is_empty(), "Missing the category name in '{s}'");
        Ok(Self {
            category: category.to_string(),
            amount: amount.parse()?,
        })
    }
}

#[derive(Debug, Parser, Clone)]
pub struct BalanceArgs {
    category: String,
    /// YYYY-MM
    month: Month,
}

impl BalanceArgs {
    pub fn new(category: impl Into<String>, month: Month) -> Self {
        Self {
            category: category.into(),
            month,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn month(&self) -> Month {
        self.month
    }
}

#[derive(Debug, Parser, Clone, Default)]
pub struct RollupArgs {
    /// YYYY-MM, defaults to the current month.
    month: Option<Month>,
}

impl RollupArgs {
    pub fn new(month: Option<Month>) -> Self {
        Self { month }
    }

    pub fn month(&self) -> Option<Month> {
        self.month
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpDown {
    Up,
    #[default]
    Down,
}

serde_plain::derive_display_from_serialize!(UpDown);
serde_plain::derive_fromstr_from_deserialize!(UpDown);

/// (Not shown): Args for the `fintrack sync` command.
#[derive(Debug, Parser, Clone)]
pub struct SyncArgs {
    /// The direction to sync: "up" replaces the Drive copy with local data, "down" replaces local
    /// data with the Drive copy.
    direction: UpDown,
}

impl SyncArgs {
    pub fn new(direction: UpDown) -> Self {
        Self { direction }
    }

    pub fn direction(&self) -> UpDown {
        self.direction
    }
}

fn default_fintrack_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("fintrack"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --fintrack-home or FINTRACK_HOME instead of relying on the \
                default home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("fintrack")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_distribution_edit_parse() {
        let edit = DistributionEdit::from_str("Rent=1,200").unwrap();
        assert_eq!(edit.category(), "Rent");
        assert_eq!(edit.amount().value(), Decimal::from(1200));

        let edit = DistributionEdit::from_str("A=B=$5").unwrap();
        assert_eq!(edit.category(), "A=B");
        assert_eq!(edit.amount().value(), Decimal::from(5));

        assert!(DistributionEdit::from_str("Rent").is_err());
        assert!(DistributionEdit::from_str("=5").is_err());
        assert!(DistributionEdit::from_str("Rent=abc").is_err());
    }

    #[test]
    fn test_parse_distribute_command() {
        let args = Args::try_parse_from([
            "fintrack",
            "--fintrack-home",
            "/tmp/ft",
            "distribute",
            "2024-03",
            "Rent=1200",
            "Fun=50",
        ])
        .unwrap();
        assert_eq!(args.common().fintrack_home().path(), Path::new("/tmp/ft"));
        let Command::Distribute(d) = args.command() else {
            panic!("expected distribute, got {:?}", args.command());
        };
        assert_eq!(d.month().to_string(), "2024-03");
        assert_eq!(d.edits().len(), 2);
        assert!(Args::try_parse_from(["fintrack", "distribute", "2024-03"]).is_err());
    }

    #[test]
    fn test_parse_transaction_edit() {
        let args = Args::try_parse_from([
            "fintrack",
            "transaction",
            "edit",
            "abc-123",
            "--amount",
            "45",
            "--kind",
            "transfer",
        ])
        .unwrap();
        let Command::Transaction(t) = args.command() else {
            panic!("expected transaction");
        };
        let TransactionCommand::Edit(edit) = t.command() else {
            panic!("expected edit, got {:?}", t.command());
        };
        assert_eq!(edit.id(), "abc-123");
        let changes = edit.edit();
        assert_eq!(changes.amount, Some(Decimal::from(45)));
        assert_eq!(changes.kind, Some(TransactionKind::Transfer));
        assert_eq!(changes.category, None);
        assert_eq!(changes.month, None);
    }

    #[test]
    fn test_parse_transaction_add() {
        let args = Args::try_parse_from([
            "fintrack",
            "transaction",
            "add",
            "$30",
            "--kind",
            "income",
            "--category",
            "Salary",
            "--month",
            "2024-01",
        ])
        .unwrap();
        let Command::Transaction(t) = args.command() else {
            panic!("expected transaction");
        };
        let TransactionCommand::Add(add) = t.command() else {
            panic!("expected add");
        };
        assert_eq!(add.kind(), TransactionKind::Income);
        assert_eq!(add.amount().value(), Decimal::from(30));
        assert_eq!(add.month().map(|m| m.to_string()).as_deref(), Some("2024-01"));
        assert!(Args::try_parse_from(["fintrack", "rollup", "2024-13"]).is_err());
    }

    #[test]
    fn test_parse_sync() {
        let args = Args::try_parse_from(["fintrack", "sync", "up"]).unwrap();
        let Command::Sync(s) = args.command() else {
            panic!("expected sync");
        };
        assert_eq!(s.direction(), UpDown::Up);
    }
}
