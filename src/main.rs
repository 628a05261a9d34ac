use clap::Parser;
use fintrack::args::{Args, CategoryCommand, Command, MonthCommand, TransactionCommand, UpDown};
use fintrack::model::CategoryStatus;
use fintrack::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().fintrack_home().path();

    // When FINTRACK_IN_TEST_MODE is set and non-empty, Drive traffic goes to a directory inside
    // the home instead of Google.
    let mode = Mode::from_env();

    let command = match args.command() {
        Command::Init(init_args) => {
            commands::init(
                home,
                init_args.storage(),
                init_args.drive_folder(),
                init_args.client_secret(),
            )
            .await?
            .print();
            return Ok(());
        }
        other => other,
    };

    let config = Config::load(home).await?;
    let _: () = match command {
        // Handled before the config exists.
        Command::Init(_) => {}

        Command::Auth(auth_args) => commands::auth(&config, mode, auth_args.refresh())
            .await?
            .print(),

        Command::Category(category_args) => match category_args.command() {
            CategoryCommand::Add(args) => commands::category_add(&config, mode, args).await?.print(),
            CategoryCommand::List => commands::category_list(&config, mode).await?.print(),
            CategoryCommand::Deactivate(args) => {
                commands::category_set_status(&config, mode, args.name(), CategoryStatus::Inactive)
                    .await?
                    .print()
            }
            CategoryCommand::Activate(args) => {
                commands::category_set_status(&config, mode, args.name(), CategoryStatus::Active)
                    .await?
                    .print()
            }
            CategoryCommand::Rename(args) => {
                commands::category_rename(&config, mode, args.old(), args.new_name())
                    .await?
                    .print()
            }
        },

        Command::Transaction(transaction_args) => match transaction_args.command() {
            TransactionCommand::Add(args) => {
                commands::transaction_add(&config, mode, args).await?.print()
            }
            TransactionCommand::Edit(args) => {
                commands::transaction_edit(&config, mode, args).await?.print()
            }
            TransactionCommand::List(args) => commands::transaction_list(&config, mode, args.month())
                .await?
                .print(),
            TransactionCommand::Delete(args) => {
                commands::transaction_delete(&config, mode, args.id())
                    .await?
                    .print()
            }
        },

        Command::Month(month_args) => match month_args.command() {
            MonthCommand::Init(args) => commands::month_init(&config, mode, args.month())
                .await?
                .print(),
        },

        Command::Distribute(args) => {
            commands::distribute(&config, mode, args.month(), args.edits())
                .await?
                .print()
        }

        Command::Balance(args) => commands::balance(&config, mode, args.category(), args.month())
            .await?
            .print(),

        Command::Rollup(args) => commands::rollup(&config, mode, args.month()).await?.print(),

        Command::Sync(sync_args) => match sync_args.direction() {
            UpDown::Up => commands::sync_up(&config, mode).await?.print(),
            UpDown::Down => commands::sync_down(&config, mode).await?.print(),
        },
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!(
            "{}={},{}={}",
            env!("CARGO_CRATE_NAME"),
            level,
            env!("CARGO_BIN_NAME"),
            level
        )),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
