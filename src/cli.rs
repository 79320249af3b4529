//! Command line interface.

use clap::{Parser, Subcommand};
use optionshouse_client::{ActivityQuery, Envelope, Error, OrderRef, Session};
use std::path::PathBuf;
use tracing::{info, warn};

/// OptionsHouse command line client.
#[derive(Debug, Parser)]
#[command(name = "optionshouse", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        env = "OPTIONSHOUSE_CONFIG",
        default_value = "optionshouse.toml"
    )]
    pub config: PathBuf,

    /// Login password, taking precedence over the configuration file.
    #[arg(long, env = "OPTIONSHOUSE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Keep the server-side session open when done.
    #[arg(long)]
    pub no_logout: bool,

    /// Action to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported actions.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List accounts visible to the login.
    Info,
    /// Show cash balances.
    Cash {
        /// Account identifier.
        account: String,
    },
    /// Show margin requirements.
    Margin {
        /// Account identifier.
        account: String,
    },
    /// Show open positions for up to three accounts.
    Positions {
        /// Account identifiers.
        #[arg(required = true, num_args = 1..=3)]
        accounts: Vec<String>,
    },
    /// Show account activity.
    Activity {
        /// Account identifier.
        account: String,
        /// Page number.
        #[arg(long)]
        page: Option<u32>,
        /// Entries per page.
        #[arg(long, default_value_t = 50)]
        size: u32,
    },
    /// List master account orders.
    Orders {
        /// Account identifier.
        account: String,
    },
    /// Cancel up to three orders.
    Cancel {
        /// Account identifier.
        account: String,
        /// Order identifiers.
        #[arg(required = true, num_args = 1..=3)]
        order_ids: Vec<u64>,
    },
    /// Show order details.
    Details {
        /// Account identifier.
        account: String,
        /// Order identifier.
        order_id: u64,
    },
    /// Show order history.
    History {
        /// Account identifier.
        account: String,
        /// Order identifier.
        order_id: u64,
    },
    /// Quote instruments.
    Quote {
        /// Instrument keys.
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show the option series of an underlying.
    Series {
        /// Underlying symbol.
        symbol: String,
    },
    /// Extend the session token lifetime.
    KeepAlive {
        /// Account identifier.
        account: String,
    },
}

/// Runs one command against the session.
///
/// # Errors
/// Returns error if the request fails.
pub async fn run(session: &mut Session, command: &Command) -> Result<Envelope, Error> {
    info!("Running {:?}", command);

    match command {
        Command::Info => session.account_info().await,
        Command::Cash { account } => session.account_cash(account).await,
        Command::Margin { account } => session.account_margin(account).await,
        Command::Positions { accounts } => match accounts.as_slice() {
            [account] => session.account_positions(account).await,
            _ => {
                let accounts: Vec<&str> = accounts.iter().map(String::as_str).collect();
                session.account_positions_batch(&accounts).await
            }
        },
        Command::Activity {
            account,
            page,
            size,
        } => {
            let query = match page {
                Some(page) => ActivityQuery::new(account).page(*page, *size),
                None => ActivityQuery::new(account),
            };
            session.account_activity(&query).await
        }
        Command::Orders { account } => session.master_account_orders(account).await,
        Command::Cancel { account, order_ids } => match order_ids.as_slice() {
            [order_id] => session.cancel_order(account, *order_id).await,
            _ => {
                let orders: Vec<OrderRef> = order_ids
                    .iter()
                    .map(|id| OrderRef::new(account, *id))
                    .collect();
                session.cancel_orders(&orders).await
            }
        },
        Command::Details { account, order_id } => session.order_details(account, *order_id).await,
        Command::History { account, order_id } => session.order_history(account, *order_id).await,
        Command::Quote { keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            session.quote_list(&keys).await
        }
        Command::Series { symbol } => session.series(symbol).await,
        Command::KeepAlive { account } => session.keep_alive(account).await,
    }
}

/// Runs one command, then closes the session whether or not it succeeded.
///
/// The server-side session is logged out when `logout` is set and a token
/// is held. A failed logout is only logged.
///
/// # Errors
/// Returns the command's error, if any.
pub async fn execute(
    session: &mut Session,
    command: &Command,
    logout: bool,
) -> Result<Envelope, Error> {
    let result = run(session, command).await;

    if logout
        && session.is_authenticated()
        && let Err(e) = session.logout().await
    {
        warn!("Logout failed: {}", e);
    }
    session.disconnect();

    result
}
