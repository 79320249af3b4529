//! HTTP client library for the OptionsHouse brokerage API.
//!
//! This crate wraps the OptionsHouse JSON-over-HTTPS protocol: requests are
//! `EZMessage`/`EZList` envelopes posted as form data, signed with a session
//! token. A [`Session`] logs in on first use, spaces requests at least one
//! second apart, and logs in again once when the server rejects the token.
//!
//! # Example
//!
//! ```no_run
//! use optionshouse_client::{ClientConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), optionshouse_client::Error> {
//!     let mut session = Session::new(ClientConfig::new("user", "password"))?;
//!
//!     // Logs in, then fetches the account list
//!     let accounts = session.account_info().await?;
//!     println!("{:?}", accounts.data());
//!
//!     session.cancel_order("A1", 192743916).await?;
//!     session.logout().await?;
//!
//!     Ok(())
//! }
//! ```

mod actions;
mod client;
mod error;
mod throttle;
mod types;

pub use actions::{batch, single};
pub use client::{ClientConfig, DEFAULT_REMOTE_HOST, Session};
pub use error::{Error, ErrorKind};
pub use throttle::{DEFAULT_MIN_INTERVAL, Throttle};
pub use types::*;
