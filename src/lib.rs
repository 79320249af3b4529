//! # OptionsHouse - Command Line Client
//!
//! Runs single OptionsHouse API actions from the shell, on top of the
//! [`optionshouse_client`] session library.
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cli`] | Argument parsing and command dispatch |
//! | [`config`] | TOML configuration loading and validation |
//!
//! ## Configuration
//!
//! ```toml
//! [credentials]
//! username = "trader"
//! # password may also come from OPTIONSHOUSE_PASSWORD
//! password = "secret"
//!
//! [client]
//! remote_host = "https://api.optionshouse.com"
//! raise_errors = true
//! fast_api = false
//! min_request_interval_ms = 1000
//! timeout_secs = 30
//! accept_invalid_certs = false
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## Example Usage
//!
//! ```bash
//! # List accounts
//! optionshouse --config optionshouse.toml info
//!
//! # Cancel two orders in one batch
//! optionshouse cancel A1 192743916 192743917
//!
//! # Verbose request logging
//! RUST_LOG=debug optionshouse series AAPL
//! ```

pub mod cli;
pub mod config;
