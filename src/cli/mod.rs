//! # CLI Module
//!
//! Command-line tools for inspecting an application's configuration.
//!
//! ## Commands
//!
//! ### `route`
//!
//! Resolve a URI with the conventional router and print the controller and
//! action the dispatcher would look up:
//!
//! ```bash
//! mvcore route --uri /admin/users/edit/7 --config app.yaml
//! ```
//!
//! Modules declared in the configuration are recognised as a leading path
//! segment.
//!
//! ### `check-config`
//!
//! Parse a configuration file, apply environment overrides and print the
//! resolved settings, including the store connection string:
//!
//! ```bash
//! mvcore check-config --config app.yaml
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use mvcore::cli::run_cli;
//!
//! run_cli()?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{execute, run_cli, Cli, Commands};
