//! Typed bindings for the GitHub REST API.
//!
//! ```no_run
//! # async fn demo() -> github_rest::Result<()> {
//! let client = github_rest::Client::from_env()?;
//! let rules = client
//!     .rulesets()
//!     .get_rules_for_branch("octocat", "hello-world", "main")
//!     .await?;
//! for rule in rules.value {
//!     println!("{}", rule.rule.rule_type());
//! }
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod activity;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod issues;
pub mod pagination;
pub mod pulls;
pub mod rate_limit;
pub mod repos;
pub mod rulesets;
pub mod secrets;
pub mod types;

pub use client::Client;
pub use config::Config;
pub use error::{Error, ErrorResponse, Result};
pub use http::Response;
pub use pagination::{ListOptions, Pages};
pub use rate_limit::Rate;
