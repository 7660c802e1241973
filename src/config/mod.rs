//! Configuration management
//!
//! Node list, retry budgets, timeouts and chain parameters. Values come from built-in
//! defaults, an optional TOML file named by `GOLOS_CONFIG`, and `GOLOS_*` environment
//! variables, in that order.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
