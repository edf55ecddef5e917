//! CLI command implementations.
//!
//! - `start`: Provision and run an instance until stdin closes
//! - `dsn`: Render a DSN from flags
//! - `show_config`: Print the resolved configuration
//! - `completions`: Generate shell completion scripts

pub mod completions;
pub mod dsn;
pub mod show_config;
pub mod start;

pub use completions::CompletionsCommand;
pub use dsn::DsnCommand;
pub use show_config::ShowConfigCommand;
pub use start::StartCommand;
