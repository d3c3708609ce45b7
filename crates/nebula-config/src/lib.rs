//! Settings for the effects demo.
//!
//! Settings persist to disk as RON, accept CLI overrides via clap, and
//! support hot-reload detection. Unknown and missing fields are tolerated.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, NebulaConfig, TrailConfig, WindowConfig};
pub use error::ConfigError;
