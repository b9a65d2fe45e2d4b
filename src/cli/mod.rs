//! Command-line interface module.

mod args;
mod common;
pub mod inject;
pub mod load;
pub mod resolve;
pub mod stats;

pub use args::{Cli, Commands};
