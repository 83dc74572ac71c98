pub mod auth;
pub mod cli;
pub mod flickr;
pub mod load_config;
pub mod progress;
pub mod prompt;

pub use cli::{run, Cli, Commands};
