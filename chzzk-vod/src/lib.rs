pub mod api;
mod commands;
pub mod config;
pub mod cookie;
pub mod deps;
pub mod downloader;
pub mod error;
mod logger;
pub mod playlist;
pub mod prompt;
pub mod selector;
pub mod utils;

#[doc(hidden)]
pub use commands::Args;
pub use error::{Error, Result};
pub use logger::Logger;
