//! readlog - reading list tracker (TUI Edition)
//!
//! Paginated, filterable view of a personal book collection plus the
//! add/edit workflow against the collection server and public catalog.

pub mod config;
pub mod core;
pub mod tui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
