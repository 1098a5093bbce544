pub mod api;
pub mod feed;
pub mod filter;
pub mod logging;
pub mod models;
pub mod scroll;
pub mod session;
pub mod workflow;
