pub mod entry;
pub mod library;
