pub mod args;
pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod extractor;
pub mod models;
pub mod output;
pub mod overlay;
pub mod sender;
pub mod source;
pub mod types;
