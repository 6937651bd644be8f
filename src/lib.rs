pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod init;
pub mod models;
pub mod services;
pub mod utils;

pub use error::ScopeError;
