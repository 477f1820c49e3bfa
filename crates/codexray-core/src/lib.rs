//! Core types, prompt building and the analysis pipeline for codexray.

pub mod bundle;
pub mod chunk;
pub mod config;
pub mod error;
pub mod ledger;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod prompt;
pub mod store;
pub mod types;
