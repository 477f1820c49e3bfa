//! HTTP API and GitHub integration for codexray.

pub mod github;
pub mod server;
pub mod state;

pub use state::AppState;
