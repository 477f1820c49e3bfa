//! Provider gateway: one prompt in, one generated text out, for OpenAI,
//! Gemini and Claude.

pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod providers;
pub mod router;
pub mod types;

pub use client::Gateway;
pub use config::{GatewayConfig, ProviderConfig};
pub use error::{LlmError, Result};
pub use fallback::FallbackPolicy;
pub use types::*;
