//! LLM Provider implementations for WindowScout.
//!
//! All providers implement the `windowscout_core::Provider` trait.
//! The router builds the configured provider, wrapped in the retry policy.

pub mod openai_compat;
pub mod retry;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryProvider;
pub use router::build_from_config;
