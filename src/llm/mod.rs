//! LLM client, call pacing, and the agent loop

pub mod agent;
pub mod client;
pub mod limiter;
pub mod types;

pub use agent::Agent;
pub use client::{GeminiClient, ModelTransport};
pub use limiter::{RateLimiter, RetryPolicy};
