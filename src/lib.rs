//! Mech Agent - an autonomous tool-calling agent for mech marketplace tasks
//!
//! The agent pursues a natural-language goal by repeatedly asking Gemini
//! which tool to invoke next, executing it, and feeding the result back
//! until the model signals completion. One of the built-in tools
//! synthesizes a function from a natural-language description at runtime
//! and evaluates it in a constrained scope.
//!
//! # Example
//!
//! ```no_run
//! use mech_agent::{run_orchestrator, RunResult};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let kwargs = json!({
//!         "api_keys": {"gemini": "..."},
//!         "goal": "Find interesting new tokens and decide how much to invest."
//!     });
//!
//!     let RunResult(result, ..) = run_orchestrator(kwargs.as_object().unwrap().clone()).await;
//!     println!("{:?}", result);
//! }
//! ```

mod config;
mod error;
mod jobs;
mod llm;
mod prompts;
mod tools;

// Re-export the public API
pub use config::{Config, RuntimeConfig, DEFAULT_MODEL, DEFAULT_TEMPERATURE, GEMINI_API_KEY_ENV};
pub use error::{Error, ModelError, Result, ToolError};
pub use jobs::{run_dynamic, run_dynamic_with, run_orchestrator, run_orchestrator_with, RunResult};
pub use llm::types::{
    Candidate, Content, FunctionCall, FunctionDeclaration, FunctionResponse, GenerateRequest,
    GenerateResponse, GenerationConfig, Part, ToolConfig,
};
pub use llm::{Agent, GeminiClient, ModelTransport, RateLimiter, RetryPolicy};
pub use tools::{DynamicCodeTool, Tool, ToolOutcome, ToolRegistry, DONE_TOOL};
