//! Mech marketplace job entry points
//!
//! Each job accepts the marketplace's keyword-argument map (including the
//! nested `api_keys` mapping) and returns the uniform four-part result
//! record. Missing credentials or parameters short-circuit to an error
//! record; everything else is absorbed internally.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::{resolve_gemini_key, RuntimeConfig, GEMINI_API_KEY_ENV};
use crate::error::Error;
use crate::llm::agent::Agent;
use crate::llm::client::{GeminiClient, ModelTransport};
use crate::llm::limiter::RateLimiter;
use crate::tools::{DynamicCodeTool, ToolRegistry};

/// The four-part record returned to the external mech caller:
/// `(result_or_error_message, artifact_mapping, extra, extra)`.
///
/// A failure puts a human-readable string in the first slot and leaves the
/// remaining three empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult(
    pub Option<Value>,
    pub Option<Map<String, Value>>,
    pub Option<Value>,
    pub Option<Value>,
);

impl RunResult {
    pub fn success(value: Value) -> Self {
        Self(Some(value), None, None, None)
    }

    /// An error mech response
    pub fn error(msg: impl Into<String>) -> Self {
        Self(Some(Value::String(msg.into())), None, None, None)
    }
}

/// Run the goal-seeking orchestrator job.
///
/// Recognized keyword arguments: `api_keys.gemini` (or the environment
/// fallback), `goal` (required), `model` and `temperature` (optional
/// overrides).
pub async fn run_orchestrator(kwargs: Map<String, Value>) -> RunResult {
    run_orchestrator_with(kwargs, RuntimeConfig::default()).await
}

/// Orchestrator job with an explicit runtime configuration
pub async fn run_orchestrator_with(mut kwargs: Map<String, Value>, config: RuntimeConfig) -> RunResult {
    let api_keys = take_object(&mut kwargs, "api_keys");
    let Some(api_key) = resolve_gemini_key(api_keys.as_ref()) else {
        return RunResult::error("gemini_api_key was not provided");
    };

    let Some(goal) = take_string(&mut kwargs, "goal") else {
        return RunResult::error("Goal was not provided");
    };

    let config = apply_overrides(config, &mut kwargs);

    match orchestrate(api_key, &goal, config).await {
        Ok(outcome) => RunResult::success(outcome.unwrap_or(Value::Null)),
        Err(e) => RunResult::error(e.to_string()),
    }
}

async fn orchestrate(
    api_key: String,
    goal: &str,
    config: RuntimeConfig,
) -> Result<Option<Value>, Error> {
    let client = GeminiClient::new(api_key, &config.model)?;
    let transport: Arc<dyn ModelTransport> = Arc::new(client);

    let tools = ToolRegistry::builtin(DynamicCodeTool::new(
        Arc::clone(&transport),
        config.temperature,
    ))?;
    let limiter = RateLimiter::with_policy(config.min_interval, config.retry.clone());

    let mut agent = Agent::new(transport, tools, limiter);
    agent.run(goal).await
}

/// Run the one-shot dynamic code job.
///
/// Recognized keyword arguments: `api_keys.gemini` (or the environment
/// fallback), `prompt` (required), `model` and `temperature` (optional),
/// plus the generated function's arguments.
pub async fn run_dynamic(kwargs: Map<String, Value>) -> RunResult {
    run_dynamic_with(kwargs, RuntimeConfig::default()).await
}

/// Dynamic code job with an explicit runtime configuration
pub async fn run_dynamic_with(mut kwargs: Map<String, Value>, config: RuntimeConfig) -> RunResult {
    let api_keys = take_object(&mut kwargs, "api_keys");
    let supplied_key = api_keys
        .as_ref()
        .and_then(|keys| keys.get("gemini"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let env_key = std::env::var(GEMINI_API_KEY_ENV).ok();
    if supplied_key.is_none() && env_key.is_none() {
        return RunResult::error("gemini_api_key was not provided");
    }

    let Some(prompt) = take_string(&mut kwargs, "prompt") else {
        return RunResult::error("Prompt was not provided");
    };

    let config = apply_overrides(config, &mut kwargs);

    // A caller-supplied key that fails validation falls back to the
    // environment key.
    let api_key = match supplied_key {
        Some(key) => {
            let valid = match GeminiClient::new(key.clone(), &config.model) {
                Ok(client) => client.probe().await,
                Err(_) => false,
            };
            if valid {
                Some(key)
            } else {
                warn!("Supplied Gemini key failed validation, falling back to environment");
                env_key
            }
        }
        None => env_key,
    };
    let Some(api_key) = api_key else {
        return RunResult::error("gemini_api_key was not provided");
    };

    let client = match GeminiClient::new(api_key, &config.model) {
        Ok(client) => client,
        Err(e) => return RunResult::error(e.to_string()),
    };
    let tool = DynamicCodeTool::new(Arc::new(client), config.temperature);

    match tool
        .synthesize_and_run(&prompt, config.temperature, &kwargs)
        .await
    {
        Some(value) => RunResult::success(value),
        None => RunResult::error("Function synthesis or evaluation produced no value"),
    }
}

/// Pull `model` / `temperature` overrides out of the keyword arguments
fn apply_overrides(mut config: RuntimeConfig, kwargs: &mut Map<String, Value>) -> RuntimeConfig {
    if let Some(model) = take_string(kwargs, "model") {
        config.model = model;
    }
    if let Some(temperature) = kwargs.remove("temperature").and_then(|v| v.as_f64()) {
        config.temperature = temperature as f32;
    }
    config
}

fn take_string(kwargs: &mut Map<String, Value>, key: &str) -> Option<String> {
    match kwargs.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn take_object(kwargs: &mut Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    match kwargs.remove(key) {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn kwargs_with_key(pairs: &[(&str, Value)]) -> Map<String, Value> {
        let mut kwargs = Map::new();
        kwargs.insert("api_keys".to_string(), json!({"gemini": "test-key"}));
        for (k, v) in pairs {
            kwargs.insert(k.to_string(), v.clone());
        }
        kwargs
    }

    #[tokio::test]
    async fn test_orchestrator_requires_goal() {
        let result = run_orchestrator(kwargs_with_key(&[])).await;
        assert_eq!(result, RunResult::error("Goal was not provided"));
    }

    #[tokio::test]
    async fn test_dynamic_requires_prompt() {
        let result = run_dynamic(kwargs_with_key(&[("x", json!(1))])).await;
        assert_eq!(result, RunResult::error("Prompt was not provided"));
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        std::env::remove_var(GEMINI_API_KEY_ENV);

        let mut kwargs = Map::new();
        kwargs.insert("goal".to_string(), json!("anything"));
        let result = run_orchestrator(kwargs.clone()).await;
        assert_eq!(result, RunResult::error("gemini_api_key was not provided"));

        kwargs.insert("prompt".to_string(), json!("anything"));
        let result = run_dynamic(kwargs).await;
        assert_eq!(result, RunResult::error("gemini_api_key was not provided"));
    }

    #[test]
    fn test_error_record_shape() {
        let result = RunResult::error("boom");
        assert_eq!(result.0, Some(json!("boom")));
        assert_eq!(result.1, None);
        assert_eq!(result.2, None);
        assert_eq!(result.3, None);
    }
}
