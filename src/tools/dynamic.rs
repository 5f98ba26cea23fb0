//! Runtime function synthesis tool
//!
//! Asks the model to write a function for a described behavior, then
//! evaluates it against the caller's arguments. Generated code is a single
//! `dynamic_function(<params>) = <expression>` definition in a constrained
//! expression language: the evaluation context is seeded only with the
//! supplied arguments, so generated code cannot name host capabilities.

use std::sync::Arc;

use evalexpr::{
    eval_with_context_mut, ContextWithMutableVariables, HashMapContext, Value as ExprValue,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::Tool;
use crate::error::ToolError;
use crate::llm::client::ModelTransport;
use crate::llm::types::GenerateRequest;
use crate::prompts;

/// Name the generated definition must bind
pub const FUNCTION_NAME: &str = "dynamic_function";

/// Tool that synthesizes and evaluates a function at runtime
pub struct DynamicCodeTool {
    transport: Arc<dyn ModelTransport>,
    temperature: f32,
}

impl DynamicCodeTool {
    pub const NAME: &'static str = "dynamic_tool";

    pub fn new(transport: Arc<dyn ModelTransport>, temperature: f32) -> Self {
        Self {
            transport,
            temperature,
        }
    }

    /// Synthesize a function for `description` and evaluate it against
    /// `arguments`. Every failure mode (remote error, unparseable source,
    /// header mismatch, evaluation error) collapses to `None`; the cause
    /// is visible only in logs.
    pub async fn synthesize_and_run(
        &self,
        description: &str,
        temperature: f32,
        arguments: &Map<String, Value>,
    ) -> Option<Value> {
        let parameters: Vec<&str> = arguments.keys().map(String::as_str).collect();
        let directive = prompts::synthesis_directive(FUNCTION_NAME, description, &parameters);

        let request = GenerateRequest::text(directive).with_temperature(temperature);
        let response = match self.transport.generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Function synthesis request failed");
                return None;
            }
        };

        let source = response.text();
        let source = strip_code_fence(&source);
        debug!(source, ?arguments, "Evaluating synthesized function");

        let result = evaluate(source, arguments);
        debug!(?result, "Synthesized function evaluated");
        result
    }
}

#[async_trait::async_trait]
impl Tool for DynamicCodeTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Implements a function described in natural language and evaluates it. \
         Pass the behavior description in 'prompt' and every argument the \
         function should receive as an additional named property."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Natural-language description of the function to implement"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, mut args: Map<String, Value>) -> Result<Value, ToolError> {
        let prompt = match args.remove("prompt") {
            Some(Value::String(prompt)) => prompt,
            _ => return Err(ToolError::InvalidArguments("'prompt' is required".into())),
        };

        // The model is fixed by the transport; ignore attempts to pick one
        args.remove("model");
        let temperature = args
            .remove("temperature")
            .and_then(|v| v.as_f64())
            .map(|t| t as f32)
            .unwrap_or(self.temperature);

        self.synthesize_and_run(&prompt, temperature, &args)
            .await
            .ok_or_else(|| {
                ToolError::ExecutionFailed("function synthesis or evaluation produced no value".into())
            })
    }
}

/// Strip an optional markdown code-fence wrapper from a model reply
fn strip_code_fence(source: &str) -> &str {
    let trimmed = source.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string on the opening fence line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    let body = body.rfind("```").map(|idx| &body[..idx]).unwrap_or(body);
    body.trim()
}

/// Parse a `dynamic_function(<params>) = <expression>` definition.
/// Returns the parameter names and the body expression.
fn parse_definition(source: &str) -> Option<(Vec<String>, &str)> {
    let rest = source.trim().strip_prefix(FUNCTION_NAME)?;
    let rest = rest.trim_start().strip_prefix('(')?;
    let (params, rest) = rest.split_once(')')?;
    let body = rest.trim_start().strip_prefix('=')?.trim();
    if body.is_empty() {
        return None;
    }

    let params: Vec<String> = params
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    Some((params, body))
}

/// Evaluate a sanitized definition in a context seeded only with the
/// caller's arguments. The definition's parameter set must exactly match
/// the argument names.
fn evaluate(source: &str, arguments: &Map<String, Value>) -> Option<Value> {
    let Some((params, body)) = parse_definition(source) else {
        warn!(source, "Generated code is not a single {} definition", FUNCTION_NAME);
        return None;
    };

    let mut expected: Vec<&str> = arguments.keys().map(String::as_str).collect();
    let mut declared: Vec<&str> = params.iter().map(String::as_str).collect();
    expected.sort_unstable();
    declared.sort_unstable();
    if expected != declared {
        warn!(
            ?declared,
            ?expected,
            "Generated function parameters do not match the supplied arguments"
        );
        return None;
    }

    let mut context = HashMapContext::new();
    for (name, value) in arguments {
        if let Err(e) = context.set_value(name.clone(), to_expr_value(value)) {
            warn!(argument = %name, error = %e, "Could not seed evaluation context");
            return None;
        }
    }

    match eval_with_context_mut(body, &mut context) {
        Ok(value) => Some(from_expr_value(value)),
        Err(e) => {
            warn!(error = %e, "Evaluation of the generated function failed");
            None
        }
    }
}

fn to_expr_value(value: &Value) -> ExprValue {
    match value {
        Value::Null => ExprValue::Empty,
        Value::Bool(b) => ExprValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ExprValue::Int(i),
            None => ExprValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => ExprValue::String(s.clone()),
        Value::Array(items) => ExprValue::Tuple(items.iter().map(to_expr_value).collect()),
        // The expression language has no map type
        Value::Object(_) => ExprValue::String(value.to_string()),
    }
}

fn from_expr_value(value: ExprValue) -> Value {
    match value {
        ExprValue::String(s) => Value::String(s),
        ExprValue::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ExprValue::Int(i) => Value::from(i),
        ExprValue::Boolean(b) => Value::Bool(b),
        ExprValue::Tuple(items) => Value::Array(items.into_iter().map(from_expr_value).collect()),
        ExprValue::Empty => Value::Null,
    }
}
