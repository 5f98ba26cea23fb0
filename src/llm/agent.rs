//! Agent loop driving goal-seeking conversations with tool execution
//!
//! One model call per turn, at most one function call per reply. The model
//! holds the conversational memory through the session transcript; the loop
//! itself threads only the goal and the most recent tool outcome.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::llm::client::ModelTransport;
use crate::llm::limiter::RateLimiter;
use crate::llm::types::{Content, FunctionCall, GenerateRequest, GenerateResponse, Part, ToolConfig};
use crate::prompts;
use crate::tools::{ToolOutcome, ToolRegistry, DONE_TOOL};

/// Internal state for one loop turn
enum LoopState {
    /// Solicit the next function call from the model
    AwaitingCall,
    /// Route a decoded call to its handler (or the termination marker)
    Dispatching(FunctionCall),
    /// Wrap a successful outcome into a function response for the model
    BuildingResponse { call: FunctionCall, value: Value },
    /// Termination tool selected
    Terminated,
}

/// Agent that pursues a goal by letting the model pick tools until it
/// selects the termination marker.
///
/// Each agent owns its own [`RateLimiter`]; limiter state is never shared
/// across sessions. There is no turn cap and no timeout: the run ends only
/// when the model elects the termination tool.
pub struct Agent {
    transport: Arc<dyn ModelTransport>,
    tools: ToolRegistry,
    limiter: RateLimiter,
    contents: Vec<Content>,
    last_outcome: ToolOutcome,
}

impl Agent {
    pub fn new(transport: Arc<dyn ModelTransport>, tools: ToolRegistry, limiter: RateLimiter) -> Self {
        Self {
            transport,
            tools,
            limiter,
            contents: Vec::new(),
            last_outcome: ToolOutcome::default(),
        }
    }

    /// Pursue `goal` to completion and return the value of the last
    /// successful tool call (none if no tool ran before termination).
    pub async fn run(&mut self, goal: &str) -> Result<Option<Value>, Error> {
        info!(goal, "Starting agent run");
        self.contents.push(Content::user(prompts::goal_preamble(goal)));

        let mut state = LoopState::AwaitingCall;
        loop {
            state = match state {
                LoopState::AwaitingCall => {
                    let response = self.request_turn().await?;
                    match response.function_call() {
                        Some(call) => LoopState::Dispatching(call.clone()),
                        None => {
                            // No call this turn: poll again with the session
                            // unchanged until the model produces one.
                            debug!(text = %response.text(), "Model produced no function call");
                            LoopState::AwaitingCall
                        }
                    }
                }

                LoopState::Dispatching(call) => {
                    if call.name == DONE_TOOL {
                        info!("Termination tool selected");
                        LoopState::Terminated
                    } else {
                        match self.dispatch(&call).await {
                            Some(value) => LoopState::BuildingResponse { call, value },
                            // Failed calls are dropped without reporting
                            // their shape back to the model; it is simply
                            // asked again with the session unchanged.
                            None => LoopState::AwaitingCall,
                        }
                    }
                }

                LoopState::BuildingResponse { call, value } => {
                    let name = call.name.clone();
                    self.contents.push(Content {
                        role: "model".to_string(),
                        parts: vec![Part {
                            text: None,
                            function_call: Some(call),
                            function_response: None,
                        }],
                    });
                    self.contents
                        .push(Content::function_response(name, json!({ "result": value.clone() })));
                    self.last_outcome = ToolOutcome {
                        value: Some(value),
                        failed: false,
                    };
                    LoopState::AwaitingCall
                }

                LoopState::Terminated => {
                    return Ok(self.last_outcome.value.take());
                }
            };
        }
    }

    /// One gated model call carrying the session and the tool declarations
    async fn request_turn(&mut self) -> Result<GenerateResponse, Error> {
        let request = GenerateRequest {
            contents: self.contents.clone(),
            tools: Some(vec![ToolConfig {
                function_declarations: self.tools.declarations(),
            }]),
            generation_config: None,
        };

        let transport = Arc::clone(&self.transport);
        let response = self
            .limiter
            .execute(move || {
                let transport = Arc::clone(&transport);
                let request = request.clone();
                async move { transport.generate(&request).await }
            })
            .await?;
        Ok(response)
    }

    /// Resolve and execute one call. Unknown names and handler failures are
    /// absorbed here: log, return `None`, keep the loop moving.
    async fn dispatch(&self, call: &FunctionCall) -> Option<Value> {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return None;
        };

        let args = match &call.args {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                warn!(tool = %call.name, args = %other, "Tool arguments were not an object");
                return None;
            }
        };

        info!(tool = %call.name, "Dispatching tool call");
        match tool.execute(args).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool failed, discarding this turn's outcome");
                None
            }
        }
    }
}
