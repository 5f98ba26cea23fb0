//! Agent-invocable tools
//!
//! Tools are registered explicitly at startup; there is no runtime
//! discovery. Each tool is an async callable taking keyword arguments.

pub mod dynamic;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{Error, Result, ToolError};
use crate::llm::types::FunctionDeclaration;

pub use dynamic::DynamicCodeTool;

/// Every agent-invocable tool name carries this suffix
pub const TOOL_NAME_SUFFIX: &str = "_tool";

/// The termination marker. Selecting it ends the orchestration loop; it is
/// never executed and can never be registered as a handler.
pub const DONE_TOOL: &str = "done_tool";

/// A named capability the model may select per turn.
///
/// Handlers accept keyword arguments and either produce a value or fail;
/// the orchestration layer never looks past that distinction.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, ending in [`TOOL_NAME_SUFFIX`]
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters
    fn schema(&self) -> Value;

    /// Execute with the decoded keyword arguments
    async fn execute(&self, args: Map<String, Value>) -> std::result::Result<Value, ToolError>;
}

/// The result of dispatching one function-call request
#[derive(Debug, Clone, Default)]
pub struct ToolOutcome {
    pub value: Option<Value>,
    pub failed: bool,
}

/// Registry of available tools
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a registry with the built-in tool set
    pub fn builtin(tool: DynamicCodeTool) -> Result<Self> {
        let mut registry = Self::empty();
        registry.register(Arc::new(tool))?;
        Ok(registry)
    }

    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Violations of the naming convention, a duplicate
    /// name, or an attempt to shadow the termination marker are
    /// configuration errors that abort startup.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if !name.ends_with(TOOL_NAME_SUFFIX) {
            return Err(Error::Config(format!(
                "tool name '{}' does not end in '{}'",
                name, TOOL_NAME_SUFFIX
            )));
        }
        if name == DONE_TOOL {
            return Err(Error::Config(format!(
                "'{}' is reserved for the termination marker",
                DONE_TOOL
            )));
        }
        if self.tools.contains_key(&name) {
            return Err(Error::Config(format!("duplicate tool name '{}'", name)));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a handler by name. The termination marker has no handler.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Number of registered handlers (excluding the termination marker)
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function declarations for a model request: one per registered tool
    /// plus the always-present termination marker.
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        let mut declarations: Vec<FunctionDeclaration> = self
            .tools
            .values()
            .map(|tool| FunctionDeclaration {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: Some(tool.schema()),
            })
            .collect();
        declarations.sort_by(|a, b| a.name.cmp(&b.name));

        declarations.push(FunctionDeclaration {
            name: DONE_TOOL.to_string(),
            description: "Signal that the goal has been achieved and no further tool calls are needed. Takes no arguments.".to_string(),
            parameters: None,
        });

        declarations
    }
}
