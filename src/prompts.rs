//! Centralized prompt definitions
//!
//! All directives sent to the model live here.

/// Preamble wrapped around the caller's goal for an agent run
pub fn goal_preamble(goal: &str) -> String {
    format!(
        r#"You are an autonomous agent working towards the following goal:

{goal}

Work towards the goal by calling the available tools, one call at a time.
Use each tool's result to decide the next call. When the goal is achieved,
or no further progress is possible, call `done_tool` to finish."#
    )
}

/// Directive for synthesizing a function from a natural-language description
pub fn synthesis_directive(function_name: &str, description: &str, parameters: &[&str]) -> String {
    format!(
        r#"Define a function called '{function_name}' that implements the following logic:

{description}

The function receives exactly these parameters: ({params})

Respond only with a definition of the form:

{function_name}({params}) = <expression>

The expression may chain sub-expressions with ';' (for example `t = x * 2; t + y`)
and may use arithmetic, comparison and boolean operators and the built-in math
functions. No other variables or functions are available. Do not include prose,
comments or markdown fences."#,
        params = parameters.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_directive_lists_parameters() {
        let directive = synthesis_directive("dynamic_function", "add the numbers", &["x", "y"]);
        assert!(directive.contains("dynamic_function(x, y) = <expression>"));
        assert!(directive.contains("add the numbers"));
    }

    #[test]
    fn test_goal_preamble_names_termination_tool() {
        let preamble = goal_preamble("buy low, sell high");
        assert!(preamble.contains("buy low, sell high"));
        assert!(preamble.contains("done_tool"));
    }
}
