//! Output-marker rewriting and rendering.
//!
//! Every call compiles the template source into a fresh tree, rewrites the
//! tree around the output marker, then executes it. Nothing is cached or
//! shared between calls.

use promptpack_core::{TemplateError, Turn};

use crate::exec::{self, Value};
use crate::node::{Action, Node};
use crate::parser;

/// Template field bound to the turn's system instruction.
pub const SYSTEM_FIELD: &str = "System";
/// Template field bound to the turn's user prompt.
pub const PROMPT_FIELD: &str = "Prompt";
/// Template field bound to the turn's response; its first top-level
/// reference is the output marker.
pub const RESPONSE_FIELD: &str = "Response";

/// The three values a prompt template sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bindings<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub response: &'a str,
}

impl Bindings<'_> {
    fn to_value(self) -> Value {
        [
            (SYSTEM_FIELD, self.system),
            (PROMPT_FIELD, self.prompt),
            (RESPONSE_FIELD, self.response),
        ]
        .into_iter()
        .collect()
    }
}

impl<'a> From<&'a Turn> for Bindings<'a> {
    fn from(turn: &'a Turn) -> Self {
        Self {
            system: turn.system(),
            prompt: turn.prompt(),
            response: turn.response(),
        }
    }
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            nodes: parser::parse(src)?,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Rewrite around the output marker; see [`format_for_response`].
    pub fn for_response(self, cut: bool) -> Self {
        Self {
            nodes: format_for_response(self.nodes, cut),
        }
    }

    /// True when some top-level action references `.Response`.
    pub fn has_response_node(&self) -> bool {
        self.nodes.iter().any(is_marker)
    }

    pub fn execute(&self, vars: Bindings<'_>) -> Result<String, TemplateError> {
        exec::execute(&self.nodes, &vars.to_value())
    }
}

/// Whether an action is the output marker: some argument of some command
/// in its pipeline is a field reference rooted at `.Response`.
pub fn is_response_node(action: &Action) -> bool {
    action
        .pipeline
        .commands
        .iter()
        .flat_map(|command| &command.args)
        .any(|arg| arg.is_field_rooted_at(RESPONSE_FIELD))
}

fn is_marker(node: &Node) -> bool {
    matches!(node, Node::Action(action) if is_response_node(action))
}

/// Build the node sequence to execute.
///
/// - marker found, `cut`: keep everything up to and including the first marker;
/// - marker found, no `cut`: unchanged;
/// - no marker: append a bare `{{ .Response }}` so the response is always
///   rendered somewhere.
pub fn format_for_response(mut nodes: Vec<Node>, cut: bool) -> Vec<Node> {
    match nodes.iter().position(is_marker) {
        Some(i) if cut => nodes.truncate(i + 1),
        Some(_) => {}
        None => nodes.push(Node::Action(Action::field(RESPONSE_FIELD))),
    }
    nodes
}

/// Compile `template`, rewrite it around the output marker and execute it.
pub fn render(template: &str, vars: Bindings<'_>, cut: bool) -> Result<String, TemplateError> {
    let template = Template::parse(template)?.for_response(cut);
    template.execute(vars).inspect_err(|e| {
        tracing::debug!(error = %e, "template execution failed");
    })
}
