//! The compiled template tree.
//!
//! A closed set of node shapes. Rewrites never mutate a tree in place
//! across calls: each render parses its own `Vec<Node>` and builds the
//! rewritten sequence from it.

/// A top-level or nested template node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, copied to the output as-is.
    Text(String),
    /// `{{ pipeline }}`, printing the pipeline's value.
    Action(Action),
    /// `{{ if pipeline }} list {{ else }} list {{ end }}`
    If(Branch),
    /// `{{ with pipeline }} list {{ else }} list {{ end }}`, rebinding dot.
    With(Branch),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub line: usize,
    pub pipeline: Pipeline,
}

impl Action {
    /// A bare `{{ .Name }}` action.
    pub fn field(name: &str) -> Self {
        Self {
            line: 0,
            pipeline: Pipeline {
                commands: vec![Command {
                    args: vec![Arg::Field(vec![name.to_string()])],
                }],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub line: usize,
    pub pipeline: Pipeline,
    pub list: Vec<Node>,
    /// `{{ else if }}` chains nest as a single `If` node here.
    pub else_list: Option<Vec<Node>>,
}

/// Commands joined by `|`; each result feeds the next command's last argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Arg>,
}

/// One operand of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `.Name.Sub`, stored as its identifier path.
    Field(Vec<String>),
    /// `.`
    Dot,
    /// A built-in function name.
    Function(String),
    Str(String),
    Number(i64),
    Bool(bool),
    Nil,
    /// `( pipeline )`
    Pipeline(Pipeline),
}

impl Arg {
    /// True for a field reference whose first identifier is `root`.
    pub fn is_field_rooted_at(&self, root: &str) -> bool {
        match self {
            Arg::Field(path) => path.first().is_some_and(|ident| ident == root),
            _ => false,
        }
    }
}

impl std::fmt::Display for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Field(path) => write!(f, ".{}", path.join(".")),
            Arg::Dot => f.write_str("."),
            Arg::Function(name) => f.write_str(name),
            Arg::Str(s) => write!(f, "{s:?}"),
            Arg::Number(n) => write!(f, "{n}"),
            Arg::Bool(b) => write!(f, "{b}"),
            Arg::Nil => f.write_str("nil"),
            Arg::Pipeline(_) => f.write_str("(pipeline)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_field_action() {
        let action = Action::field("Response");
        assert_eq!(action.pipeline.commands.len(), 1);
        assert!(action.pipeline.commands[0].args[0].is_field_rooted_at("Response"));
    }

    #[test]
    fn only_fields_have_roots() {
        assert!(!Arg::Str("Response".into()).is_field_rooted_at("Response"));
        assert!(!Arg::Function("Response".into()).is_field_rooted_at("Response"));
        assert!(Arg::Field(vec!["Response".into(), "Len".into()]).is_field_rooted_at("Response"));
        assert!(!Arg::Field(vec!["Prompt".into()]).is_field_rooted_at("Response"));
    }

    #[test]
    fn args_display_like_source() {
        assert_eq!(Arg::Field(vec!["A".into(), "B".into()]).to_string(), ".A.B");
        assert_eq!(Arg::Str("x".into()).to_string(), "\"x\"");
    }
}
