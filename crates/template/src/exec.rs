//! Tree execution and built-in functions.
//!
//! Missing keys evaluate to [`Value::Nil`], which prints as nothing, so a
//! template may reference fields its caller never binds.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use promptpack_core::TemplateError;

use crate::node::{Arg, Command, Node, Pipeline};

const FUNCTIONS: &[&str] = &["and", "or", "not", "eq", "ne", "len", "print", "println", "printf"];

pub(crate) fn is_function(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

/// A value flowing through template evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(i64),
    Str(String),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Template truthiness: empty strings and maps, zero, false and nil are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "int",
            Value::Str(_) => "string",
            Value::Map(_) => "map",
        }
    }

    fn field(&self, name: &str) -> Result<Value, TemplateError> {
        match self {
            Value::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
            Value::Nil => Ok(Value::Nil),
            other => Err(TemplateError::execution(format!(
                "can't evaluate field {name} in type {}",
                other.kind()
            ))),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Map(map) => {
                f.write_str("map[")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Execute `nodes` against `data`, returning the rendered text.
pub(crate) fn execute(nodes: &[Node], data: &Value) -> Result<String, TemplateError> {
    let mut out = String::new();
    walk(&mut out, nodes, data)?;
    Ok(out)
}

fn walk(out: &mut String, nodes: &[Node], dot: &Value) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action(action) => {
                let value = eval_pipeline(&action.pipeline, dot)?;
                // Writing to a String cannot fail.
                let _ = write!(out, "{value}");
            }
            Node::If(branch) => {
                if eval_pipeline(&branch.pipeline, dot)?.is_truthy() {
                    walk(out, &branch.list, dot)?;
                } else if let Some(else_list) = &branch.else_list {
                    walk(out, else_list, dot)?;
                }
            }
            Node::With(branch) => {
                let value = eval_pipeline(&branch.pipeline, dot)?;
                if value.is_truthy() {
                    walk(out, &branch.list, &value)?;
                } else if let Some(else_list) = &branch.else_list {
                    walk(out, else_list, dot)?;
                }
            }
        }
    }
    Ok(())
}

fn eval_pipeline(pipeline: &Pipeline, dot: &Value) -> Result<Value, TemplateError> {
    let mut piped = None;
    for command in &pipeline.commands {
        piped = Some(eval_command(command, dot, piped)?);
    }
    Ok(piped.unwrap_or_default())
}

fn eval_command(command: &Command, dot: &Value, piped: Option<Value>) -> Result<Value, TemplateError> {
    let Some((first, rest)) = command.args.split_first() else {
        return Ok(Value::Nil);
    };
    match first {
        Arg::Function(name) => {
            let mut args = rest
                .iter()
                .map(|arg| eval_arg(arg, dot))
                .collect::<Result<Vec<_>, _>>()?;
            args.extend(piped);
            call(name, args)
        }
        operand => {
            if !rest.is_empty() || piped.is_some() {
                return Err(TemplateError::execution(format!(
                    "can't give argument to non-function {operand}"
                )));
            }
            eval_arg(operand, dot)
        }
    }
}

fn eval_arg(arg: &Arg, dot: &Value) -> Result<Value, TemplateError> {
    match arg {
        Arg::Field(path) => path.iter().try_fold(dot.clone(), |value, name| value.field(name)),
        Arg::Dot => Ok(dot.clone()),
        Arg::Function(name) => call(name, Vec::new()),
        Arg::Str(s) => Ok(Value::Str(s.clone())),
        Arg::Number(n) => Ok(Value::Number(*n)),
        Arg::Bool(b) => Ok(Value::Bool(*b)),
        Arg::Nil => Ok(Value::Nil),
        Arg::Pipeline(pipeline) => eval_pipeline(pipeline, dot),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: Option<usize>) -> Result<(), TemplateError> {
    let n = args.len();
    if n < min || max.is_some_and(|max| n > max) {
        return Err(TemplateError::execution(format!(
            "wrong number of args for {name}: got {n}"
        )));
    }
    Ok(())
}

fn call(name: &str, mut args: Vec<Value>) -> Result<Value, TemplateError> {
    match name {
        "and" => {
            arity(name, &args, 1, None)?;
            let last = args.len() - 1;
            let index = args.iter().position(|v| !v.is_truthy()).unwrap_or(last);
            Ok(args.swap_remove(index))
        }
        "or" => {
            arity(name, &args, 1, None)?;
            let last = args.len() - 1;
            let index = args.iter().position(Value::is_truthy).unwrap_or(last);
            Ok(args.swap_remove(index))
        }
        "not" => {
            arity(name, &args, 1, Some(1))?;
            Ok(Value::Bool(!args[0].is_truthy()))
        }
        "eq" => {
            arity(name, &args, 2, None)?;
            Ok(Value::Bool(args[1..].contains(&args[0])))
        }
        "ne" => {
            arity(name, &args, 2, Some(2))?;
            Ok(Value::Bool(args[0] != args[1]))
        }
        "len" => {
            arity(name, &args, 1, Some(1))?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Number(s.len() as i64)),
                Value::Map(m) => Ok(Value::Number(m.len() as i64)),
                other => Err(TemplateError::execution(format!(
                    "len of type {}",
                    other.kind()
                ))),
            }
        }
        "print" => Ok(Value::Str(sprint(&args))),
        "println" => {
            let line: Vec<String> = args.iter().map(Value::to_string).collect();
            Ok(Value::Str(format!("{}\n", line.join(" "))))
        }
        "printf" => {
            arity(name, &args, 1, None)?;
            let Value::Str(format) = &args[0] else {
                return Err(TemplateError::execution(format!(
                    "printf format must be a string, got {}",
                    args[0].kind()
                )));
            };
            Ok(Value::Str(sprintf(format, &args[1..])))
        }
        other => Err(TemplateError::execution(format!("function {other:?} not defined"))),
    }
}

/// Operands are separated by a space when neither side is a string.
fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        let is_str = |v: &Value| matches!(v, Value::Str(_));
        if i > 0 && !is_str(arg) && !is_str(&args[i - 1]) {
            out.push(' ');
        }
        let _ = write!(out, "{arg}");
    }
    out
}

fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::new();
    let mut args = args.iter();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(verb @ ('s' | 'v' | 'd' | 'q')) => match args.next() {
                Some(Value::Str(s)) if verb == 'q' => {
                    let _ = write!(out, "{s:?}");
                }
                Some(Value::Number(n)) if verb == 'd' => {
                    let _ = write!(out, "{n}");
                }
                Some(value) if verb == 'd' => {
                    let _ = write!(out, "%!d({}={value})", value.kind());
                }
                Some(value) => {
                    let _ = write!(out, "{value}");
                }
                None => {
                    let _ = write!(out, "%!{verb}(MISSING)");
                }
            },
            Some(other) => {
                let _ = write!(out, "%!{other}(BADVERB)");
            }
            None => out.push_str("%!(NOVERB)"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(src: &str, data: &Value) -> Result<String, TemplateError> {
        execute(&parse(src)?, data)
    }

    fn vars() -> Value {
        [("System", "sys"), ("Prompt", "hi"), ("Response", "")]
            .into_iter()
            .collect()
    }

    #[test]
    fn fields_render() {
        assert_eq!(run("{{ .System }}|{{ .Prompt }}", &vars()).unwrap(), "sys|hi");
    }

    #[test]
    fn missing_keys_render_empty() {
        assert_eq!(run("[{{ .Nope }}][{{ .Nope.Deeper }}]", &vars()).unwrap(), "[][]");
    }

    #[test]
    fn field_of_string_fails_at_execution() {
        let err = run("{{ .Prompt.Length }}", &vars()).unwrap_err();
        assert!(matches!(err, TemplateError::Execution(_)));
        assert!(err.to_string().contains("type string"));
    }

    #[test]
    fn conditionals_follow_truthiness() {
        let src = "{{ if .Response }}R{{ else if .Prompt }}P{{ else }}none{{ end }}";
        assert_eq!(run(src, &vars()).unwrap(), "P");
        assert_eq!(run(src, &Value::Nil).unwrap(), "none");
    }

    #[test]
    fn with_rebinds_dot() {
        assert_eq!(run("{{ with .Prompt }}<{{ . }}>{{ end }}", &vars()).unwrap(), "<hi>");
        assert_eq!(
            run("{{ with .Response }}<{{ . }}>{{ else }}empty{{ end }}", &vars()).unwrap(),
            "empty"
        );
    }

    #[test]
    fn pipelines_pass_the_last_argument() {
        assert_eq!(run("{{ .Prompt | len }}", &vars()).unwrap(), "2");
        assert_eq!(run(r#"{{ "a" | printf "%s-%s" "b" }}"#, &vars()).unwrap(), "b-a");
    }

    #[test]
    fn boolean_functions() {
        assert_eq!(run("{{ and .System .Response }}", &vars()).unwrap(), "");
        assert_eq!(run("{{ or .Response .Prompt }}", &vars()).unwrap(), "hi");
        assert_eq!(run("{{ not .Response }}", &vars()).unwrap(), "true");
        assert_eq!(run(r#"{{ eq .Prompt "x" "hi" }}"#, &vars()).unwrap(), "true");
        assert_eq!(run(r#"{{ ne .Prompt "hi" }}"#, &vars()).unwrap(), "false");
    }

    #[test]
    fn print_family() {
        assert_eq!(run(r#"{{ print 1 2 "a" "b" }}"#, &vars()).unwrap(), "1 2ab");
        assert_eq!(run(r#"{{ println "a" 1 }}"#, &vars()).unwrap(), "a 1\n");
        assert_eq!(
            run(r#"{{ printf "%q %d%% %s" .Prompt 5 }}"#, &vars()).unwrap(),
            "\"hi\" 5% %!s(MISSING)"
        );
    }

    #[test]
    fn arguments_to_a_field_fail() {
        let err = run("{{ .Prompt .System }}", &vars()).unwrap_err();
        assert!(err.to_string().contains("non-function"));
    }

    #[test]
    fn wrong_arity_fails() {
        assert!(run("{{ not }}", &vars()).is_err());
        assert!(run("{{ len 3 }}", &vars()).is_err());
        assert!(run("{{ printf 3 }}", &vars()).is_err());
    }

    #[test]
    fn map_display() {
        let value: Value = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(value.to_string(), "map[a:1 b:2]");
    }
}
