//! Builds the node tree from lexed items.
//!
//! Grammar (informal):
//! ```text
//! list     = (TEXT | action | if | with)*
//! if       = "{{if" pipeline "}}" list ("{{else if" pipeline "}}" list)* ["{{else}}" list] "{{end}}"
//! with     = "{{with" pipeline "}}" list ["{{else}}" list] "{{end}}"
//! action   = "{{" pipeline "}}"
//! pipeline = command ("|" command)*
//! command  = operand+
//! operand  = FIELD | "." | FUNCTION | STRING | NUMBER | "true" | "false" | "nil" | "(" pipeline ")"
//! ```

use promptpack_core::TemplateError;

use crate::exec::is_function;
use crate::lexer::{Item, Token, lex};
use crate::node::{Action, Arg, Branch, Command, Node, Pipeline};

/// Parse template source into its top-level nodes.
pub(crate) fn parse(src: &str) -> Result<Vec<Node>, TemplateError> {
    let mut parser = Parser {
        items: lex(src)?.into_iter(),
    };
    let (nodes, stop) = parser.parse_list()?;
    match stop {
        Stop::Eof => Ok(nodes),
        Stop::End(line) => Err(TemplateError::syntax(line, "unexpected {{end}}")),
        Stop::Else { line, .. } => Err(TemplateError::syntax(line, "unexpected {{else}}")),
    }
}

/// Why a list stopped.
enum Stop {
    Eof,
    End(usize),
    /// `{{else}}`, or `{{else if pipeline}}` when `chain` is set.
    Else {
        line: usize,
        chain: Option<Pipeline>,
    },
}

struct Parser {
    items: std::vec::IntoIter<Item>,
}

impl Parser {
    fn parse_list(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.next() {
            let (line, tokens) = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action { line, tokens } => (line, tokens),
            };

            match keyword(&tokens) {
                Some("end") => {
                    if tokens.len() > 1 {
                        return Err(TemplateError::syntax(line, "unexpected tokens after end"));
                    }
                    return Ok((nodes, Stop::End(line)));
                }
                Some("else") => {
                    let chain = match &tokens[1..] {
                        [] => None,
                        [Token::Ident(kw), rest @ ..] if kw == "if" => {
                            Some(parse_pipeline(line, rest, "if")?)
                        }
                        _ => {
                            return Err(TemplateError::syntax(line, "unexpected tokens after else"));
                        }
                    };
                    return Ok((nodes, Stop::Else { line, chain }));
                }
                Some("if") => {
                    let pipeline = parse_pipeline(line, &tokens[1..], "if")?;
                    nodes.push(Node::If(self.parse_branch(line, pipeline, true)?));
                }
                Some("with") => {
                    let pipeline = parse_pipeline(line, &tokens[1..], "with")?;
                    nodes.push(Node::With(self.parse_branch(line, pipeline, false)?));
                }
                Some(other) => {
                    return Err(TemplateError::syntax(
                        line,
                        format!("unsupported action {{{{{other}}}}}"),
                    ));
                }
                None => nodes.push(Node::Action(Action {
                    line,
                    pipeline: parse_pipeline(line, &tokens, "command")?,
                })),
            }
        }
        Ok((nodes, Stop::Eof))
    }

    /// Parse the body of an `if`/`with` whose opening action was on `line`,
    /// consuming through the matching `{{end}}`.
    fn parse_branch(
        &mut self,
        line: usize,
        pipeline: Pipeline,
        allow_else_if: bool,
    ) -> Result<Branch, TemplateError> {
        let (list, stop) = self.parse_list()?;
        let else_list = match stop {
            Stop::End(_) => None,
            Stop::Eof => return Err(unclosed(line)),
            Stop::Else { chain: None, .. } => {
                let (else_list, stop) = self.parse_list()?;
                match stop {
                    Stop::End(_) => Some(else_list),
                    Stop::Eof => return Err(unclosed(line)),
                    Stop::Else { line, .. } => {
                        return Err(TemplateError::syntax(line, "expected end; found {{else}}"));
                    }
                }
            }
            Stop::Else {
                line: else_line,
                chain: Some(chained),
            } => {
                if !allow_else_if {
                    return Err(TemplateError::syntax(else_line, "else if is only valid inside if"));
                }
                // The chained branch shares this branch's {{end}}.
                let nested = self.parse_branch(else_line, chained, true)?;
                Some(vec![Node::If(nested)])
            }
        };
        Ok(Branch {
            line,
            pipeline,
            list,
            else_list,
        })
    }
}

fn unclosed(line: usize) -> TemplateError {
    TemplateError::syntax(line, "unexpected EOF: missing {{end}}")
}

fn keyword(tokens: &[Token]) -> Option<&str> {
    match tokens.first() {
        Some(Token::Ident(name)) => match name.as_str() {
            kw @ ("if" | "else" | "end" | "with" | "range" | "define" | "template" | "block"
            | "break" | "continue") => Some(kw),
            _ => None,
        },
        _ => None,
    }
}

fn parse_pipeline(line: usize, tokens: &[Token], context: &str) -> Result<Pipeline, TemplateError> {
    if tokens.is_empty() {
        return Err(TemplateError::syntax(line, format!("missing value for {context}")));
    }

    let mut commands = Vec::new();
    let mut args = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Pipe => {
                if args.is_empty() {
                    return Err(TemplateError::syntax(line, "missing command before |"));
                }
                commands.push(Command {
                    args: std::mem::take(&mut args),
                });
            }
            Token::LeftParen => {
                let close = matching_paren(&tokens[i..])
                    .ok_or_else(|| TemplateError::syntax(line, "unclosed left paren"))?;
                let inner = &tokens[i + 1..i + close];
                args.push(Arg::Pipeline(parse_pipeline(line, inner, "parenthesized pipeline")?));
                i += close;
            }
            Token::RightParen => {
                return Err(TemplateError::syntax(line, "unexpected right paren"));
            }
            token => args.push(parse_operand(line, token)?),
        }
        i += 1;
    }

    if args.is_empty() {
        return Err(TemplateError::syntax(line, "missing command after |"));
    }
    commands.push(Command { args });
    Ok(Pipeline { commands })
}

/// Offset of the `)` closing the `(` at `tokens[0]`.
fn matching_paren(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LeftParen => depth += 1,
            Token::RightParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_operand(line: usize, token: &Token) -> Result<Arg, TemplateError> {
    Ok(match token {
        Token::Field(path) => Arg::Field(path.clone()),
        Token::Dot => Arg::Dot,
        Token::Str(s) => Arg::Str(s.clone()),
        Token::Number(n) => Arg::Number(*n),
        Token::Ident(name) => match name.as_str() {
            "true" => Arg::Bool(true),
            "false" => Arg::Bool(false),
            "nil" => Arg::Nil,
            name if is_function(name) => Arg::Function(name.to_string()),
            name => {
                return Err(TemplateError::syntax(
                    line,
                    format!("function {name:?} not defined"),
                ));
            }
        },
        Token::Pipe | Token::LeftParen | Token::RightParen => {
            return Err(TemplateError::syntax(line, "unexpected delimiter in operand"));
        }
    })
}
