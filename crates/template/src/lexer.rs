//! Splits template source into text runs and tokenized actions.
//!
//! Trim markers are applied here: `{{- ` strips trailing whitespace from the
//! preceding text, ` -}}` strips leading whitespace from the following text.
//! Only ASCII space, tab, carriage return and newline count as whitespace.
//! Comments are dropped entirely.

use promptpack_core::TemplateError;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const RIGHT_TRIM: &str = "-}}";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// `.Name.Sub`
    Field(Vec<String>),
    /// `.`
    Dot,
    /// Keyword, function name, `true`, `false` or `nil`.
    Ident(String),
    Str(String),
    Number(i64),
    Pipe,
    LeftParen,
    RightParen,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Text(String),
    Action { line: usize, tokens: Vec<Token> },
}

pub(crate) fn lex(src: &str) -> Result<Vec<Item>, TemplateError> {
    let mut items = Vec::new();
    let mut pos = 0;
    let mut trim_next = false;

    while pos < src.len() {
        let rest = &src[pos..];
        let Some(open) = rest.find(LEFT_DELIM) else {
            push_text(&mut items, rest, trim_next, false);
            break;
        };

        let inner = pos + open + LEFT_DELIM.len();
        let trim_left = has_left_trim(&src[inner..]);
        push_text(&mut items, &rest[..open], trim_next, trim_left);

        let mut lexer = ActionLexer {
            src,
            pos: inner + usize::from(trim_left),
            line: line_at(src, pos + open),
        };
        let (tokens, end, trim_right) = lexer.run()?;
        if let Some(tokens) = tokens {
            items.push(Item::Action {
                line: lexer.line,
                tokens,
            });
        }
        trim_next = trim_right;
        pos = end;
    }

    Ok(items)
}

fn push_text(items: &mut Vec<Item>, text: &str, trim_start: bool, trim_end: bool) {
    let text = if trim_start { text.trim_start_matches(is_space) } else { text };
    let text = if trim_end { text.trim_end_matches(is_space) } else { text };
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }
}

/// `{{-` only trims when followed by whitespace; `{{-3}}` is a number.
fn has_left_trim(inner: &str) -> bool {
    let mut chars = inner.chars();
    chars.next() == Some('-') && chars.next().is_some_and(is_space)
}

fn line_at(src: &str, pos: usize) -> usize {
    1 + src[..pos].matches('\n').count()
}

struct ActionLexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> ActionLexer<'a> {
    /// Returns the tokens (`None` for a comment), the offset just past the
    /// closing delimiter, and whether a right trim marker was present.
    fn run(&mut self) -> Result<(Option<Vec<Token>>, usize, bool), TemplateError> {
        let start = self.pos;
        self.skip_whitespace();
        if self.rest().starts_with("/*") {
            let Some(close) = self.rest()[2..].find("*/") else {
                return Err(TemplateError::syntax(self.line, "unclosed comment"));
            };
            self.pos += 2 + close + 2;
            return match self.try_close() {
                Some((end, trim)) => Ok((None, end, trim)),
                None => Err(TemplateError::syntax(
                    self.line,
                    "comment ends before closing delimiter",
                )),
            };
        }
        self.pos = start;

        let mut tokens = Vec::new();
        loop {
            if let Some((end, trim)) = self.try_close() {
                return Ok((Some(tokens), end, trim));
            }
            let Some(c) = self.peek() else {
                return Err(TemplateError::syntax(self.line, "unclosed action"));
            };
            match c {
                c if is_space(c) => self.pos += 1,
                '|' => {
                    self.pos += 1;
                    tokens.push(Token::Pipe);
                }
                '(' => {
                    self.pos += 1;
                    tokens.push(Token::LeftParen);
                }
                ')' => {
                    self.pos += 1;
                    tokens.push(Token::RightParen);
                }
                '"' => tokens.push(self.quoted()?),
                '`' => tokens.push(self.raw_quoted()?),
                '.' => tokens.push(self.field()),
                '-' | '0'..='9' => tokens.push(self.number()?),
                c if is_ident_char(c) => tokens.push(Token::Ident(self.ident())),
                other => {
                    return Err(TemplateError::syntax(
                        self.line,
                        format!("unexpected {other:?} in command"),
                    ));
                }
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches(is_space).len();
    }

    fn try_close(&self) -> Option<(usize, bool)> {
        let rest = self.rest();
        if rest.starts_with(RIGHT_DELIM) {
            return Some((self.pos + RIGHT_DELIM.len(), false));
        }
        let trimmed = rest.trim_start_matches(is_space);
        if trimmed.len() < rest.len() && trimmed.starts_with(RIGHT_TRIM) {
            return Some((self.pos + rest.len() - trimmed.len() + RIGHT_TRIM.len(), true));
        }
        None
    }

    fn field(&mut self) -> Token {
        let mut path = Vec::new();
        while self.peek() == Some('.') && self.rest()[1..].starts_with(is_ident_char) {
            self.pos += 1;
            path.push(self.ident());
        }
        if path.is_empty() {
            self.pos += 1;
            Token::Dot
        } else {
            Token::Field(path)
        }
    }

    fn ident(&mut self) -> String {
        let rest = self.rest();
        let len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }

    fn number(&mut self) -> Result<Token, TemplateError> {
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let digits = rest[sign..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len() - sign);
        let literal = &rest[..sign + digits];
        let value = literal
            .parse::<i64>()
            .map_err(|_| TemplateError::syntax(self.line, format!("bad number syntax: {literal:?}")))?;
        self.pos += literal.len();
        Ok(Token::Number(value))
    }

    fn quoted(&mut self) -> Result<Token, TemplateError> {
        let mut value = String::new();
        let mut chars = self.rest().char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(Token::Str(value));
                }
                '\n' => break,
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, c @ ('"' | '\\'))) => value.push(c),
                    Some((_, other)) => {
                        return Err(TemplateError::syntax(
                            self.line,
                            format!("unknown escape sequence: \\{other}"),
                        ));
                    }
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(TemplateError::syntax(self.line, "unterminated quoted string"))
    }

    fn raw_quoted(&mut self) -> Result<Token, TemplateError> {
        let Some(close) = self.rest()[1..].find('`') else {
            return Err(TemplateError::syntax(self.line, "unterminated raw quoted string"));
        };
        let value = self.rest()[1..1 + close].to_string();
        self.pos += close + 2;
        Ok(Token::Str(value))
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(tokens: Vec<Token>) -> Item {
        Item::Action { line: 1, tokens }
    }

    #[test]
    fn text_and_field() {
        let items = lex("Q: {{ .Prompt }}").unwrap();
        assert_eq!(
            items,
            vec![
                Item::Text("Q: ".into()),
                action(vec![Token::Field(vec!["Prompt".into()])]),
            ]
        );
    }

    #[test]
    fn trim_markers_strip_surrounding_whitespace() {
        let items = lex("a  \n{{- .X -}}\n  b").unwrap();
        assert_eq!(items[0], Item::Text("a".into()));
        assert_eq!(items[2], Item::Text("b".into()));
    }

    #[test]
    fn negative_number_is_not_a_trim_marker() {
        let items = lex("{{-3}}").unwrap();
        assert_eq!(items, vec![action(vec![Token::Number(-3)])]);
    }

    #[test]
    fn comments_are_dropped() {
        let items = lex("a {{- /* note */ -}} b").unwrap();
        assert_eq!(items, vec![Item::Text("a".into()), Item::Text("b".into())]);
    }

    #[test]
    fn pipeline_tokens() {
        let items = lex(r#"{{ printf "%s" (.A.B) | len }}"#).unwrap();
        assert_eq!(
            items,
            vec![action(vec![
                Token::Ident("printf".into()),
                Token::Str("%s".into()),
                Token::LeftParen,
                Token::Field(vec!["A".into(), "B".into()]),
                Token::RightParen,
                Token::Pipe,
                Token::Ident("len".into()),
            ])]
        );
    }

    #[test]
    fn dot_alone() {
        let items = lex("{{ . }}").unwrap();
        assert_eq!(items, vec![action(vec![Token::Dot])]);
    }

    #[test]
    fn escapes_and_raw_strings() {
        let items = lex(r#"{{ "a\n\"b\"" }}{{ `raw\n` }}"#).unwrap();
        assert_eq!(items[0], action(vec![Token::Str("a\n\"b\"".into())]));
        assert_eq!(items[1], action(vec![Token::Str("raw\\n".into())]));
    }

    #[test]
    fn line_numbers_follow_newlines() {
        let items = lex("one\ntwo\n{{ .X }}").unwrap();
        assert!(matches!(items[1], Item::Action { line: 3, .. }));
    }

    #[test]
    fn unclosed_action_is_an_error() {
        let err = lex("hello {{ .Prompt").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { line: 1, .. }));
    }

    #[test]
    fn unclosed_comment_is_an_error() {
        assert!(lex("{{/* never closed }}").is_err());
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(lex(r#"{{ "open }}"#).is_err());
    }

    #[test]
    fn wide_space_before_comment_trim_is_a_syntax_error() {
        let err = lex("a{{/* c */\u{3000}-}}b").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn trim_markers_keep_non_ascii_whitespace() {
        let items = lex("a\u{3000}{{- .Prompt -}}\u{3000}b").unwrap();
        assert_eq!(items[0], Item::Text("a\u{3000}".into()));
        assert_eq!(items[2], Item::Text("\u{3000}b".into()));
    }

    #[test]
    fn wide_space_does_not_open_a_right_trim() {
        let err = lex("{{ .X\u{3000}-}}").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn stray_character_is_an_error() {
        assert!(lex("{{ .A & .B }}").is_err());
    }
}
