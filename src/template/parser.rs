//! Lexing and parsing of statement templates.
//!
//! Templates use `{{ }}` actions:
//!
//! ```text
//! select {{ .fields }} from {{ .table }}
//! where 1 = 1
//! {{- if .name }} and name = {{ arg .name }}{{ end }}
//! {{- if .ids }} and id {{ in .ids }}{{ end }}
//! ```

use super::functions::FunctionRegistry;
use crate::core::Value;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

lazy_static! {
    /// Opening delimiter, with the optional left trim marker.
    static ref ACTION_OPEN: Regex = Regex::new(r"\{\{(-\s)?").expect("action pattern compiles");
}

const KEYWORDS: &[&str] = &["if", "else", "end", "range", "with", "define", "template", "block"];

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    /// `{{ pipeline }}`: print the result
    Action(Pipeline),
    If {
        condition: Pipeline,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
}

/// `command | function | function`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Operand(Operand),
    /// A registered function. Only the first command of a pipeline carries an
    /// explicit argument; later ones receive the previous result.
    Call {
        function: String,
        argument: Option<Operand>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `.a.b` or a bare name
    Variable(Vec<String>),
    Literal(Value),
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(Vec<String>),
    Ident(String),
    Literal(Value),
    Pipe,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(path) => write!(f, ".{}", path.join(".")),
            Self::Ident(name) => write!(f, "{name}"),
            Self::Literal(Value::Text(s)) => write!(f, "{s:?}"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Pipe => write!(f, "|"),
        }
    }
}

enum Segment {
    Text(String),
    Action(Vec<Token>),
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn take_while(chars: &mut Peekable<CharIndices<'_>>, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn lex_string(chars: &mut Peekable<CharIndices<'_>>) -> Result<String, String> {
    let mut out = String::new();
    loop {
        match chars.next() {
            Some((_, '"')) => return Ok(out),
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, c)) => return Err(format!("unknown escape sequence \\{c}")),
                None => return Err("unterminated quoted string".to_string()),
            },
            Some((_, c)) => out.push(c),
            None => return Err("unterminated quoted string".to_string()),
        }
    }
}

fn lex_number(text: &str) -> Result<Value, String> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| format!("bad number syntax: {text}"))
}

fn tokenize(action: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = action.char_indices().peekable();

    while let Some(&(_, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '"' => {
                chars.next();
                tokens.push(Token::Literal(Value::Text(lex_string(&mut chars)?)));
            }
            '`' => {
                chars.next();
                let raw = take_while(&mut chars, |c| c != '`');
                if chars.next().is_none() {
                    return Err("unterminated raw quoted string".to_string());
                }
                tokens.push(Token::Literal(Value::Text(raw)));
            }
            '.' => {
                let mut path = Vec::new();
                while let Some(&(_, '.')) = chars.peek() {
                    chars.next();
                    let segment = take_while(&mut chars, is_ident_char);
                    if segment.is_empty() {
                        return Err(if path.is_empty() {
                            "{{ . }} is not supported, name a variable".to_string()
                        } else {
                            format!("bad field path .{}.", path.join("."))
                        });
                    }
                    path.push(segment);
                }
                tokens.push(Token::Field(path));
            }
            '-' | '+' | '0'..='9' => {
                chars.next();
                let digits = take_while(&mut chars, |c| c.is_ascii_digit() || c == '.');
                if !c.is_ascii_digit() && digits.is_empty() {
                    return Err(format!("unexpected '{c}' in action"));
                }
                tokens.push(Token::Literal(lex_number(&format!("{c}{digits}"))?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let ident = take_while(&mut chars, is_ident_char);
                tokens.push(match ident.as_str() {
                    "true" => Token::Literal(Value::Boolean(true)),
                    "false" => Token::Literal(Value::Boolean(false)),
                    "nil" => Token::Literal(Value::Null),
                    _ => Token::Ident(ident),
                });
            }
            other => return Err(format!("unexpected '{other}' in action")),
        }
    }
    Ok(tokens)
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn skip_quoted(bytes: &[u8], open: usize, escapes: bool) -> Result<usize, String> {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if escapes => i += 2,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err("unterminated quoted string".to_string())
}

/// Offset of the `}}` closing the action whose body starts at `from`.
/// Quoted strings and comments may contain `}}`.
fn find_close(body: &str, from: usize) -> Result<usize, String> {
    let bytes = body.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => i = skip_quoted(bytes, i, true)?,
            b'`' => i = skip_quoted(bytes, i, false)?,
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let len = body[i + 2..]
                    .find("*/")
                    .ok_or_else(|| "unclosed comment".to_string())?;
                i += len + 4;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Ok(i),
            _ => i += 1,
        }
    }
    Err("unclosed action".to_string())
}

fn lex(body: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut last = 0;
    let mut trim_next = false;

    while let Some(open) = ACTION_OPEN.find_at(body, last) {
        let mut text = &body[last..open.start()];
        if trim_next {
            text = text.trim_start();
        }
        if open.len() > 2 {
            text = text.trim_end();
        }
        push_text(&mut segments, text);

        let close = find_close(body, open.end())?;
        let mut action = &body[open.end()..close];
        trim_next = false;
        if let Some(stripped) = action.strip_suffix('-') {
            if stripped.ends_with(char::is_whitespace) {
                action = stripped;
                trim_next = true;
            }
        }
        last = close + 2;

        let action = action.trim();
        if action.starts_with("/*") {
            if !action.ends_with("*/") {
                return Err("comment must fill the whole action".to_string());
            }
            continue;
        }
        segments.push(Segment::Action(tokenize(action)?));
    }

    let mut tail = &body[last..];
    if trim_next {
        tail = tail.trim_start();
    }
    push_text(&mut segments, tail);
    Ok(segments)
}

// ============================================================================
// Parser
// ============================================================================

enum Item {
    Text(String),
    Action(Pipeline),
    If(Pipeline),
    Else,
    ElseIf(Pipeline),
    End,
}

struct Parser {
    items: std::vec::IntoIter<Item>,
}

/// Parse a template body into nodes. Errors are plain messages; the caller
/// attaches the statement name.
pub fn parse(body: &str, functions: &FunctionRegistry) -> Result<Vec<Node>, String> {
    let mut items = Vec::new();
    for segment in lex(body)? {
        items.push(match segment {
            Segment::Text(text) => Item::Text(text),
            Segment::Action(tokens) => classify(tokens, functions)?,
        });
    }

    let mut parser = Parser {
        items: items.into_iter(),
    };
    let (nodes, terminator) = parser.parse_list()?;
    match terminator {
        None => Ok(nodes),
        Some(Item::End) => Err("unexpected {{end}}".to_string()),
        Some(_) => Err("unexpected {{else}}".to_string()),
    }
}

fn classify(tokens: Vec<Token>, functions: &FunctionRegistry) -> Result<Item, String> {
    let Some(first) = tokens.first() else {
        return Err("missing value for command".to_string());
    };
    let keyword = match first {
        Token::Ident(name) if KEYWORDS.contains(&name.as_str()) => name.as_str(),
        _ => return Ok(Item::Action(parse_pipeline(&tokens, functions)?)),
    };
    let rest = &tokens[1..];

    match keyword {
        "if" if rest.is_empty() => Err("missing condition in {{if}}".to_string()),
        "if" => Ok(Item::If(parse_pipeline(rest, functions)?)),
        "else" => match rest.first() {
            None => Ok(Item::Else),
            Some(Token::Ident(name)) if name == "if" && rest.len() > 1 => {
                Ok(Item::ElseIf(parse_pipeline(&rest[1..], functions)?))
            }
            Some(token) => Err(format!("unexpected {token} in {{{{else}}}}")),
        },
        "end" if rest.is_empty() => Ok(Item::End),
        "end" => Err("unexpected arguments to {{end}}".to_string()),
        other => Err(format!("{{{{{other}}}}} is not supported")),
    }
}

fn parse_pipeline(tokens: &[Token], functions: &FunctionRegistry) -> Result<Pipeline, String> {
    let mut commands = Vec::new();
    for (index, command) in tokens.split(|t| *t == Token::Pipe).enumerate() {
        if command.is_empty() {
            return Err("missing command in pipeline".to_string());
        }
        commands.push(if index == 0 {
            parse_first_command(command, functions)?
        } else {
            parse_stage(command, functions)?
        });
    }
    Ok(Pipeline { commands })
}

fn parse_first_command(tokens: &[Token], functions: &FunctionRegistry) -> Result<Command, String> {
    match tokens {
        [Token::Ident(name), rest @ ..] if functions.contains(name) => match rest {
            [] => Err(format!("function {name} needs an argument")),
            [argument] => Ok(Command::Call {
                function: name.clone(),
                argument: Some(parse_operand(argument, functions)?),
            }),
            _ => Err(format!("function {name} takes one argument, got {}", rest.len())),
        },
        [Token::Ident(name), _, ..] => Err(format!("function \"{name}\" not defined")),
        [single] => Ok(Command::Operand(parse_operand(single, functions)?)),
        [first, second, ..] => Err(format!("unexpected {second} after {first}")),
        [] => Err("missing value for command".to_string()),
    }
}

fn parse_stage(tokens: &[Token], functions: &FunctionRegistry) -> Result<Command, String> {
    match tokens {
        [Token::Ident(name)] if functions.contains(name) => Ok(Command::Call {
            function: name.clone(),
            argument: None,
        }),
        [Token::Ident(name)] => Err(format!("function \"{name}\" not defined")),
        [Token::Ident(name), ..] if functions.contains(name) => Err(format!(
            "function {name} takes one argument, which a pipeline stage already supplies"
        )),
        [first, ..] => Err(format!("non-function {first} in pipeline")),
        [] => Err("missing command in pipeline".to_string()),
    }
}

fn parse_operand(token: &Token, functions: &FunctionRegistry) -> Result<Operand, String> {
    match token {
        Token::Field(path) => Ok(Operand::Variable(path.clone())),
        Token::Literal(value) => Ok(Operand::Literal(value.clone())),
        Token::Ident(name) if KEYWORDS.contains(&name.as_str()) => {
            Err(format!("unexpected keyword {name}"))
        }
        Token::Ident(name) if functions.contains(name) => {
            Err(format!("function {name} cannot be used as an operand"))
        }
        Token::Ident(name) => Ok(Operand::Variable(vec![name.clone()])),
        Token::Pipe => Err("missing command in pipeline".to_string()),
    }
}

impl Parser {
    /// Nodes up to the next `else`/`end`, which is returned alongside.
    fn parse_list(&mut self) -> Result<(Vec<Node>, Option<Item>), String> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.next() {
            match item {
                Item::Text(text) => nodes.push(Node::Text(text)),
                Item::Action(pipeline) => nodes.push(Node::Action(pipeline)),
                Item::If(condition) => nodes.push(self.parse_if(condition)?),
                terminator => return Ok((nodes, Some(terminator))),
            }
        }
        Ok((nodes, None))
    }

    fn parse_if(&mut self, condition: Pipeline) -> Result<Node, String> {
        let (then_branch, terminator) = self.parse_list()?;
        let else_branch = match terminator {
            Some(Item::End) => Vec::new(),
            Some(Item::ElseIf(nested)) => vec![self.parse_if(nested)?],
            Some(Item::Else) => match self.parse_list()? {
                (nodes, Some(Item::End)) => nodes,
                (_, Some(_)) => return Err("unexpected {{else}} after {{else}}".to_string()),
                (_, None) => return Err("unexpected EOF, {{if}} is never closed".to_string()),
            },
            _ => return Err("unexpected EOF, {{if}} is never closed".to_string()),
        };
        Ok(Node::If {
            condition,
            then_branch,
            else_branch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(body: &str) -> Result<Vec<Node>, String> {
        parse(body, &FunctionRegistry::with_default_functions())
    }

    fn var(path: &[&str]) -> Operand {
        Operand::Variable(path.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_text_and_actions() {
        let nodes = parse_default("select {{ .fields }} from {{.table}} where id = {{ arg .id }}").unwrap();
        assert_eq!(nodes.len(), 6);
        assert_eq!(nodes[0], Node::Text("select ".to_string()));
        assert_eq!(
            nodes[5],
            Node::Action(Pipeline {
                commands: vec![Command::Call {
                    function: "arg".to_string(),
                    argument: Some(var(&["id"])),
                }],
            })
        );
    }

    #[test]
    fn test_pipeline_and_paths() {
        let nodes = parse_default("{{ .user.name | arg }}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::Action(Pipeline {
                commands: vec![
                    Command::Operand(var(&["user", "name"])),
                    Command::Call {
                        function: "arg".to_string(),
                        argument: None,
                    },
                ],
            })]
        );
    }

    #[test]
    fn test_trim_markers_and_comments() {
        let nodes = parse_default("a  \n {{- /* note */ -}} \n b").unwrap();
        assert_eq!(nodes, vec![Node::Text("a".to_string()), Node::Text("b".to_string())]);
    }

    #[test]
    fn test_braces_inside_quotes_and_comments() {
        let nodes = parse_default(r#"a{{ arg "x}}y" }}{{/* b }} c */}}{{ arg `}}` -}} z"#).unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0], Node::Text("a".to_string()));
        assert_eq!(
            nodes[1],
            Node::Action(Pipeline {
                commands: vec![Command::Call {
                    function: "arg".to_string(),
                    argument: Some(Operand::Literal(Value::from("x}}y"))),
                }],
            })
        );
        assert_eq!(nodes[3], Node::Text("z".to_string()));

        assert!(parse_default(r#"{{ arg "x}} }}"#).unwrap_err().contains("unterminated"));
        assert!(parse_default("{{/* x }}").unwrap_err().contains("unclosed comment"));
    }

    #[test]
    fn test_literals() {
        let nodes = parse_default(r#"{{ arg "x\"y" }}{{ arg -3 }}{{ arg 1.5 }}{{ nil }}{{ true }}"#).unwrap();
        let literal = |node: &Node| match node {
            Node::Action(Pipeline { commands }) => match &commands[0] {
                Command::Call { argument: Some(Operand::Literal(v)), .. } => v.clone(),
                Command::Operand(Operand::Literal(v)) => v.clone(),
                other => panic!("unexpected command {other:?}"),
            },
            other => panic!("unexpected node {other:?}"),
        };
        assert_eq!(literal(&nodes[0]), Value::from("x\"y"));
        assert_eq!(literal(&nodes[1]), Value::Integer(-3));
        assert_eq!(literal(&nodes[2]), Value::Float(1.5));
        assert_eq!(literal(&nodes[3]), Value::Null);
        assert_eq!(literal(&nodes[4]), Value::Boolean(true));
    }

    #[test]
    fn test_nested_if_else() {
        let nodes = parse_default("{{ if .a }}A{{ else if .b }}B{{ else }}{{ if .c }}C{{ end }}{{ end }}").unwrap();
        let Node::If { then_branch, else_branch, .. } = &nodes[0] else {
            panic!("expected if");
        };
        assert_eq!(then_branch, &vec![Node::Text("A".to_string())]);
        let Node::If { else_branch: inner_else, .. } = &else_branch[0] else {
            panic!("expected else-if");
        };
        assert!(matches!(inner_else[0], Node::If { .. }));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_default("select {{ .a").unwrap_err().contains("unclosed"));
        assert!(parse_default("{{ like .a }}").unwrap_err().contains("not defined"));
        assert!(parse_default("{{ if .a }}x").unwrap_err().contains("never closed"));
        assert!(parse_default("x{{ end }}").is_err());
        assert!(parse_default("{{ else }}").is_err());
        assert!(parse_default("{{ . }}").is_err());
        assert!(parse_default("{{ }}").is_err());
        assert!(parse_default("{{ arg }}").is_err());
        assert!(parse_default("{{ arg .a .b }}").is_err());
        assert!(parse_default("{{ .a | .b }}").is_err());
        assert!(parse_default("{{ range .a }}{{ end }}").is_err());
    }

    #[test]
    fn test_bare_name_is_a_variable() {
        assert_eq!(
            parse_default("{{ table }}").unwrap(),
            vec![Node::Action(Pipeline {
                commands: vec![Command::Operand(var(&["table"]))],
            })]
        );
    }
}
