//! Template parser.
//!
//! Parsing happens in two passes: nom splits the source into text and action
//! parts (applying `{{-` / `-}}` trimming), then the parts are folded into a
//! tree of [`Node`]s by matching `if` / `with` / `range` with `else` and `end`.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while};
use nom::character::complete::{char, digit1, multispace0, multispace1, satisfy};
use nom::combinator::{all_consuming, map, not, opt, recognize, rest, value, verify};
use nom::error::{Error, ErrorKind};
use nom::multi::{many0, many1, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{IResult, Parser};

use super::ast::{Command, Node, Operand, Pipeline, Template};
use crate::error::TemplateError;

#[derive(Debug, Clone, PartialEq)]
enum ActionKind {
    Pipeline(Pipeline),
    If(Pipeline),
    ElseIf(Pipeline),
    Else,
    End,
    With(Pipeline),
    Range(Pipeline),
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    Action {
        kind: ActionKind,
        trim_left: bool,
        trim_right: bool,
    },
}

/// Parse a template source into its compiled form.
pub fn parse(source: &str) -> Result<Template, TemplateError> {
    let parts = match parse_parts(source) {
        Ok((_, parts)) => trim(parts),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            return Err(parse_error(source, describe(source, e.input)));
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(parse_error(source, "incomplete input".to_string()));
        }
    };

    let mut parts = parts.into_iter();
    let (nodes, stop) = build(&mut parts).map_err(|message| parse_error(source, message))?;

    match stop {
        Stop::Eof => Ok(Template { nodes }),
        Stop::End => Err(parse_error(source, "unexpected {{end}}".to_string())),
        Stop::Else | Stop::ElseIf(_) => {
            Err(parse_error(source, "unexpected {{else}}".to_string()))
        }
    }
}

fn parse_error(source: &str, message: String) -> TemplateError {
    TemplateError::Parse {
        source_text: source.to_string(),
        message,
    }
}

fn describe(source: &str, remaining: &str) -> String {
    let offset = source.len() - remaining.len();
    match remaining.get(2..) {
        Some(after) if remaining.starts_with("{{") && !after.contains("}}") => {
            format!("unclosed action at offset {offset}")
        }
        _ => {
            let snippet: String = remaining.chars().take(24).collect();
            format!("bad action at offset {offset}: {snippet:?}")
        }
    }
}

fn parse_parts(input: &str) -> IResult<&str, Vec<Part>> {
    all_consuming(many0(alt((action, text)))).parse(input)
}

fn text(input: &str) -> IResult<&str, Part> {
    map(
        verify(alt((take_until("{{"), rest)), |s: &&str| !s.is_empty()),
        |s: &str| Part::Text(s.to_string()),
    )
    .parse(input)
}

fn action(input: &str) -> IResult<&str, Part> {
    let (input, _) = tag("{{").parse(input)?;
    let (input, trim_left) = opt(terminated(char('-'), multispace1)).parse(input)?;
    let (input, kind) = delimited(multispace0, action_kind, multispace0).parse(input)?;
    let (input, trim_right) = alt((value(true, tag("-}}")), value(false, tag("}}")))).parse(input)?;

    Ok((
        input,
        Part::Action {
            kind,
            trim_left: trim_left.is_some(),
            trim_right,
        },
    ))
}

fn action_kind(input: &str) -> IResult<&str, ActionKind> {
    alt((
        value(
            ActionKind::Comment,
            delimited(tag("/*"), take_until("*/"), tag("*/")),
        ),
        map(
            preceded(
                (keyword("else"), multispace1, keyword("if"), multispace1),
                pipeline,
            ),
            ActionKind::ElseIf,
        ),
        value(ActionKind::Else, keyword("else")),
        value(ActionKind::End, keyword("end")),
        map(preceded((keyword("if"), multispace1), pipeline), ActionKind::If),
        map(preceded((keyword("with"), multispace1), pipeline), ActionKind::With),
        map(preceded((keyword("range"), multispace1), pipeline), ActionKind::Range),
        map(pipeline, ActionKind::Pipeline),
    ))
    .parse(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input| terminated(tag(word), not(satisfy(is_ident_char))).parse(input)
}

fn pipeline(input: &str) -> IResult<&str, Pipeline> {
    map(
        separated_list1(delimited(multispace0, char('|'), multispace0), command),
        |commands| Pipeline { commands },
    )
    .parse(input)
}

fn command(input: &str) -> IResult<&str, Command> {
    map(separated_list1(multispace1, operand), |args| Command { args }).parse(input)
}

fn operand(input: &str) -> IResult<&str, Operand> {
    alt((
        map(string_literal, Operand::Str),
        map(raw_string, Operand::Str),
        number,
        map(preceded(char('$'), opt(field)), |path| {
            Operand::Root(path.unwrap_or_default())
        }),
        map(field, Operand::Field),
        map(
            delimited((char('('), multispace0), pipeline, (multispace0, char(')'))),
            |inner| Operand::Pipeline(Box::new(inner)),
        ),
        map(identifier, |word| match word {
            "true" => Operand::Bool(true),
            "false" => Operand::Bool(false),
            "nil" => Operand::Nil,
            name => Operand::Function(name.to_string()),
        }),
    ))
    .parse(input)
}

fn field(input: &str) -> IResult<&str, Vec<String>> {
    alt((
        many1(preceded(char('.'), map(identifier, str::to_string))),
        value(Vec::new(), char('.')),
    ))
    .parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))
    .parse(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn number(input: &str) -> IResult<&str, Operand> {
    let (remaining, text) =
        recognize((opt(char('-')), digit1, opt((char('.'), digit1)))).parse(input)?;

    let operand = if text.contains('.') {
        text.parse().ok().map(Operand::Float)
    } else {
        text.parse().ok().map(Operand::Int)
    };

    match operand {
        Some(operand) => Ok((remaining, operand)),
        None => Err(nom::Err::Error(Error::new(input, ErrorKind::Digit))),
    }
}

fn raw_string(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('`'), take_while(|c: char| c != '`'), char('`')),
        str::to_string,
    )
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    let Some(body) = input.strip_prefix('"') else {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    };

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&body[i + 1..], out)),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            '\n' => break,
            c => out.push(c),
        }
    }

    // Unterminated strings can't be anything else, so stop backtracking.
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

/// Apply `{{-` and `-}}` trimming and drop text that became empty.
fn trim(parts: Vec<Part>) -> Vec<Part> {
    let mut out: Vec<Part> = Vec::with_capacity(parts.len());
    let mut trim_next = false;

    for part in parts {
        match part {
            Part::Text(text) => {
                let text = if trim_next {
                    text.trim_start().to_string()
                } else {
                    text
                };
                trim_next = false;
                out.push(Part::Text(text));
            }
            Part::Action {
                kind,
                trim_left,
                trim_right,
            } => {
                if trim_left && let Some(Part::Text(previous)) = out.last_mut() {
                    let trimmed = previous.trim_end().len();
                    previous.truncate(trimmed);
                }
                trim_next = trim_right;
                out.push(Part::Action {
                    kind,
                    trim_left,
                    trim_right,
                });
            }
        }
    }

    out.retain(|part| !matches!(part, Part::Text(text) if text.is_empty()));
    out
}

enum Stop {
    Eof,
    End,
    Else,
    ElseIf(Pipeline),
}

type Parts = std::vec::IntoIter<Part>;

fn build(parts: &mut Parts) -> Result<(Vec<Node>, Stop), String> {
    let mut nodes = Vec::new();

    while let Some(part) = parts.next() {
        let kind = match part {
            Part::Text(text) => {
                nodes.push(Node::Text(text));
                continue;
            }
            Part::Action { kind, .. } => kind,
        };

        match kind {
            ActionKind::Comment => {}
            ActionKind::Pipeline(pipeline) => nodes.push(Node::Action(pipeline)),
            ActionKind::End => return Ok((nodes, Stop::End)),
            ActionKind::Else => return Ok((nodes, Stop::Else)),
            ActionKind::ElseIf(pipeline) => return Ok((nodes, Stop::ElseIf(pipeline))),
            ActionKind::If(pipeline) => nodes.push(build_if(pipeline, parts)?),
            ActionKind::With(pipeline) => {
                let (body, otherwise) = build_block("with", parts)?;
                nodes.push(Node::With {
                    pipeline,
                    body,
                    otherwise,
                });
            }
            ActionKind::Range(pipeline) => {
                let (body, otherwise) = build_block("range", parts)?;
                nodes.push(Node::Range {
                    pipeline,
                    body,
                    otherwise,
                });
            }
        }
    }

    Ok((nodes, Stop::Eof))
}

fn build_if(first: Pipeline, parts: &mut Parts) -> Result<Node, String> {
    let mut branches = Vec::new();
    let mut condition = first;

    loop {
        let (body, stop) = build(parts)?;
        branches.push((condition, body));

        match stop {
            Stop::End => {
                return Ok(Node::If {
                    branches,
                    otherwise: Vec::new(),
                });
            }
            Stop::Else => {
                let otherwise = expect_end("if", parts)?;
                return Ok(Node::If {
                    branches,
                    otherwise,
                });
            }
            Stop::ElseIf(next) => condition = next,
            Stop::Eof => return Err("unexpected EOF in if".to_string()),
        }
    }
}

fn build_block(keyword: &str, parts: &mut Parts) -> Result<(Vec<Node>, Vec<Node>), String> {
    let (body, stop) = build(parts)?;
    match stop {
        Stop::End => Ok((body, Vec::new())),
        Stop::Else => Ok((body, expect_end(keyword, parts)?)),
        Stop::ElseIf(_) => Err(format!("else if is not allowed in {keyword}")),
        Stop::Eof => Err(format!("unexpected EOF in {keyword}")),
    }
}

fn expect_end(keyword: &str, parts: &mut Parts) -> Result<Vec<Node>, String> {
    let (nodes, stop) = build(parts)?;
    match stop {
        Stop::End => Ok(nodes),
        Stop::Eof => Err(format!("unexpected EOF in {keyword}")),
        Stop::Else | Stop::ElseIf(_) => Err(format!("expected end after else in {keyword}")),
    }
}
