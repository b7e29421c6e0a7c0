//! Turns content strings and chat transcripts into structural instructions.
//!
//! Markdown handling is line-oriented and heuristic. Input that does not look
//! like a marker is kept as literal text; nothing in here ever fails.

use crate::model::{ChatFormatStyle, ChatMessage, Role};

pub const MAX_HEADING_LEVEL: u8 = 6;

/// Summary entries for assistant replies are cut to this many characters.
const SUMMARY_EXCERPT_CHARS: usize = 200;

/// A span of text sharing one character style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            italic: true,
            ..Self::plain(text)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Heading { level: u8, text: String },
    Paragraph(Vec<Run>),
    BulletItem(Vec<Run>),
    NumberedItem(Vec<Run>),
}

impl Instruction {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Instruction::Heading {
            level: level.clamp(1, MAX_HEADING_LEVEL),
            text: text.into(),
        }
    }
}

/// What a single (trimmed) line of Markdown is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Heading { level: u8, text: &'a str },
    Bullet(&'a str),
    Numbered(&'a str),
    Text(&'a str),
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }

    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes > 0 {
        // `#tag` and a bare `#` stay literal
        return match line[hashes..].strip_prefix(' ').map(str::trim) {
            Some(text) if !text.is_empty() => LineKind::Heading {
                level: hashes.min(MAX_HEADING_LEVEL as usize) as u8,
                text,
            },
            _ => LineKind::Text(line),
        };
    }

    for marker in ["- ", "* ", "+ "] {
        if let Some(text) = line.strip_prefix(marker) {
            return LineKind::Bullet(text.trim_start());
        }
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if let Some(text) = line[digits..].strip_prefix(". ") {
            return LineKind::Numbered(text.trim_start());
        }
    }

    LineKind::Text(line)
}

/// Converts document content into instructions.
///
/// With `is_markdown == false` the content is only split into paragraphs on
/// blank lines.
pub fn format(content: &str, is_markdown: bool) -> Vec<Instruction> {
    if !is_markdown {
        return format_plain(content);
    }

    let mut instructions = Vec::new();
    let mut pending = Vec::new();
    for line in content.lines() {
        match classify_line(line) {
            LineKind::Blank => flush_paragraph(&mut pending, &mut instructions),
            LineKind::Text(text) => pending.push(text),
            LineKind::Heading { level, text } => {
                flush_paragraph(&mut pending, &mut instructions);
                instructions.push(Instruction::heading(level, plain_text(text)));
            }
            LineKind::Bullet(text) => {
                flush_paragraph(&mut pending, &mut instructions);
                instructions.push(Instruction::BulletItem(parse_inline(text)));
            }
            LineKind::Numbered(text) => {
                flush_paragraph(&mut pending, &mut instructions);
                instructions.push(Instruction::NumberedItem(parse_inline(text)));
            }
        }
    }
    flush_paragraph(&mut pending, &mut instructions);
    instructions
}

fn format_plain(content: &str) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() {
            if !pending.is_empty() {
                instructions.push(Instruction::Paragraph(vec![Run::plain(pending.join(" "))]));
                pending.clear();
            }
        } else {
            pending.push(line);
        }
    }
    if !pending.is_empty() {
        instructions.push(Instruction::Paragraph(vec![Run::plain(pending.join(" "))]));
    }
    instructions
}

fn flush_paragraph(pending: &mut Vec<&str>, instructions: &mut Vec<Instruction>) {
    if pending.is_empty() {
        return;
    }
    let joined = pending.join(" ");
    pending.clear();
    instructions.push(Instruction::Paragraph(parse_inline(&joined)));
}

/// Text of a line with matched emphasis markers removed.
fn plain_text(text: &str) -> String {
    parse_inline(text).into_iter().map(|run| run.text).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunStyle {
    bold: bool,
    italic: bool,
}

struct Emphasis<'a> {
    inner: &'a str,
    style: RunStyle,
    consumed: usize,
}

/// Splits a line into styled runs. `**x**` is bold, `*x*` and `_x_` are
/// italic; unmatched markers are kept as literal characters.
pub fn parse_inline(text: &str) -> Vec<Run> {
    let mut runs = Vec::new();
    push_runs(text, RunStyle::default(), &mut runs);
    runs
}

fn push_runs(text: &str, style: RunStyle, runs: &mut Vec<Run>) {
    let mut literal = String::new();
    let mut index = 0;
    while index < text.len() {
        let rest = &text[index..];
        let previous = text[..index].chars().next_back();
        if let Some(span) = emphasis_at(rest, previous, style) {
            push_run(runs, std::mem::take(&mut literal), style);
            push_runs(span.inner, span.style, runs);
            index += span.consumed;
            continue;
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        literal.push(ch);
        index += ch.len_utf8();
    }
    push_run(runs, literal, style);
}

fn emphasis_at<'a>(rest: &'a str, previous: Option<char>, style: RunStyle) -> Option<Emphasis<'a>> {
    let (marker, strong) = if rest.starts_with("**") {
        ("**", true)
    } else if rest.starts_with('*') {
        ("*", false)
    } else if rest.starts_with('_') {
        ("_", false)
    } else {
        return None;
    };

    // no nesting of the same emphasis
    if (strong && style.bold) || (!strong && style.italic) {
        return None;
    }
    let intraword_sensitive = marker == "_";
    if intraword_sensitive && previous.is_some_and(char::is_alphanumeric) {
        return None;
    }

    let body = &rest[marker.len()..];
    let close = body.find(marker)?;
    let inner = &body[..close];
    if inner.is_empty()
        || inner.starts_with(char::is_whitespace)
        || inner.ends_with(char::is_whitespace)
    {
        return None;
    }
    let after = &body[close + marker.len()..];
    if intraword_sensitive && after.starts_with(char::is_alphanumeric) {
        return None;
    }

    let style = if strong {
        RunStyle { bold: true, ..style }
    } else {
        RunStyle {
            italic: true,
            ..style
        }
    };
    Some(Emphasis {
        inner,
        style,
        consumed: close + marker.len() * 2,
    })
}

fn push_run(runs: &mut Vec<Run>, text: String, style: RunStyle) {
    if text.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some(last) if last.bold == style.bold && last.italic == style.italic => {
            last.text.push_str(&text);
        }
        _ => runs.push(Run {
            text,
            bold: style.bold,
            italic: style.italic,
        }),
    }
}

fn text_runs(text: &str) -> Vec<Run> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Run::plain(text)]
    }
}

fn message_heading(message: &ChatMessage) -> String {
    match &message.timestamp {
        Some(timestamp) => format!("{} ({timestamp})", message.role.label()),
        None => message.role.label().to_string(),
    }
}

/// One role heading plus one paragraph per message, in input order.
pub fn format_chat(messages: &[ChatMessage]) -> Vec<Instruction> {
    messages
        .iter()
        .flat_map(|message| {
            [
                Instruction::heading(2, message_heading(message)),
                Instruction::Paragraph(text_runs(&message.text)),
            ]
        })
        .collect()
}

pub fn format_chat_as(messages: &[ChatMessage], style: ChatFormatStyle) -> Vec<Instruction> {
    if messages.is_empty() {
        return Vec::new();
    }
    match style {
        ChatFormatStyle::Conversation => format_chat(messages),
        ChatFormatStyle::Summary => format_chat_summary(messages),
        ChatFormatStyle::Report => format_chat_report(messages),
    }
}

fn format_chat_summary(messages: &[ChatMessage]) -> Vec<Instruction> {
    let by_role = |role: Role| {
        messages
            .iter()
            .filter(move |m| m.role == role)
            .map(|m| m.text.as_str())
    };

    let mut instructions = Vec::new();
    let queries: Vec<_> = by_role(Role::User).collect();
    if !queries.is_empty() {
        instructions.push(Instruction::heading(2, "User Queries"));
        instructions.extend(
            queries
                .into_iter()
                .map(|q| Instruction::NumberedItem(text_runs(q))),
        );
    }

    let responses: Vec<_> = by_role(Role::Assistant).map(excerpt).collect();
    if !responses.is_empty() {
        instructions.push(Instruction::heading(2, "Key Responses"));
        instructions.extend(
            responses
                .iter()
                .map(|r| Instruction::NumberedItem(text_runs(r))),
        );
    }
    instructions
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= SUMMARY_EXCERPT_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(SUMMARY_EXCERPT_CHARS).collect();
    format!("{head}...")
}

fn format_chat_report(messages: &[ChatMessage]) -> Vec<Instruction> {
    let mut instructions = vec![
        Instruction::heading(2, "Overview"),
        Instruction::Paragraph(vec![Run::plain(format!(
            "This report contains {} messages from a chat conversation.",
            messages.len()
        ))]),
        Instruction::heading(2, "Detailed Content"),
    ];
    for (i, message) in messages.iter().enumerate() {
        instructions.push(Instruction::heading(
            3,
            format!("Section {}: {}", i + 1, message.role.label()),
        ));
        instructions.push(Instruction::Paragraph(text_runs(&message.text)));
    }
    instructions
}
