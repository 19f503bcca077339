//! AI feedback formatting
//!
//! The prediction service returns its feedback as loosely formatted text
//! (`**bold**`, `* bullets`, `1. numbered` lines). `format_feedback` turns
//! that into a small markup dialect (`<strong>`, `<br>`, `<li>`), and
//! `tokenize` splits the markup back into pieces the UI can style.
//!
//! The substitutions run in a fixed order and are not a parser: overlapping
//! patterns (a bold-wrapped numbered item, a bullet that starts with a
//! number) produce odd nesting. That is accepted.

use regex::Regex;
use std::sync::OnceLock;

const BREAK: &str = "<br>";

// Any character except a line terminator (`\r`, `\n`, U+2028, U+2029).
// The regex crate's `.` only stops at `\n`.
const LINE_CHAR: &str = r"[^\n\r\x{2028}\x{2029}]";

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"\*\*({}*?)\*\*", LINE_CHAR)).expect("valid bold pattern")
    })
}

// Runs on a single <br>-free segment and must reach its end.
fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"\* ({}*)$", LINE_CHAR)).expect("valid bullet pattern")
    })
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"([0-9]\.) ({}*)$", LINE_CHAR)).expect("valid numbered pattern")
    })
}

/// Convert feedback text into display markup.
///
/// Order matters: bold first (it must not cross lines), then newlines become
/// `<br>`, then bullets and numbered markers are wrapped up to the next
/// `<br>` or the end of the text. Anything else passes through untouched,
/// including raw `<` and `&`.
pub fn format_feedback(text: &str) -> String {
    let bolded = bold_re().replace_all(text, "<strong>${1}</strong>");
    let broken = bolded.replace('\n', BREAK);

    let bulleted = map_segments(&broken, |segment| {
        bullet_re().replace(segment, "<li>${1}</li>").into_owned()
    });

    map_segments(&bulleted, |segment| {
        numbered_re()
            .replace(segment, "<strong>${1} ${2}</strong>")
            .into_owned()
    })
}

/// Apply `f` to every `<br>`-delimited segment, keeping the delimiters.
fn map_segments(markup: &str, f: impl Fn(&str) -> String) -> String {
    markup
        .split(BREAK)
        .map(|segment| f(segment))
        .collect::<Vec<_>>()
        .join(BREAK)
}

/// A piece of display markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Break,
    StrongOpen,
    StrongClose,
    ItemOpen,
    ItemClose,
}

static TAGS: [(&str, Token); 5] = [
    ("<br>", Token::Break),
    ("<strong>", Token::StrongOpen),
    ("</strong>", Token::StrongClose),
    ("<li>", Token::ItemOpen),
    ("</li>", Token::ItemClose),
];

/// Split display markup into tokens. Only the tags `format_feedback` emits
/// are recognised; any other `<...>` stays in the text.
pub fn tokenize(markup: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = markup;

    while !rest.is_empty() {
        let tag = rest
            .starts_with('<')
            .then(|| TAGS.iter().find(|(tag, _)| rest.starts_with(tag)))
            .flatten();

        match tag {
            Some((tag, token)) => {
                if !text.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut text)));
                }
                tokens.push(token.clone());
                rest = &rest[tag.len()..];
            }
            None => {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    text.push(c);
                }
                rest = chars.as_str();
            }
        }
    }

    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    tokens
}
