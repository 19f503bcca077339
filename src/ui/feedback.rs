//! Renders feedback markup as styled terminal lines

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::feedback::{tokenize, Token};

const BULLET: &str = "  • ";

/// Lay out display markup: `<br>` starts a new line, `<strong>` is bold in
/// the header color, `<li>` gets a bullet. Unbalanced tags are tolerated.
pub fn markup_lines(markup: &str, text: Style, strong: Style) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut bold_depth = 0usize;

    for token in tokenize(markup) {
        match token {
            Token::Text(content) => {
                let style = if bold_depth > 0 {
                    strong.add_modifier(Modifier::BOLD)
                } else {
                    text
                };
                spans.push(Span::styled(content, style));
            }
            Token::Break => lines.push(Line::from(std::mem::take(&mut spans))),
            Token::StrongOpen => bold_depth += 1,
            Token::StrongClose => bold_depth = bold_depth.saturating_sub(1),
            Token::ItemOpen => spans.push(Span::styled(BULLET, strong)),
            Token::ItemClose => {}
        }
    }

    if !spans.is_empty() || lines.is_empty() {
        lines.push(Line::from(spans));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_markup_lines() {
        let text = Style::default().fg(Color::White);
        let strong = Style::default().fg(Color::Magenta);
        let lines = markup_lines(
            "<strong>Bold</strong> text<br><li>item one</li><br><strong>1. Intro</strong>",
            text,
            strong,
        );

        assert_eq!(lines.len(), 3);
        assert_eq!(plain(&lines[0]), "Bold text");
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(lines[0].spans[1].style, text);
        assert_eq!(plain(&lines[1]), "  • item one");
        assert_eq!(plain(&lines[2]), "1. Intro");
    }

    #[test]
    fn test_unbalanced_tags() {
        let style = Style::default();
        let lines = markup_lines("<li><strong>1. Skills</li></strong> after", style, style);
        assert_eq!(lines.len(), 1);
        assert_eq!(plain(&lines[0]), "  • 1. Skills after");
        assert!(!lines[0].spans[2].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_empty_and_trailing_break() {
        let style = Style::default();
        assert_eq!(markup_lines("", style, style).len(), 1);
        assert_eq!(markup_lines("a<br>", style, style).len(), 1);
        assert_eq!(markup_lines("a<br><br>b", style, style).len(), 3);
    }
}
