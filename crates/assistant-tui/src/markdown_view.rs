//! Terminal rendering of assistant markdown.

use assistant_core::markdown::{self, Block, Inline};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Render assistant text as styled terminal lines.
pub fn to_lines(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for block in markdown::parse(text) {
        match block {
            Block::Heading { level, content } => {
                let style = match level {
                    1 => Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    2 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    _ => Style::default().add_modifier(Modifier::BOLD),
                };
                lines.push(Line::from(spans(&content, style)));
            }
            Block::Paragraph(rows) => {
                for row in rows {
                    lines.push(Line::from(spans(&row, Style::default())));
                }
            }
            Block::CodeBlock { language, code } => {
                if let Some(lang) = language {
                    lines.push(Line::from(Span::styled(
                        format!("  [{}]", lang),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                for code_line in code.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", code_line),
                        Style::default().fg(Color::Yellow),
                    )));
                }
            }
            Block::List(items) => {
                for item in items {
                    let mut row = vec![Span::styled("  • ", Style::default().fg(Color::DarkGray))];
                    row.extend(spans(&item, Style::default()));
                    lines.push(Line::from(row));
                }
            }
            Block::Blank => lines.push(Line::default()),
        }
    }

    lines
}

fn spans(inlines: &[Inline], base: Style) -> Vec<Span<'static>> {
    let mut out = Vec::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push(Span::styled(text.clone(), base)),
            Inline::Strong(inner) => out.extend(spans(inner, base.add_modifier(Modifier::BOLD))),
            Inline::Emphasis(inner) => {
                out.extend(spans(inner, base.add_modifier(Modifier::ITALIC)))
            }
            Inline::Code(code) => out.push(Span::styled(code.clone(), base.fg(Color::Yellow))),
            Inline::Link { label, url } => {
                let link_style = base.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
                out.extend(spans(label, link_style));
                if markdown::is_safe_url(url) {
                    out.push(Span::styled(
                        format!(" ({})", url),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_strong_span_is_bold() {
        let lines = to_lines("plain **bold** end");
        let bold = &lines[0].spans[1];
        assert_eq!(bold.content, "bold");
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(text_of(&lines[0]), "plain bold end");
    }

    #[test]
    fn test_list_items_get_bullets() {
        let lines = to_lines("* one\n* two");
        assert_eq!(lines.len(), 2);
        assert_eq!(text_of(&lines[1]), "  • two");
    }

    #[test]
    fn test_code_block_lines_are_indented() {
        let lines = to_lines("```bash\nros2 topic list\n```");
        assert_eq!(text_of(&lines[0]), "  [bash]");
        assert_eq!(text_of(&lines[1]), "  ros2 topic list");
    }

    #[test]
    fn test_link_shows_url() {
        let lines = to_lines("[docs](https://docs.ros.org)");
        assert_eq!(text_of(&lines[0]), "docs (https://docs.ros.org)");
    }
}
