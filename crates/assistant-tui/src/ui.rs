use assistant_core::widget::SUGGESTIONS;
use assistant_core::{ChatRole, MenuAction};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane};
use crate::markdown_view;
use crate::page::PageLine;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.widget.shell().is_open() {
        let [page_area, chat_area] = Layout::horizontal([
            Constraint::Percentage(58),
            Constraint::Percentage(42),
        ])
        .areas(body_area);
        render_page(app, frame, page_area);
        render_chat(app, frame, chat_area);
    } else {
        app.chat_area = None;
        render_page(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);

    if app.widget.shell().is_open() && app.widget.shell().is_menu_visible() {
        render_menu(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Course Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{} ", app.page.title),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.focus {
        FocusPane::Page => vec![
            Span::styled(" drag ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" chat ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        FocusPane::Chat if app.widget.shell().is_menu_visible() => vec![
            Span::styled(" ↑/↓ ", key_style),
            Span::styled(" choose ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" apply ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" back ", label_style),
        ],
        FocusPane::Chat => {
            let mut hints = vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" ^Y ", key_style),
                Span::styled(" copy ", label_style),
                Span::styled(" ^O ", key_style),
                Span::styled(" menu ", label_style),
            ];
            if app.widget.dispatcher().selection().is_some() {
                hints.push(Span::styled(" ^R ", key_style));
                hints.push(Span::styled(" drop selection ", label_style));
            }
            hints.push(Span::styled(" Esc ", key_style));
            hints.push(Span::styled(" page ", label_style));
            hints
        }
    };

    if let Some(status) = &app.status {
        hints.push(Span::styled(
            format!(" {} ", status),
            Style::default().fg(Color::Green),
        ));
    }

    // Floating toggle button
    let mode_style = Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD);
    let toggle = if app.widget.shell().is_open() { " c ✕ " } else { " c 💬 " };

    let [hints_area, toggle_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(toggle.chars().count() as u16 + 1),
    ])
    .areas(area);

    frame.render_widget(Paragraph::new(Line::from(hints)), hints_area);
    frame.render_widget(Paragraph::new(Span::styled(toggle, mode_style)), toggle_area);
}

fn render_page(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Page;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", app.page.title));
    let inner = block.inner(area);

    // Store area for mouse hit-testing
    app.page_area = Some(inner);
    app.page_height = inner.height;

    // Selection points refer to wrapped rows, so a re-wrap invalidates them
    if app.page.rewrap(inner.width as usize) {
        app.selection = None;
        app.dragging = false;
    }
    let max_scroll = (app.page.line_count() as u16).saturating_sub(inner.height);
    app.page_scroll = app.page_scroll.min(max_scroll);

    let start = app.page_scroll as usize;
    let lines: Vec<Line> = app
        .page
        .lines()
        .iter()
        .enumerate()
        .skip(start)
        .take(inner.height as usize)
        .map(|(idx, line)| page_row(app, idx, line))
        .collect();

    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn page_row(app: &App, idx: usize, line: &PageLine) -> Line<'static> {
    let base = if line.heading {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let highlighted = Style::default().bg(Color::Blue).fg(Color::White);

    let len = line.text.chars().count();
    let Some((from, to)) = app.selection.and_then(|sel| sel.columns_on(idx, len)) else {
        return Line::from(Span::styled(line.text.clone(), base));
    };

    let before: String = line.text.chars().take(from).collect();
    let selected: String = line.text.chars().skip(from).take(to - from).collect();
    let after: String = line.text.chars().skip(to).collect();
    Line::from(vec![
        Span::styled(before, base),
        Span::styled(selected, highlighted),
        Span::styled(after, base),
    ])
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let preview = app.widget.selection_preview();
    let preview_height = if preview.is_some() { 4 } else { 0 };

    let [messages_area, preview_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(preview_height),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas for mouse hit-testing and scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = messages_area.height.saturating_sub(2);
    app.chat_width = messages_area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", app.client.backend().display_name()))
        .title_bottom(Line::from(" ^O ⋮ ").right_aligned());

    let chat_text = if app.widget.conversation().is_empty() && !app.widget.is_loading() {
        welcome_text()
    } else {
        conversation_text(app)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, messages_area);

    if let Some(preview) = preview {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .title(" Using selected text as context (^R to remove) ");
        let text = Paragraph::new(format!("\"{}\"", preview))
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(text, preview_area);
    }

    render_input(app, frame, input_area);
}

fn welcome_text() -> Text<'static> {
    let mut lines = vec![
        Line::from("Hello! I'm your Physical AI & Humanoid Robotics assistant."),
        Line::default(),
        Line::from(Span::styled(
            "Ask me anything about the book content, or select text on the page to ask specific questions about it.",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
    ];
    for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!(" F{} ", i + 1),
                Style::default().bg(Color::DarkGray).fg(Color::White),
            ),
            Span::styled(format!(" {}", suggestion), Style::default().fg(Color::Cyan)),
        ]));
    }
    Text::from(lines)
}

fn conversation_text(app: &App) -> Text<'static> {
    let user_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let assistant_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let last_assistant = app.widget.last_assistant_index();

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (idx, msg) in app.widget.conversation().messages().iter().enumerate() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(format!("{}:", msg.role.label()), user_style)));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                let mut role = vec![Span::styled(format!("{}:", msg.role.label()), assistant_style)];
                if last_assistant == Some(idx) {
                    role.push(Span::styled("  [^Y copy]", Style::default().fg(Color::DarkGray)));
                }
                lines.push(Line::from(role));
                lines.extend(markdown_view::to_lines(&msg.content));

                if !msg.sources.is_empty() {
                    lines.push(Line::from(Span::styled(
                        "Sources:",
                        Style::default().add_modifier(Modifier::BOLD),
                    )));
                    for (i, source) in msg.sources.iter().enumerate() {
                        lines.push(Line::from(Span::styled(
                            format!("  • {}", source.display_label(i)),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
            }
        }
        lines.push(Line::default());
    }

    if app.widget.is_loading() {
        lines.push(Line::from(Span::styled(
            format!("{}:", ChatRole::Assistant.label()),
            assistant_style,
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat && !app.widget.shell().is_menu_visible();
    let border_color = if !app.widget.can_send() {
        Color::DarkGray
    } else if focused {
        Color::Yellow
    } else {
        Color::Gray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(if app.widget.is_loading() { " Waiting for answer… " } else { " Ask a question... " });

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.draft_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    // Get the visible slice of the input
    let visible_text: String = app
        .widget
        .draft()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    if focused {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_menu(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(chat_area) = app.chat_area else {
        return;
    };
    let actions = MenuAction::all();

    // Dropdown anchored to the top-right corner of the chat panel
    let popup_width = 18.min(chat_area.width);
    let popup_height = (actions.len() as u16 + 2).min(area.height);
    let popup_area = Rect::new(
        chat_area.x + chat_area.width.saturating_sub(popup_width),
        chat_area.y + 1,
        popup_width,
        popup_height,
    );

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let items: Vec<ListItem> = actions
        .iter()
        .map(|action| ListItem::new(format!(" {} ", action.label())))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.menu_state);
}
