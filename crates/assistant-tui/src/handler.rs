use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane};
use crate::page::{PageSelection, TextPoint};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }
    app.status = None;

    match app.focus {
        FocusPane::Page => handle_page_key(app, key),
        FocusPane::Chat if app.widget.shell().is_menu_visible() => handle_menu_key(app, key),
        FocusPane::Chat => handle_chat_key(app, key),
    }
}

fn handle_page_key(app: &mut App, key: KeyEvent) {
    let half_page = (app.page_height / 2).max(1);
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('j') | KeyCode::Down => app.scroll_page_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_page_up(1),
        KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_page_down(half_page),
        KeyCode::PageUp => app.scroll_page_up(half_page),
        KeyCode::Char('g') => app.page_scroll = 0,
        KeyCode::Char('G') => app.scroll_page_down(u16::MAX),

        // Floating toggle button
        KeyCode::Char('c') => app.toggle_widget(),
        KeyCode::Tab => {
            if app.widget.shell().is_open() {
                app.focus = FocusPane::Chat;
            }
        }
        KeyCode::Esc => app.selection = None,
        _ => {}
    }
}

fn handle_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.menu_nav(false),
        KeyCode::Down | KeyCode::Char('j') => app.menu_nav(true),
        KeyCode::Enter => app.activate_menu(),
        KeyCode::Esc => app.close_menu(),
        KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => app.close_menu(),
        _ => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('o') => app.toggle_menu(),
            KeyCode::Char('r') => app.widget.discard_selection(),
            KeyCode::Char('y') => app.copy_last_answer(),
            KeyCode::Char('l') => app.toggle_widget(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Tab => app.focus = FocusPane::Page,
        KeyCode::Enter => app.send_draft(),
        KeyCode::F(n @ 1..=3) => app.apply_suggestion(usize::from(n - 1)),
        KeyCode::PageDown => app.scroll_chat_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_chat_up(app.chat_height.max(1)),
        KeyCode::Backspace => {
            if app.draft_cursor > 0 {
                app.draft_cursor -= 1;
                let byte_pos = char_to_byte_index(app.widget.draft(), app.draft_cursor);
                app.widget.draft_mut().remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.widget.draft().chars().count();
            if app.draft_cursor < char_count {
                let byte_pos = char_to_byte_index(app.widget.draft(), app.draft_cursor);
                app.widget.draft_mut().remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.draft_cursor = app.draft_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.widget.draft().chars().count();
            app.draft_cursor = (app.draft_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.draft_cursor = 0;
        }
        KeyCode::End => {
            app.draft_cursor = app.widget.draft().chars().count();
        }
        KeyCode::Char(c) => {
            // The input stays editable while a request is pending
            let byte_pos = char_to_byte_index(app.widget.draft(), app.draft_cursor);
            app.widget.draft_mut().insert(byte_pos, c);
            app.draft_cursor += 1;
        }
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Map a screen cell inside the page pane onto the wrapped text.
fn page_point(app: &App, x: u16, y: u16) -> Option<TextPoint> {
    let area = app.page_area?;
    let x = x.clamp(area.x, (area.x + area.width).saturating_sub(1));
    let y = y.clamp(area.y, (area.y + area.height).saturating_sub(1));
    let point = TextPoint {
        line: usize::from(y - area.y) + usize::from(app.page_scroll),
        col: usize::from(x - area.x),
    };
    Some(app.page.clamp_point(point))
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    // Determine which area the mouse is in (position-based scrolling)
    let in_page = app.page_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if in_page {
                app.focus = FocusPane::Page;
                app.selection = page_point(app, x, y).map(PageSelection::at);
                app.dragging = app.selection.is_some();
            } else if in_chat {
                app.focus = FocusPane::Chat;
            }
        }
        MouseEventKind::Drag(MouseButton::Left) if app.dragging => {
            if let (Some(point), Some(selection)) = (page_point(app, x, y), app.selection.as_mut()) {
                selection.head = point;
            }
        }
        // Every release is reported; short or empty ones are ignored downstream
        MouseEventKind::Up(MouseButton::Left) if app.dragging => app.release_selection(),
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.scroll_chat_down(3);
            } else if in_page {
                app.scroll_page_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.scroll_chat_up(3);
            } else if in_page {
                app.scroll_page_up(3);
            }
        }
        _ => {}
    }
}

/// Put `text` on the system clipboard using whichever tool is installed.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let candidates: [(&str, &[&str]); 3] = [
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];

    for (program, args) in candidates {
        let Ok(mut child) = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            continue;
        };
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        if child.wait()?.success() {
            return Ok(());
        }
    }
    Err(anyhow!("no clipboard tool found (tried pbcopy, wl-copy, xclip)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        let s = "añb";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 9), s.len());
    }

    #[test]
    fn test_point_in_rect_excludes_far_edge() {
        let rect = Rect::new(2, 2, 4, 3);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 4, rect));
        assert!(!point_in_rect(6, 4, rect));
        assert!(!point_in_rect(1, 2, rect));
    }
}
