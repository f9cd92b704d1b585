use std::time::Duration;

use assistant_core::dispatch::{self, Outcome};
use assistant_core::{
    BackendClient, BackendError, ChatRole, ChatWidget, Config, MenuAction, PreparedRequest,
    SelectionHub, Ticket,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::markdown_view;
use crate::page::{Page, PageSelection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Page,
    Chat,
}

/// The request currently running on a background task.
pub struct InFlight {
    pub ticket: Ticket,
    pub handle: JoinHandle<Outcome>,
}

pub struct App {
    pub should_quit: bool,
    pub focus: FocusPane,

    // Host page state
    pub page: Page,
    pub page_scroll: u16,
    pub page_height: u16,
    pub selection: Option<PageSelection>,
    pub dragging: bool,
    pub hub: SelectionHub,

    // Widget state
    pub widget: ChatWidget,
    pub client: BackendClient,
    pub timeout: Duration,
    pub query_task: Option<InFlight>,
    pub draft_cursor: usize, // cursor position in the draft, in chars
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub menu_state: ListState,
    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub page_area: Option<Rect>,
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(config: &Config, client: BackendClient, page: Page) -> Self {
        let hub = SelectionHub::new();
        let widget = ChatWidget::mount(&hub, config.selection_threshold());

        Self {
            should_quit: false,
            focus: FocusPane::Page,

            page,
            page_scroll: 0,
            page_height: 0,
            selection: None,
            dragging: false,
            hub,

            widget,
            client,
            timeout: config.request_timeout(),
            query_task: None,
            draft_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            menu_state: ListState::default(),
            status: None,

            animation_frame: 0,

            page_area: None,
            chat_area: None,
        }
    }

    /// Run `request` on a background task; its outcome is picked up by
    /// [`App::poll_task`].
    pub fn dispatch(&mut self, request: PreparedRequest) {
        let client = self.client.clone();
        let timeout = self.timeout;
        let ticket = request.ticket;
        let handle = tokio::spawn(async move { dispatch::execute(&client, &request, timeout).await });
        self.query_task = Some(InFlight { ticket, handle });
        self.scroll_chat_to_bottom();
    }

    /// Forward pointer-release selections to the widget and start any
    /// automatic send they trigger.
    pub fn poll_selection(&mut self) {
        if let Some(request) = self.widget.poll_selection() {
            self.focus = FocusPane::Chat;
            self.dispatch(request);
        }
    }

    /// Collect the outcome of a finished request, if there is one.
    pub async fn poll_task(&mut self) {
        let finished = self
            .query_task
            .as_ref()
            .is_some_and(|task| task.handle.is_finished());
        if !finished {
            return;
        }
        let Some(task) = self.query_task.take() else {
            return;
        };

        let outcome = match task.handle.await {
            Ok(outcome) => outcome,
            Err(err) => Err(BackendError::Transport(err.to_string())),
        };
        self.widget.complete(task.ticket, outcome);
        self.scroll_chat_to_bottom();
    }

    pub fn send_draft(&mut self) {
        if let Some(request) = self.widget.begin_send() {
            self.draft_cursor = 0;
            self.dispatch(request);
        }
    }

    /// Pointer released over the page: publish whatever is selected.
    pub fn release_selection(&mut self) {
        self.dragging = false;
        let text = self
            .selection
            .map(|sel| self.page.selected_text(&sel))
            .unwrap_or_default();
        self.hub.pointer_released(&text);
    }

    pub fn toggle_widget(&mut self) {
        self.widget.toggle_open();
        self.focus = if self.widget.shell().is_open() {
            FocusPane::Chat
        } else {
            FocusPane::Page
        };
    }

    pub fn toggle_menu(&mut self) {
        self.widget.toggle_menu();
        self.menu_state
            .select(self.widget.shell().is_menu_visible().then_some(0));
    }

    pub fn menu_nav(&mut self, down: bool) {
        let len = MenuAction::all().len();
        let i = self.menu_state.selected().unwrap_or(0);
        let next = if down { (i + 1).min(len - 1) } else { i.saturating_sub(1) };
        self.menu_state.select(Some(next));
    }

    pub fn activate_menu(&mut self) {
        let actions = MenuAction::all();
        if let Some(action) = self.menu_state.selected().and_then(|i| actions.get(i)) {
            self.widget.apply_menu_action(*action);
            if *action == MenuAction::ClearChat {
                // An in-flight request still settles through poll_task and
                // is discarded there
                self.chat_scroll = 0;
            }
        }
        self.close_menu();
        if !self.widget.shell().is_open() {
            self.focus = FocusPane::Page;
        }
    }

    pub fn close_menu(&mut self) {
        self.widget.hide_menu();
        self.menu_state.select(None);
    }

    pub fn apply_suggestion(&mut self, index: usize) {
        if self.widget.apply_suggestion(index) {
            self.draft_cursor = self.widget.draft().chars().count();
        }
    }

    pub fn copy_last_answer(&mut self) {
        let Some(text) = self
            .widget
            .last_assistant_index()
            .and_then(|i| self.widget.copy_text(i))
        else {
            self.status = Some("Nothing to copy yet".to_string());
            return;
        };
        self.status = Some(match crate::handler::copy_to_clipboard(text) {
            Ok(()) => "Copied answer to clipboard".to_string(),
            Err(err) => format!("Copy failed: {}", err),
        });
    }

    pub fn tick_animation(&mut self) {
        if self.widget.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Page scrolling
    fn max_page_scroll(&self) -> u16 {
        (self.page.line_count() as u16).saturating_sub(self.page_height)
    }

    pub fn scroll_page_down(&mut self, rows: u16) {
        self.page_scroll = self.page_scroll.saturating_add(rows).min(self.max_page_scroll());
    }

    pub fn scroll_page_up(&mut self, rows: u16) {
        self.page_scroll = self.page_scroll.saturating_sub(rows);
    }

    pub fn scroll_chat_down(&mut self, rows: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(rows);
    }

    pub fn scroll_chat_up(&mut self, rows: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(rows);
    }

    /// Rows the chat panel needs at `wrap_width`, counted from the same
    /// lines `ui::render` draws.
    pub fn chat_line_count(&self, wrap_width: usize) -> usize {
        let wrap_width = wrap_width.max(1);
        let rows = |chars: usize| chars.div_ceil(wrap_width).max(1);

        let mut total: usize = 0;
        for msg in self.widget.conversation().messages() {
            total = total.saturating_add(1); // Role line
            match msg.role {
                ChatRole::User => {
                    for line in msg.content.lines() {
                        total = total.saturating_add(rows(line.chars().count()));
                    }
                }
                ChatRole::Assistant => {
                    for line in markdown_view::to_lines(&msg.content) {
                        total = total.saturating_add(rows(line.width()));
                    }
                    if !msg.sources.is_empty() {
                        total = total.saturating_add(1 + msg.sources.len());
                    }
                }
            }
            total = total.saturating_add(1); // Blank line after message
        }
        if self.widget.is_loading() {
            total = total.saturating_add(2);
        }
        total
    }

    /// Scroll chat to bottom so the newest turn (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            40
        };
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        let total_lines = u16::try_from(self.chat_line_count(wrap_width)).unwrap_or(u16::MAX);
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::TextPoint;
    use assistant_core::Phase;

    fn test_app() -> App {
        let config = Config {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..Config::default()
        };
        let client = BackendClient::from_config(&config).unwrap();
        let page = Page::from_text(
            "test",
            "Actuators convert stored energy into motion.\nok".to_string(),
        );
        App::new(&config, client, page)
    }

    fn select(app: &mut App, from: usize, to: usize) {
        app.selection = Some(PageSelection {
            anchor: TextPoint { line: 0, col: from },
            head: TextPoint { line: 0, col: to },
        });
        app.dragging = true;
        app.release_selection();
    }

    async fn settle(app: &mut App) {
        for _ in 0..100 {
            app.poll_task().await;
            if app.query_task.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("request did not settle");
    }

    #[tokio::test]
    async fn test_short_selection_does_nothing() {
        let mut app = test_app();
        select(&mut app, 0, 3); // "Actu"
        app.poll_selection();
        assert!(!app.widget.shell().is_open());
        assert!(app.query_task.is_none());
    }

    #[tokio::test]
    async fn test_selection_opens_widget_and_sends() {
        let mut app = test_app();
        select(&mut app, 0, 8); // "Actuators"
        app.poll_selection();

        assert!(app.widget.shell().is_open());
        assert_eq!(app.focus, FocusPane::Chat);
        assert!(app.widget.is_loading());
        assert_eq!(
            app.widget.conversation().messages()[0].content,
            "Explain this section in detail: \"Actuators\""
        );

        settle(&mut app).await;
        let reply = app.widget.conversation().last().unwrap();
        assert_eq!(reply.role, ChatRole::Assistant);
        assert!(reply.content.starts_with("Error: "));
        assert_eq!(app.widget.phase(), Phase::DisplayedError);
    }

    #[tokio::test]
    async fn test_clear_from_menu_discards_late_reply() {
        let mut app = test_app();
        app.widget.draft_mut().push_str("What is ROS 2?");
        app.toggle_widget();
        app.send_draft();
        assert!(app.query_task.is_some());

        app.toggle_menu();
        assert_eq!(app.menu_state.selected(), Some(0));
        app.activate_menu();
        assert!(!app.widget.shell().is_menu_visible());
        assert!(app.widget.conversation().is_empty());

        settle(&mut app).await;
        assert!(app.widget.conversation().is_empty());
        assert!(!app.widget.is_loading());
    }

    #[test]
    fn test_menu_nav_stays_in_bounds() {
        let mut app = test_app();
        app.toggle_widget();
        app.toggle_menu();
        app.menu_nav(false);
        assert_eq!(app.menu_state.selected(), Some(0));
        app.menu_nav(true);
        app.menu_nav(true);
        assert_eq!(app.menu_state.selected(), Some(MenuAction::all().len() - 1));
    }

    #[test]
    fn test_suggestion_moves_cursor_to_end() {
        let mut app = test_app();
        app.apply_suggestion(1);
        assert_eq!(app.widget.draft(), "Explain ROS2 nodes");
        assert_eq!(app.draft_cursor, "Explain ROS2 nodes".chars().count());
    }

    #[test]
    fn test_chat_line_count_follows_rendered_markdown() {
        let mut app = test_app();
        app.widget.draft_mut().push_str("Show me");
        let request = app.widget.begin_send().unwrap();
        let answer = "```bash\nros2 topic list\n```\n\nDone";
        app.widget.complete(
            request.ticket,
            Ok(assistant_core::Reply {
                content: answer.to_string(),
                ..Default::default()
            }),
        );

        // user: role + 1 row + blank; assistant: role + rendered rows + blank
        let rendered = markdown_view::to_lines(answer).len();
        assert_eq!(rendered, 4);
        assert_eq!(app.chat_line_count(80), 3 + 1 + rendered + 1);
    }

    #[test]
    fn test_scroll_to_bottom_saturates_on_long_history() {
        let mut app = test_app();
        let long = "x".repeat(200_000);
        let request = app.widget.begin_send_with(Some("q"), false).unwrap();
        app.widget.complete(
            request.ticket,
            Ok(assistant_core::Reply {
                content: long,
                ..Default::default()
            }),
        );
        app.chat_width = 1;
        app.chat_height = 10;
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 10);
    }
}
