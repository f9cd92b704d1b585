//! The mountable chat widget: shell, conversation and dispatcher together.

use std::time::Duration;

use crate::client::BackendClient;
use crate::dispatch::{self, Dispatcher, Outcome, Phase, PreparedRequest, Ticket};
use crate::selection::{SelectionHub, SelectionSubscription};
use crate::shell::{MenuAction, WidgetShell};
use crate::state::{ChatRole, Conversation};

/// Prompts offered while the conversation is empty.
pub const SUGGESTIONS: [&str; 3] = [
    "What is Physical AI?",
    "Explain ROS2 nodes",
    "How do I install Gazebo?",
];

/// Longest selection excerpt shown in the context preview.
const PREVIEW_CHARS: usize = 100;

pub struct ChatWidget {
    shell: WidgetShell,
    conversation: Conversation,
    dispatcher: Dispatcher,
    subscription: Option<SelectionSubscription>,
}

impl ChatWidget {
    pub fn new(selection_threshold: usize) -> Self {
        Self {
            shell: WidgetShell::new(),
            conversation: Conversation::new(),
            dispatcher: Dispatcher::new(selection_threshold),
            subscription: None,
        }
    }

    /// Create a widget listening to `hub` until it is unmounted or dropped.
    pub fn mount(hub: &SelectionHub, selection_threshold: usize) -> Self {
        let mut widget = Self::new(selection_threshold);
        widget.subscription = Some(hub.subscribe());
        widget
    }

    pub fn unmount(&mut self) {
        self.subscription = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn shell(&self) -> &WidgetShell {
        &self.shell
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn phase(&self) -> Phase {
        self.dispatcher.phase()
    }

    pub fn is_loading(&self) -> bool {
        self.dispatcher.is_loading()
    }

    pub fn draft(&self) -> &str {
        self.dispatcher.draft()
    }

    pub fn draft_mut(&mut self) -> &mut String {
        self.dispatcher.draft_mut()
    }

    pub fn can_send(&self) -> bool {
        self.dispatcher.can_send()
    }

    /// Drain pointer releases seen since the last call and start the
    /// automatic send for the last qualifying one.
    pub fn poll_selection(&mut self) -> Option<PreparedRequest> {
        let mut released = Vec::new();
        if let Some(subscription) = self.subscription.as_mut() {
            while let Some(text) = subscription.try_next() {
                released.push(text);
            }
        }
        for text in released {
            self.on_selection(&text);
        }
        self.take_auto_send()
    }

    /// Stage a selection; opens the widget when it qualifies.
    pub fn on_selection(&mut self, text: &str) -> bool {
        let staged = self.dispatcher.stage_selection(text);
        if staged {
            self.shell.open();
            tracing::info!(chars = text.trim().chars().count(), "selection staged");
        }
        staged
    }

    pub fn discard_selection(&mut self) {
        self.dispatcher.discard_selection();
    }

    pub fn take_auto_send(&mut self) -> Option<PreparedRequest> {
        self.dispatcher.take_auto_send(&mut self.conversation)
    }

    /// Manual send of the current draft (and staged selection).
    pub fn begin_send(&mut self) -> Option<PreparedRequest> {
        self.dispatcher.begin_send(&mut self.conversation, None, false)
    }

    pub fn begin_send_with(&mut self, override_text: Option<&str>, is_auto_send: bool) -> Option<PreparedRequest> {
        self.dispatcher
            .begin_send(&mut self.conversation, override_text, is_auto_send)
    }

    pub fn complete(&mut self, ticket: Ticket, outcome: Outcome) -> bool {
        self.dispatcher.complete(&mut self.conversation, ticket, outcome)
    }

    /// Begin, execute and complete one send. Returns `false` for a no-op.
    pub async fn send(
        &mut self,
        client: &BackendClient,
        override_text: Option<&str>,
        is_auto_send: bool,
        timeout: Duration,
    ) -> bool {
        let Some(request) = self.begin_send_with(override_text, is_auto_send) else {
            return false;
        };
        let outcome = dispatch::execute(client, &request, timeout).await;
        self.complete(request.ticket, outcome);
        true
    }

    pub fn toggle_open(&mut self) {
        self.shell.toggle_open();
    }

    pub fn toggle_menu(&mut self) {
        self.shell.toggle_menu();
    }

    pub fn hide_menu(&mut self) {
        self.shell.hide_menu();
    }

    pub fn close(&mut self) {
        self.shell.close();
    }

    pub fn clear_chat(&mut self) {
        self.conversation.clear();
        self.dispatcher.reset();
        tracing::info!("conversation cleared");
    }

    pub fn apply_menu_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::ClearChat => {
                self.clear_chat();
                self.shell.hide_menu();
            }
            MenuAction::Close => self.close(),
        }
    }

    /// Fill the draft with one of [`SUGGESTIONS`].
    pub fn apply_suggestion(&mut self, index: usize) -> bool {
        match SUGGESTIONS.get(index) {
            Some(text) if self.conversation.is_empty() => {
                self.dispatcher.set_draft(*text);
                true
            }
            _ => false,
        }
    }

    /// Content of an assistant message, for the copy affordance.
    pub fn copy_text(&self, index: usize) -> Option<&str> {
        self.conversation
            .get(index)
            .filter(|m| m.role == ChatRole::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn last_assistant_index(&self) -> Option<usize> {
        self.conversation
            .messages()
            .iter()
            .rposition(|m| m.role == ChatRole::Assistant)
    }

    /// Staged selection shortened for display.
    pub fn selection_preview(&self) -> Option<String> {
        let selection = self.dispatcher.selection()?;
        let mut preview: String = selection.chars().take(PREVIEW_CHARS).collect();
        if selection.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        Some(preview)
    }
}
