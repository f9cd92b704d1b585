//! Question dispatch state machine
//!
//! A send is split in two halves so the host can run the HTTP call on its own
//! task: [`Dispatcher::begin_send`] validates, appends the user turn and hands
//! back a [`PreparedRequest`]; [`Dispatcher::complete`] appends the single
//! assistant turn for that request. At most one request is in flight; sends
//! attempted meanwhile are dropped.
//!
//! ```text
//! Idle ──selection──▶ SelectionStaged ──send──▶ Sending ──ok──▶ DisplayedSuccess
//!   ▲                        │                     └──err──▶ DisplayedError
//!   └──────discard───────────┘
//! ```

use std::time::Duration;

use crate::client::BackendClient;
use crate::error::BackendError;
use crate::selection::qualifying_selection;
use crate::state::{ChatMessage, Conversation, Source};

/// Appended to manually typed questions before they go to the backend.
pub const DETAIL_SUFFIX: &str = " Please provide a detailed explanation.";
/// Question used for a manual send with an empty draft and a staged selection.
pub const DEFAULT_SELECTION_QUESTION: &str = "Explain this selected text";

/// Question sent automatically when a selection is staged.
pub fn auto_send_question(selection: &str) -> String {
    format!("Explain this section in detail: \"{}\"", selection)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    SelectionStaged,
    Sending,
    DisplayedSuccess,
    DisplayedError,
}

/// Identifies one dispatched request. Requests issued before a `clear` carry
/// an older epoch and their replies are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    id: u64,
    epoch: u64,
}

/// Everything a backend client needs to issue one request.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub ticket: Ticket,
    /// Question as sent to the backend (suffixed for manual sends)
    pub question: String,
    /// Question as shown in the conversation
    pub display_question: String,
    pub selection: Option<String>,
    /// Conversation including the new user turn, whose content is `question`
    pub history: Vec<ChatMessage>,
    pub session_id: Option<String>,
    pub is_auto_send: bool,
}

/// Successful backend answer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reply {
    pub content: String,
    pub sources: Vec<Source>,
    pub session_id: Option<String>,
}

pub type Outcome = Result<Reply, BackendError>;

#[derive(Debug)]
pub struct Dispatcher {
    draft: String,
    selection: Option<String>,
    auto_send_pending: bool,
    phase: Phase,
    in_flight: Option<Ticket>,
    next_id: u64,
    epoch: u64,
    selection_threshold: usize,
}

impl Dispatcher {
    pub fn new(selection_threshold: usize) -> Self {
        Self {
            draft: String::new(),
            selection: None,
            auto_send_pending: false,
            phase: Phase::Idle,
            in_flight: None,
            next_id: 0,
            epoch: 0,
            selection_threshold,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn auto_send_pending(&self) -> bool {
        self.auto_send_pending
    }

    /// Whether a manual send would do anything right now.
    pub fn can_send(&self) -> bool {
        !self.is_loading() && (!self.draft.trim().is_empty() || self.selection.is_some())
    }

    /// Stage a pointer-release selection. Returns `true` when it qualified and
    /// an automatic send is now pending. While a request is in flight the
    /// selection is dropped and the widget stays as it is.
    pub fn stage_selection(&mut self, raw: &str) -> bool {
        if self.is_loading() {
            tracing::debug!("selection ignored while a request is in flight");
            return false;
        }
        let Some(text) = qualifying_selection(raw, self.selection_threshold) else {
            return false;
        };

        self.selection = Some(text.to_string());
        self.auto_send_pending = true;
        self.phase = Phase::SelectionStaged;
        true
    }

    /// Drop the staged selection without sending it.
    pub fn discard_selection(&mut self) {
        self.selection = None;
        self.auto_send_pending = false;
        if self.phase == Phase::SelectionStaged {
            self.phase = Phase::Idle;
        }
    }

    /// Start the pending automatic send, if any.
    pub fn take_auto_send(&mut self, conversation: &mut Conversation) -> Option<PreparedRequest> {
        if !std::mem::take(&mut self.auto_send_pending) {
            return None;
        }
        let question = auto_send_question(self.selection.as_deref()?);
        self.begin_send(conversation, Some(&question), true)
    }

    /// Validate and start a send. Returns `None` for the silent no-op cases:
    /// already loading, or nothing to ask.
    pub fn begin_send(
        &mut self,
        conversation: &mut Conversation,
        override_text: Option<&str>,
        is_auto_send: bool,
    ) -> Option<PreparedRequest> {
        if self.is_loading() {
            tracing::debug!("send blocked: already loading");
            return None;
        }

        let uses_draft = override_text.is_none();
        let mut question = override_text.unwrap_or(&self.draft).trim().to_string();
        if question.is_empty() {
            if self.selection.is_none() {
                tracing::debug!("send ignored: no question and no selection");
                return None;
            }
            question = DEFAULT_SELECTION_QUESTION.to_string();
        }

        let backend_question = if is_auto_send {
            question.clone()
        } else {
            format!("{}{}", question, DETAIL_SUFFIX)
        };

        conversation.push(ChatMessage::user(question.clone()));
        if uses_draft {
            self.draft.clear();
        }

        let mut history = conversation.messages().to_vec();
        if let Some(last) = history.last_mut() {
            last.content = backend_question.clone();
        }

        let ticket = Ticket {
            id: self.next_id,
            epoch: self.epoch,
        };
        self.next_id += 1;
        self.in_flight = Some(ticket);
        self.auto_send_pending = false;
        self.phase = Phase::Sending;

        tracing::debug!(
            ticket = ticket.id,
            auto = is_auto_send,
            has_selection = self.selection.is_some(),
            "dispatching question"
        );

        Some(PreparedRequest {
            ticket,
            question: backend_question,
            display_question: question,
            selection: self.selection.clone(),
            history,
            session_id: conversation.session_id().map(str::to_string),
            is_auto_send,
        })
    }

    /// Record the outcome of the request identified by `ticket`. Returns
    /// `true` if an assistant message was appended.
    pub fn complete(
        &mut self,
        conversation: &mut Conversation,
        ticket: Ticket,
        outcome: Outcome,
    ) -> bool {
        if self.in_flight != Some(ticket) {
            tracing::warn!(ticket = ticket.id, "completion for a request that is not in flight");
            return false;
        }
        self.in_flight = None;
        self.selection = None;

        if ticket.epoch != self.epoch {
            tracing::debug!(ticket = ticket.id, "discarding reply for a cleared conversation");
            self.phase = Phase::Idle;
            return false;
        }

        match outcome {
            Ok(reply) => {
                conversation.set_session_id(reply.session_id);
                conversation.push(ChatMessage::assistant(reply.content, reply.sources));
                self.phase = Phase::DisplayedSuccess;
            }
            Err(err) => {
                tracing::warn!(ticket = ticket.id, error = %err, "backend request failed");
                conversation.push(ChatMessage::assistant(err.to_string(), Vec::new()));
                self.phase = Phase::DisplayedError;
            }
        }
        true
    }

    /// Forget pending state after the conversation was cleared. A request
    /// still in flight keeps the widget loading until it settles.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.selection = None;
        self.auto_send_pending = false;
        if !self.is_loading() {
            self.phase = Phase::Idle;
        }
    }
}

/// Run one prepared request against `client`, bounded by `timeout`.
pub async fn execute(client: &BackendClient, request: &PreparedRequest, timeout: Duration) -> Outcome {
    match tokio::time::timeout(timeout, client.ask(request)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(BackendError::Timeout(timeout)),
    }
}
