//! UI-agnostic conversation state
//!
//! These types are shared by every host that mounts the widget and don't
//! depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// Longest excerpt shown when a source only carries page content.
const SOURCE_EXCERPT_CHARS: usize = 100;

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            sources,
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "Assistant",
        }
    }
}

/// A citation attached to an assistant reply. Display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Label(String),
    Record {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page_content: Option<String>,
    },
}

impl Source {
    /// Text shown for this source; `position` is its zero-based index in the
    /// reply's source list.
    pub fn display_label(&self, position: usize) -> String {
        match self {
            Source::Label(label) => label.clone(),
            Source::Record { file_path, page_content } => {
                if let Some(path) = file_path.as_deref().filter(|p| !p.is_empty()) {
                    return path.to_string();
                }
                if let Some(content) = page_content.as_deref().filter(|c| !c.is_empty()) {
                    return content.chars().take(SOURCE_EXCERPT_CHARS).collect();
                }
                format!("Source {}", position + 1)
            }
        }
    }
}

/// Ordered, append-only log of conversation turns plus the backend session id.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    session_id: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Drop every message and forget the session id.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.session_id = None;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn set_session_id(&mut self, session_id: Option<String>) {
        if session_id.is_some() {
            self.session_id = session_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_label_prefers_plain_text() {
        let source = Source::Label("chapter-2.md".to_string());
        assert_eq!(source.display_label(0), "chapter-2.md");
    }

    #[test]
    fn test_source_label_falls_back_through_record_fields() {
        let with_path = Source::Record {
            file_path: Some("docs/ros2/nodes.md".to_string()),
            page_content: Some("Nodes are processes".to_string()),
        };
        assert_eq!(with_path.display_label(0), "docs/ros2/nodes.md");

        let excerpt = "x".repeat(150);
        let with_content = Source::Record {
            file_path: None,
            page_content: Some(excerpt),
        };
        assert_eq!(with_content.display_label(0).chars().count(), 100);

        let empty = Source::Record {
            file_path: None,
            page_content: None,
        };
        assert_eq!(empty.display_label(2), "Source 3");
    }

    #[test]
    fn test_sources_deserialize_mixed_shapes() {
        let sources: Vec<Source> =
            serde_json::from_str(r#"["intro.md", {"file_path": "gazebo.md"}, {}]"#).unwrap();
        assert_eq!(sources[0], Source::Label("intro.md".to_string()));
        assert_eq!(sources[1].display_label(1), "gazebo.md");
        assert_eq!(sources[2].display_label(2), "Source 3");
    }

    #[test]
    fn test_clear_drops_messages_and_session() {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::user("hi"));
        conversation.set_session_id(Some("abc".to_string()));

        conversation.clear();

        assert!(conversation.is_empty());
        assert_eq!(conversation.session_id(), None);
    }

    #[test]
    fn test_missing_session_id_keeps_existing_one() {
        let mut conversation = Conversation::new();
        conversation.set_session_id(Some("abc".to_string()));
        conversation.set_session_id(None);
        assert_eq!(conversation.session_id(), Some("abc"));
    }
}
