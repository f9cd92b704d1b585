use serde::{Deserialize, Serialize};

/// Which backend contract the widget talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `POST /api/ask` and `POST /api/ask-selection`
    #[default]
    Ask,
    /// `POST /api/chat` with full history and a server-side session id
    Chat,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Ask => "ask",
            Backend::Chat => "chat",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ask" | "ask-selection" => Some(Backend::Ask),
            "chat" | "session" => Some(Backend::Chat),
            _ => None,
        }
    }

    pub fn all() -> Vec<Backend> {
        vec![Backend::Ask, Backend::Chat]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Ask => "Ask (selection-aware)",
            Backend::Chat => "Chat (session)",
        }
    }

    /// Selections must be strictly longer than this many characters to
    /// trigger an automatic question.
    pub fn default_selection_threshold(&self) -> usize {
        match self {
            Backend::Ask => 5,
            Backend::Chat => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_aliases() {
        assert_eq!(Backend::from_str("ASK"), Some(Backend::Ask));
        assert_eq!(Backend::from_str(" session "), Some(Backend::Chat));
        assert_eq!(Backend::from_str("grpc"), None);
    }

    #[test]
    fn test_round_trips_through_as_str() {
        for backend in Backend::all() {
            assert_eq!(Backend::from_str(backend.as_str()), Some(backend));
        }
    }
}
