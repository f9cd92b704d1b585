pub mod backend;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod markdown;
pub mod selection;
pub mod shell;
pub mod state;
pub mod widget;

// Re-export main types for convenience
pub use backend::Backend;
pub use client::{AskClient, BackendClient, ChatClient};
pub use config::Config;
pub use dispatch::{Dispatcher, Outcome, Phase, PreparedRequest, Reply, Ticket};
pub use error::BackendError;
pub use markdown::{render_html, Block, Inline};
pub use selection::{SelectionHub, SelectionSubscription};
pub use shell::{MenuAction, WidgetShell};
pub use state::{ChatMessage, ChatRole, Conversation, Source};
pub use widget::ChatWidget;
