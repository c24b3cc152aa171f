//! Assembly of the ordered message sequence sent upstream.

use async_trait::async_trait;

use suroo_domain::auth::Subject;
use suroo_domain::chat::ChatTurn;
use suroo_domain::Result;

/// Default bound on how many trailing history turns enter the prompt.
pub const HISTORY_WINDOW: usize = 4;

/// Collaborator supplying prior turns of a conversation. Chat storage
/// itself lives outside the pipeline.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// The last `limit` turns of the conversation, oldest first.
    async fn recent(&self, conversation_id: &str, limit: usize) -> Result<Vec<ChatTurn>>;
}

/// Builds a fresh turn list per request:
/// system prompt, optional profile turn, bounded history, current message.
pub struct PromptBuilder {
    system_prompt: String,
    history_window: usize,
}

impl PromptBuilder {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            history_window: HISTORY_WINDOW,
        }
    }

    pub fn with_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    /// The profile is deliberately a *user* turn, not a second system
    /// turn: a cheap personalization hint placed right after the system
    /// prompt, before any history.
    fn render_profile(subject: &Subject) -> String {
        format!(
            "Профиль:\n- username: {}\n- ID: {}\n",
            subject.first_name, subject.id
        )
    }

    pub fn build(
        &self,
        user_message: &str,
        subject: Option<&Subject>,
        history: &[ChatTurn],
    ) -> Vec<ChatTurn> {
        let mut turns = Vec::with_capacity(history.len().min(self.history_window) + 3);

        turns.push(ChatTurn::system(self.system_prompt.clone()));

        if let Some(subject) = subject {
            turns.push(ChatTurn::user(Self::render_profile(subject)));
        }

        let start = history.len().saturating_sub(self.history_window);
        turns.extend_from_slice(&history[start..]);

        turns.push(ChatTurn::user(user_message));
        turns
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
