//! Agent turn: wrap the user's text in the persona prompt, call the completion backend, and
//! substitute the fallback reply when the call fails.

use crate::config::CompletionConfig;
use crate::llm::CompletionBackend;

/// Persona used when `completion.systemPrompt` is not configured.
pub const DEFAULT_PERSONA: &str = "\
You are a helpful and witty chatbot in a private friends' group on Facebook Messenger.
Your name is Gemini.
Your location is Pune, Maharashtra, India.
Be friendly, conversational, use emojis, and keep your responses concise.
";

/// Reply sent when the completion backend fails.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Sorry, my AI brain is taking a little nap. Try again in a moment.";

/// Result of one agent turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentReply {
    /// Text generated by the backend.
    Generated(String),
    /// The backend failed; carries the configured fallback reply.
    Fallback(String),
}

impl AgentReply {
    /// Text to deliver to the user.
    pub fn text(&self) -> &str {
        match self {
            AgentReply::Generated(t) => t,
            AgentReply::Fallback(t) => t,
        }
    }
}

/// Persona and fallback text for agent turns.
#[derive(Debug, Clone)]
pub struct Persona {
    system_prompt: String,
    fallback_reply: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_PERSONA.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }
}

impl Persona {
    pub fn from_config(config: &CompletionConfig) -> Self {
        let defaults = Self::default();
        Self {
            system_prompt: config
                .system_prompt
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.system_prompt),
            fallback_reply: config
                .fallback_reply
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.fallback_reply),
        }
    }

    /// Full prompt for `message`: today's local date, the persona, then the friend's message.
    pub fn build_prompt(&self, message: &str) -> String {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        self.build_prompt_for_date(&today, message)
    }

    fn build_prompt_for_date(&self, today: &str, message: &str) -> String {
        let mut out = String::new();
        out.push_str("Today's date: ");
        out.push_str(today);
        out.push('\n');
        out.push_str(self.system_prompt.trim_end());
        out.push_str("\n\nFriend's message: ");
        out.push_str(message);
        out
    }
}

/// Run one agent turn. Never fails: backend errors become `AgentReply::Fallback`.
pub async fn run_turn(
    backend: &dyn CompletionBackend,
    persona: &Persona,
    message: &str,
) -> AgentReply {
    let prompt = persona.build_prompt(message);
    match backend.complete(&prompt).await {
        Ok(text) => {
            log::info!("agent: received response from {}", backend.name());
            AgentReply::Generated(text)
        }
        Err(e) => {
            log::error!("agent: error calling {}: {}", backend.name(), e);
            AgentReply::Fallback(persona.fallback_reply.clone())
        }
    }
}
