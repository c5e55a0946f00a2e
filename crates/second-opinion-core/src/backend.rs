use serde::{Deserialize, Serialize};

/// One of the two language-model providers a message is fanned out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Claude,
    ChatGpt,
}

impl Backend {
    /// Every backend, in display order.
    pub const ALL: [Backend; 2] = [Backend::Claude, Backend::ChatGpt];

    /// Wire tag used by the dispatch gateway.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Claude => "claude",
            Backend::ChatGpt => "chatgpt",
        }
    }

    /// Parse a wire tag. Case and surrounding whitespace are ignored.
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Some(Backend::Claude),
            "chatgpt" => Some(Backend::ChatGpt),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Claude => "Claude",
            Backend::ChatGpt => "ChatGPT",
        }
    }

    /// The other backend. Used by the UI to flip between tabs.
    pub fn other(&self) -> Self {
        match self {
            Backend::Claude => Backend::ChatGpt,
            Backend::ChatGpt => Backend::Claude,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
