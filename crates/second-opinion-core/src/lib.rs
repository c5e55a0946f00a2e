//! Second Opinion core: send one message to Claude and ChatGPT at the same
//! time and collect both answers into one conversation.
//!
//! - [`ai`] wraps each provider behind the [`ai::BackendAdapter`] trait.
//! - [`gateway`] routes `{message, target}` to an adapter, in-process or over HTTP.
//! - [`orchestrator`] fans each submission out and folds the outcomes into the log.
//! - [`state`] holds the append-only conversation log.

pub mod ai;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod state;

// Re-export main types for convenience
pub use ai::{BackendAdapter, ClaudeClient, OpenAIClient};
pub use backend::Backend;
pub use config::Config;
pub use error::{DispatchError, ProviderError, SubmitError};
pub use gateway::{Dispatch, Gateway, GatewayClient};
pub use orchestrator::{FailurePolicy, Orchestrator, Progress, Snapshot, SubmissionState, PLACEHOLDER_TEXT};
pub use state::{ChatMessage, ChatRole, ConversationLog, MessageId};
