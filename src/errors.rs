use thiserror::Error;

use crate::models::ConversationId;

/// Top-level error for the chat client. Display texts on the generation
/// variants are the exact messages surfaced in the session's `error` field.
#[derive(Debug, Error)]
pub enum ChatError {
    // ── Generation service errors ────────────────────────────────────────────
    #[error("Model '{model}' not found. Please ensure it's installed.")]
    ModelNotFound { model: String },

    #[error("Failed to connect to the generation service at {base_url}. Please ensure it's running.")]
    ServiceUnreachable { base_url: String },

    #[error("Request cancelled")]
    Cancelled,

    /// Best-effort title call failed. Logged, never shown to the user.
    #[error("Title generation failed: {reason}")]
    TitleGenerationFailed { reason: String },

    // ── Conversation errors ──────────────────────────────────────────────────
    #[error("Conversation '{id}' not found")]
    ConversationNotFound { id: ConversationId },
}

impl ChatError {
    /// Cancellation is a neutral outcome, not a failure; callers use this to
    /// pick log levels and rendering.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ChatError::ConversationNotFound { .. })
    }
}
