use chrono::Utc;

use crate::errors::ChatError;
use crate::models::{Conversation, ConversationId, Message};

/// In-memory session state: every conversation (in creation order), the
/// selected one, and the flags the driver renders from. Nothing here is
/// persisted; the process owns the only copy.
///
/// Transitions are total: on error the state is left exactly as it was.
/// `current_conversation_id`, when set, always refers to an existing entry in
/// `conversations`.
#[derive(Debug, Default)]
pub struct SessionState {
    pub conversations: Vec<Conversation>,
    pub current_conversation_id: Option<ConversationId>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    /// Create a conversation with an empty history and the placeholder title.
    /// Does not select it; that is the caller's decision.
    pub fn create_conversation(&mut self, model: impl Into<String>) -> ConversationId {
        let id = self.next_conversation_id();
        self.conversations.push(Conversation::new(id, model));
        id
    }

    /// Append a message to the conversation, refreshing its `updated_at`.
    pub fn append_message(
        &mut self,
        id: ConversationId,
        message: Message,
    ) -> Result<(), ChatError> {
        let conversation = self.conversation_mut(id)?;
        conversation.messages.push(message);
        conversation.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the conversation's model. History and title are untouched.
    pub fn set_model(&mut self, id: ConversationId, model: &str) -> Result<(), ChatError> {
        let conversation = self.conversation_mut(id)?;
        conversation.model = model.to_string();
        Ok(())
    }

    /// Replace the conversation's title. The lookup is by id, so a title
    /// landing after the user moved on is still applied.
    pub fn set_title(
        &mut self,
        id: ConversationId,
        title: impl Into<String>,
    ) -> Result<(), ChatError> {
        let conversation = self.conversation_mut(id)?;
        conversation.title = title.into();
        Ok(())
    }

    pub fn select_conversation(&mut self, id: ConversationId) -> Result<(), ChatError> {
        if self.conversation(id).is_none() {
            return Err(ChatError::ConversationNotFound { id });
        }
        self.current_conversation_id = Some(id);
        Ok(())
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current_conversation_id.and_then(|id| self.conversation(id))
    }

    fn conversation_mut(&mut self, id: ConversationId) -> Result<&mut Conversation, ChatError> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ChatError::ConversationNotFound { id })
    }

    /// Ids come from the wall clock in millis; when several conversations are
    /// created inside one millisecond, bump past the newest existing id so
    /// ids stay unique and creation-ordered.
    fn next_conversation_id(&self) -> ConversationId {
        let candidate = ConversationId::from_millis(Utc::now().timestamp_millis() as u64);
        match self.conversations.iter().map(|c| c.id).max() {
            Some(newest) if candidate <= newest => newest.next(),
            _ => candidate,
        }
    }
}
