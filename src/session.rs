use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::GenerationBackend;
use crate::errors::ChatError;
use crate::models::{ConversationId, Message, Role};
use crate::store::SessionState;

/// Identifies one primary generation request. Tokens increase monotonically;
/// a resolution may only mutate state while its token is still the tracked
/// one, so superseded requests land as no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolutions delivered back to the owner's event loop.
#[derive(Debug)]
pub enum SessionEvent {
    GenerationFinished {
        token: RequestToken,
        conversation_id: ConversationId,
        result: Result<String, ChatError>,
    },
    TitleResolved {
        conversation_id: ConversationId,
        result: Result<String, ChatError>,
    },
}

struct InflightRequest {
    token: RequestToken,
    cancel: CancellationToken,
}

/// Owns the session state and drives every user action against it.
///
/// `send` spawns request tasks onto the ambient tokio runtime; their
/// resolutions come back as [`SessionEvent`]s which the owner feeds to
/// [`SessionController::apply`] from its event loop. State is only touched
/// between events, so there is no locking anywhere.
pub struct SessionController {
    state: SessionState,
    backend: Arc<dyn GenerationBackend>,
    events: UnboundedSender<SessionEvent>,
    default_model: String,
    next_token: u64,
    inflight: Option<InflightRequest>,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        default_model: impl Into<String>,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            state: SessionState::default(),
            backend,
            events,
            default_model: default_model.into(),
            next_token: 0,
            inflight: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn inflight_token(&self) -> Option<RequestToken> {
        self.inflight.as_ref().map(|r| r.token)
    }

    /// Open a fresh conversation on the default model and select it.
    /// No network call is made.
    pub fn new_chat(&mut self) -> ConversationId {
        let id = self.state.create_conversation(&self.default_model);
        self.state.current_conversation_id = Some(id);
        info!("opened conversation {id}");
        id
    }

    /// Select another conversation. An in-flight request keeps running; only
    /// a newer send supersedes it.
    pub fn switch_conversation(&mut self, id: ConversationId) -> Result<(), ChatError> {
        self.state.select_conversation(id)
    }

    /// Point the current conversation at another model. Ignored when no
    /// conversation is selected. Ids are not checked against the registry;
    /// a model missing from the service surfaces on the next send.
    pub fn change_model(&mut self, model_id: &str) {
        match self.state.current_conversation_id {
            Some(id) => {
                if let Err(e) = self.state.set_model(id, model_id) {
                    error!("failed to change model: {e}");
                }
            }
            None => debug!("model change ignored: no conversation selected"),
        }
    }

    /// Start a turn on the current conversation: append the user message,
    /// mark the session loading and fire the generation request. Returns the
    /// request's token, or `None` when no conversation is selected.
    pub fn send(&mut self, content: impl Into<String>) -> Option<RequestToken> {
        let content = content.into();
        let (conversation_id, model, first_message) = match self.state.current_conversation() {
            Some(c) => (c.id, c.model.clone(), c.messages.is_empty()),
            None => {
                debug!("send ignored: no conversation selected");
                return None;
            }
        };

        // ── Supersede any outstanding request ─────────────────────────────────
        if let Some(previous) = self.inflight.take() {
            debug!("cancelling request {} superseded by a newer send", previous.token);
            previous.cancel.cancel();
        }

        // ── Optimistic user message ───────────────────────────────────────────
        let user_message = Message::new(Role::User, content.clone());
        if let Err(e) = self.state.append_message(conversation_id, user_message) {
            error!("dropping send, conversation vanished: {e}");
            self.state.is_loading = false;
            return None;
        }
        self.state.is_loading = true;
        self.state.error = None;

        // ── Best-effort title for a first message ─────────────────────────────
        if first_message {
            self.spawn_title_request(conversation_id, model.clone(), content.clone());
        }

        // ── Primary generation request ────────────────────────────────────────
        let token = self.issue_token();
        let cancel = CancellationToken::new();
        self.inflight = Some(InflightRequest { token, cancel: cancel.clone() });

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.generate(&model, &content, &cancel).await;
            // a closed channel just means the session is shutting down
            let _ = events.send(SessionEvent::GenerationFinished {
                token,
                conversation_id,
                result,
            });
        });

        Some(token)
    }

    /// Fold a resolution into the state. Must be called from the same loop
    /// that issues user actions so transitions never interleave.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::GenerationFinished { token, conversation_id, result } => {
                match &self.inflight {
                    Some(inflight) if inflight.token == token => {}
                    _ => {
                        debug!("discarding stale resolution for request {token}");
                        return;
                    }
                }
                self.inflight = None;
                self.state.is_loading = false;

                match result {
                    Ok(text) => {
                        let reply = Message::new(Role::Assistant, text);
                        if let Err(e) = self.state.append_message(conversation_id, reply) {
                            error!("reply arrived for a vanished conversation: {e}");
                        }
                    }
                    Err(e) => {
                        if e.is_cancelled() {
                            info!("request {token} cancelled");
                        } else {
                            warn!("request {token} failed: {e}");
                        }
                        self.state.error = Some(e.to_string());
                    }
                }
            }
            SessionEvent::TitleResolved { conversation_id, result } => match result {
                Ok(title) => {
                    if let Err(e) = self.state.set_title(conversation_id, title) {
                        debug!("title arrived for a vanished conversation: {e}");
                    }
                }
                // best-effort: log and move on, the placeholder title stays
                Err(e) => warn!("{e}"),
            },
        }
    }

    fn spawn_title_request(&self, conversation_id: ConversationId, model: String, seed: String) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.generate_title(&model, &seed).await;
            let _ = events.send(SessionEvent::TitleResolved { conversation_id, result });
        });
    }

    fn issue_token(&mut self) -> RequestToken {
        self.next_token += 1;
        RequestToken(self.next_token)
    }
}
