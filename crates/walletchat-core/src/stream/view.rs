use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::log::MessageLog;
use crate::config::DEFAULT_NOTICE_TTL_SECS;
use crate::error::{ChatError, Result};
use crate::protocol::{ChatMessage, Conversation};

/// A transient, auto-expiring error shown after a failed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
    id: u64,
}

#[derive(Default)]
struct ViewState {
    /// Bumped on every conversation change; work from an older epoch is dead.
    epoch: u64,
    log: MessageLog,
    loading: bool,
    history_error: Option<String>,
    stream_error: Option<String>,
    notice: Option<Notice>,
    next_notice_id: u64,
    draft: String,
}

struct Shared {
    state: Mutex<ViewState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Runs `f` only while `epoch` is current and `token` is live.
    fn apply(&self, epoch: u64, token: &CancellationToken, f: impl FnOnce(&mut ViewState)) -> bool {
        let mut state = self.lock();
        if token.is_cancelled() || state.epoch != epoch {
            return false;
        }
        f(&mut state);
        drop(state);
        self.bump();
        true
    }
}

struct ActiveConversation {
    conversation: Arc<dyn Conversation>,
    token: CancellationToken,
}

/// Live, deduplicated message view of one conversation at a time.
///
/// Setting a conversation loads its history and then keeps one subscription
/// open, merging arrivals by identifier. Switching conversations or dropping
/// the view cancels the subscription; anything it still delivers afterwards
/// is discarded.
///
/// Background work is spawned on the current tokio runtime.
pub struct ConversationView {
    shared: Arc<Shared>,
    active: Option<ActiveConversation>,
    notice_ttl: Duration,
}

impl ConversationView {
    pub fn new(notice_ttl: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ViewState::default()),
                revision,
            }),
            active: None,
            notice_ttl,
        }
    }

    /// Switches the view to `conversation` (or to none).
    ///
    /// The previous subscription is cancelled and the visible sequence
    /// cleared before this returns. Passing the conversation that is already
    /// active does nothing.
    pub fn set_conversation(&mut self, conversation: Option<Arc<dyn Conversation>>) {
        let unchanged = match (&self.active, &conversation) {
            (Some(active), Some(next)) => active.conversation.topic() == next.topic(),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        if let Some(previous) = self.active.take() {
            tracing::debug!(
                "[ConversationView] leaving conversation {}",
                previous.conversation.topic()
            );
            previous.token.cancel();
        }

        let epoch = {
            let mut state = self.shared.lock();
            state.epoch += 1;
            state.log.clear();
            state.history_error = None;
            state.stream_error = None;
            state.loading = conversation.is_some();
            state.epoch
        };
        self.shared.bump();

        let Some(conversation) = conversation else {
            return;
        };

        tracing::debug!("[ConversationView] entering conversation {}", conversation.topic());
        let token = CancellationToken::new();
        tokio::spawn(pump(
            self.shared.clone(),
            conversation.clone(),
            epoch,
            token.clone(),
        ));
        self.active = Some(ActiveConversation {
            conversation,
            token,
        });
    }

    pub fn conversation(&self) -> Option<&Arc<dyn Conversation>> {
        self.active.as_ref().map(|active| &active.conversation)
    }

    /// Re-fetches history for the active conversation and replaces the
    /// visible sequence with it.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NoConversation`] without an active conversation
    /// and [`ChatError::Transient`] when the fetch fails; the sequence is then
    /// left as it was.
    pub async fn refresh_history(&self) -> Result<()> {
        let active = self.active.as_ref().ok_or(ChatError::NoConversation)?;
        let epoch = self.shared.lock().epoch;
        let conversation = active.conversation.clone();
        let token = active.token.clone();

        match conversation.history().await {
            Ok(messages) => {
                self.shared.apply(epoch, &token, |state| {
                    state.log.replace(messages);
                    state.history_error = None;
                });
                Ok(())
            }
            Err(e) => {
                let err = ChatError::transient(e);
                tracing::warn!("[ConversationView] history refresh failed: {}", err);
                let message = err.to_string();
                self.shared.apply(epoch, &token, |state| state.history_error = Some(message));
                Err(err)
            }
        }
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.shared.lock().draft = text.into();
        self.shared.bump();
    }

    /// Sends the current draft to the active conversation.
    ///
    /// A blank draft is a no-op. On success the draft is cleared; on failure
    /// the draft and the message sequence are untouched and a notice is shown
    /// for the configured duration.
    pub async fn send(&self) -> Result<()> {
        let active = self.active.as_ref().ok_or(ChatError::NoConversation)?;
        let draft = self.shared.lock().draft.clone();
        let text = draft.trim();
        if text.is_empty() {
            return Ok(());
        }

        match active.conversation.send(text).await {
            Ok(()) => {
                let mut state = self.shared.lock();
                // Keep anything typed while the send was in flight.
                if state.draft == draft {
                    state.draft.clear();
                }
                drop(state);
                self.shared.bump();
                Ok(())
            }
            Err(e) => {
                let err = ChatError::transient(e);
                tracing::warn!("[ConversationView] send failed: {}", err);
                self.show_notice(err.to_string());
                Err(err)
            }
        }
    }

    fn show_notice(&self, message: String) {
        let id = {
            let mut state = self.shared.lock();
            state.next_notice_id += 1;
            let id = state.next_notice_id;
            state.notice = Some(Notice {
                message,
                expires_at: Instant::now() + self.notice_ttl,
                id,
            });
            id
        };
        self.shared.bump();

        let shared = self.shared.clone();
        let ttl = self.notice_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut state = shared.lock();
            if state.notice.as_ref().is_some_and(|notice| notice.id == id) {
                state.notice = None;
                drop(state);
                shared.bump();
            }
        });
    }

    // ============================================================================
    // Snapshots
    // ============================================================================

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.lock().log.messages().to_vec()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.lock().loading
    }

    pub fn history_error(&self) -> Option<String> {
        self.shared.lock().history_error.clone()
    }

    pub fn stream_error(&self) -> Option<String> {
        self.shared.lock().stream_error.clone()
    }

    /// The current send-failure notice, if it has not expired.
    pub fn notice(&self) -> Option<Notice> {
        let state = self.shared.lock();
        state
            .notice
            .clone()
            .filter(|notice| Instant::now() < notice.expires_at)
    }

    pub fn draft(&self) -> String {
        self.shared.lock().draft.clone()
    }

    /// Receives a new revision number after every visible change.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}

impl Default for ConversationView {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_NOTICE_TTL_SECS))
    }
}

impl Drop for ConversationView {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
        }
    }
}

/// Opens the live subscription, loads history, then merges the
/// subscription until cancelled.
///
/// The subscription is opened first so that messages arriving during the
/// history fetch are buffered by the stream; merge-by-id drops whatever the
/// history already contains.
async fn pump(
    shared: Arc<Shared>,
    conversation: Arc<dyn Conversation>,
    epoch: u64,
    token: CancellationToken,
) {
    let topic = conversation.topic().to_string();

    let subscribed = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        subscribed = conversation.subscribe() => subscribed,
    };
    let stream = match subscribed {
        Ok(stream) => Some(stream),
        Err(e) => {
            let err = ChatError::transient(e);
            tracing::error!("[ConversationView] failed to subscribe to {}: {}", topic, err);
            let message = err.to_string();
            shared.apply(epoch, &token, |state| state.stream_error = Some(message));
            None
        }
    };

    let history = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        history = conversation.history() => history,
    };
    match history {
        Ok(messages) => {
            tracing::debug!("[ConversationView] loaded {} messages for {}", messages.len(), topic);
            shared.apply(epoch, &token, |state| {
                state.log.replace(messages);
                state.history_error = None;
                state.loading = false;
            });
        }
        Err(e) => {
            let err = ChatError::transient(e);
            tracing::warn!("[ConversationView] history load failed for {}: {}", topic, err);
            let message = err.to_string();
            shared.apply(epoch, &token, |state| {
                state.history_error = Some(message);
                state.loading = false;
            });
        }
    }

    let Some(mut stream) = stream else {
        return;
    };

    loop {
        let item = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            item = stream.next() => item,
        };
        match item {
            Some(Ok(message)) => {
                let id = message.id.clone();
                let mut appended = false;
                if !shared.apply(epoch, &token, |state| appended = state.log.merge(message)) {
                    tracing::debug!("[ConversationView] dropped {} after teardown of {}", id, topic);
                    break;
                }
                if !appended {
                    tracing::trace!("[ConversationView] duplicate {} ignored", id);
                }
            }
            Some(Err(e)) => {
                let err = ChatError::transient(e);
                tracing::error!("[ConversationView] stream error on {}: {}", topic, err);
                let message = err.to_string();
                shared.apply(epoch, &token, |state| state.stream_error = Some(message));
                break;
            }
            None => {
                tracing::debug!("[ConversationView] stream ended for {}", topic);
                break;
            }
        }
    }
}
