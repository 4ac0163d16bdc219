//! Chat use case implementation.
//!
//! This module provides the `ChatUseCase` which owns the session store and
//! wires the user-triggered actions (connect, initialize, start or open a
//! conversation) onto the session manager and identity resolver.

use std::sync::Arc;
use walletchat_core::config::ChatConfig;
use walletchat_core::error::Result;
use walletchat_core::identity::{
    Address, IdentityResolver, IdentityTracker, NameResolver, ResolvedIdentity,
};
use walletchat_core::protocol::{Conversation, ProtocolClientFactory, ProtocolSigner};
use walletchat_core::session::{InitOutcome, SessionManager, SessionState, SessionStore};
use walletchat_core::stream::ConversationView;
use walletchat_core::wallet::{SignerAdapter, WalletProvider};

/// A conversation resolved from user input.
#[derive(Debug, Clone)]
pub struct StartedConversation {
    pub peer: ResolvedIdentity,
    pub conversation: Arc<dyn Conversation>,
}

/// Composition root for one wallet-connected chat client.
///
/// # Responsibilities
///
/// - Owning the identity-keyed session store for the process
/// - Tracking the connected wallet identity
/// - Resolving conversation targets before the session is asked to open them
/// - Handing out conversation views configured from `ChatConfig`
pub struct ChatUseCase {
    config: ChatConfig,
    wallet: Arc<dyn WalletProvider>,
    store: Arc<SessionStore>,
    sessions: SessionManager,
    resolver: Arc<IdentityResolver>,
    target: IdentityTracker,
}

impl ChatUseCase {
    /// Creates a new `ChatUseCase` instance.
    ///
    /// # Arguments
    ///
    /// * `config` - Root configuration
    /// * `wallet` - Request interface of the user's wallet
    /// * `factory` - Builds protocol clients
    /// * `names` - Name-resolution service
    pub fn new(
        config: ChatConfig,
        wallet: Arc<dyn WalletProvider>,
        factory: Arc<dyn ProtocolClientFactory>,
        names: Arc<dyn NameResolver>,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let sessions = SessionManager::new(
            store.clone(),
            factory,
            wallet.clone(),
            config.client_options(),
        );
        let resolver = Arc::new(IdentityResolver::new(
            names,
            config.resolver.name_suffixes.clone(),
        ));
        let target = IdentityTracker::new(resolver.clone());
        Self {
            config,
            wallet,
            store,
            sessions,
            resolver,
            target,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The resolution state bound to the conversation target input.
    pub fn target(&self) -> &IdentityTracker {
        &self.target
    }

    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    // ============================================================================
    // Wallet identity
    // ============================================================================

    /// Reads the wallet's current account and makes it the active identity.
    ///
    /// Does not construct a session.
    pub async fn connect_wallet(&self) -> Result<Address> {
        let signer = SignerAdapter::new(self.wallet.clone());
        let account = signer.account().await?;
        tracing::info!("[ChatUseCase] wallet connected: {}", account);
        self.sessions.set_identity(Some(account.clone()));
        Ok(account)
    }

    /// Sets the active identity directly, e.g. on an account-changed event.
    pub fn set_identity(&self, identity: Option<Address>) {
        self.sessions.set_identity(identity);
    }

    pub fn disconnect_wallet(&self) {
        tracing::info!("[ChatUseCase] wallet disconnected");
        self.sessions.set_identity(None);
    }

    // ============================================================================
    // Session
    // ============================================================================

    /// Explicit user action: build (or reuse) the session for the active
    /// identity.
    pub async fn initialize_session(&self) -> Result<InitOutcome> {
        self.sessions.initialize().await
    }

    pub async fn reinitialize_session(&self) -> Result<InitOutcome> {
        self.sessions.reinitialize().await
    }

    // ============================================================================
    // Conversations
    // ============================================================================

    pub async fn resolve(&self, input: &str) -> Result<ResolvedIdentity> {
        self.resolver.resolve(input).await
    }

    /// Resolves `input` and opens the conversation with it.
    ///
    /// An address is used as typed; its reverse lookup is left to
    /// [`ChatUseCase::target`] and never delays the open.
    ///
    /// # Errors
    ///
    /// Resolution errors are returned before the network is contacted;
    /// an unreachable peer yields [`walletchat_core::ChatError::UnreachablePeer`].
    pub async fn start_conversation(&self, input: &str) -> Result<StartedConversation> {
        let peer = self.resolver.resolve_address(input).await?;
        tracing::debug!("[ChatUseCase] starting conversation with {}", peer.label());
        let conversation = self.sessions.start_conversation(&peer.address).await?;
        Ok(StartedConversation { peer, conversation })
    }

    pub async fn list_conversations(&self) -> Result<Vec<Arc<dyn Conversation>>> {
        self.sessions.list_conversations().await
    }

    /// A view showing `conversation`, with the configured notice duration.
    pub fn open_view(&self, conversation: Option<Arc<dyn Conversation>>) -> ConversationView {
        let mut view = ConversationView::new(self.config.chat.notice_ttl());
        view.set_conversation(conversation);
        view
    }
}
