use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use super::model::{InitOutcome, Session, SessionState};
use super::store::SessionStore;
use crate::error::{ChatError, Result};
use crate::identity::Address;
use crate::protocol::{ClientOptions, Conversation, ProtocolClientFactory, ProtocolSigner};
use crate::wallet::{SignerAdapter, WalletProvider};

#[derive(Default)]
struct Inner {
    /// The wallet identity the UI currently shows.
    identity: Option<Address>,
    /// Identities with a client construction in flight.
    in_flight: HashSet<Address>,
}

/// Owns the session lifecycle for the active wallet identity.
///
/// `SessionManager` is responsible for:
/// - Tracking the active identity (without ever initializing on change)
/// - Explicit, deduplicated client construction through the wallet
/// - Serving cached sessions from the [`SessionStore`]
/// - Starting conversations behind a reachability check
///
/// All transitions happen inside one short critical section that is never
/// held across an `.await`.
pub struct SessionManager {
    store: Arc<SessionStore>,
    factory: Arc<dyn ProtocolClientFactory>,
    wallet: Arc<dyn WalletProvider>,
    options: ClientOptions,
    inner: Mutex<Inner>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    ///
    /// # Arguments
    ///
    /// * `store` - Session cache shared with the composition root
    /// * `factory` - Builds protocol clients from a signer
    /// * `wallet` - The connected wallet's request interface
    /// * `options` - Passed to every client construction
    pub fn new(
        store: Arc<SessionStore>,
        factory: Arc<dyn ProtocolClientFactory>,
        wallet: Arc<dyn WalletProvider>,
        options: ClientOptions,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Absent);
        Self {
            store,
            factory,
            wallet,
            options,
            inner: Mutex::new(Inner::default()),
            state,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribes to state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> Option<Address> {
        self.lock().identity.clone()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Records the active wallet identity.
    ///
    /// The state returns to Absent (or Initializing if a construction for the
    /// new identity is still in flight). No construction is started.
    pub fn set_identity(&self, identity: Option<Address>) {
        let mut inner = self.lock();
        if inner.identity == identity {
            return;
        }
        tracing::info!(
            "[SessionManager] identity changed: {:?} -> {:?}",
            inner.identity.as_ref().map(Address::as_str),
            identity.as_ref().map(Address::as_str)
        );
        let next = match &identity {
            Some(id) if inner.in_flight.contains(id) => SessionState::Initializing {
                identity: id.clone(),
            },
            _ => SessionState::Absent,
        };
        inner.identity = identity;
        self.state.send_replace(next);
    }

    /// Initializes the session for the active identity.
    ///
    /// A cached session is served without touching the wallet. While a
    /// construction for the identity is in flight, further calls are no-ops.
    ///
    /// # Returns
    ///
    /// - `Ok(InitOutcome::Ready(session))`: the session is Ready
    /// - `Ok(InitOutcome::InFlight)`: another call is already constructing
    /// - `Ok(InitOutcome::Cancelled)`: the user dismissed the wallet prompt
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NoIdentity`] without an active identity and
    /// [`ChatError::Construction`] when the client cannot be built. The
    /// latter also moves the state to Error.
    pub async fn initialize(&self) -> Result<InitOutcome> {
        let identity = {
            let mut inner = self.lock();
            let identity = inner.identity.clone().ok_or(ChatError::NoIdentity)?;

            if let Some(session) = self.state.borrow().session()
                && session.identity == identity
            {
                return Ok(InitOutcome::Ready(session.clone()));
            }

            if inner.in_flight.contains(&identity) {
                tracing::debug!("[SessionManager] initialize ignored, already in flight for {}", identity);
                self.await_in_flight(&identity);
                return Ok(InitOutcome::InFlight);
            }

            if let Some(session) = self.store.get(&identity) {
                tracing::debug!("[SessionManager] serving cached session for {}", identity);
                self.state.send_replace(SessionState::Ready {
                    session: session.clone(),
                });
                return Ok(InitOutcome::Ready(session));
            }

            inner.in_flight.insert(identity.clone());
            self.state.send_replace(SessionState::Initializing {
                identity: identity.clone(),
            });
            identity
        };

        self.construct(identity, false).await
    }

    /// Points the state at a construction already in flight for `identity`,
    /// e.g. after a reset while it was running.
    fn await_in_flight(&self, identity: &Address) {
        let waiting = matches!(
            &*self.state.borrow(),
            SessionState::Initializing { identity: pending } if pending == identity
        );
        if !waiting {
            self.state.send_replace(SessionState::Initializing {
                identity: identity.clone(),
            });
        }
    }

    /// Builds a client for `identity`, which the caller has marked in flight.
    ///
    /// With `supersede` the new session replaces the cached one; otherwise
    /// an already cached session wins. A failed or cancelled construction
    /// never touches the cache, and a state waiting on it falls back to the
    /// cached session when there is one.
    async fn construct(&self, identity: Address, supersede: bool) -> Result<InitOutcome> {
        tracing::info!(
            "[SessionManager] constructing client for {} (env={})",
            identity,
            self.options.environment
        );
        let signer: Arc<dyn ProtocolSigner> = Arc::new(SignerAdapter::new(self.wallet.clone()));
        let result = self
            .factory
            .create(signer, self.options.clone())
            .await
            .map_err(ChatError::from_construction)
            .and_then(|client| {
                if client.address() == &identity {
                    Ok(client)
                } else {
                    Err(ChatError::Construction(format!(
                        "wallet account {} does not match {}",
                        client.address(),
                        identity
                    )))
                }
            });

        let mut inner = self.lock();
        inner.in_flight.remove(&identity);
        // Only a state still waiting on this construction is updated; a reset
        // or identity switch in the meantime wins.
        let awaiting = matches!(
            &*self.state.borrow(),
            SessionState::Initializing { identity: pending } if *pending == identity
        );
        let fallback = || {
            self.store
                .get(&identity)
                .map(|session| SessionState::Ready { session })
        };

        match result {
            Ok(client) => {
                let fresh = Arc::new(Session::new(identity.clone(), client));
                let session = if supersede {
                    self.store.replace(fresh.clone());
                    fresh
                } else {
                    self.store.get_or_insert(fresh)
                };
                if awaiting {
                    self.state.send_replace(SessionState::Ready {
                        session: session.clone(),
                    });
                }
                tracing::info!("[SessionManager] session ready for {}", identity);
                Ok(InitOutcome::Ready(session))
            }
            Err(err) if err.is_user_cancelled() => {
                if awaiting {
                    self.state
                        .send_replace(fallback().unwrap_or(SessionState::Absent));
                }
                tracing::info!("[SessionManager] initialization cancelled by user for {}", identity);
                Ok(InitOutcome::Cancelled)
            }
            Err(err) => {
                if awaiting {
                    self.state.send_replace(fallback().unwrap_or_else(|| SessionState::Error {
                        identity: identity.clone(),
                        message: err.to_string(),
                    }));
                }
                tracing::error!("[SessionManager] initialization failed for {}: {}", identity, err);
                Err(err)
            }
        }
    }

    /// Returns the state to Absent. The cached session is kept.
    pub fn reset(&self) {
        let _inner = self.lock();
        tracing::debug!("[SessionManager] reset");
        self.state.send_replace(SessionState::Absent);
    }

    /// Removes the cached session for `identity`.
    ///
    /// If that session is the Ready one, the state returns to Absent.
    pub fn evict(&self, identity: &Address) -> Option<Arc<Session>> {
        let _inner = self.lock();
        let removed = self.store.remove(identity);
        let was_ready = self
            .state
            .borrow()
            .session()
            .is_some_and(|session| &session.identity == identity);
        if was_ready {
            self.state.send_replace(SessionState::Absent);
        }
        if removed.is_some() {
            tracing::info!("[SessionManager] evicted session for {}", identity);
        }
        removed
    }

    /// Builds a new session for the active identity and swaps it in for the
    /// cached one.
    ///
    /// The cached session stays in place until the replacement exists. If
    /// the user cancels or construction fails, it is kept and shown as
    /// Ready again.
    pub async fn reinitialize(&self) -> Result<InitOutcome> {
        let identity = {
            let mut inner = self.lock();
            let identity = inner.identity.clone().ok_or(ChatError::NoIdentity)?;
            if inner.in_flight.contains(&identity) {
                tracing::debug!("[SessionManager] reinitialize ignored, already in flight for {}", identity);
                self.await_in_flight(&identity);
                return Ok(InitOutcome::InFlight);
            }
            inner.in_flight.insert(identity.clone());
            self.state.send_replace(SessionState::Initializing {
                identity: identity.clone(),
            });
            identity
        };

        self.construct(identity, true).await
    }

    /// Returns the Ready session.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotReady`] in any other state.
    pub fn ready_session(&self) -> Result<Arc<Session>> {
        let state = self.state.borrow();
        state
            .session()
            .cloned()
            .ok_or_else(|| ChatError::NotReady(state.name().to_string()))
    }

    /// Lists conversations known to the network for the Ready session.
    pub async fn list_conversations(&self) -> Result<Vec<Arc<dyn Conversation>>> {
        let session = self.ready_session()?;
        session
            .client
            .list_conversations()
            .await
            .map_err(ChatError::transient)
    }

    /// Opens a conversation with `peer` after checking it can receive
    /// messages.
    ///
    /// # Errors
    ///
    /// - [`ChatError::NotReady`]: no Ready session
    /// - [`ChatError::UnreachablePeer`]: `peer` cannot receive messages; no
    ///   conversation is opened
    /// - [`ChatError::Transient`]: the check or the open failed
    pub async fn start_conversation(&self, peer: &Address) -> Result<Arc<dyn Conversation>> {
        let session = self.ready_session()?;

        let reachable = session.client.can_message(peer).await.map_err(|e| {
            tracing::warn!("[SessionManager] reachability check failed for {}: {}", peer, e);
            ChatError::transient(e)
        })?;
        if !reachable {
            tracing::info!("[SessionManager] {} cannot receive messages", peer);
            return Err(ChatError::unreachable_peer(peer.as_str()));
        }

        let conversation = session
            .client
            .open_conversation(peer)
            .await
            .map_err(ChatError::transient)?;
        tracing::debug!(
            "[SessionManager] opened conversation {} with {}",
            conversation.topic(),
            peer
        );
        Ok(conversation)
    }
}
