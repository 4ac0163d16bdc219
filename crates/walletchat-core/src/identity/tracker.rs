use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use super::address::Address;
use super::resolver::IdentityResolver;

/// Observable result of resolving the current target input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionState {
    pub input: String,
    pub resolved_address: Option<Address>,
    pub display_name: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Keeps a resolution pair in sync with a changing input.
///
/// Every call to [`IdentityTracker::set_input`] supersedes the previous one;
/// a lookup that completes after its input was replaced is discarded.
pub struct IdentityTracker {
    resolver: Arc<IdentityResolver>,
    generation: AtomicU64,
    state: watch::Sender<ResolutionState>,
}

impl IdentityTracker {
    pub fn new(resolver: Arc<IdentityResolver>) -> Self {
        let (state, _) = watch::channel(ResolutionState::default());
        Self {
            resolver,
            generation: AtomicU64::new(0),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ResolutionState {
        self.state.borrow().clone()
    }

    /// Updates the input and re-resolves it.
    ///
    /// Empty input clears the previous result before returning, without any
    /// lookup.
    pub async fn set_input(&self, input: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if input.trim().is_empty() {
            self.state.send_replace(ResolutionState::default());
            return;
        }

        self.state.send_replace(ResolutionState {
            input: input.to_string(),
            loading: true,
            ..Default::default()
        });

        let result = self.resolver.resolve_address(input).await;
        if !self.is_current(generation, input) {
            return;
        }

        let resolved = match result {
            Ok(resolved) => resolved,
            Err(e) => {
                self.state.send_replace(ResolutionState {
                    input: input.to_string(),
                    loading: false,
                    error: Some(e.to_string()),
                    ..Default::default()
                });
                return;
            }
        };

        // The address is usable before the reverse lookup returns.
        let address = resolved.address.clone();
        let named = resolved.display_name.is_some();
        self.state.send_replace(ResolutionState {
            input: input.to_string(),
            resolved_address: Some(resolved.address),
            display_name: resolved.display_name,
            loading: false,
            error: None,
        });
        if named {
            return;
        }

        let display_name = self.resolver.display_name(&address).await;
        if display_name.is_some() && self.is_current(generation, input) {
            self.state.send_modify(|state| state.display_name = display_name);
        }
    }

    fn is_current(&self, generation: u64, input: &str) -> bool {
        if self.generation.load(Ordering::SeqCst) == generation {
            return true;
        }
        tracing::debug!("[IdentityTracker] discarding stale result for '{}'", input);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::identity::resolver::NameResolver;
    use crate::identity::resolver::tests::MockNameResolver;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";

    fn tracker(mock: impl NameResolver + 'static) -> Arc<IdentityTracker> {
        let resolver = IdentityResolver::new(Arc::new(mock), vec![".eth".into()]);
        Arc::new(IdentityTracker::new(Arc::new(resolver)))
    }

    #[tokio::test]
    async fn test_resolves_name() {
        let tracker = tracker(MockNameResolver::with_name("alice.eth", ALICE));
        tracker.set_input("alice.eth").await;
        let state = tracker.snapshot();
        assert_eq!(state.resolved_address.unwrap().as_str(), ALICE);
        assert_eq!(state.display_name.as_deref(), Some("alice.eth"));
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_error_then_clear_on_empty() {
        let tracker = tracker(MockNameResolver::default());
        tracker.set_input("ghost.eth").await;
        assert!(tracker.snapshot().error.is_some());
        assert!(tracker.snapshot().resolved_address.is_none());

        tracker.set_input("").await;
        assert_eq!(tracker.snapshot(), ResolutionState::default());
    }

    /// Forward lookup that blocks on `gate` for one specific name.
    struct GatedResolver {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl NameResolver for GatedResolver {
        async fn forward(&self, name: &str) -> Result<Option<Address>> {
            if name == "slow.eth" {
                self.gate.notified().await;
                return Ok(Some(Address::parse(ALICE).unwrap()));
            }
            Ok(Some(Address::parse(BOB).unwrap()))
        }

        async fn reverse(&self, address: &Address) -> Result<Option<String>> {
            if address.as_str() == ALICE {
                self.gate.notified().await;
                return Ok(Some("alice.eth".to_string()));
            }
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_stale_result_is_discarded() {
        let gate = Arc::new(Notify::new());
        let tracker = tracker(GatedResolver { gate: gate.clone() });

        let slow = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.set_input("slow.eth").await })
        };
        tokio::task::yield_now().await;
        assert!(tracker.snapshot().loading);

        tracker.set_input("fast.eth").await;
        gate.notify_one();
        slow.await.unwrap();

        let state = tracker.snapshot();
        assert_eq!(state.input, "fast.eth");
        assert_eq!(state.resolved_address.unwrap().as_str(), BOB);
    }

    #[tokio::test]
    async fn test_address_is_published_before_reverse_lookup() {
        let gate = Arc::new(Notify::new());
        let tracker = tracker(GatedResolver { gate: gate.clone() });

        let pending = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.set_input(ALICE).await })
        };
        tokio::task::yield_now().await;
        let state = tracker.snapshot();
        assert_eq!(state.resolved_address.unwrap().as_str(), ALICE);
        assert!(state.display_name.is_none());
        assert!(!state.loading);

        gate.notify_one();
        pending.await.unwrap();
        assert_eq!(tracker.snapshot().display_name.as_deref(), Some("alice.eth"));
    }

    #[tokio::test]
    async fn test_late_name_is_not_applied_to_new_input() {
        let gate = Arc::new(Notify::new());
        let tracker = tracker(GatedResolver { gate: gate.clone() });

        let pending = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.set_input(ALICE).await })
        };
        tokio::task::yield_now().await;
        tracker.set_input(BOB).await;
        gate.notify_one();
        pending.await.unwrap();

        let state = tracker.snapshot();
        assert_eq!(state.resolved_address.unwrap().as_str(), BOB);
        assert!(state.display_name.is_none());
    }
}
