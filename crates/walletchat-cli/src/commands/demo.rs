use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use walletchat_application::ChatUseCase;
use walletchat_core::identity::{Address, NameResolver};
use walletchat_infrastructure::{ConfigService, DevWallet, MemoryNetwork};

const WAIT: Duration = Duration::from_secs(5);
const POLL: Duration = Duration::from_millis(10);

/// Names known to the demo only.
struct DemoNames {
    names: HashMap<String, Address>,
}

#[async_trait]
impl NameResolver for DemoNames {
    async fn forward(&self, name: &str) -> walletchat_core::Result<Option<Address>> {
        Ok(self.names.get(&name.to_ascii_lowercase()).cloned())
    }

    async fn reverse(&self, address: &Address) -> walletchat_core::Result<Option<String>> {
        Ok(self
            .names
            .iter()
            .find(|(_, known)| *known == address)
            .map(|(name, _)| name.clone()))
    }
}

async fn wait_for(what: &str, mut condition: impl FnMut() -> bool) -> Result<()> {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .map_err(|_| anyhow!("timed out waiting for {}", what))
}

/// Messages worth sending: blank ones would never be delivered.
fn outgoing(messages: Vec<String>) -> Vec<String> {
    let messages: Vec<String> = messages
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    if messages.is_empty() {
        vec!["gm".to_string(), "wen chat".to_string()]
    } else {
        messages
    }
}

pub async fn run(service: &ConfigService, messages: Vec<String>) -> Result<()> {
    let messages = outgoing(messages);

    let config = service.get_config();
    let network = MemoryNetwork::new();
    let alice_wallet = Arc::new(DevWallet::random());
    let bob_wallet = Arc::new(DevWallet::random());
    let names = Arc::new(DemoNames {
        names: HashMap::from([
            ("alice.eth".to_string(), alice_wallet.account().clone()),
            ("bob.eth".to_string(), bob_wallet.account().clone()),
        ]),
    });

    let alice = ChatUseCase::new(
        config.clone(),
        alice_wallet,
        Arc::new(network.clone()),
        names.clone(),
    );
    let bob = ChatUseCase::new(config, bob_wallet, Arc::new(network.clone()), names);

    for app in [&alice, &bob] {
        let account = app.connect_wallet().await?;
        let outcome = app.initialize_session().await?;
        if outcome.session().is_none() {
            return Err(anyhow!("session for {} was not initialized", account));
        }
        println!("ready: {}", account);
    }

    let stranger = DevWallet::random();
    match alice.start_conversation(stranger.account().as_str()).await {
        Ok(_) => println!("unexpectedly reached {}", stranger.account()),
        Err(e) => println!("{} -> {}", stranger.account().abbreviated(), e),
    }

    let started = alice.start_conversation("bob.eth").await?;
    println!("alice -> {} ({})", started.peer.label(), started.conversation.topic());
    let alice_view = alice.open_view(Some(started.conversation));

    let bob_conversation = bob
        .list_conversations()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("bob has no conversations"))?;
    let bob_view = bob.open_view(Some(bob_conversation));

    let alice_address = alice.sessions().identity().ok_or_else(|| anyhow!("alice disconnected"))?;
    let bob_address = bob.sessions().identity().ok_or_else(|| anyhow!("bob disconnected"))?;
    wait_for("subscriptions", || {
        network.subscriber_count(&alice_address, &bob_address) == 2
    })
    .await?;

    for text in &messages {
        alice_view.set_draft(text.as_str());
        alice_view.send().await?;
    }
    wait_for("delivery", || bob_view.messages().len() == messages.len()).await?;

    for message in bob_view.messages() {
        let sender = if message.is_from(&alice_address) {
            "alice.eth"
        } else {
            "bob.eth"
        };
        println!("[{}] {}: {}", message.sent_at.format("%H:%M:%S"), sender, message.content);
    }

    Ok(())
}
