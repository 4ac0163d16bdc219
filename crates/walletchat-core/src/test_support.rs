//! Scripted collaborators shared by the unit tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};

use crate::identity::Address;
use crate::protocol::{
    ChatMessage, ClientOptions, Conversation, MessageStream, ProtocolClient,
    ProtocolClientFactory, ProtocolError, ProtocolSigner,
};
use crate::wallet::{WalletError, WalletProvider};

pub(crate) const ME: &str = "0xabcdef0123456789abcdef0123456789abcdef01";
pub(crate) const PEER: &str = "0x1111111111111111111111111111111111111111";

pub(crate) fn addr(value: &str) -> Address {
    Address::parse(value).unwrap()
}

pub(crate) fn msg(id: &str, topic: &str, sender: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        topic: topic.to_string(),
        sender: addr(sender),
        content: format!("content of {id}"),
        sent_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
}

pub(crate) fn ids(messages: &[ChatMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}

// ----------------------------------------------------------------------------
// Wallet
// ----------------------------------------------------------------------------

pub(crate) struct MockWallet {
    account: String,
    reject: AtomicBool,
    sign_calls: AtomicUsize,
}

impl MockWallet {
    pub(crate) fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            reject: AtomicBool::new(false),
            sign_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn rejecting(self) -> Self {
        self.reject.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn set_rejecting(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub(crate) fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request(&self, method: &str, _params: Vec<Value>) -> Result<Value, WalletError> {
        match method {
            "eth_accounts" => Ok(json!([self.account])),
            "eth_chainId" => Ok(json!("0x1")),
            "personal_sign" => {
                self.sign_calls.fetch_add(1, Ordering::SeqCst);
                if self.reject.load(Ordering::SeqCst) {
                    Err(WalletError::user_rejected())
                } else {
                    Ok(json!("0xsigned"))
                }
            }
            other => Err(WalletError::new(4200, format!("unsupported method {other}"))),
        }
    }
}

// ----------------------------------------------------------------------------
// Conversation
// ----------------------------------------------------------------------------

pub(crate) struct MockConversation {
    topic: String,
    me: Address,
    peer: Address,
    history: Mutex<Vec<ChatMessage>>,
    /// Delivered to open subscriptions by the next history fetch.
    during_history: Mutex<Vec<ChatMessage>>,
    fail_history: AtomicBool,
    fail_subscribe: AtomicBool,
    fail_send: AtomicBool,
    history_calls: AtomicUsize,
    subscriptions: AtomicUsize,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Result<ChatMessage, ProtocolError>>>>,
    sent: Mutex<Vec<String>>,
}

impl MockConversation {
    pub(crate) fn new(topic: &str, me: &str, peer: &str) -> Self {
        Self {
            topic: topic.to_string(),
            me: addr(me),
            peer: addr(peer),
            history: Mutex::new(Vec::new()),
            during_history: Mutex::new(Vec::new()),
            fail_history: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            history_calls: AtomicUsize::new(0),
            subscriptions: AtomicUsize::new(0),
            subscribers: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_history(self, messages: Vec<ChatMessage>) -> Self {
        *self.history.lock().unwrap() = messages;
        self
    }

    pub(crate) fn arriving_during_history(self, messages: Vec<ChatMessage>) -> Self {
        *self.during_history.lock().unwrap() = messages;
        self
    }

    pub(crate) fn set_history(&self, messages: Vec<ChatMessage>) {
        *self.history.lock().unwrap() = messages;
    }

    pub(crate) fn fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub(crate) fn live_subscribers(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivers `message` to every open subscription.
    pub(crate) fn deliver(&self, message: ChatMessage) {
        self.push(Ok(message));
    }

    /// Fails every open subscription with `error`.
    pub(crate) fn deliver_error(&self, error: ProtocolError) {
        self.push(Err(error));
    }

    fn push(&self, item: Result<ChatMessage, ProtocolError>) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(item.clone()).is_ok());
    }
}

#[async_trait]
impl Conversation for MockConversation {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn peer_address(&self) -> &Address {
        &self.peer
    }

    fn created_at(&self) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    async fn history(&self) -> Result<Vec<ChatMessage>, ProtocolError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let arriving = std::mem::take(&mut *self.during_history.lock().unwrap());
        for message in arriving {
            self.deliver(message);
        }
        tokio::task::yield_now().await;
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(ProtocolError::Network("history unavailable".into()));
        }
        Ok(self.history.lock().unwrap().clone())
    }

    async fn subscribe(&self) -> Result<MessageStream, ProtocolError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(ProtocolError::Rejected("subscription refused".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(Box::pin(stream))
    }

    async fn send(&self, text: &str) -> Result<(), ProtocolError> {
        tokio::task::yield_now().await;
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ProtocolError::Network("send failed".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(text.to_string());
        let id = format!("sent-{}", sent.len());
        drop(sent);
        let mut message = msg(&id, &self.topic, self.me.as_str());
        message.content = text.to_string();
        self.deliver(message);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Client and factory
// ----------------------------------------------------------------------------

pub(crate) struct MockClient {
    address: Address,
    reachable: Vec<Address>,
    conversations: Mutex<HashMap<Address, Arc<MockConversation>>>,
    open_calls: AtomicUsize,
}

impl MockClient {
    pub(crate) fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolClient for MockClient {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn can_message(&self, address: &Address) -> Result<bool, ProtocolError> {
        Ok(self.reachable.contains(address))
    }

    async fn list_conversations(&self) -> Result<Vec<Arc<dyn Conversation>>, ProtocolError> {
        let conversations = self.conversations.lock().unwrap();
        Ok(conversations
            .values()
            .map(|c| c.clone() as Arc<dyn Conversation>)
            .collect())
    }

    async fn open_conversation(&self, peer: &Address) -> Result<Arc<dyn Conversation>, ProtocolError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        let mut conversations = self.conversations.lock().unwrap();
        let conversation = conversations
            .entry(peer.clone())
            .or_insert_with(|| {
                let topic = format!("dm:{}:{}", self.address, peer);
                Arc::new(MockConversation::new(&topic, self.address.as_str(), peer.as_str()))
            })
            .clone();
        Ok(conversation)
    }
}

pub(crate) struct MockFactory {
    gate: Option<Arc<Notify>>,
    failure: Mutex<Option<ProtocolError>>,
    reachable: Vec<Address>,
    clients: Mutex<Vec<Arc<MockClient>>>,
}

impl MockFactory {
    pub(crate) fn new() -> Self {
        Self {
            gate: None,
            failure: Mutex::new(None),
            reachable: Vec::new(),
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Holds every construction until `gate` is notified.
    pub(crate) fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn failing(self, failure: ProtocolError) -> Self {
        self.set_failure(Some(failure));
        self
    }

    pub(crate) fn set_failure(&self, failure: Option<ProtocolError>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub(crate) fn reaching(mut self, peer: &str) -> Self {
        self.reachable.push(addr(peer));
        self
    }

    pub(crate) fn created(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    pub(crate) fn client(&self) -> Arc<MockClient> {
        self.clients.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ProtocolClientFactory for MockFactory {
    async fn create(
        &self,
        signer: Arc<dyn ProtocolSigner>,
        _options: ClientOptions,
    ) -> Result<Arc<dyn ProtocolClient>, ProtocolError> {
        tokio::task::yield_now().await;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let address = signer.account().await?;
        signer.sign_message("register identity").await?;
        if let Some(failure) = self.failure.lock().unwrap().clone() {
            return Err(failure);
        }
        let client = Arc::new(MockClient {
            address,
            reachable: self.reachable.clone(),
            conversations: Mutex::new(HashMap::new()),
            open_calls: AtomicUsize::new(0),
        });
        self.clients.lock().unwrap().push(client.clone());
        Ok(client)
    }
}
