/*!
Mock transports for development without brokers

Both doubles record everything published on them. `MockBus` also routes
simulated deliveries to subscribers whose pattern matches, with NATS
wildcard semantics (`*` is one token, `>` is the remainder).
*/

use async_trait::async_trait;
use bytes::Bytes;
use edge_agent::senml::{self, Pack};
use edge_agent::transport::{BusMessage, BusStream, ControlPlane, InternalBus};
use edge_agent::{AgentError, Result};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Control-plane double; records every publish.
#[derive(Clone, Default)]
pub struct MockControlPlane {
    published_messages: Arc<Mutex<Vec<MockMessage>>>,
    fail_publish: Arc<AtomicBool>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following publish fail.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn get_published_messages(&self) -> Vec<MockMessage> {
        self.published_messages.lock().unwrap().clone()
    }

    pub fn find_messages_by_topic(&self, topic: &str) -> Vec<MockMessage> {
        self.published_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|msg| msg.topic == topic)
            .cloned()
            .collect()
    }

    /// Decode the last payload published on `topic` as SenML.
    pub fn get_last_senml(&self, topic: &str) -> Option<Pack> {
        self.find_messages_by_topic(topic)
            .last()
            .and_then(|msg| senml::decode(&msg.payload).ok())
    }

    pub fn clear(&self) {
        self.published_messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(AgentError::Publish("mock publish failure".to_string()));
        }

        log::info!("📤 [MOCK] Published to {}: {} bytes", topic, payload.len());
        self.published_messages.lock().unwrap().push(MockMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }
}

struct Subscription {
    pattern: String,
    sender: mpsc::UnboundedSender<BusMessage>,
}

/// Internal-bus double.
#[derive(Clone, Default)]
pub struct MockBus {
    published_messages: Arc<Mutex<Vec<BusMessage>>>,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    fail_publish: Arc<AtomicBool>,
    fail_subscribe: Arc<AtomicBool>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following publish fail.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscriptions(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn get_subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.pattern.clone())
            .collect()
    }

    pub fn get_published_messages(&self) -> Vec<BusMessage> {
        self.published_messages.lock().unwrap().clone()
    }

    pub fn find_messages_by_subject(&self, subject: &str) -> Vec<BusMessage> {
        self.get_published_messages()
            .into_iter()
            .filter(|msg| msg.subject == subject)
            .collect()
    }

    /// Simulate a message arriving on `subject`; returns how many
    /// subscriptions received it.
    pub fn deliver(&self, subject: &str, payload: &[u8]) -> usize {
        self.send_to(subject, payload, |pattern| subject_matches(pattern, subject))
    }

    /// Deliver to every subscription regardless of pattern, as a
    /// misbehaving server would.
    pub fn deliver_unfiltered(&self, subject: &str, payload: &[u8]) -> usize {
        self.send_to(subject, payload, |_| true)
    }

    fn send_to(&self, subject: &str, payload: &[u8], accept: impl Fn(&str) -> bool) -> usize {
        let message = BusMessage {
            subject: subject.to_string(),
            payload: Bytes::copy_from_slice(payload),
        };

        let subscriptions = self.subscriptions.lock().unwrap();
        let mut delivered = 0;
        for sub in subscriptions.iter().filter(|s| accept(&s.pattern)) {
            if sub.sender.send(message.clone()).is_ok() {
                delivered += 1;
            }
        }

        log::info!("📨 [MOCK] Simulated {} -> {} subscriber(s)", subject, delivered);
        delivered
    }
}

#[async_trait]
impl InternalBus for MockBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(AgentError::Publish("mock bus publish failure".to_string()));
        }

        log::info!("📤 [MOCK] Bus publish to {}: {} bytes", subject, payload.len());
        self.published_messages.lock().unwrap().push(BusMessage {
            subject: subject.to_string(),
            payload,
        });
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<BusStream> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(AgentError::Subscribe(format!("{}: mock failure", pattern)));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscriptions.lock().unwrap().push(Subscription {
            pattern: pattern.to_string(),
            sender,
        });
        log::info!("📥 [MOCK] Subscribed to {}", pattern);

        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|msg| (msg, receiver))
        });
        Ok(stream.boxed())
    }
}

/// NATS subject matching: `*` matches exactly one token, a trailing `>`
/// matches one or more.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => {}
            (Some(p), Some(s)) if p == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
