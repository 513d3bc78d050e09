//! In-process publish/subscribe for image messages
//!
//! Topics are plain strings. Delivery is synchronous: `Publisher::publish`
//! runs every subscriber callback on the calling thread before returning.
//! Each callback sits behind its own mutex, so a single subscription is never
//! invoked concurrently with itself even when several threads publish.

use crate::messages::ImageMessage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type ImageCallback = Box<dyn FnMut(Arc<ImageMessage>) + Send>;

struct Subscription {
    id: u64,
    callback: Mutex<ImageCallback>,
}

impl Subscription {
    fn deliver(&self, message: Arc<ImageMessage>) {
        let mut callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        (*callback)(message);
    }
}

#[derive(Default)]
struct TopicState {
    subscriptions: Vec<Arc<Subscription>>,
    latched: Option<Arc<ImageMessage>>,
    publishers: usize,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<String, TopicState>,
}

/// Shared topic registry; clones refer to the same set of topics
#[derive(Clone, Default)]
pub struct ImageTransport {
    registry: Arc<Mutex<Registry>>,
}

impl ImageTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a publisher. A latched publisher hands its most recent message
    /// to every subscriber that joins later.
    pub fn advertise(&self, topic: &str, latch: bool) -> Publisher {
        self.registry()
            .topics
            .entry(topic.to_string())
            .or_default()
            .publishers += 1;

        tracing::debug!(topic, latch, "Advertised topic");

        Publisher {
            topic: topic.to_string(),
            latch,
            transport: self.clone(),
        }
    }

    /// Register a callback for every message on `topic`. The subscription
    /// lives as long as the returned `Subscriber`.
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> Subscriber
    where
        F: FnMut(Arc<ImageMessage>) + Send + 'static,
    {
        let (subscription, latched) = {
            let mut registry = self.registry();
            let id = registry.next_id;
            registry.next_id += 1;

            let subscription = Arc::new(Subscription {
                id,
                callback: Mutex::new(Box::new(callback)),
            });

            let state = registry.topics.entry(topic.to_string()).or_default();
            state.subscriptions.push(subscription.clone());
            (subscription, state.latched.clone())
        };

        tracing::debug!(topic, "Subscribed to topic");

        if let Some(message) = latched {
            subscription.deliver(message);
        }

        Subscriber {
            topic: topic.to_string(),
            id: subscription.id,
            transport: self.clone(),
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry()
            .topics
            .get(topic)
            .map_or(0, |state| state.subscriptions.len())
    }

    pub fn publisher_count(&self, topic: &str) -> usize {
        self.registry()
            .topics
            .get(topic)
            .map_or(0, |state| state.publishers)
    }

    /// Names of every topic that has been advertised or subscribed to
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry().topics.keys().cloned().collect();
        names.sort();
        names
    }

    fn publish(&self, topic: &str, message: ImageMessage, latch: bool) -> usize {
        let message = Arc::new(message);

        // Callbacks run outside the registry lock so they may publish themselves.
        let subscriptions = {
            let mut registry = self.registry();
            let state = registry.topics.entry(topic.to_string()).or_default();
            if latch {
                state.latched = Some(message.clone());
            }
            state.subscriptions.clone()
        };

        for subscription in &subscriptions {
            subscription.deliver(message.clone());
        }

        subscriptions.len()
    }

    fn unsubscribe(&self, topic: &str, id: u64) {
        if let Some(state) = self.registry().topics.get_mut(topic) {
            state.subscriptions.retain(|subscription| subscription.id != id);
        }
    }

    fn unadvertise(&self, topic: &str) {
        if let Some(state) = self.registry().topics.get_mut(topic) {
            state.publishers = state.publishers.saturating_sub(1);
        }
    }
}

/// Sending end of a topic
pub struct Publisher {
    topic: String,
    latch: bool,
    transport: ImageTransport,
}

impl Publisher {
    /// Deliver `message` to every current subscriber; returns how many received it
    pub fn publish(&self, message: ImageMessage) -> usize {
        self.transport.publish(&self.topic, message, self.latch)
    }

    pub fn subscriber_count(&self) -> usize {
        self.transport.subscriber_count(&self.topic)
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.transport.unadvertise(&self.topic);
    }
}

/// Receiving end of a topic; unsubscribes on drop
pub struct Subscriber {
    topic: String,
    id: u64,
    transport: ImageTransport,
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.transport.unsubscribe(&self.topic, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::encodings;

    fn message(width: u32) -> ImageMessage {
        ImageMessage {
            width,
            height: 1,
            encoding: encodings::MONO8.to_string(),
            step: width,
            data: vec![0; width as usize],
            ..Default::default()
        }
    }

    fn collector(transport: &ImageTransport, topic: &str) -> (Subscriber, Arc<Mutex<Vec<u32>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let subscriber = transport.subscribe(topic, move |msg| sink.lock().unwrap().push(msg.width));
        (subscriber, received)
    }

    #[test]
    fn test_publish_reaches_subscribers() {
        let transport = ImageTransport::new();
        let publisher = transport.advertise("image", false);
        let (_a, first) = collector(&transport, "image");
        let (_b, second) = collector(&transport, "image");
        let (_c, other) = collector(&transport, "other");

        assert_eq!(publisher.publish(message(3)), 2);
        assert_eq!(*first.lock().unwrap(), vec![3]);
        assert_eq!(*second.lock().unwrap(), vec![3]);
        assert!(other.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dropping_subscriber_unsubscribes() {
        let transport = ImageTransport::new();
        let publisher = transport.advertise("image", false);
        let (subscriber, received) = collector(&transport, "image");
        assert_eq!(publisher.subscriber_count(), 1);

        drop(subscriber);
        assert_eq!(publisher.subscriber_count(), 0);
        assert_eq!(publisher.publish(message(1)), 0);
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_latched_message_reaches_late_subscriber() {
        let transport = ImageTransport::new();
        let latched = transport.advertise("latched", true);
        let plain = transport.advertise("plain", false);
        latched.publish(message(7));
        plain.publish(message(8));

        let (_a, late_latched) = collector(&transport, "latched");
        let (_b, late_plain) = collector(&transport, "plain");

        assert_eq!(*late_latched.lock().unwrap(), vec![7]);
        assert!(late_plain.lock().unwrap().is_empty());
    }

    #[test]
    fn test_callback_may_republish() {
        let transport = ImageTransport::new();
        let relay = transport.advertise("out", false);
        let _relay_sub = transport.subscribe("in", move |msg| {
            relay.publish((*msg).clone());
        });
        let (_sink, received) = collector(&transport, "out");

        transport.advertise("in", false).publish(message(5));
        assert_eq!(*received.lock().unwrap(), vec![5]);
        assert_eq!(transport.topics(), vec!["in".to_string(), "out".to_string()]);
    }
}
