//! The set of topics the application wants kept live.

use std::collections::HashSet;

/// Ordered, append-only set of topic names.
///
/// Topics are kept in the order they were first requested; repeated requests
/// for the same topic are ignored. The set is never pruned, so every topic
/// requested during the session is replayed after each reconnect.
///
/// # Examples
///
/// ```
/// use iobus_rpc::SubscriptionSet;
///
/// let mut topics = SubscriptionSet::default();
/// assert!(topics.insert("state"));
/// assert!(topics.insert("firmware"));
/// assert!(!topics.insert("state"));
/// assert_eq!(topics.iter().collect::<Vec<_>>(), ["state", "firmware"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SubscriptionSet {
    order: Vec<String>,
    members: HashSet<String>,
}

impl SubscriptionSet {
    /// Add `topic`. Returns `true` if it was not already present.
    pub fn insert(&mut self, topic: impl Into<String>) -> bool {
        let topic = topic.into();
        if self.members.contains(&topic) {
            return false;
        }
        self.members.insert(topic.clone());
        self.order.push(topic);
        true
    }

    /// Whether `topic` has been requested.
    #[must_use]
    pub fn contains(&self, topic: &str) -> bool { self.members.contains(topic) }

    /// Topics in first-request order.
    pub fn iter(&self) -> impl Iterator<Item = &str> { self.order.iter().map(String::as_str) }

    /// Number of topics.
    #[must_use]
    pub fn len(&self) -> usize { self.order.len() }

    /// Whether no topic has been requested.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.order.is_empty() }
}
