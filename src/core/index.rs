//! The subscription index: a pure data structure, mutated only by the event
//! loop task that owns it (§4.2 — no external locks required).

use std::collections::{HashMap, HashSet};

use super::client::ClientId;

/// Maps an event-type key to the set of clients registered under it.
///
/// Buckets are never pruned on last-removal: an empty `HashSet` left behind
/// by the final `Remove` is cheap to keep and the spec explicitly allows
/// either behavior ("empty buckets may be retained or pruned").
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    buckets: HashMap<String, HashSet<ClientId>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, client: ClientId) {
        self.buckets.entry(key.to_string()).or_default().insert(client);
    }

    pub fn remove(&mut self, key: &str, client: ClientId) {
        if let Some(bucket) = self.buckets.get_mut(key) {
            bucket.remove(&client);
        }
    }

    pub fn get(&self, key: &str) -> impl Iterator<Item = ClientId> + '_ {
        self.buckets
            .get(key)
            .into_iter()
            .flat_map(|bucket| bucket.iter().copied())
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn add_then_get_roundtrips() {
        let mut index = SubscriptionIndex::new();
        let client = ClientId(Ulid::new());
        index.add("a:b", client);
        assert_eq!(index.get("a:b").collect::<Vec<_>>(), vec![client]);
        assert!(index.get("a:c").collect::<Vec<_>>().is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut index = SubscriptionIndex::new();
        let client = ClientId(Ulid::new());
        index.add("a", client);
        index.remove("a", client);
        index.remove("a", client);
        assert!(index.get("a").collect::<Vec<_>>().is_empty());
    }
}
