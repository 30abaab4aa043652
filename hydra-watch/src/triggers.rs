use fnv::FnvHashMap;
use std::{fmt, sync::Arc};
use tokio::sync::watch;

/// A shared counter that wakes a watched query when incremented.
///
/// Clones share the same cell. Subscribers get a `watch::Receiver` that resolves on every
/// increment.
#[derive(Clone)]
pub struct Trigger {
    cell: Arc<watch::Sender<u64>>
}

impl Trigger {
    pub fn new(value: u64) -> Self {
        let (sender, _) = watch::channel(value);
        Trigger {
            cell: Arc::new(sender)
        }
    }

    pub fn value(&self) -> u64 {
        *self.cell.borrow()
    }

    pub fn increment(&self) {
        self.cell.send_modify(|value| *value += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.cell.subscribe()
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Trigger) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("value", &self.value())
            .finish()
    }
}

/// At most one trigger per watched query.
#[derive(Clone, Debug, Default)]
pub struct TriggerRegistry {
    triggers: FnvHashMap<u64, Trigger>
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, query_key: u64, trigger: Trigger) {
        self.triggers.insert(query_key, trigger);
    }

    pub fn get(&self, query_key: u64) -> Option<&Trigger> {
        self.triggers.get(&query_key)
    }

    pub fn delete(&mut self, query_key: u64) -> Option<Trigger> {
        self.triggers.remove(&query_key)
    }

    /// Removes every entry holding `trigger` and returns their query keys.
    pub fn delete_cell(&mut self, trigger: &Trigger) -> Vec<u64> {
        let keys: Vec<u64> = self
            .triggers
            .iter()
            .filter(|(_, registered)| registered.ptr_eq(trigger))
            .map(|(key, _)| *key)
            .collect();
        for key in &keys {
            self.triggers.remove(key);
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Trigger)> {
        self.triggers.iter().map(|(key, trigger)| (*key, trigger))
    }
}

#[cfg(test)]
mod tests {
    use super::{Trigger, TriggerRegistry};

    #[tokio::test]
    async fn increments_wake_subscribers() {
        let trigger = Trigger::new(0);
        let mut changes = trigger.subscribe();

        trigger.clone().increment();

        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow(), 1);
        assert_eq!(trigger.value(), 1);
    }

    #[test]
    fn increments_without_subscribers() {
        let trigger = Trigger::new(1);
        trigger.increment();
        trigger.increment();

        assert_eq!(trigger.value(), 3);
    }

    #[test]
    fn registry_holds_one_trigger_per_query() {
        let first = Trigger::new(0);
        let second = Trigger::new(0);
        let mut registry = TriggerRegistry::new();

        registry.set(1, first.clone());
        registry.set(1, second.clone());

        assert!(registry.get(1).unwrap().ptr_eq(&second));
        assert!(!registry.get(1).unwrap().ptr_eq(&first));
        assert!(registry.delete(1).is_some());
        assert!(registry.get(1).is_none());
    }

    #[test]
    fn deletes_every_entry_of_a_cell() {
        let shared = Trigger::new(0);
        let mut registry = TriggerRegistry::new();
        registry.set(1, shared.clone());
        registry.set(2, shared.clone());
        registry.set(3, Trigger::new(0));

        let mut removed = registry.delete_cell(&shared);
        removed.sort_unstable();

        assert_eq!(removed, vec![1, 2]);
        assert_eq!(registry.len(), 1);
    }
}
