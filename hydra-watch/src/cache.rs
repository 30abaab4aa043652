use crate::{
    dependencies::DependencyIndex,
    triggers::{Trigger, TriggerRegistry},
    walker::{walk_entities, EntityKey}
};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub(crate) struct WatchState {
    pub(crate) dependencies: DependencyIndex,
    pub(crate) triggers: TriggerRegistry
}

/// The state shared by the watch exchange and the queries of one render context.
///
/// Create one per render, hand it to
/// [`WatchExchange::new`](./struct.WatchExchange.html#method.new) when building the client, and
/// [`snapshot`](#method.snapshot) it at the end of a server render so the client can
/// [`resume`](#method.resume) where the server left off.
#[derive(Debug, Default)]
pub struct WatchCache {
    state: Mutex<WatchState>
}

/// The serializable form of a [`WatchCache`](./struct.WatchCache.html).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchSnapshot {
    pub dependencies: DependencyIndex,
    /// Trigger values by query key.
    pub triggers: BTreeMap<u64, u64>
}

impl WatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the cache from a snapshot. Every trigger becomes a fresh cell holding its saved
    /// value; consumers adopt them through [`trigger`](#method.trigger).
    pub fn resume(snapshot: WatchSnapshot) -> Self {
        let mut triggers = TriggerRegistry::new();
        for (query_key, value) in snapshot.triggers {
            triggers.set(query_key, Trigger::new(value));
        }
        debug!(
            dependencies = snapshot.dependencies.len(),
            triggers = triggers.len(),
            "resumed watch cache"
        );

        WatchCache {
            state: Mutex::new(WatchState {
                dependencies: snapshot.dependencies,
                triggers
            })
        }
    }

    pub fn snapshot(&self) -> WatchSnapshot {
        let state = self.state.lock();
        WatchSnapshot {
            dependencies: state.dependencies.clone(),
            triggers: state
                .triggers
                .iter()
                .map(|(query_key, trigger)| (query_key, trigger.value()))
                .collect()
        }
    }

    /// The trigger registered for a query, if it's being watched.
    pub fn trigger(&self, query_key: u64) -> Option<Trigger> {
        self.state.lock().triggers.get(query_key).cloned()
    }

    /// The queries currently depending on an entity.
    pub fn dependencies(&self, entity: &EntityKey) -> Vec<u64> {
        self.state.lock().dependencies.lookup(entity).to_vec()
    }

    /// Watches a query again after it ran: `trigger` is registered for `query_key` and the query
    /// is listed under every entity in `data` it isn't listed under yet.
    ///
    /// A wake-up forgets the woken query, so a consumer that wants to keep following its entities
    /// calls this after every result.
    pub fn register(&self, query_key: u64, trigger: &Trigger, data: &Value) {
        let mut state = self.state.lock();
        state.triggers.set(query_key, trigger.clone());

        let mut recorded = 0usize;
        walk_entities(data, &mut |entity| {
            let key = entity.key();
            if !state.dependencies.lookup(&key).contains(&query_key) {
                state.dependencies.record(key, query_key);
                recorded += 1;
            }
        });
        trace!(key = query_key, entities = recorded, "re-registered watched query");
    }

    /// Stops watching every query registered with `trigger`. Called when a consumer tears down.
    pub fn release(&self, trigger: &Trigger) {
        let mut state = self.state.lock();
        let released = state.triggers.delete_cell(trigger);
        for query_key in &released {
            state.dependencies.remove_query(*query_key);
        }
        if !released.is_empty() {
            debug!(queries = ?released, "released watched queries");
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock()
    }
}
