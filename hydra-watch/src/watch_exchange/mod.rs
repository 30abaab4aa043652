//! Contains the exchange factory and implementation. The factory is the only thing needed for most
//! users and is reexported from the root.

use crate::{
    cache::{WatchCache, WatchState},
    types::WatchExtension,
    walker::walk_entities
};
use fnv::FnvHashSet;
use hydra::{
    exchange::{Exchange, ExchangeFactory, ExchangeResult, Operation, OperationResult},
    CacheOutcome, RequestPolicy
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};


/// The watch exchange. Remembers which watched queries read which entities and wakes them up
/// when a fresh response contains one of those entities again.
///
/// Put it in front of the document cache so it can see whether a result was a cache hit:
///
/// ```
/// # use hydra::{default_exchanges::{CacheExchange, FetchExchange}, Client};
/// # use hydra_watch::{WatchCache, WatchExchange};
/// # use std::sync::Arc;
/// let cache = Arc::new(WatchCache::new());
/// let client = Client::builder("http://localhost:3000/graphql")
///     .with_exchange(FetchExchange)
///     .with_exchange(CacheExchange)
///     .with_exchange(WatchExchange::new(cache.clone()))
///     .build();
/// ```
pub struct WatchExchange {
    cache: Arc<WatchCache>
}

impl WatchExchange {
    pub fn new(cache: Arc<WatchCache>) -> Self {
        Self { cache }
    }
}

impl<TNext: Exchange> ExchangeFactory<TNext> for WatchExchange {
    type Output = WatchExchangeImpl<TNext>;

    fn build(self, next: TNext) -> WatchExchangeImpl<TNext> {
        WatchExchangeImpl {
            cache: self.cache,
            next
        }
    }
}

/// The implementation of the watch exchange. Exposed in case someone needs to drive it by hand,
/// most users shouldn't.
pub struct WatchExchangeImpl<TNext: Exchange> {
    cache: Arc<WatchCache>,
    next: TNext
}

fn has_data(result: &OperationResult) -> Option<&Value> {
    match result.response.data {
        Some(Value::Null) | None => None,
        Some(ref data) => Some(data)
    }
}

/// Lists `query_key` under every entity in `data`.
pub(crate) fn set_dependencies(state: &mut WatchState, query_key: u64, data: &Value) {
    let mut recorded = 0usize;
    walk_entities(data, &mut |entity| {
        state.dependencies.record(entity.key(), query_key);
        recorded += 1;
    });
    trace!(key = query_key, entities = recorded, "registered dependencies");
}

/// Wakes every query depending on an entity in `data`, skipping the ones already in `hits`.
///
/// Each woken query loses its trigger and is dropped from the entities it was listed under, so
/// it has to register again to be woken a second time. `origin` is the query that produced the
/// data and keeps its own registrations. Returns the queries that were woken.
pub(crate) fn trigger_dependencies(
    state: &mut WatchState,
    data: &Value,
    origin: u64,
    hits: &mut FnvHashSet<u64>
) -> Vec<u64> {
    let mut woken = Vec::new();
    walk_entities(data, &mut |entity| {
        let key = entity.key();
        let dependents = state.dependencies.lookup(&key).to_vec();
        if dependents.is_empty() {
            return;
        }

        for dependent in dependents {
            if !hits.insert(dependent) {
                continue;
            }
            // The consumer may already be gone
            if let Some(trigger) = state.triggers.delete(dependent) {
                trigger.increment();
                woken.push(dependent);
            }
        }
        state
            .dependencies
            .retain(&key, |dependent| dependent == origin || !hits.contains(&dependent));
    });
    woken
}

impl<TNext: Exchange> WatchExchangeImpl<TNext> {
    /// Registers the operation's trigger and prefers the cache for re-runs.
    pub fn process_request(&self, operation: &mut Operation) {
        let trigger = match operation.context.extension::<WatchExtension>() {
            Some(extension) => extension.trigger.clone(),
            None => return
        };

        let rerun = trigger.value() > 0;
        self.cache.lock().triggers.set(operation.key, trigger);

        if rerun {
            operation.context.request_policy = RequestPolicy::CacheFirst;
        }
    }

    /// Wakes dependent queries with fresh data and records the dependencies of first runs.
    pub fn process_response(&self, result: &OperationResult) {
        if result.operation.context.is_aborted() {
            return;
        }
        let data = match has_data(result) {
            Some(data) => data,
            None => return
        };

        let key = result.key();
        let mut state = self.cache.lock();

        if result.cache_outcome() != Some(CacheOutcome::Hit) {
            let mut hits = FnvHashSet::default();
            hits.insert(key);
            let woken = trigger_dependencies(&mut state, data, key, &mut hits);
            if !woken.is_empty() {
                debug!(key, woken = ?woken, "woke dependent queries");
            }
        }

        let first_run = state
            .triggers
            .get(key)
            .map(|trigger| trigger.value() == 0)
            .unwrap_or(false);
        if first_run {
            set_dependencies(&mut state, key, data);
        }
    }
}

#[async_trait]
impl<TNext: Exchange> Exchange for WatchExchangeImpl<TNext> {
    async fn run(&self, operation: Operation) -> ExchangeResult {
        let mut operation = operation;
        self.process_request(&mut operation);

        let result = self.next.run(operation).await?;
        self.process_response(&result);
        Ok(result)
    }
}
