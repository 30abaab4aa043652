use crate::{
    exchange::{
        Exchange, ExchangeFactory, ExchangeResult, Operation, OperationResult, OperationType
    },
    utils::collect_typenames,
    CacheOutcome, RequestPolicy, Response
};
use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc
};
use tracing::{debug, trace};

type ResultCache = Arc<Mutex<FnvHashMap<u64, Response<Value>>>>;
type OperationCache = Arc<Mutex<HashMap<String, FnvHashSet<u64>>>>;

/// The default cache exchange.
///
/// Stores whole query results by operation key and evicts every result sharing a `__typename`
/// with a mutation result.
pub struct CacheExchange;

impl<TNext: Exchange> ExchangeFactory<TNext> for CacheExchange {
    type Output = CacheExchangeImpl<TNext>;

    fn build(self, next: TNext) -> Self::Output {
        CacheExchangeImpl {
            result_cache: ResultCache::default(),
            operation_cache: OperationCache::default(),

            next
        }
    }
}

pub struct CacheExchangeImpl<TNext: Exchange> {
    result_cache: ResultCache,
    operation_cache: OperationCache,

    next: TNext
}

#[inline]
fn should_skip(operation: &Operation) -> bool {
    let operation_type = &operation.meta.operation_type;
    operation_type != &OperationType::Query && operation_type != &OperationType::Mutation
}

impl<TNext: Exchange> CacheExchangeImpl<TNext> {
    fn is_operation_cached(&self, operation: &Operation) -> bool {
        let operation_type = &operation.meta.operation_type;
        let request_policy = &operation.context.request_policy;

        operation_type == &OperationType::Query
            && request_policy != &RequestPolicy::NetworkOnly
            && (request_policy == &RequestPolicy::CacheOnly
                || self.result_cache.lock().contains_key(&operation.key))
    }

    fn after_query(&self, operation_result: &OperationResult) {
        let data = match operation_result.response.data {
            Some(ref data) => data,
            None => return
        };

        let key = operation_result.key();
        let mut typenames = HashSet::new();
        collect_typenames(data, &mut typenames);

        self.result_cache
            .lock()
            .insert(key, operation_result.response.clone());

        let mut operation_cache = self.operation_cache.lock();
        for typename in typenames {
            operation_cache.entry(typename).or_default().insert(key);
        }
        trace!(key, "cached query result");
    }

    fn after_mutation(&self, operation_result: &OperationResult) {
        let data = match operation_result.response.data {
            Some(ref data) => data,
            None => return
        };

        let mut typenames = HashSet::new();
        collect_typenames(data, &mut typenames);

        let ops_to_remove: FnvHashSet<u64> = {
            let operation_cache = self.operation_cache.lock();
            typenames
                .iter()
                .filter_map(|typename| operation_cache.get(typename))
                .flatten()
                .copied()
                .collect()
        };

        let mut result_cache = self.result_cache.lock();
        for op in ops_to_remove.iter() {
            result_cache.remove(op);
        }
        debug!(
            key = operation_result.key(),
            evicted = ops_to_remove.len(),
            "mutation invalidated cached queries"
        );
    }
}

#[async_trait]
impl<TNext: Exchange> Exchange for CacheExchangeImpl<TNext> {
    async fn run(&self, operation: Operation) -> ExchangeResult {
        if should_skip(&operation) {
            return self.next.run(operation).await;
        }

        if self.is_operation_cached(&operation) {
            let cached = self.result_cache.lock().get(&operation.key).cloned();
            let mut operation = operation;

            if let Some(response) = cached {
                operation.context.cache_outcome = Some(CacheOutcome::Hit);
                return Ok(OperationResult::new(operation, response));
            } else if operation.context.request_policy == RequestPolicy::CacheOnly {
                operation.context.cache_outcome = Some(CacheOutcome::Miss);
                let empty = Response {
                    data: None,
                    errors: None
                };
                return Ok(OperationResult::new(operation, empty));
            }

            return self.forward(operation).await;
        }

        self.forward(operation).await
    }
}

impl<TNext: Exchange> CacheExchangeImpl<TNext> {
    async fn forward(&self, operation: Operation) -> ExchangeResult {
        let operation_type = operation.meta.operation_type;
        let mut result = self.next.run(operation).await?;
        if result.operation.context.cache_outcome.is_none() {
            result.operation.context.cache_outcome = Some(CacheOutcome::Miss);
        }

        match operation_type {
            OperationType::Query => self.after_query(&result),
            OperationType::Mutation => self.after_mutation(&result),
            _ => {}
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::CacheExchange;
    use crate::{
        exchange::{
            Exchange, ExchangeFactory, ExchangeResult, Operation, OperationContext,
            OperationMeta, OperationResult, OperationType
        },
        CacheOutcome, QueryBody, RequestPolicy, Response
    };
    use serde_json::{json, Value};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc
    };

    struct FakeFetch {
        calls: Arc<AtomicUsize>
    }

    #[async_trait]
    impl Exchange for FakeFetch {
        async fn run(&self, operation: Operation) -> ExchangeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let data = match operation.meta.operation_type {
                OperationType::Mutation => json!({
                    "updateFilm": { "__typename": "Film", "id": "1", "title": "new" }
                }),
                _ => json!({ "film": { "__typename": "Film", "id": "1", "title": "old" } })
            };
            Ok(OperationResult::new(
                operation,
                Response {
                    data: Some(data),
                    errors: None
                }
            ))
        }
    }

    fn make_op(key: u64, operation_type: OperationType, request_policy: RequestPolicy) -> Operation {
        Operation {
            key,
            meta: OperationMeta {
                query_key: key as u32,
                operation_type
            },
            query: QueryBody {
                variables: Value::Null,
                query: "",
                operation_name: "Test"
            },
            context: OperationContext {
                url: "http://0.0.0.0".to_string(),
                extra_headers: None,
                request_policy,
                extensions: None,
                abort: None,
                cache_outcome: None
            }
        }
    }

    #[tokio::test]
    async fn serves_repeated_queries_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let exchange = CacheExchange.build(FakeFetch {
            calls: calls.clone()
        });

        let first = exchange
            .run(make_op(1, OperationType::Query, RequestPolicy::CacheFirst))
            .await
            .unwrap();
        let second = exchange
            .run(make_op(1, OperationType::Query, RequestPolicy::CacheFirst))
            .await
            .unwrap();

        assert_eq!(first.cache_outcome(), Some(CacheOutcome::Miss));
        assert_eq!(second.cache_outcome(), Some(CacheOutcome::Hit));
        assert_eq!(second.response, first.response);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn network_only_skips_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let exchange = CacheExchange.build(FakeFetch {
            calls: calls.clone()
        });

        for _ in 0..2 {
            let result = exchange
                .run(make_op(1, OperationType::Query, RequestPolicy::NetworkOnly))
                .await
                .unwrap();
            assert_eq!(result.cache_outcome(), Some(CacheOutcome::Miss));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_only_misses_without_fetching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let exchange = CacheExchange.build(FakeFetch {
            calls: calls.clone()
        });

        let result = exchange
            .run(make_op(1, OperationType::Query, RequestPolicy::CacheOnly))
            .await
            .unwrap();

        assert_eq!(result.cache_outcome(), Some(CacheOutcome::Miss));
        assert!(result.response.data.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mutations_invalidate_queries_with_shared_types() {
        let calls = Arc::new(AtomicUsize::new(0));
        let exchange = CacheExchange.build(FakeFetch {
            calls: calls.clone()
        });

        exchange
            .run(make_op(1, OperationType::Query, RequestPolicy::CacheFirst))
            .await
            .unwrap();
        exchange
            .run(make_op(2, OperationType::Mutation, RequestPolicy::CacheFirst))
            .await
            .unwrap();
        let result = exchange
            .run(make_op(1, OperationType::Query, RequestPolicy::CacheFirst))
            .await
            .unwrap();

        assert_eq!(result.cache_outcome(), Some(CacheOutcome::Miss));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
