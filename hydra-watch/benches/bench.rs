use criterion::{
    criterion_group, criterion_main, measurement::WallTime, BatchSize, BenchmarkGroup,
    BenchmarkId, Criterion, Throughput
};
use hydra::{
    default_exchanges::TerminatorExchange,
    exchange::{
        ExchangeFactory, Operation, OperationContext, OperationMeta, OperationResult,
        OperationType
    },
    ext, CacheOutcome, QueryBody, RequestPolicy, Response
};
use hydra_watch::{
    walker::extract_entities, Trigger, WatchCache, WatchExchange, WatchExchangeImpl,
    WatchExtension
};
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;

criterion_group!(benches, walk, wake_up);
criterion_main!(benches);

pub fn walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk");

    benchmark_walk(&mut group, 100);
    benchmark_walk(&mut group, 1000);
    benchmark_walk(&mut group, 10000);

    group.finish();
}

pub fn wake_up(c: &mut Criterion) {
    let mut group = c.benchmark_group("wake up");

    benchmark_wake_up(&mut group, 100);
    benchmark_wake_up(&mut group, 1000);

    group.finish();
}

fn make_film(i: usize) -> Value {
    let mut rand = rand::thread_rng();
    json!({
        "__typename": "Film",
        "id": i.to_string(),
        "title": format!("film {}", i),
        "rating": rand.gen_range(0..100),
        "director": { "__typename": "Person", "id": format!("p{}", i % 17) },
        "tags": ["space", "opera"]
    })
}

fn make_films(n: usize) -> Value {
    let films: Vec<Value> = (0..n).map(make_film).collect();
    json!({ "films": films })
}

fn make_operation(key: u64, trigger: Option<Trigger>) -> Operation {
    Operation {
        key,
        meta: OperationMeta {
            query_key: 1,
            operation_type: OperationType::Query
        },
        query: QueryBody {
            variables: Value::Null,
            query: "",
            operation_name: ""
        },
        context: OperationContext {
            url: "".to_string(),
            extra_headers: None,
            request_policy: RequestPolicy::CacheFirst,
            extensions: trigger.map(|trigger| ext![WatchExtension { trigger }]),
            abort: None,
            cache_outcome: Some(CacheOutcome::Miss)
        }
    }
}

fn make_result(operation: Operation, data: Value) -> OperationResult {
    OperationResult::new(
        operation,
        Response {
            data: Some(data),
            errors: None
        }
    )
}

fn benchmark_walk(group: &mut BenchmarkGroup<WallTime>, n: usize) {
    let data = make_films(n);

    group.throughput(Throughput::Elements(n as u64));
    group.sample_size(usize::max(10, 10000 / n));
    group.bench_with_input(
        BenchmarkId::new("films", format!("{} entries", n)),
        &data,
        |b, data| b.iter(|| extract_entities(data).len())
    );
}

/// `n` watched queries each read one film, then a single response updates all of them.
fn watched_exchange(n: usize) -> WatchExchangeImpl<TerminatorExchange> {
    let exchange = WatchExchange::new(Arc::new(WatchCache::new())).build(TerminatorExchange);
    for key in 0..n {
        let mut operation = make_operation(key as u64, Some(Trigger::new(0)));
        exchange.process_request(&mut operation);
        let data = json!({ "film": make_film(key) });
        exchange.process_response(&make_result(operation, data));
    }
    exchange
}

fn benchmark_wake_up(group: &mut BenchmarkGroup<WallTime>, n: usize) {
    let update = make_result(make_operation(u64::MAX, None), make_films(n));

    group.throughput(Throughput::Elements(n as u64));
    group.sample_size(10);
    group.bench_with_input(
        BenchmarkId::new("queries", format!("{} watchers", n)),
        &update,
        |b, update| {
            b.iter_batched(
                || watched_exchange(n),
                |exchange| exchange.process_response(update),
                BatchSize::SmallInput
            )
        }
    );
}
