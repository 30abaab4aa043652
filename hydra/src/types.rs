use crate::{QueryBody, QueryError, Response};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type ExchangeResult = Result<OperationResult, QueryError>;

/// A single step in the exchange chain. Exchanges wrap the next exchange and may act on the
/// operation before forwarding it and on the result after it comes back.
#[async_trait]
pub trait Exchange: Send + Sync + 'static {
    async fn run(&self, operation: Operation) -> ExchangeResult;
}

/// Builds an exchange around the next one in the chain.
pub trait ExchangeFactory<TNext: Exchange> {
    type Output: Exchange;

    fn build(self, next: TNext) -> Self::Output;
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPolicy {
    CacheFirst,
    CacheOnly,
    NetworkOnly,
    CacheAndNetwork
}

/// Whether a result was resolved locally or by going down the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOutcome {
    Hit,
    Miss
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderPair(pub String, pub String);

pub type HeaderFn = Arc<dyn Fn() -> Vec<HeaderPair> + Send + Sync>;

pub type ExtensionMap = type_map::concurrent::TypeMap;

/// Arbitrary data attached to an operation. Exchanges look up their own types in here.
pub type Extensions = Arc<ExtensionMap>;

#[derive(Clone, Debug)]
pub struct OperationMeta {
    pub query_key: u32,
    pub operation_type: OperationType
}

#[derive(Clone)]
pub struct OperationContext {
    pub url: String,
    pub extra_headers: Option<HeaderFn>,
    pub request_policy: RequestPolicy,
    pub extensions: Option<Extensions>,
    /// Fires when the consumer that issued the operation goes away.
    pub abort: Option<CancellationToken>,
    /// Set on the way back up by whichever exchange resolved the operation.
    pub cache_outcome: Option<CacheOutcome>
}

impl OperationContext {
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.as_ref().and_then(|ext| ext.get::<T>())
    }

    pub fn is_aborted(&self) -> bool {
        self.abort
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct Operation {
    /// Unique per query and set of variables.
    pub key: u64,
    pub meta: OperationMeta,
    pub query: QueryBody<Value>,
    pub context: OperationContext
}

#[derive(Clone)]
pub struct OperationResult {
    pub operation: Operation,
    pub response: Response<Value>
}

impl OperationResult {
    pub fn new(operation: Operation, response: Response<Value>) -> Self {
        Self {
            operation,
            response
        }
    }

    pub fn key(&self) -> u64 {
        self.operation.key
    }

    pub fn cache_outcome(&self) -> Option<CacheOutcome> {
        self.operation.context.cache_outcome
    }
}

/// Per-call overrides for the client defaults.
#[derive(Default, Clone)]
pub struct QueryOptions {
    pub url: Option<String>,
    pub extra_headers: Option<HeaderFn>,
    pub request_policy: Option<RequestPolicy>,
    pub extensions: Option<Extensions>,
    pub abort: Option<CancellationToken>
}
