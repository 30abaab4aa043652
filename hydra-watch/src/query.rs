use crate::{
    cache::WatchCache,
    context::RenderContext,
    error::WatchError,
    triggers::Trigger,
    types::{Environment, WatchExtension}
};
use futures::{
    stream::{self, BoxStream},
    Stream, StreamExt
};
use hydra::{
    client::decode_response,
    exchange::{Exchange, Operation},
    Client, CombinedError, ExtensionMap, GraphQLQuery, QueryError, QueryOptions, Response
};
use std::{
    marker::PhantomData,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll}
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// A result in a form that can be handed to a UI layer or serialized along with the render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse<D> {
    pub data: Option<D>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CombinedError>
}

impl<D: Clone> QueryResponse<D> {
    pub fn from_result(result: Result<Response<D>, QueryError>) -> Self {
        let error = CombinedError::from_result(&result);
        QueryResponse {
            data: result.ok().and_then(|response| response.data),
            error
        }
    }
}

/// Per-query settings.
#[derive(Clone, Default)]
pub struct QueryConfig {
    /// Overrides [`WatchOptions::watch`](./struct.WatchOptions.html#structfield.watch).
    pub watch: Option<bool>,
    pub options: QueryOptions
}

struct Teardown {
    abort: CancellationToken,
    release: Option<(Arc<WatchCache>, Trigger)>
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.abort.cancel();
        if let Some((cache, trigger)) = self.release.take() {
            cache.release(&trigger);
        }
    }
}

/// The results of a query, as a stream.
///
/// On the server the stream yields the first result and ends. On the client a watched query keeps
/// going: every time one of the entities it read comes back fresh from another operation, it runs
/// again and yields the new result.
///
/// Dropping the stream aborts the request in flight and stops watching.
pub struct WatchedQuery<Q: GraphQLQuery> {
    results: BoxStream<'static, QueryResponse<Q::ResponseData>>,
    key: u64,
    trigger: Option<Trigger>,
    _teardown: Teardown,
    _query: PhantomData<fn() -> Q>
}

impl<Q: GraphQLQuery> WatchedQuery<Q> {
    /// The operation key shared by every run of this query.
    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn trigger(&self) -> Option<&Trigger> {
        self.trigger.as_ref()
    }
}

impl<Q: GraphQLQuery> Stream for WatchedQuery<Q> {
    type Item = QueryResponse<Q::ResponseData>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.results.poll_next_unpin(cx)
    }
}

struct QueryState<M: Exchange> {
    client: Client<M>,
    operation: Operation,
    abort: CancellationToken,
    changes: Option<watch::Receiver<u64>>,
    /// Set for watched client queries, which register again after every result.
    registration: Option<(Arc<WatchCache>, Trigger)>,
    first: bool
}

impl<M: Exchange> QueryState<M> {
    /// Waits for the trigger to move. `false` means the query is done.
    async fn wait_for_wake_up(&mut self) -> bool {
        let changes = match self.changes {
            Some(ref mut changes) => changes,
            None => return false
        };
        tokio::select! {
            biased;
            _ = self.abort.cancelled() => false,
            changed = changes.changed() => changed.is_ok()
        }
    }

    async fn run<Q: GraphQLQuery>(&self) -> Result<Response<Q::ResponseData>, QueryError> {
        let mut operation = self.operation.clone();
        operation.context.abort = Some(self.abort.child_token());
        let result = self.client.execute(operation).await?;
        if let (Some((cache, trigger)), Some(data)) =
            (&self.registration, result.response.data.as_ref())
        {
            cache.register(result.key(), trigger, data);
        }
        decode_response::<Q>(result.response)
    }
}

/// Adds the watch extension to the operation. Extensions shared with other operations can't be
/// extended, in which case the operation is left alone and `false` is returned.
fn attach_trigger(operation: &mut Operation, trigger: Trigger) -> bool {
    let mut extensions = match operation.context.extensions.take() {
        None => ExtensionMap::new(),
        Some(extensions) => match Arc::try_unwrap(extensions) {
            Ok(extensions) => extensions,
            Err(shared) => {
                operation.context.extensions = Some(shared);
                return false;
            }
        }
    };
    extensions.insert(WatchExtension { trigger });
    operation.context.extensions = Some(Arc::new(extensions));
    true
}

impl<M: Exchange> RenderContext<M> {
    /// Runs a query and keeps it up to date, see [`WatchedQuery`](./struct.WatchedQuery.html).
    pub async fn query<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
        config: QueryConfig
    ) -> Result<WatchedQuery<Q>, WatchError> {
        let client = self.client().await?;
        let environment = self.options().environment;
        let watch = config.watch.unwrap_or(self.options().watch);
        let mut options = config.options;
        let abort = options
            .abort
            .take()
            .map(|parent| parent.child_token())
            .unwrap_or_else(CancellationToken::new);

        let mut operation = client.create_request_operation::<Q>(variables, options)?;
        let trigger = if watch {
            // A query resumed from the server picks up the cell it was registered with
            let trigger = match environment {
                Environment::Client => self.watch_cache().trigger(operation.key),
                Environment::Server => None
            }
            .unwrap_or_else(|| Trigger::new(environment.initial_trigger_value()));

            if attach_trigger(&mut operation, trigger.clone()) {
                Some(trigger)
            } else {
                debug!(key = operation.key, "extensions are shared, query won't be watched");
                None
            }
        } else {
            None
        };

        let key = operation.key;
        let changes = match (environment, &trigger) {
            (Environment::Client, Some(trigger)) => Some(trigger.subscribe()),
            _ => None
        };
        let registration = match (environment, &trigger) {
            (Environment::Client, Some(trigger)) => {
                Some((self.watch_cache().clone(), trigger.clone()))
            }
            _ => None
        };
        let release = registration.clone();
        trace!(key, watch, ?environment, "starting query");

        let state = QueryState {
            client,
            operation,
            abort: abort.clone(),
            changes,
            registration,
            first: true
        };
        let results = stream::unfold(state, |mut state| async move {
            if !state.first && !state.wait_for_wake_up().await {
                return None;
            }
            state.first = false;

            let result = state.run::<Q>().await;
            if matches!(result, Err(ref e) if e.is_aborted()) {
                return None;
            }
            Some((QueryResponse::from_result(result), state))
        })
        .boxed();

        Ok(WatchedQuery {
            results,
            key,
            trigger,
            _teardown: Teardown { abort, release },
            _query: PhantomData
        })
    }

    /// Runs a mutation once. Failures come back as
    /// [`QueryResponse::error`](./struct.QueryResponse.html#structfield.error).
    pub async fn mutate<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
        options: QueryOptions
    ) -> Result<QueryResponse<Q::ResponseData>, WatchError> {
        let client = self.client().await?;
        let operation = client.create_request_operation::<Q>(variables, options)?;
        let result = client
            .execute(operation)
            .await
            .and_then(|result| decode_response::<Q>(result.response));
        Ok(QueryResponse::from_result(result))
    }
}
