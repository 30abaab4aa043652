use crate::{
    cache::WatchCache,
    client_cache::ClientCache,
    error::WatchError,
    types::WatchOptions
};
use futures::future::{BoxFuture, FutureExt};
use hydra::{exchange::Exchange, Client};
use std::{fmt, future::Future, sync::Arc};
use tracing::debug;

/// Tokens for the current user, handed to the client factory so it can authenticate requests.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub token: Option<String>,
    pub refresh: Option<String>
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// What a [`ClientFactory`](./trait.ClientFactory.html) gets to build a client with.
#[derive(Clone, Debug)]
pub struct FactoryParams {
    /// Pass this to [`WatchExchange::new`](./struct.WatchExchange.html#method.new).
    pub watch_cache: Arc<WatchCache>,
    pub auth_tokens: Option<AuthTokens>
}

/// Builds the client of a render context. Implemented for any
/// `Fn(FactoryParams) -> impl Future<Output = C>`.
pub trait ClientFactory<C>: Send + Sync + 'static {
    fn create(&self, params: FactoryParams) -> BoxFuture<'static, C>;
}

impl<C, F, Fut> ClientFactory<C> for F
where
    F: Fn(FactoryParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = C> + Send + 'static
{
    fn create(&self, params: FactoryParams) -> BoxFuture<'static, C> {
        self(params).boxed()
    }
}

struct ContextInner<M: Exchange> {
    id: String,
    clients: Arc<ClientCache<Client<M>>>,
    factory: Option<Arc<dyn ClientFactory<Client<M>>>>,
    watch_cache: Arc<WatchCache>,
    auth_tokens: Option<AuthTokens>,
    options: WatchOptions
}

impl<M: Exchange> Drop for ContextInner<M> {
    fn drop(&mut self) {
        self.clients.gc(&self.id);
    }
}

/// Everything the queries of one render share: the client, the watch state and the options.
///
/// Cloning is cheap. When the last clone goes away the render's client is removed from the
/// [`ClientCache`](./struct.ClientCache.html).
pub struct RenderContext<M: Exchange> {
    inner: Arc<ContextInner<M>>
}

impl<M: Exchange> Clone for RenderContext<M> {
    fn clone(&self) -> Self {
        RenderContext {
            inner: self.inner.clone()
        }
    }
}

impl<M: Exchange> RenderContext<M> {
    pub fn builder<I: Into<String>>(
        id: I,
        clients: Arc<ClientCache<Client<M>>>
    ) -> RenderContextBuilder<M> {
        RenderContextBuilder {
            id: id.into(),
            clients,
            factory: None,
            watch_cache: None,
            auth_tokens: None,
            options: WatchOptions::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn watch_cache(&self) -> &Arc<WatchCache> {
        &self.inner.watch_cache
    }

    pub fn auth_tokens(&self) -> Option<&AuthTokens> {
        self.inner.auth_tokens.as_ref()
    }

    pub fn options(&self) -> &WatchOptions {
        &self.inner.options
    }

    /// The client of this render, built on first use.
    ///
    /// Fails with [`WatchError::ClientFactoryNotFound`](./enum.WatchError.html) if no factory was
    /// registered and no client exists for this render yet.
    pub async fn client(&self) -> Result<Client<M>, WatchError> {
        let inner = &self.inner;
        match inner.factory {
            Some(ref factory) => {
                let params = FactoryParams {
                    watch_cache: inner.watch_cache.clone(),
                    auth_tokens: inner.auth_tokens.clone()
                };
                let client = inner
                    .clients
                    .get_or_create(&inner.id, move || factory.create(params))
                    .await;
                Ok(client)
            }
            None => inner
                .clients
                .get_client(&inner.id)
                .await
                .ok_or(WatchError::ClientFactoryNotFound)
        }
    }

    /// Removes this render's client from the cache right away instead of waiting for the last
    /// handle to drop.
    pub fn finish(&self) {
        if self.inner.clients.gc(&self.inner.id) {
            debug!(id = %self.inner.id, "render finished");
        }
    }
}

pub struct RenderContextBuilder<M: Exchange> {
    id: String,
    clients: Arc<ClientCache<Client<M>>>,
    factory: Option<Arc<dyn ClientFactory<Client<M>>>>,
    watch_cache: Option<Arc<WatchCache>>,
    auth_tokens: Option<AuthTokens>,
    options: WatchOptions
}

impl<M: Exchange> RenderContextBuilder<M> {
    pub fn with_factory<F: ClientFactory<Client<M>>>(mut self, factory: F) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Use existing watch state, for example one resumed from a server snapshot.
    pub fn with_watch_cache(mut self, watch_cache: Arc<WatchCache>) -> Self {
        self.watch_cache = Some(watch_cache);
        self
    }

    pub fn with_auth_tokens(mut self, auth_tokens: AuthTokens) -> Self {
        self.auth_tokens = Some(auth_tokens);
        self
    }

    pub fn with_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> RenderContext<M> {
        RenderContext {
            inner: Arc::new(ContextInner {
                id: self.id,
                clients: self.clients,
                factory: self.factory,
                watch_cache: self.watch_cache.unwrap_or_default(),
                auth_tokens: self.auth_tokens,
                options: self.options
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthTokens, FactoryParams, RenderContext};
    use crate::{client_cache::ClientCache, error::WatchError, WatchCache, WatchExchange};
    use hydra::Client;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc
    };

    type TestClient = Client<crate::WatchExchangeImpl<hydra::default_exchanges::TerminatorExchange>>;

    fn make_client(params: FactoryParams) -> TestClient {
        Client::builder("http://0.0.0.0")
            .with_exchange(WatchExchange::new(params.watch_cache))
            .build()
    }

    #[tokio::test]
    async fn builds_one_client_per_render() {
        let clients: Arc<ClientCache<TestClient>> = Arc::new(ClientCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let context = RenderContext::builder("render-1", clients.clone())
            .with_factory(move |params: FactoryParams| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { make_client(params) }
            })
            .build();

        let a = context.client().await.unwrap();
        let b = context.clone().client().await.unwrap();

        assert!(a.ptr_eq(&b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clients.contains("render-1"));
    }

    #[tokio::test]
    async fn missing_factory_fails_fast() {
        let clients: Arc<ClientCache<TestClient>> = Arc::new(ClientCache::default());
        let context = RenderContext::builder("render-1", clients).build();

        let result = context.client().await;

        assert!(matches!(result, Err(WatchError::ClientFactoryNotFound)));
    }

    #[tokio::test]
    async fn factory_sees_tokens_and_watch_cache() {
        let clients: Arc<ClientCache<TestClient>> = Arc::new(ClientCache::default());
        let watch_cache = Arc::new(WatchCache::new());
        let expected = watch_cache.clone();
        let context = RenderContext::builder("render-1", clients)
            .with_watch_cache(watch_cache)
            .with_auth_tokens(AuthTokens {
                token: Some("secret".to_string()),
                refresh: None
            })
            .with_factory(move |params: FactoryParams| {
                assert!(Arc::ptr_eq(&params.watch_cache, &expected));
                assert_eq!(
                    params.auth_tokens.as_ref().and_then(|t| t.token.as_deref()),
                    Some("secret")
                );
                async move { make_client(params) }
            })
            .build();

        context.client().await.unwrap();
    }

    #[tokio::test]
    async fn dropping_the_last_handle_collects_the_client() {
        let clients: Arc<ClientCache<TestClient>> = Arc::new(ClientCache::default());
        let context = RenderContext::builder("render-1", clients.clone())
            .with_factory(|params: FactoryParams| async move { make_client(params) })
            .build();
        let handle = context.clone();

        context.client().await.unwrap();
        drop(context);
        assert!(clients.contains("render-1"));

        drop(handle);
        assert!(!clients.contains("render-1"));
    }

    #[tokio::test]
    async fn finish_collects_right_away() {
        let clients: Arc<ClientCache<TestClient>> = Arc::new(ClientCache::default());
        let context = RenderContext::builder("render-1", clients.clone())
            .with_factory(|params: FactoryParams| async move { make_client(params) })
            .build();

        context.client().await.unwrap();
        context.finish();

        assert!(clients.is_empty());
    }

    #[test]
    fn tokens_are_redacted_in_logs() {
        let tokens = AuthTokens {
            token: Some("secret".to_string()),
            refresh: None
        };

        let printed = format!("{:?}", tokens);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }
}
