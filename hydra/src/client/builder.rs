#[cfg(feature = "default-exchanges")]
use crate::default_exchanges::{CacheExchange, FetchExchange};
use crate::{
    client::ClientImpl,
    default_exchanges::TerminatorExchange,
    exchange::{Exchange, ExchangeFactory},
    types::HeaderFn,
    Client, HeaderPair, RequestPolicy
};
use std::sync::Arc;

/// Configures a [`Client`](./struct.Client.html). Start with
/// [`Client::builder`](./struct.Client.html#method.builder).
pub struct ClientBuilder<M: Exchange = TerminatorExchange> {
    exchange: M,
    url: String,
    extra_headers: Option<HeaderFn>,
    request_policy: RequestPolicy
}

impl ClientBuilder<TerminatorExchange> {
    pub fn new<U: Into<String>>(url: U) -> Self {
        ClientBuilder {
            exchange: TerminatorExchange,
            url: url.into(),
            extra_headers: None,
            request_policy: RequestPolicy::CacheFirst
        }
    }
}

impl<M: Exchange> ClientBuilder<M> {
    /// Fetch at the bottom, the document cache above it.
    #[cfg(feature = "default-exchanges")]
    pub fn with_default_exchanges(self) -> ClientBuilder<impl Exchange> {
        self.with_exchange(FetchExchange).with_exchange(CacheExchange)
    }

    /// Wraps the chain built so far in another exchange. The first exchange added sees operations
    /// last, so add the network exchange first.
    pub fn with_exchange<F>(self, exchange_factory: F) -> ClientBuilder<F::Output>
    where
        F: ExchangeFactory<M>
    {
        ClientBuilder {
            exchange: exchange_factory.build(self.exchange),
            url: self.url,
            extra_headers: self.extra_headers,
            request_policy: self.request_policy
        }
    }

    /// Headers computed for every request, e.g. an `Authorization` bearer.
    pub fn with_extra_headers<F>(mut self, headers: F) -> Self
    where
        F: Fn() -> Vec<HeaderPair> + Send + Sync + 'static
    {
        self.extra_headers = Some(Arc::new(headers));
        self
    }

    /// The policy used when an operation doesn't pick one. Defaults to `CacheFirst`.
    pub fn with_request_policy(mut self, policy: RequestPolicy) -> Self {
        self.request_policy = policy;
        self
    }

    pub fn build(self) -> Client<M> {
        Client(Arc::new(ClientImpl {
            url: self.url,
            exchange: self.exchange,
            extra_headers: self.extra_headers,
            request_policy: self.request_policy
        }))
    }
}
