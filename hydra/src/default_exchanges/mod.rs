//! This module contains the default exchanges.
//! Note that the cache and fetch exchanges require the `default-exchanges` feature.

use crate::{
    exchange::{Exchange, ExchangeResult, Operation},
    QueryError
};

#[cfg(feature = "default-exchanges")]
mod cache;
#[cfg(feature = "default-exchanges")]
mod fetch;

#[cfg(feature = "default-exchanges")]
pub use cache::{CacheExchange, CacheExchangeImpl};
#[cfg(feature = "default-exchanges")]
pub use fetch::FetchExchange;

/// The terminating exchange.
/// This will always be the last exchange in the chain and will simply return an error if called.
pub struct TerminatorExchange;

#[async_trait]
impl Exchange for TerminatorExchange {
    async fn run(&self, _operation: Operation) -> ExchangeResult {
        Err(QueryError::UnexpectedEndOfChain)
    }
}
