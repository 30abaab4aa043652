//! A small GraphQL Client with common built-in features
//! that can be extended with a chain of exchanges
//!
//! # Getting Started
//!
//! Queries are described by implementing [`GraphQLQuery`](./trait.GraphQLQuery.html) on a
//! zero-size type. The implementation names the variables and response types and builds the
//! body that's sent to the server:
//!
//! ```
//! use hydra::{exchange::{OperationMeta, OperationType}, GraphQLQuery, QueryBody};
//! use serde::{Deserialize, Serialize};
//!
//! pub struct GetFilm;
//!
//! #[derive(Serialize, Clone)]
//! pub struct Variables {
//!     pub id: String
//! }
//!
//! #[derive(Deserialize, Clone, Debug)]
//! pub struct ResponseData {
//!     pub film: Option<Film>
//! }
//!
//! #[derive(Deserialize, Clone, Debug)]
//! pub struct Film {
//!     pub id: String,
//!     pub title: String
//! }
//!
//! impl GraphQLQuery for GetFilm {
//!     type Variables = Variables;
//!     type ResponseData = ResponseData;
//!
//!     fn build_query(variables: Variables) -> (QueryBody<Variables>, OperationMeta) {
//!         let body = QueryBody {
//!             variables,
//!             query: "query GetFilm($id: ID!) { film(id: $id) { __typename id title } }",
//!             operation_name: "GetFilm"
//!         };
//!         let meta = OperationMeta {
//!             query_key: 1,
//!             operation_type: OperationType::Query
//!         };
//!         (body, meta)
//!     }
//! }
//! ```
//!
//! Afterwards, build a client and run the query:
//!
//! ```no_run
//! # use hydra::{exchange::{OperationMeta, OperationType}, GraphQLQuery, QueryBody};
//! # use serde::{Deserialize, Serialize};
//! # pub struct GetFilm;
//! # #[derive(Serialize, Clone)]
//! # pub struct Variables { pub id: String }
//! # #[derive(Deserialize, Clone, Debug)]
//! # pub struct ResponseData { pub film: Option<serde_json::Value> }
//! # impl GraphQLQuery for GetFilm {
//! #     type Variables = Variables;
//! #     type ResponseData = ResponseData;
//! #     fn build_query(variables: Variables) -> (QueryBody<Variables>, OperationMeta) {
//! #         (QueryBody { variables, query: "", operation_name: "GetFilm" },
//! #          OperationMeta { query_key: 1, operation_type: OperationType::Query })
//! #     }
//! # }
//! # tokio_test::block_on(async {
//! use hydra::Client;
//!
//! let client = Client::builder("http://localhost:3000/graphql")
//!     .with_default_exchanges()
//!     .build();
//!
//! let result = client.query(GetFilm, Variables { id: "1".to_string() }).await.unwrap();
//! assert!(result.data.is_some());
//! # });
//! ```
//!
//! # Exchanges
//!
//! An exchange sits between the client and the network and sees every operation twice: once on
//! the way down and once when the result comes back up. It can answer an operation itself or hand
//! it to the next exchange.
//! Everything an exchange does before awaiting the next exchange sees the request,
//! everything after sees the response.
//!
//! Exchanges work on untyped JSON data (`serde_json::Value`). Typed data is only decoded
//! once the result leaves the chain, so exchanges don't need to know about every query.
//!
//! There are two default exchanges, called in this order:
//!
//! ## CacheExchange
//!
//! A document cache that stores whole results by operation key and drops them eagerly.
//! Every result remembers the `__typename`s it contains and a mutation returning any of those
//! types evicts it. Results served from the cache are marked with
//! [`CacheOutcome::Hit`](./enum.CacheOutcome.html).
//!
//! ## FetchExchange
//!
//! The fetch exchange will serialize the query, send it over the network and deserialize the
//! response using `reqwest`. Operations carrying an abort token are cancelled as soon as the
//! token fires. This should be your last exchange in the chain, as it never forwards a query.
//!
//! # Features
//!
//! * `default-exchanges` **(default)**: the fetch and cache exchanges plus
//!   `ClientBuilder::with_default_exchanges`

#[macro_use]
extern crate serde;
#[macro_use]
extern crate async_trait;

use serde::{de::DeserializeOwned, Serialize};

pub mod client;
pub mod default_exchanges;
mod error;
mod response;
pub(crate) mod types;
pub mod utils;

pub use client::{Client, ClientBuilder};
pub use error::{CombinedError, NetworkError, QueryError};
pub use response::{Error, Location, PathFragment, Response};
pub use types::{
    CacheOutcome, ExtensionMap, Extensions, HeaderPair, QueryOptions, RequestPolicy
};

/// What an exchange needs to know to run an operation, without the Rust types of the query.
pub mod exchange {
    pub use crate::types::{
        Exchange, ExchangeFactory, ExchangeResult, Operation, OperationContext, OperationMeta,
        OperationResult, OperationType
    };
}

/// The JSON body of a GraphQL request. Usually built by
/// [`GraphQLQuery::build_query`](./trait.GraphQLQuery.html#tymethod.build_query).
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct QueryBody<V: Serialize + Send + Sync + Clone> {
    pub variables: V,
    /// Query source text.
    pub query: &'static str,
    #[serde(rename = "operationName")]
    pub operation_name: &'static str
}

/// Describes a single query or mutation. Implement it on a zero-size type.
pub trait GraphQLQuery: Send + Sync + 'static {
    type Variables: Serialize + Send + Sync + Clone + 'static;
    /// The shape of the `data` field of the response.
    type ResponseData: DeserializeOwned + Send + Sync + Clone + 'static;

    /// Builds the request body and the metadata the exchanges route on.
    fn build_query(variables: Self::Variables) -> (QueryBody<Self::Variables>, exchange::OperationMeta);
}
