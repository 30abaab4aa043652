use std::sync::Arc;

mod builder;
mod r#impl;

use crate::{
    default_exchanges::TerminatorExchange,
    exchange::{Exchange, ExchangeResult, Operation},
    GraphQLQuery, QueryError, QueryOptions, Response
};
pub use builder::ClientBuilder;
pub use r#impl::{decode_response, ClientImpl};

/// A cheaply cloneable handle to a client and its exchange chain.
#[repr(transparent)]
pub struct Client<M: Exchange = TerminatorExchange>(pub Arc<ClientImpl<M>>);

impl<M: Exchange> Clone for Client<M> {
    fn clone(&self) -> Self {
        Client(self.0.clone())
    }
}

impl Client {
    pub fn builder<U: Into<String>>(url: U) -> ClientBuilder {
        ClientBuilder::new(url)
    }
}

impl<M: Exchange> Client<M> {
    pub async fn query<Q: GraphQLQuery>(
        &self,
        _query: Q,
        variables: Q::Variables
    ) -> Result<Response<Q::ResponseData>, QueryError> {
        self.0.query(_query, variables).await
    }

    pub async fn query_with_options<Q: GraphQLQuery>(
        &self,
        _query: Q,
        variables: Q::Variables,
        options: QueryOptions
    ) -> Result<Response<Q::ResponseData>, QueryError> {
        self.0.query_with_options(_query, variables, options).await
    }

    /// Build the operation the client would send for a query, without sending it.
    pub fn create_request_operation<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
        options: QueryOptions
    ) -> Result<Operation, QueryError> {
        self.0.create_request_operation::<Q>(variables, options)
    }

    /// Send an already built operation down the exchange chain.
    pub async fn execute(&self, operation: Operation) -> ExchangeResult {
        self.0.execute_request_operation(operation).await
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
