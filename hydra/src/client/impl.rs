use crate::{
    exchange::{Exchange, ExchangeResult, Operation, OperationContext},
    types::HeaderFn,
    utils::progressive_hash,
    GraphQLQuery, QueryBody, QueryError, QueryOptions, RequestPolicy, Response
};
use std::sync::Arc;

pub struct ClientImpl<M: Exchange> {
    pub(crate) url: String,
    pub(crate) exchange: M,
    pub(crate) extra_headers: Option<HeaderFn>,
    pub(crate) request_policy: RequestPolicy
}

impl<M: Exchange> ClientImpl<M> {
    pub(crate) async fn execute_request_operation(&self, operation: Operation) -> ExchangeResult {
        self.exchange.run(operation).await
    }

    pub async fn query<Q: GraphQLQuery>(
        self: &Arc<Self>,
        _query: Q,
        variables: Q::Variables
    ) -> Result<Response<Q::ResponseData>, QueryError> {
        self.query_with_options(_query, variables, QueryOptions::default())
            .await
    }

    pub async fn query_with_options<Q: GraphQLQuery>(
        self: &Arc<Self>,
        _query: Q,
        variables: Q::Variables,
        options: QueryOptions
    ) -> Result<Response<Q::ResponseData>, QueryError> {
        let operation = self.create_request_operation::<Q>(variables, options)?;
        let result = self.execute_request_operation(operation).await?;
        decode_response::<Q>(result.response)
    }

    pub(crate) fn create_request_operation<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
        options: QueryOptions
    ) -> Result<Operation, QueryError> {
        let (query, meta) = Q::build_query(variables);
        let key = progressive_hash(meta.query_key, &query.variables)?;
        let query = QueryBody {
            variables: serde_json::to_value(&query.variables)?,
            query: query.query,
            operation_name: query.operation_name
        };

        let extra_headers = if let Some(extra_headers) = options.extra_headers {
            Some(extra_headers)
        } else if let Some(ref extra_headers) = self.extra_headers {
            Some(extra_headers.clone())
        } else {
            None
        };

        Ok(Operation {
            key,
            meta,
            query,
            context: OperationContext {
                url: options.url.unwrap_or_else(|| self.url.clone()),
                extra_headers,
                request_policy: options.request_policy.unwrap_or(self.request_policy),
                extensions: options.extensions,
                abort: options.abort,
                cache_outcome: None
            }
        })
    }
}

/// Turn the untyped data that travels through the exchanges into the query's response type.
pub fn decode_response<Q: GraphQLQuery>(
    response: Response<serde_json::Value>
) -> Result<Response<Q::ResponseData>, QueryError> {
    let data = match response.data {
        Some(serde_json::Value::Null) | None => None,
        Some(data) => Some(serde_json::from_value(data)?)
    };
    Ok(Response {
        data,
        errors: response.errors
    })
}
