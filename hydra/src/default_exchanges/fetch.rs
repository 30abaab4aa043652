use crate::{
    exchange::{Exchange, ExchangeFactory, ExchangeResult, Operation, OperationResult},
    HeaderPair, QueryBody, QueryError, Response
};
use serde_json::Value;
use tracing::debug;

/// The default fetch exchange
///
/// Uses `reqwest` to POST the query as JSON. If the operation carries an abort token, the
/// request is dropped as soon as the token fires and the exchange returns
/// `QueryError::Aborted`.
pub struct FetchExchange;

impl<TNext: Exchange> ExchangeFactory<TNext> for FetchExchange {
    type Output = FetchExchange;

    fn build(self, _next: TNext) -> Self::Output {
        FetchExchange
    }
}

impl FetchExchange {
    async fn fetch(
        extra_headers: Vec<HeaderPair>,
        url: &str,
        query: &QueryBody<Value>
    ) -> Result<Response<Value>, QueryError> {
        let client = reqwest::Client::new();
        let mut request = client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(query);

        for HeaderPair(key, value) in extra_headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(QueryError::network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(QueryError::network)?;

        // GraphQL servers may answer with a non-2xx status and a regular error body
        match serde_json::from_slice::<Response<Value>>(&body) {
            Ok(response) => Ok(response),
            Err(_) if !status.is_success() => Err(QueryError::NotOk {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned()
            }),
            Err(e) => Err(e.into())
        }
    }
}

#[async_trait]
impl Exchange for FetchExchange {
    async fn run(&self, operation: Operation) -> ExchangeResult {
        let extra_headers = operation
            .context
            .extra_headers
            .as_ref()
            .map(|extra_headers| extra_headers())
            .unwrap_or_default();

        let response = {
            let fetch = FetchExchange::fetch(
                extra_headers,
                &operation.context.url,
                &operation.query
            );

            match operation.context.abort.clone() {
                Some(abort) => tokio::select! {
                    biased;
                    _ = abort.cancelled() => {
                        debug!(key = operation.key, "fetch aborted");
                        return Err(QueryError::Aborted);
                    }
                    response = fetch => response?
                },
                None => fetch.await?
            }
        };

        Ok(OperationResult::new(operation, response))
    }
}
