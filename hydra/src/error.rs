use crate::Error as GraphQLError;
use std::{error::Error as StdError, sync::Arc};
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum QueryError {
    #[error("fetch error: {0}")]
    Network(Arc<dyn StdError + Send + Sync>),
    #[error("server returned error code {status}: {body}")]
    NotOk { status: u16, body: String },
    #[error("decoding error: {0}")]
    Decode(Arc<serde_json::Error>),
    #[error("the operation was aborted")]
    Aborted,
    #[error("unexpected end of exchange chain")]
    UnexpectedEndOfChain
}

impl QueryError {
    pub fn network<E: StdError + Send + Sync + 'static>(e: E) -> Self {
        QueryError::Network(Arc::new(e))
    }

    /// The consumer went away before the operation finished. Not a failure of the request.
    pub fn is_aborted(&self) -> bool {
        matches!(self, QueryError::Aborted)
    }

    fn name(&self) -> &'static str {
        match self {
            QueryError::Network(_) | QueryError::NotOk { .. } => "NetworkError",
            QueryError::Decode(_) => "DecodeError",
            QueryError::Aborted => "AbortError",
            QueryError::UnexpectedEndOfChain => "ExchangeError"
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::Decode(Arc::new(e))
    }
}

/// The transport half of a [`CombinedError`](./struct.CombinedError.html).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkError {
    pub name: String,
    pub message: String
}

/// Errors in a serializable format, so they can be handed to a UI layer or sent
/// along with server-rendered state.
///
/// ```
/// use hydra::{CombinedError, Error, QueryError};
///
/// let error = CombinedError::new(
///     &[Error {
///         message: "Film not found".to_string(),
///         locations: None,
///         path: None,
///         extensions: None
///     }],
///     Some(&QueryError::Aborted)
/// )
/// .unwrap();
///
/// assert_eq!(error.message, "[Network] the operation was aborted\n[GraphQL] Film not found");
/// assert_eq!(error.network_error.unwrap().name, "AbortError");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedError {
    pub name: String,
    pub message: String,
    #[serde(rename = "graphQLErrors")]
    pub graphql_errors: Vec<GraphQLError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_error: Option<NetworkError>
}

impl CombinedError {
    /// Returns `None` when there is nothing to report.
    pub fn new(graphql_errors: &[GraphQLError], network_error: Option<&QueryError>) -> Option<Self> {
        if graphql_errors.is_empty() && network_error.is_none() {
            return None;
        }

        let mut lines = Vec::with_capacity(graphql_errors.len() + 1);
        if let Some(e) = network_error {
            lines.push(format!("[Network] {}", e));
        }
        for e in graphql_errors {
            lines.push(format!("[GraphQL] {}", e.message));
        }

        Some(CombinedError {
            name: "CombinedError".to_string(),
            message: lines.join("\n"),
            graphql_errors: graphql_errors.to_vec(),
            network_error: network_error.map(|e| NetworkError {
                name: e.name().to_string(),
                message: e.to_string()
            })
        })
    }

    /// Normalizes the outcome of a request into an optional serializable error.
    pub fn from_result<D: Clone>(result: &Result<crate::Response<D>, QueryError>) -> Option<Self> {
        match result {
            Ok(response) => Self::new(response.errors.as_deref().unwrap_or(&[]), None),
            Err(e) => Self::new(&[], Some(e))
        }
    }
}

impl From<QueryError> for CombinedError {
    fn from(e: QueryError) -> Self {
        let message = format!("[Network] {}", e);
        CombinedError {
            name: "CombinedError".to_string(),
            message,
            graphql_errors: Vec::new(),
            network_error: Some(NetworkError {
                name: e.name().to_string(),
                message: e.to_string()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CombinedError, QueryError};
    use crate::{Error, Response};
    use serde_json::{json, Value};

    fn graphql_error(message: &str) -> Error {
        Error {
            message: message.to_string(),
            locations: None,
            path: None,
            extensions: None
        }
    }

    #[test]
    fn nothing_to_report() {
        let result: Result<Response<Value>, QueryError> = Ok(Response {
            data: Some(json!({})),
            errors: Some(Vec::new())
        });
        assert_eq!(CombinedError::from_result(&result), None);
    }

    #[test]
    fn collects_graphql_errors() {
        let result: Result<Response<Value>, QueryError> = Ok(Response {
            data: None,
            errors: Some(vec![graphql_error("one"), graphql_error("two")])
        });
        let error = CombinedError::from_result(&result).unwrap();

        assert_eq!(error.message, "[GraphQL] one\n[GraphQL] two");
        assert_eq!(error.graphql_errors.len(), 2);
        assert!(error.network_error.is_none());
    }

    #[test]
    fn serializes_in_camel_case() {
        let error: CombinedError = QueryError::NotOk {
            status: 500,
            body: "oops".to_string()
        }
        .into();
        let value = serde_json::to_value(&error).unwrap();

        assert_eq!(value["name"], "CombinedError");
        assert_eq!(value["graphQLErrors"], json!([]));
        assert_eq!(value["networkError"]["name"], "NetworkError");
        assert_eq!(
            value["networkError"]["message"],
            "server returned error code 500: oops"
        );
    }
}
