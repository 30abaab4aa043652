use hydra::QueryError;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum WatchError {
    /// A client was requested for a render context that never registered a factory.
    #[error("client factory not found")]
    ClientFactoryNotFound,
    #[error("failed to build operation: {0}")]
    Operation(#[from] QueryError)
}
