//! Keeps server-rendered and hydrated [`hydra`](../hydra/index.html) queries up to date.
//!
//! This crate adds three things on top of the client:
//!
//! * A [`WatchExchange`](./struct.WatchExchange.html) that records which watched queries read
//! which entities (`__typename` + `id`) and re-runs them when another operation returns fresh
//! data for one of those entities.
//! * A [`ClientCache`](./struct.ClientCache.html) that builds exactly one client per render
//! context, even when many queries ask for it concurrently.
//! * A [`RenderContext`](./struct.RenderContext.html) tying both together for one render, with
//! [`query`](./struct.RenderContext.html#method.query) and
//! [`mutate`](./struct.RenderContext.html#method.mutate) helpers.
//!
//! # Resuming on the client
//!
//! The watch state is explicit. At the end of a server render, take a
//! [`snapshot`](./struct.WatchCache.html#method.snapshot) of the render's
//! [`WatchCache`](./struct.WatchCache.html), ship it along with the page and
//! [`resume`](./struct.WatchCache.html#method.resume) it on the client:
//!
//! ```
//! use hydra_watch::{WatchCache, WatchSnapshot};
//!
//! let server = WatchCache::new();
//! let json = serde_json::to_string(&server.snapshot()).unwrap();
//!
//! let snapshot: WatchSnapshot = serde_json::from_str(&json).unwrap();
//! let client = WatchCache::resume(snapshot);
//! # assert_eq!(client.snapshot(), server.snapshot());
//! ```

#[macro_use]
extern crate async_trait;
#[macro_use]
extern crate serde;

mod cache;
mod client_cache;
mod context;
pub mod dependencies;
mod error;
mod query;
pub mod triggers;
mod types;
pub mod walker;
mod watch_exchange;

pub use cache::{WatchCache, WatchSnapshot};
pub use client_cache::{ClientCache, ClientCacheOptions};
pub use context::{AuthTokens, ClientFactory, FactoryParams, RenderContext, RenderContextBuilder};
pub use error::WatchError;
pub use query::{QueryConfig, QueryResponse, WatchedQuery};
pub use triggers::Trigger;
pub use types::{Environment, WatchExtension, WatchOptions};
pub use watch_exchange::{WatchExchange, WatchExchangeImpl};
