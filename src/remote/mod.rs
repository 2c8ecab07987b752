//! Remote Store Client
//!
//! The backend holds one full [`SyncSnapshot`] per account. Clients fetch,
//! replace and delete it as a whole.

pub mod auth;
pub mod http;

pub use auth::{EnvToken, StaticToken, TokenProvider};
pub use http::HttpRemoteStore;

use crate::error::Result;
use crate::models::SyncSnapshot;
use async_trait::async_trait;

/// Access to the remote copy of the user's data
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the remote snapshot; `None` when the account has no data yet
    async fn fetch_snapshot(&self) -> Result<Option<SyncSnapshot>>;

    /// Replace the remote snapshot
    async fn push_snapshot(&self, snapshot: &SyncSnapshot) -> Result<()>;

    /// Remove all remote data for the account
    async fn delete_snapshot(&self) -> Result<()>;
}
