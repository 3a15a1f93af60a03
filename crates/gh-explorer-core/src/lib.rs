//! Client-side state for the repository explorer
//!
//! Three cooperating pieces sit between a host surface (CLI, UI) and the
//! backend reached through [`gh_explorer_client::RemoteClient`]:
//!
//! - [`SessionManager`]: the authenticated user and login/logout lifecycle,
//!   including suppression of profile requests after a rejected session
//! - [`RequestExecutor`]: retrying wrapper that turns failures into an
//!   observable error state plus a default value
//! - [`CollectionStore`]: organizations, repositories, branches, content,
//!   pull requests and services behind TTL caches, with selection state
//!
//! # Example
//!
//! ```rust,no_run
//! use gh_explorer_client::{HttpClient, LogNavigator, RemoteClient, TokenStorage};
//! use gh_explorer_core::{CollectionStore, SessionManager, StoreOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), gh_explorer_client::ApiError> {
//! let tokens = TokenStorage::in_memory();
//! let client: Arc<dyn RemoteClient> =
//!     Arc::new(HttpClient::new("http://localhost:8080", tokens.clone())?);
//! let session = Arc::new(SessionManager::new(client.clone(), tokens, Arc::new(LogNavigator)));
//!
//! if session.init().await {
//!     let mut store = CollectionStore::new(client, session, StoreOptions::default());
//!     for org in store.fetch_organizations(false).await {
//!         println!("{}", org.label());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod collections;
pub mod executor;
pub mod sanitize;
pub mod session;

#[cfg(test)]
mod test_support;

pub use collections::{CollectionStore, RepoScope, StoreOptions};
pub use executor::{
    ErrorKind, ExecuteOptions, RequestError, RequestExecutor, RequestState, RetryPredicate,
};
pub use sanitize::{sanitize_content, sanitize_markup};
pub use session::{AuthStatus, SessionManager, SessionPhase};
