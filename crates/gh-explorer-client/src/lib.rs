//! Explorer backend API client
//!
//! This crate provides a trait-based client for the explorer backend. The
//! core talks to the backend only through the `RemoteClient` trait, which
//! keeps the transport swappable and lets tests count calls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              RemoteClient trait                  │
//! │  - get_profile() / get_user_orgs()               │
//! │  - get_*_repos() / get_repo_branches()           │
//! │  - get_repo_content() / register_service()       │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!              ┌─────────────────┐      ┌──────────────┐
//!              │   HttpClient    │─────►│ TokenStorage │
//!              │   (reqwest)     │      │ durable +    │
//!              └─────────────────┘      │ session slot │
//!                                       └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gh_explorer_client::{HttpClient, RemoteClient, TokenStorage};
//!
//! # async fn example() -> Result<(), gh_explorer_client::ApiError> {
//! let client = HttpClient::new("http://localhost:8080", TokenStorage::in_memory())?;
//! let orgs = client.get_user_orgs().await?;
//! println!("{} organizations", orgs.organizations.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod http_client;
pub mod navigator;
pub mod storage;
pub mod types;

/// Default backend base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

pub use client::{ApiResult, RemoteClient};
pub use error::ApiError;
pub use http_client::HttpClient;
pub use navigator::{LogNavigator, Navigator};
pub use storage::{FileStore, KeyValueStore, MemoryStore, TokenStorage};
pub use types::{
    split_full_name, AuthResponse, Branch, ContentEntry, ContentType, Organization,
    OrganizationsResponse, PullRequest, PullRequestFilter, PullRequestState,
    PullRequestsResponse, RefreshResponse, RegistrationResponse, RepoContent, RepositoriesResponse,
    Repository, RepositoryOwner, ServiceInfo, ServiceRegistration, ServicesResponse, UserProfile,
};
