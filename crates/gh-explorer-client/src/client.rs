//! Remote client trait
//!
//! This module defines the `RemoteClient` trait that every client
//! implementation must satisfy. The core only ever talks to the backend
//! through this seam, so tests substitute a counting mock.

use crate::error::ApiError;
use crate::types::{
    AuthResponse, OrganizationsResponse, PullRequestFilter, PullRequestsResponse, RefreshResponse,
    RegistrationResponse, RepoContent, RepositoriesResponse, ServiceRegistration,
    ServicesResponse, UserProfile,
};
use async_trait::async_trait;

/// Result type of every remote call
pub type ApiResult<T> = Result<T, ApiError>;

/// Explorer backend API
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single client can be shared
/// between the session manager and the collection store.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    // === Auth ===

    /// Absolute URL of the login redirect target (`GET /auth/github`)
    ///
    /// Never called directly; the host navigates to it.
    fn login_url(&self) -> String;

    /// Verify a one-time callback code (`GET /auth/verify?code=`)
    async fn verify_code(&self, code: &str) -> ApiResult<AuthResponse>;

    /// Exchange an OAuth code for a token (`POST /auth/exchange`)
    async fn exchange_token(&self, code: &str) -> ApiResult<AuthResponse>;

    /// End the remote session (`POST /auth/logout`)
    ///
    /// # Arguments
    ///
    /// * `csrf_token` - Sent as `X-CSRF-Token` when present
    async fn logout(&self, csrf_token: Option<&str>) -> ApiResult<()>;

    /// Refresh the credential token (`POST /auth/refresh`)
    async fn refresh_token(&self) -> ApiResult<RefreshResponse>;

    // === User & organizations ===

    /// Current user profile (`GET /api/user`)
    async fn get_profile(&self) -> ApiResult<UserProfile>;

    /// Organizations of the current user (`GET /api/orgs`)
    async fn get_user_orgs(&self) -> ApiResult<OrganizationsResponse>;

    // === Repositories ===

    /// Repositories of the current user (`GET /api/repos`)
    async fn get_user_repos(&self) -> ApiResult<RepositoriesResponse>;

    /// Repositories of a named user (`GET /api/users/{username}/repos`)
    async fn get_user_repos_by_username(&self, username: &str)
        -> ApiResult<RepositoriesResponse>;

    /// Repositories of an organization (`GET /api/orgs/{org}/repos`)
    async fn get_org_repos(&self, org: &str) -> ApiResult<RepositoriesResponse>;

    /// Raw branch payload (`GET /api/repos/{owner}/{repo}/branches`)
    ///
    /// Returned unparsed: the caller validates the shape and treats a
    /// malformed payload as an error of its own.
    async fn get_repo_branches(&self, owner: &str, repo: &str) -> ApiResult<serde_json::Value>;

    /// File or directory content (`GET /api/repos/{owner}/{repo}/contents/{path}?ref=`)
    async fn get_repo_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> ApiResult<RepoContent>;

    // === Platform ===

    /// Pull requests of the platform repository (`GET /api/platform/pulls`)
    async fn get_pull_requests(&self, filter: &PullRequestFilter)
        -> ApiResult<PullRequestsResponse>;

    /// Registered services (`GET /api/platform/service`)
    async fn get_services(&self) -> ApiResult<ServicesResponse>;

    /// Register a service repository (`POST /api/platform/service`)
    async fn register_service(
        &self,
        registration: &ServiceRegistration,
    ) -> ApiResult<RegistrationResponse>;

    /// Backend liveness probe (`GET /health`)
    async fn health_check(&self) -> ApiResult<()>;
}
