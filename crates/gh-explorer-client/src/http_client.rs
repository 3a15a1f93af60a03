//! reqwest-based remote client
//!
//! Direct implementation of the `RemoteClient` trait against the explorer
//! backend. Every request carries the stored bearer token; state-changing
//! requests also carry the CSRF token. A refreshed token announced by the
//! server through `X-Refresh-Token` is persisted, and a 401 clears both
//! tokens before the error is returned.

use crate::client::{ApiResult, RemoteClient};
use crate::error::ApiError;
use crate::navigator::{should_redirect_on_unauthorized, Navigator, HOME_PATH, LOGIN_PATH, LOGOUT_PATH};
use crate::storage::TokenStorage;
use crate::types::{
    AuthResponse, OrganizationsResponse, PullRequestFilter, PullRequestsResponse, RefreshResponse,
    RegistrationResponse, RepoContent, RepositoriesResponse, ServiceRegistration,
    ServicesResponse, UserProfile,
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Request header carrying the CSRF token
pub const CSRF_HEADER: &str = "x-csrf-token";
/// Response header carrying a refreshed credential token
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Which CSRF token a request should carry
#[derive(Debug, Clone, Copy)]
enum Csrf<'a> {
    /// Whatever the token storage holds (non-GET only)
    Stored,
    /// Exactly this token, or none
    Explicit(Option<&'a str>),
}

/// Direct explorer API client using reqwest
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStorage,
    navigator: Option<Arc<dyn Navigator>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("tokens", &self.tokens)
            .finish()
    }
}

impl HttpClient {
    /// Create a client for `base_url` using `tokens` for authentication
    pub fn new(base_url: impl Into<String>, tokens: TokenStorage) -> ApiResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            navigator: None,
        })
    }

    /// Send the host home when the session is rejected
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStorage {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_headers(&self, method: &Method, csrf: Csrf<'_>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.tokens.credential_token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => warn!("Stored credential token is not a valid header: {}", e),
            }
        }

        let csrf_token = match csrf {
            Csrf::Stored if method != Method::GET => self.tokens.csrf_token(),
            Csrf::Stored => None,
            Csrf::Explicit(token) => token.map(str::to_string),
        };
        if let Some(token) = csrf_token {
            if let Ok(value) = HeaderValue::from_str(&token) {
                headers.insert(HeaderName::from_static(CSRF_HEADER), value);
            }
        }

        headers
    }

    fn persist_refreshed_token(&self, headers: &HeaderMap) {
        let refreshed = headers
            .get(REFRESH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|token| !token.is_empty());
        if let Some(token) = refreshed {
            debug!("Persisting refreshed credential token");
            self.tokens.set_credential_token(token);
        }
    }

    fn handle_unauthorized(&self, request_path: &str) {
        debug!("401 on {}, clearing stored tokens", request_path);
        self.tokens.clear();

        if let Some(navigator) = &self.navigator {
            if should_redirect_on_unauthorized(&navigator.current_path(), request_path) {
                navigator.navigate(HOME_PATH);
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
        csrf: Csrf<'_>,
    ) -> ApiResult<reqwest::Response> {
        let mut request = self
            .http
            .request(method.clone(), self.url(path))
            .headers(self.build_headers(&method, csrf));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!("{} {}", method, path);
        let response = request.send().await?;
        self.persist_refreshed_token(response.headers());

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(path);
        }
        debug!("{} {} failed with {}", method, path, status);
        Err(ApiError::from_status(status.as_u16(), error_message(&body)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let response = self
            .send(Method::GET, path, query, None, Csrf::Stored)
            .await?;
        Ok(response.json().await?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ApiResult<T> {
        let response = self
            .send(Method::POST, path, &[], body, Csrf::Stored)
            .await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RemoteClient for HttpClient {
    fn login_url(&self) -> String {
        self.url(LOGIN_PATH)
    }

    async fn verify_code(&self, code: &str) -> ApiResult<AuthResponse> {
        self.get_json("/auth/verify", &[("code", code)]).await
    }

    async fn exchange_token(&self, code: &str) -> ApiResult<AuthResponse> {
        self.post_json("/auth/exchange", Some(serde_json::json!({ "code": code })))
            .await
    }

    async fn logout(&self, csrf_token: Option<&str>) -> ApiResult<()> {
        self.send(
            Method::POST,
            LOGOUT_PATH,
            &[],
            None,
            Csrf::Explicit(csrf_token),
        )
        .await?;
        Ok(())
    }

    async fn refresh_token(&self) -> ApiResult<RefreshResponse> {
        self.post_json("/auth/refresh", None).await
    }

    async fn get_profile(&self) -> ApiResult<UserProfile> {
        self.get_json("/api/user", &[]).await
    }

    async fn get_user_orgs(&self) -> ApiResult<OrganizationsResponse> {
        self.get_json("/api/orgs", &[]).await
    }

    async fn get_user_repos(&self) -> ApiResult<RepositoriesResponse> {
        self.get_json("/api/repos", &[("visibility", "all")]).await
    }

    async fn get_user_repos_by_username(
        &self,
        username: &str,
    ) -> ApiResult<RepositoriesResponse> {
        let path = format!("/api/users/{}/repos", username);
        self.get_json(&path, &[("visibility", "all")]).await
    }

    async fn get_org_repos(&self, org: &str) -> ApiResult<RepositoriesResponse> {
        let path = format!("/api/orgs/{}/repos", org);
        self.get_json(&path, &[("visibility", "all")]).await
    }

    async fn get_repo_branches(&self, owner: &str, repo: &str) -> ApiResult<serde_json::Value> {
        let path = format!("/api/repos/{}/{}/branches", owner, repo);
        self.get_json(&path, &[]).await
    }

    async fn get_repo_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> ApiResult<RepoContent> {
        let route = content_path(owner, repo, path);
        match git_ref.filter(|r| !r.is_empty()) {
            Some(git_ref) => self.get_json(&route, &[("ref", git_ref)]).await,
            None => self.get_json(&route, &[]).await,
        }
    }

    async fn get_pull_requests(
        &self,
        filter: &PullRequestFilter,
    ) -> ApiResult<PullRequestsResponse> {
        self.get_json(
            "/api/platform/pulls",
            &[
                ("state", filter.state.as_str()),
                ("sort", filter.sort.as_str()),
                ("direction", filter.direction.as_str()),
            ],
        )
        .await
    }

    async fn get_services(&self) -> ApiResult<ServicesResponse> {
        self.get_json("/api/platform/service", &[]).await
    }

    async fn register_service(
        &self,
        registration: &ServiceRegistration,
    ) -> ApiResult<RegistrationResponse> {
        let body = serde_json::to_value(registration)?;
        self.post_json("/api/platform/service", Some(body)).await
    }

    async fn health_check(&self) -> ApiResult<()> {
        self.send(Method::GET, "/health", &[], None, Csrf::Stored)
            .await?;
        Ok(())
    }
}

/// Route of the contents endpoint; `path` may be empty or start with `/`
fn content_path(owner: &str, repo: &str, path: &str) -> String {
    format!(
        "/api/repos/{}/{}/contents/{}",
        owner,
        repo,
        path.trim_start_matches('/')
    )
}

/// Extract the `error` field of a JSON error body
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}
