//! Cached collections and selection state
//!
//! The store holds the user's organizations, the repositories of the selected
//! scope, the selected repository's branches, platform pull requests and
//! registered services. Every read goes through a TTL cache keyed by the
//! selection it depends on, and every remote call runs through the retrying
//! executor so failures end up in [`CollectionStore::error`] instead of the
//! caller's hands.
//!
//! # Selection cascade
//!
//! ```text
//! select_organization ──► clears repository selection, branches, content
//!         │                         │
//!         ▼                         ▼
//!  fetch_repositories     select_repository ──► fresh branch fetch
//! ```

use crate::executor::{ExecuteOptions, RequestError, RequestExecutor, DEFAULT_RETRY_DELAY};
use crate::sanitize::sanitize_content;
use crate::session::SessionManager;
use gh_explorer_cache::{CacheMode, ResourceCache, DEFAULT_TTL};
use gh_explorer_client::{
    split_full_name, ApiError, ApiResult, Branch, Organization, PullRequest, PullRequestFilter,
    RegistrationResponse, RemoteClient, RepoContent, Repository, ServiceInfo,
    ServiceRegistration,
};
use log::{debug, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const ORGANIZATIONS_KEY: &str = "organizations";
const SERVICES_KEY: &str = "services";

fn branches_key(owner: &str, repo: &str) -> String {
    format!("branches:{}/{}", owner, repo)
}

fn content_key(owner: &str, repo: &str, path: &str, git_ref: Option<&str>) -> String {
    format!("content:{}/{}/{}@{}", owner, repo, path, git_ref.unwrap_or(""))
}

fn pull_requests_key(filter: &PullRequestFilter) -> String {
    format!("pull_requests:{}", filter.cache_scope())
}

/// Tunables for a [`CollectionStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub cache_ttl: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            max_retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Which repositories a listing refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoScope {
    /// The signed-in user's own repositories, by login
    Personal(String),
    Organization(String),
    /// No organization selected: whatever the backend lists for the user
    User,
}

impl RepoScope {
    /// Scope for the selected organization login
    ///
    /// The selection counts as personal when it names the synthetic personal
    /// entry in `organizations`.
    pub fn resolve(selected_org: Option<&str>, organizations: &[Organization]) -> Self {
        match selected_org {
            None => RepoScope::User,
            Some(login) => {
                let personal = organizations
                    .iter()
                    .any(|org| org.is_personal && org.login == login);
                if personal {
                    RepoScope::Personal(login.to_string())
                } else {
                    RepoScope::Organization(login.to_string())
                }
            }
        }
    }

    fn cache_key(&self) -> String {
        match self {
            RepoScope::Personal(login) => format!("repositories:personal:{}", login),
            RepoScope::Organization(org) => format!("repositories:org:{}", org),
            RepoScope::User => "repositories:user".to_string(),
        }
    }
}

/// Value produced by [`read_through`]
struct Read<T> {
    value: T,
    /// `value` is the executor's default after a failed request
    failed: bool,
}

/// Cache-first read shared by all collection fetches
///
/// The remote result, or the executor's default on failure, is written back
/// when the mode allows it.
async fn read_through<T, F, Fut>(
    cache: &mut ResourceCache<T>,
    executor: &RequestExecutor,
    key: &str,
    mode: CacheMode,
    operation: F,
    options: ExecuteOptions<T>,
) -> Read<T>
where
    T: Clone + Send + Sync + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    if mode.should_read() {
        if let Some(cached) = cache.get(key) {
            return Read {
                value: cached.clone(),
                failed: false,
            };
        }
    }
    let value = executor.execute(operation, options).await;
    let failed = executor.error().is_some();
    if mode.should_write() {
        cache.set(key, value.clone());
    }
    Read { value, failed }
}

/// Validate the raw branch payload
fn parse_branches(payload: serde_json::Value) -> Result<Vec<Branch>, ApiError> {
    let list = payload
        .get("branches")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| ApiError::Malformed("branch payload has no 'branches' array".to_string()))?;
    list.iter()
        .map(|branch| serde_json::from_value(branch.clone()).map_err(ApiError::from))
        .collect()
}

pub struct CollectionStore {
    client: Arc<dyn RemoteClient>,
    session: Arc<SessionManager>,
    executor: RequestExecutor,
    options: StoreOptions,

    organizations: Vec<Organization>,
    repositories: Vec<Repository>,
    branches: Vec<Branch>,
    pull_requests: Vec<PullRequest>,
    services: Vec<ServiceInfo>,
    selected_org: Option<String>,
    selected_repo: Option<String>,

    organization_cache: ResourceCache<Vec<Organization>>,
    repository_cache: ResourceCache<Vec<Repository>>,
    branch_cache: ResourceCache<Vec<Branch>>,
    content_cache: ResourceCache<Option<RepoContent>>,
    pull_request_cache: ResourceCache<Vec<PullRequest>>,
    service_cache: ResourceCache<Vec<ServiceInfo>>,
}

impl CollectionStore {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        session: Arc<SessionManager>,
        options: StoreOptions,
    ) -> Self {
        let ttl = options.cache_ttl;
        Self {
            client,
            session,
            executor: RequestExecutor::new(),
            options,
            organizations: Vec::new(),
            repositories: Vec::new(),
            branches: Vec::new(),
            pull_requests: Vec::new(),
            services: Vec::new(),
            selected_org: None,
            selected_repo: None,
            organization_cache: ResourceCache::new(ttl),
            repository_cache: ResourceCache::new(ttl),
            branch_cache: ResourceCache::new(ttl),
            content_cache: ResourceCache::new(ttl),
            pull_request_cache: ResourceCache::new(ttl),
            service_cache: ResourceCache::new(ttl),
        }
    }

    fn execute_options<T>(&self, message: &str, default_value: T) -> ExecuteOptions<T> {
        ExecuteOptions::new(message, default_value)
            .max_retries(self.options.max_retries)
            .retry_delay(self.options.retry_delay)
    }

    fn selected_owner_and_name(&self) -> Option<(String, String)> {
        self.selected_repo
            .as_deref()
            .and_then(split_full_name)
            .map(|(owner, name)| (owner.to_string(), name.to_string()))
    }

    /// Drop branches and every repository-scoped cache entry
    fn clear_repository_scope(&mut self) {
        self.branches.clear();
        self.branch_cache.invalidate(None);
        self.content_cache.invalidate(None);
    }

    // === Organizations ===

    /// Organizations of the user, personal entry first when signed in
    ///
    /// Clears the organization selection when it no longer appears in the
    /// refreshed list. A failed refresh keeps the selection.
    pub async fn fetch_organizations(&mut self, force_refresh: bool) -> &[Organization] {
        let options = self.execute_options("Failed to load organizations", Vec::new());
        let client = self.client.as_ref();
        let Read {
            value: mut organizations,
            failed,
        } = read_through(
            &mut self.organization_cache,
            &self.executor,
            ORGANIZATIONS_KEY,
            CacheMode::for_refresh(force_refresh),
            move || async move { client.get_user_orgs().await.map(|r| r.organizations) },
            options,
        )
        .await;

        if let Some(user) = self.session.user() {
            organizations.insert(0, Organization::personal(&user));
        }

        // A failed read is not a refreshed list
        if let Some(selected) = self.selected_org.as_deref().filter(|_| !failed) {
            if !organizations.iter().any(|org| org.login == selected) {
                info!("Selected organization {} is gone, clearing selection", selected);
                self.selected_org = None;
                self.selected_repo = None;
                self.clear_repository_scope();
            }
        }

        self.organizations = organizations;
        &self.organizations
    }

    /// Select an organization and load its repositories
    ///
    /// Returns `false` without any effect when `login` is already selected.
    pub async fn select_organization(&mut self, login: &str) -> bool {
        if self.selected_org.as_deref() == Some(login) {
            debug!("Organization {} already selected", login);
            return false;
        }
        info!("Selecting organization {}", login);
        self.selected_org = Some(login.to_string());
        self.selected_repo = None;
        self.clear_repository_scope();
        self.fetch_repositories(false).await;
        true
    }

    // === Repositories ===

    pub fn repo_scope(&self) -> RepoScope {
        RepoScope::resolve(self.selected_org.as_deref(), &self.organizations)
    }

    /// Repositories of the current scope
    ///
    /// Clears the repository selection when it is not part of the result.
    pub async fn fetch_repositories(&mut self, force_refresh: bool) -> &[Repository] {
        let scope = self.repo_scope();
        let key = scope.cache_key();
        let options = self.execute_options("Failed to load repositories", Vec::new());
        let client = self.client.as_ref();
        let scope_ref = &scope;
        let Read {
            value: repositories,
            failed,
        } = read_through(
            &mut self.repository_cache,
            &self.executor,
            &key,
            CacheMode::for_refresh(force_refresh),
            move || async move {
                let response = match scope_ref {
                    RepoScope::Personal(login) => client.get_user_repos_by_username(login).await,
                    RepoScope::Organization(org) => client.get_org_repos(org).await,
                    RepoScope::User => client.get_user_repos().await,
                };
                response.map(|r| r.repositories)
            },
            options,
        )
        .await;

        if let Some(selected) = self.selected_repo.as_deref().filter(|_| !failed) {
            if !repositories.iter().any(|repo| repo.full_name == selected) {
                debug!("Selected repository {} not in scope, clearing", selected);
                self.selected_repo = None;
                self.branches.clear();
            }
        }

        self.repositories = repositories;
        &self.repositories
    }

    /// Select a repository by full name and fetch its branches fresh
    ///
    /// Returns `Ok(false)` without any effect when it is already selected.
    pub async fn select_repository(&mut self, full_name: &str) -> Result<bool, ApiError> {
        if self.selected_repo.as_deref() == Some(full_name) {
            debug!("Repository {} already selected", full_name);
            return Ok(false);
        }
        info!("Selecting repository {}", full_name);
        self.selected_repo = Some(full_name.to_string());
        self.branches.clear();
        self.content_cache.invalidate(None);
        self.fetch_branches(true).await?;
        Ok(true)
    }

    // === Branches ===

    /// Branches of the selected repository
    ///
    /// A payload without a `branches` array is an error: it is returned to
    /// the caller and not cached. Without a selection the list is emptied.
    pub async fn fetch_branches(&mut self, force_refresh: bool) -> Result<&[Branch], ApiError> {
        let Some((owner, repo)) = self.selected_owner_and_name() else {
            self.branches.clear();
            return Ok(&self.branches);
        };
        let key = branches_key(&owner, &repo);
        let mode = CacheMode::for_refresh(force_refresh);

        if mode.should_read() {
            if let Some(cached) = self.branch_cache.get(&key) {
                self.branches = cached.clone();
                return Ok(&self.branches);
            }
        }

        let options = self.execute_options(
            "Failed to load branches",
            serde_json::json!({ "branches": [] }),
        );
        let client = self.client.as_ref();
        let (owner_ref, repo_ref) = (owner.as_str(), repo.as_str());
        let payload = self
            .executor
            .execute(
                move || async move { client.get_repo_branches(owner_ref, repo_ref).await },
                options,
            )
            .await;

        let branches = parse_branches(payload)?;
        if mode.should_write() {
            self.branch_cache.set(key, branches.clone());
        }
        self.branches = branches;
        Ok(&self.branches)
    }

    // === Content ===

    /// File or directory content of the selected repository
    ///
    /// File bodies are sanitized before they are cached. `None` without a
    /// selection or when the request failed.
    pub async fn fetch_repo_content(
        &mut self,
        path: &str,
        git_ref: Option<&str>,
        force_refresh: bool,
    ) -> Option<RepoContent> {
        let (owner, repo) = self.selected_owner_and_name()?;
        let key = content_key(&owner, &repo, path, git_ref);
        let options = self.execute_options("Failed to load content", None);
        let client = self.client.as_ref();
        let (owner_ref, repo_ref) = (owner.as_str(), repo.as_str());
        read_through(
            &mut self.content_cache,
            &self.executor,
            &key,
            CacheMode::for_refresh(force_refresh),
            move || async move {
                client
                    .get_repo_content(owner_ref, repo_ref, path, git_ref)
                    .await
                    .map(|content| Some(sanitize_content(content)))
            },
            options,
        )
        .await
        .value
    }

    // === Platform ===

    pub async fn fetch_pull_requests(
        &mut self,
        filter: &PullRequestFilter,
        force_refresh: bool,
    ) -> &[PullRequest] {
        let key = pull_requests_key(filter);
        let options = self.execute_options("Failed to load pull requests", Vec::new());
        let client = self.client.as_ref();
        self.pull_requests = read_through(
            &mut self.pull_request_cache,
            &self.executor,
            &key,
            CacheMode::for_refresh(force_refresh),
            move || async move { client.get_pull_requests(filter).await.map(|r| r.pull_requests) },
            options,
        )
        .await
        .value;
        &self.pull_requests
    }

    pub async fn fetch_services(&mut self, force_refresh: bool) -> &[ServiceInfo] {
        let options = self.execute_options("Failed to load services", Vec::new());
        let client = self.client.as_ref();
        self.services = read_through(
            &mut self.service_cache,
            &self.executor,
            SERVICES_KEY,
            CacheMode::for_refresh(force_refresh),
            move || async move { client.get_services().await.map(|r| r.services) },
            options,
        )
        .await
        .value;
        &self.services
    }

    /// Register `repo` as a platform service
    ///
    /// Missing optional fields are sent as empty strings and `is_enterprise`
    /// defaults to `false`. Failures are returned as-is; on success the
    /// services cache is dropped.
    pub async fn register_service(
        &mut self,
        repo: &Repository,
        team: Option<&str>,
        prod_branch: Option<&str>,
        dev_branch: Option<&str>,
    ) -> Result<RegistrationResponse, ApiError> {
        let registration = ServiceRegistration::from_repository(repo, team, prod_branch, dev_branch);
        info!("Registering service {}", registration.full_name);
        let response = self.client.register_service(&registration).await?;
        self.service_cache.invalidate(Some(SERVICES_KEY));
        Ok(response)
    }

    /// Forget every collection, selection and cache entry
    pub fn reset(&mut self) {
        self.organizations.clear();
        self.repositories.clear();
        self.branches.clear();
        self.pull_requests.clear();
        self.services.clear();
        self.selected_org = None;
        self.selected_repo = None;
        self.organization_cache.invalidate(None);
        self.repository_cache.invalidate(None);
        self.branch_cache.invalidate(None);
        self.content_cache.invalidate(None);
        self.pull_request_cache.invalidate(None);
        self.service_cache.invalidate(None);
        self.executor.clear_error();
    }

    // === Getters ===

    pub fn organizations(&self) -> &[Organization] {
        &self.organizations
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn pull_requests(&self) -> &[PullRequest] {
        &self.pull_requests
    }

    pub fn services(&self) -> &[ServiceInfo] {
        &self.services
    }

    pub fn selected_org(&self) -> Option<&str> {
        self.selected_org.as_deref()
    }

    pub fn selected_repo(&self) -> Option<&str> {
        self.selected_repo.as_deref()
    }

    pub fn current_org(&self) -> Option<&Organization> {
        let selected = self.selected_org.as_deref()?;
        self.organizations.iter().find(|org| org.login == selected)
    }

    pub fn current_repo(&self) -> Option<&Repository> {
        let selected = self.selected_repo.as_deref()?;
        self.repositories.iter().find(|repo| repo.full_name == selected)
    }

    pub fn is_personal_account(&self) -> bool {
        self.current_org().is_some_and(|org| org.is_personal)
    }

    pub fn is_loading(&self) -> bool {
        self.executor.is_loading()
    }

    pub fn error(&self) -> Option<RequestError> {
        self.executor.error()
    }
}
