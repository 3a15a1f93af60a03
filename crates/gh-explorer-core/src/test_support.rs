//! Counting mock backend shared by the core tests

use async_trait::async_trait;
use gh_explorer_client::{
    ApiError, ApiResult, AuthResponse, Navigator, Organization, OrganizationsResponse,
    PullRequestFilter, PullRequestsResponse, RefreshResponse, RegistrationResponse, RemoteClient,
    RepoContent, RepositoriesResponse, Repository, RepositoryOwner, ServiceInfo,
    ServiceRegistration, ServicesResponse, UserProfile,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock backend whose responses can be swapped between calls
pub struct MockClient {
    calls: Mutex<HashMap<&'static str, usize>>,
    pub profile: Mutex<ApiResult<UserProfile>>,
    pub profile_delay: Mutex<Duration>,
    pub organizations: Mutex<Vec<Organization>>,
    /// Returned by `get_user_orgs` instead of the list while set
    pub orgs_error: Mutex<Option<ApiError>>,
    pub repositories: Mutex<Vec<Repository>>,
    /// Returned by every repository listing while set
    pub repos_error: Mutex<Option<ApiError>>,
    pub branches: Mutex<ApiResult<serde_json::Value>>,
    pub content: Mutex<ApiResult<RepoContent>>,
    pub services: Mutex<Vec<ServiceInfo>>,
    pub verify: Mutex<ApiResult<AuthResponse>>,
    pub logout_result: Mutex<ApiResult<()>>,
    pub register_result: Mutex<ApiResult<RegistrationResponse>>,
    pub registrations: Mutex<Vec<ServiceRegistration>>,
    pub logout_csrf: Mutex<Vec<Option<String>>>,
    pub repo_requests: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            profile: Mutex::new(Ok(user("octocat"))),
            profile_delay: Mutex::new(Duration::ZERO),
            organizations: Mutex::new(vec![org(10, "acme")]),
            orgs_error: Mutex::new(None),
            repositories: Mutex::new(vec![repo(1, "acme/widgets")]),
            repos_error: Mutex::new(None),
            branches: Mutex::new(Ok(json!({
                "branches": [{ "name": "main", "commit_sha": "abc", "protected": true, "is_default": true }]
            }))),
            content: Mutex::new(Err(ApiError::from_status(404, None))),
            services: Mutex::new(Vec::new()),
            verify: Mutex::new(Ok(AuthResponse::default())),
            logout_result: Mutex::new(Ok(())),
            register_result: Mutex::new(Ok(RegistrationResponse::default())),
            registrations: Mutex::new(Vec::new()),
            logout_csrf: Mutex::new(Vec::new()),
            repo_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn record(&self, operation: &'static str) {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
    }

    fn repositories_response(&self) -> ApiResult<RepositoriesResponse> {
        if let Some(err) = self.repos_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(RepositoriesResponse {
            repositories: self.repositories.lock().unwrap().clone(),
        })
    }
}

pub fn user(login: &str) -> UserProfile {
    UserProfile {
        id: 42,
        login: login.to_string(),
        name: None,
        email: None,
        avatar_url: format!("https://avatars/{}", login),
        html_url: None,
        bio: None,
        company: None,
        location: None,
    }
}

pub fn org(id: i64, login: &str) -> Organization {
    Organization {
        id,
        login: login.to_string(),
        name: None,
        avatar_url: None,
        html_url: None,
        is_personal: false,
    }
}

pub fn repo(id: i64, full_name: &str) -> Repository {
    let (owner, name) = full_name.split_once('/').unwrap();
    Repository {
        id,
        name: name.to_string(),
        full_name: full_name.to_string(),
        description: None,
        private: false,
        html_url: format!("https://github.com/{}", full_name),
        clone_url: None,
        ssh_url: None,
        owner: RepositoryOwner {
            login: owner.to_string(),
            id: 1,
            avatar_url: String::new(),
        },
        default_branch: Some("main".to_string()),
        created_at: None,
        updated_at: None,
        is_enterprise: None,
        team: None,
        prod_branch: None,
        dev_branch: None,
    }
}

#[async_trait]
impl RemoteClient for MockClient {
    fn login_url(&self) -> String {
        "http://backend/auth/github".to_string()
    }

    async fn verify_code(&self, _code: &str) -> ApiResult<AuthResponse> {
        self.record("verify_code");
        self.verify.lock().unwrap().clone()
    }

    async fn exchange_token(&self, _code: &str) -> ApiResult<AuthResponse> {
        self.record("exchange_token");
        self.verify.lock().unwrap().clone()
    }

    async fn logout(&self, csrf_token: Option<&str>) -> ApiResult<()> {
        self.record("logout");
        self.logout_csrf
            .lock()
            .unwrap()
            .push(csrf_token.map(str::to_string));
        self.logout_result.lock().unwrap().clone()
    }

    async fn refresh_token(&self) -> ApiResult<RefreshResponse> {
        self.record("refresh_token");
        Ok(RefreshResponse {
            token: "refreshed".to_string(),
            csrf_token: Some("csrf-2".to_string()),
        })
    }

    async fn get_profile(&self) -> ApiResult<UserProfile> {
        self.record("get_profile");
        let delay = *self.profile_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.profile.lock().unwrap().clone()
    }

    async fn get_user_orgs(&self) -> ApiResult<OrganizationsResponse> {
        self.record("get_user_orgs");
        if let Some(err) = self.orgs_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(OrganizationsResponse {
            organizations: self.organizations.lock().unwrap().clone(),
        })
    }

    async fn get_user_repos(&self) -> ApiResult<RepositoriesResponse> {
        self.record("get_user_repos");
        self.repo_requests.lock().unwrap().push("user".to_string());
        self.repositories_response()
    }

    async fn get_user_repos_by_username(&self, username: &str) -> ApiResult<RepositoriesResponse> {
        self.record("get_user_repos_by_username");
        self.repo_requests
            .lock()
            .unwrap()
            .push(format!("user:{}", username));
        self.repositories_response()
    }

    async fn get_org_repos(&self, org: &str) -> ApiResult<RepositoriesResponse> {
        self.record("get_org_repos");
        self.repo_requests.lock().unwrap().push(format!("org:{}", org));
        self.repositories_response()
    }

    async fn get_repo_branches(&self, _owner: &str, _repo: &str) -> ApiResult<serde_json::Value> {
        self.record("get_repo_branches");
        self.branches.lock().unwrap().clone()
    }

    async fn get_repo_content(
        &self,
        _owner: &str,
        _repo: &str,
        _path: &str,
        _git_ref: Option<&str>,
    ) -> ApiResult<RepoContent> {
        self.record("get_repo_content");
        self.content.lock().unwrap().clone()
    }

    async fn get_pull_requests(&self, _filter: &PullRequestFilter) -> ApiResult<PullRequestsResponse> {
        self.record("get_pull_requests");
        Ok(PullRequestsResponse::default())
    }

    async fn get_services(&self) -> ApiResult<ServicesResponse> {
        self.record("get_services");
        Ok(ServicesResponse {
            services: self.services.lock().unwrap().clone(),
        })
    }

    async fn register_service(
        &self,
        registration: &ServiceRegistration,
    ) -> ApiResult<RegistrationResponse> {
        self.record("register_service");
        self.registrations.lock().unwrap().push(registration.clone());
        self.register_result.lock().unwrap().clone()
    }

    async fn health_check(&self) -> ApiResult<()> {
        self.record("health_check");
        Ok(())
    }
}

/// Navigator recording every requested target
#[derive(Default)]
pub struct RecordingNavigator {
    pub visited: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visited.lock().unwrap().push(url.to_string());
    }

    fn current_path(&self) -> String {
        "/dashboard".to_string()
    }
}

pub fn shared(mock: MockClient) -> (Arc<MockClient>, Arc<dyn RemoteClient>) {
    let mock = Arc::new(mock);
    let client: Arc<dyn RemoteClient> = mock.clone();
    (mock, client)
}
