//! Remote API data transfer objects
//!
//! These types mirror the JSON exchanged with the explorer backend. They are
//! intentionally separate from the core's state types so this crate stays a
//! pure transport layer.

use serde::{Deserialize, Serialize};

/// The authenticated user's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// An organization, or the synthetic personal-account entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    /// Client-side flag marking the user's own account
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_personal: bool,
}

impl Organization {
    /// Build the personal-account entry for `user`
    pub fn personal(user: &UserProfile) -> Self {
        Self {
            id: user.id,
            login: user.login.clone(),
            name: Some(format!("{} (Personal)", user.login)),
            avatar_url: Some(user.avatar_url.clone()),
            html_url: user.html_url.clone(),
            is_personal: true,
        }
    }

    /// Display label: the name if present, else the login
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.login)
    }
}

/// Owner block embedded in a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
    pub id: i64,
    #[serde(default)]
    pub avatar_url: String,
}

/// A repository as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub ssh_url: Option<String>,
    pub owner: RepositoryOwner,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub is_enterprise: Option<bool>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default, rename = "prodBranch")]
    pub prod_branch: Option<String>,
    #[serde(default, rename = "devBranch")]
    pub dev_branch: Option<String>,
}

impl Repository {
    /// Split `full_name` into `(owner, name)`
    pub fn owner_and_name(&self) -> Option<(&str, &str)> {
        split_full_name(&self.full_name)
    }
}

/// Split an `owner/name` string
pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Some((owner, name)),
        _ => None,
    }
}

/// A repository branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub commit_sha: String,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub is_default: bool,
}

/// Kind of a content entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// A file or directory inside a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// Repository content: a single entry or a directory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepoContent {
    Entry(ContentEntry),
    Listing(Vec<ContentEntry>),
}

/// Author of a pull request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
}

/// A pull request against the platform repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: i64,
    pub number: u64,
    pub title: String,
    /// "open" or "closed"
    pub state: String,
    pub user: PullRequestUser,
    #[serde(default)]
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub html_url: String,
}

/// Pull request state filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PullRequestState {
    #[default]
    All,
    Open,
    Closed,
}

impl PullRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullRequestState::All => "all",
            PullRequestState::Open => "open",
            PullRequestState::Closed => "closed",
        }
    }
}

/// Query parameters for the platform pull request listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestFilter {
    pub state: PullRequestState,
    pub sort: String,
    pub direction: String,
}

impl Default for PullRequestFilter {
    fn default() -> Self {
        Self {
            state: PullRequestState::All,
            sort: "created".to_string(),
            direction: "desc".to_string(),
        }
    }
}

impl PullRequestFilter {
    pub fn with_state(state: PullRequestState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Stable cache key fragment for this filter
    pub fn cache_scope(&self) -> String {
        format!("{}/{}/{}", self.state.as_str(), self.sort, self.direction)
    }
}

/// Git location of a registered service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceGit {
    pub repo: String,
}

/// A service registered on the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "specPath")]
    pub spec_path: Option<String>,
    #[serde(default, rename = "prodBranch")]
    pub prod_branch: String,
    #[serde(default, rename = "devBranch")]
    pub dev_branch: String,
    pub git: ServiceGit,
    #[serde(default)]
    pub team: String,
}

/// Canonical payload for `POST /api/platform/service`
///
/// Every optional string of the source repository is flattened to `""`,
/// `is_enterprise` defaults to `false`, and the branch fields are always
/// serialized (as `null` when unknown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRegistration {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub private: bool,
    pub html_url: String,
    pub clone_url: String,
    pub ssh_url: String,
    pub owner: RepositoryOwner,
    pub default_branch: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_enterprise: bool,
    pub team: String,
    #[serde(rename = "prodBranch")]
    pub prod_branch: Option<String>,
    #[serde(rename = "devBranch")]
    pub dev_branch: Option<String>,
}

impl ServiceRegistration {
    /// Normalize a repository record into the submission shape
    pub fn from_repository(
        repo: &Repository,
        team: Option<&str>,
        prod_branch: Option<&str>,
        dev_branch: Option<&str>,
    ) -> Self {
        Self {
            id: repo.id,
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            description: repo.description.clone().unwrap_or_default(),
            private: repo.private,
            html_url: repo.html_url.clone(),
            clone_url: repo.clone_url.clone().unwrap_or_default(),
            ssh_url: repo.ssh_url.clone().unwrap_or_default(),
            owner: repo.owner.clone(),
            default_branch: repo.default_branch.clone().unwrap_or_default(),
            created_at: repo.created_at.clone().unwrap_or_default(),
            updated_at: repo.updated_at.clone().unwrap_or_default(),
            is_enterprise: repo.is_enterprise.unwrap_or(false),
            team: team
                .map(str::to_string)
                .or_else(|| repo.team.clone())
                .unwrap_or_default(),
            prod_branch: prod_branch
                .map(str::to_string)
                .or_else(|| repo.prod_branch.clone()),
            dev_branch: dev_branch
                .map(str::to_string)
                .or_else(|| repo.dev_branch.clone()),
        }
    }
}

/// Backend acknowledgement of a service registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pull_request_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response of `GET /auth/verify` and `POST /auth/exchange`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

/// Response of `POST /auth/refresh`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

/// `{ "organizations": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationsResponse {
    #[serde(default)]
    pub organizations: Vec<Organization>,
}

/// `{ "repositories": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoriesResponse {
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

/// `{ "pull_requests": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestsResponse {
    #[serde(default)]
    pub pull_requests: Vec<PullRequest>,
}

/// `{ "services": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicesResponse {
    #[serde(default)]
    pub services: Vec<ServiceInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo_without_platform_fields() -> Repository {
        serde_json::from_value(json!({
            "id": 7,
            "name": "widgets",
            "full_name": "acme/widgets",
            "private": true,
            "html_url": "https://github.com/acme/widgets",
            "owner": { "login": "acme", "id": 1, "avatar_url": "https://a/1" }
        }))
        .unwrap()
    }

    #[test]
    fn test_registration_defaults_missing_fields() {
        let repo = repo_without_platform_fields();
        assert_eq!(repo.is_enterprise, None);

        let payload = ServiceRegistration::from_repository(&repo, None, None, None);
        assert!(!payload.is_enterprise);
        assert_eq!(payload.description, "");
        assert_eq!(payload.clone_url, "");
        assert_eq!(payload.team, "");
    }

    #[test]
    fn test_registration_always_serializes_team_and_branches() {
        let repo = repo_without_platform_fields();
        let payload = ServiceRegistration::from_repository(&repo, None, None, None);
        let value = serde_json::to_value(&payload).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object["is_enterprise"], json!(false));
        assert_eq!(object["team"], json!(""));
        assert!(object.contains_key("prodBranch"));
        assert!(object.contains_key("devBranch"));
        assert_eq!(object["prodBranch"], serde_json::Value::Null);
    }

    #[test]
    fn test_registration_prefers_arguments_over_record() {
        let mut repo = repo_without_platform_fields();
        repo.team = Some("old-team".to_string());
        repo.prod_branch = Some("release".to_string());

        let payload =
            ServiceRegistration::from_repository(&repo, Some("payments"), None, Some("develop"));
        assert_eq!(payload.team, "payments");
        assert_eq!(payload.prod_branch.as_deref(), Some("release"));
        assert_eq!(payload.dev_branch.as_deref(), Some("develop"));
    }

    #[test]
    fn test_personal_organization_entry() {
        let user = UserProfile {
            id: 42,
            login: "octocat".to_string(),
            name: None,
            email: None,
            avatar_url: "https://a/42".to_string(),
            html_url: None,
            bio: None,
            company: None,
            location: None,
        };
        let org = Organization::personal(&user);
        assert!(org.is_personal);
        assert_eq!(org.label(), "octocat (Personal)");
    }

    #[test]
    fn test_repo_content_entry_and_listing() {
        let entry: RepoContent = serde_json::from_value(json!({
            "name": "README.md", "path": "README.md", "type": "file", "content": "hi", "url": "u"
        }))
        .unwrap();
        assert!(matches!(entry, RepoContent::Entry(ref e) if e.kind == ContentType::File));

        let listing: RepoContent = serde_json::from_value(json!([
            { "name": "src", "path": "src", "type": "dir", "url": "u" },
            { "name": "link", "path": "link", "type": "symlink", "url": "u" }
        ]))
        .unwrap();
        match listing {
            RepoContent::Listing(entries) => {
                assert_eq!(entries[0].kind, ContentType::Dir);
                assert_eq!(entries[1].kind, ContentType::Other);
            }
            other => panic!("expected listing, got {:?}", other),
        }
    }

    #[test]
    fn test_split_full_name() {
        assert_eq!(split_full_name("acme/widgets"), Some(("acme", "widgets")));
        assert_eq!(split_full_name("acme"), None);
        assert_eq!(split_full_name("/widgets"), None);
    }

    #[test]
    fn test_pull_request_filter_scope() {
        let filter = PullRequestFilter::with_state(PullRequestState::Open);
        assert_eq!(filter.cache_scope(), "open/created/desc");
    }
}
