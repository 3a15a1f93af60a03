//! Subcommand handlers

use anyhow::{anyhow, bail, Context, Result};
use gh_explorer_client::{
    split_full_name, PullRequestFilter, PullRequestState, RemoteClient, RepoContent,
};
use gh_explorer_core::{CollectionStore, SessionManager};
use serde::Serialize;
use std::sync::Arc;

pub struct App {
    pub client: Arc<dyn RemoteClient>,
    pub session: Arc<SessionManager>,
    pub store: CollectionStore,
    pub json: bool,
    pub refresh: bool,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_repo(full_name: &str) -> Result<(&str, &str)> {
    split_full_name(full_name).ok_or_else(|| anyhow!("Expected owner/name, got '{}'", full_name))
}

impl App {
    /// Initialize the session and fail unless a user is signed in
    async fn require_session(&self) -> Result<()> {
        if self.session.init().await {
            return Ok(());
        }
        match self.session.error() {
            Some(message) => bail!("Not signed in ({}). Run `gh-explorer login`.", message),
            None => bail!("Not signed in. Run `gh-explorer login`."),
        }
    }

    /// Surface an error recorded by the store during the last fetch
    fn report_store_error(&self) {
        if let Some(error) = self.store.error() {
            eprintln!("warning: {}", error.message);
        }
    }

    pub fn login(&self) -> Result<()> {
        self.session.initiate_login();
        Ok(())
    }

    pub async fn callback(&self, code: &str, exchange: bool) -> Result<()> {
        let authenticated = if exchange {
            self.session.complete_login_with_exchange(code).await
        } else {
            self.session.complete_login(code).await
        }
        .context("Failed to verify login code")?;
        match self.session.user() {
            Some(user) if authenticated => println!("Signed in as {}", user.login),
            _ => bail!("Login code accepted but no session could be established"),
        }
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.init().await;
        self.session.logout().await;
        println!("Signed out");
        Ok(())
    }

    pub async fn whoami(&self) -> Result<()> {
        self.require_session().await?;
        let user = self
            .session
            .user()
            .context("Session has no user profile")?;
        if self.json {
            return print_json(&user);
        }
        match user.name.as_deref() {
            Some(name) => println!("{} ({})", user.login, name),
            None => println!("{}", user.login),
        }
        if let Some(email) = user.email.as_deref() {
            println!("  {}", email);
        }
        Ok(())
    }

    pub async fn health(&self) -> Result<()> {
        self.client
            .health_check()
            .await
            .context("Backend is not healthy")?;
        println!("ok");
        Ok(())
    }

    pub async fn orgs(&mut self) -> Result<()> {
        self.require_session().await?;
        let organizations = self.store.fetch_organizations(self.refresh).await;
        if self.json {
            print_json(organizations)?;
        } else {
            for org in organizations {
                let marker = if org.is_personal { "*" } else { " " };
                println!("{} {:<24} {}", marker, org.login, org.label());
            }
        }
        self.report_store_error();
        Ok(())
    }

    pub async fn repos(&mut self, org: Option<&str>) -> Result<()> {
        self.require_session().await?;
        self.store.fetch_organizations(false).await;
        match org {
            Some(org) => {
                self.store.select_organization(org).await;
                if self.refresh {
                    self.store.fetch_repositories(true).await;
                }
            }
            None => {
                self.store.fetch_repositories(self.refresh).await;
            }
        }

        let repositories = self.store.repositories();
        if self.json {
            print_json(repositories)?;
        } else {
            for repo in repositories {
                let visibility = if repo.private { "private" } else { "public" };
                println!(
                    "{:<40} {:<8} {}",
                    repo.full_name,
                    visibility,
                    repo.description.as_deref().unwrap_or("")
                );
            }
        }
        self.report_store_error();
        Ok(())
    }

    pub async fn branches(&mut self, repo: &str) -> Result<()> {
        parse_repo(repo)?;
        self.require_session().await?;
        self.store
            .select_repository(repo)
            .await
            .context("Branch listing could not be read")?;

        let branches = self.store.branches();
        if self.json {
            print_json(branches)?;
        } else {
            for branch in branches {
                let mut flags = Vec::new();
                if branch.is_default {
                    flags.push("default");
                }
                if branch.protected {
                    flags.push("protected");
                }
                println!("{:<32} {}", branch.name, flags.join(", "));
            }
        }
        self.report_store_error();
        Ok(())
    }

    pub async fn content(&mut self, repo: &str, path: &str, git_ref: Option<&str>) -> Result<()> {
        parse_repo(repo)?;
        self.require_session().await?;
        self.store
            .select_repository(repo)
            .await
            .context("Branch listing could not be read")?;

        let Some(content) = self
            .store
            .fetch_repo_content(path, git_ref, self.refresh)
            .await
        else {
            self.report_store_error();
            bail!("No content at '{}' in {}", path, repo);
        };

        if self.json {
            return print_json(&content);
        }
        match content {
            RepoContent::Listing(entries) => {
                for entry in entries {
                    println!("{:<5} {}", format!("{:?}", entry.kind).to_lowercase(), entry.path);
                }
            }
            RepoContent::Entry(entry) => match entry.content {
                Some(body) => println!("{}", body),
                None => println!("{} ({} bytes)", entry.path, entry.size),
            },
        }
        Ok(())
    }

    pub async fn pulls(&mut self, state: PullRequestState) -> Result<()> {
        self.require_session().await?;
        let filter = PullRequestFilter::with_state(state);
        let pull_requests = self.store.fetch_pull_requests(&filter, self.refresh).await;
        if self.json {
            print_json(pull_requests)?;
        } else {
            for pr in pull_requests {
                println!("#{:<6} {:<8} {} ({})", pr.number, pr.state, pr.title, pr.user.login);
            }
        }
        self.report_store_error();
        Ok(())
    }

    pub async fn services(&mut self) -> Result<()> {
        self.require_session().await?;
        let services = self.store.fetch_services(self.refresh).await;
        if self.json {
            print_json(services)?;
        } else {
            for service in services {
                println!("{:<32} {:<16} {}", service.name, service.team, service.git.repo);
            }
        }
        self.report_store_error();
        Ok(())
    }

    pub async fn register(
        &mut self,
        repo: &str,
        team: Option<&str>,
        prod_branch: Option<&str>,
        dev_branch: Option<&str>,
    ) -> Result<()> {
        let (owner, _) = parse_repo(repo)?;
        self.require_session().await?;
        self.store.fetch_organizations(false).await;
        self.store.select_organization(owner).await;

        let record = self
            .store
            .repositories()
            .iter()
            .find(|candidate| candidate.full_name == repo)
            .cloned()
            .with_context(|| format!("Repository {} not found under {}", repo, owner))?;

        let response = self
            .store
            .register_service(&record, team, prod_branch, dev_branch)
            .await
            .context("Service registration failed")?;

        if self.json {
            return print_json(&response);
        }
        println!(
            "{}",
            response
                .message
                .as_deref()
                .unwrap_or("Service registration submitted")
        );
        if let Some(url) = response.pull_request_url.as_deref() {
            println!("  {}", url);
        }
        Ok(())
    }
}
