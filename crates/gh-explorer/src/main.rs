use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gh_explorer_client::{FileStore, HttpClient, PullRequestState, RemoteClient, TokenStorage};
use gh_explorer_config::AppConfig;
use gh_explorer_core::{CollectionStore, SessionManager, StoreOptions};
use std::sync::Arc;

mod commands;
mod logger;
mod navigator;

use navigator::TerminalNavigator;

#[derive(Parser)]
#[command(name = "gh-explorer", version, about = "Browse GitHub organizations, repositories and platform services")]
struct Cli {
    /// Backend base URL (overrides config file and environment)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Bypass cached collections
    #[arg(long, global = true)]
    refresh: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the login URL to open in a browser
    Login,
    /// Finish login with the one-time code from the callback page
    Callback {
        /// One-time code
        code: String,
        /// Trade the code at the token exchange endpoint instead of verifying it
        #[arg(long)]
        exchange: bool,
    },
    /// End the current session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check that the backend is reachable
    Health,
    /// List organizations, personal account first
    Orgs,
    /// List repositories of an organization or of the user
    Repos {
        /// Organization (or own login) to list; omit for all user repositories
        #[arg(long)]
        org: Option<String>,
    },
    /// List branches of a repository
    Branches {
        /// Repository as owner/name
        repo: String,
    },
    /// Show a file or directory of a repository
    Content {
        /// Repository as owner/name
        repo: String,
        /// Path inside the repository
        #[arg(default_value = "")]
        path: String,
        /// Branch, tag or commit
        #[arg(long = "ref")]
        git_ref: Option<String>,
    },
    /// List pull requests of the platform repository
    Pulls {
        #[arg(long, value_enum, default_value = "all")]
        state: StateArg,
    },
    /// List registered platform services
    Services,
    /// Register a repository as a platform service
    Register {
        /// Repository as owner/name
        repo: String,
        /// Owning team
        #[arg(long)]
        team: Option<String>,
        /// Production branch
        #[arg(long)]
        prod: Option<String>,
        /// Development branch
        #[arg(long)]
        dev: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    All,
    Open,
    Closed,
}

impl From<StateArg> for PullRequestState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::All => PullRequestState::All,
            StateArg::Open => PullRequestState::Open,
            StateArg::Closed => PullRequestState::Closed,
        }
    }
}

fn token_storage() -> Result<TokenStorage> {
    let durable_path = gh_explorer_config::token_store_path()?;
    let session_path = gh_explorer_config::session_store_path()?;
    let durable = FileStore::open(&durable_path)
        .with_context(|| format!("Failed to open token store {:?}", durable_path))?;
    let session = FileStore::open(&session_path)
        .with_context(|| format!("Failed to open session store {:?}", session_path))?;
    Ok(TokenStorage::new(Arc::new(durable), Arc::new(session)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let log_file = logger::init(cli.verbose)?;
    log::info!("Starting gh-explorer, logging to {:?}", log_file);

    let config = AppConfig::load().with_base_url_override(cli.base_url.clone());
    log::debug!("Using backend {}", config.api_base_url);

    let tokens = token_storage()?;
    let navigator = Arc::new(TerminalNavigator);
    let client: Arc<dyn RemoteClient> = Arc::new(
        HttpClient::new(&config.api_base_url, tokens.clone())
            .context("Failed to build HTTP client")?
            .with_navigator(navigator.clone()),
    );
    let session = Arc::new(SessionManager::new(client.clone(), tokens, navigator));
    let store = CollectionStore::new(
        client.clone(),
        session.clone(),
        StoreOptions {
            cache_ttl: config.cache_ttl(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        },
    );

    let mut app = commands::App {
        client,
        session,
        store,
        json: cli.json,
        refresh: cli.refresh,
    };

    let result = match cli.cmd {
        Command::Login => app.login(),
        Command::Callback { code, exchange } => app.callback(&code, exchange).await,
        Command::Logout => app.logout().await,
        Command::Whoami => app.whoami().await,
        Command::Health => app.health().await,
        Command::Orgs => app.orgs().await,
        Command::Repos { org } => app.repos(org.as_deref()).await,
        Command::Branches { repo } => app.branches(&repo).await,
        Command::Content { repo, path, git_ref } => {
            app.content(&repo, &path, git_ref.as_deref()).await
        }
        Command::Pulls { state } => app.pulls(state.into()).await,
        Command::Services => app.services().await,
        Command::Register {
            repo,
            team,
            prod,
            dev,
        } => {
            app.register(&repo, team.as_deref(), prod.as_deref(), dev.as_deref())
                .await
        }
    };

    if let Err(e) = &result {
        log::error!("Command failed: {:#}", e);
    }
    log::info!("Exiting gh-explorer");
    result
}
