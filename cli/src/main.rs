use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use polly_client::config::{ConfigError, DEFAULT_API_BASE, DEFAULT_ORIGIN, Timeouts};
use polly_client::net::types::{
    CreatePollData, LoginCredentials, RegisterCredentials, UpdatePollData, VoteData,
};
use polly_client::storage::FileStorage;
use polly_client::util::auth::with_auth;
use polly_client::{ApiError, AuthRequired, AuthService, ClientConfig, PollsApi, SessionStore};


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("no config directory on this platform; pass --session-dir or set POLLY_SESSION_DIR")]
    NoSessionDir,
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    AuthFailed(String),
    #[error("{0}; run `polly login` first")]
    AuthRequired(#[from] AuthRequired),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "polly", about = "Polly polling service CLI")]
struct Cli {
    #[arg(long, env = "POLLY_ORIGIN")]
    origin: Option<String>,

    #[arg(long, env = "POLLY_API_URL")]
    api_url: Option<String>,

    /// Directory holding the persisted session.
    #[arg(long, env = "POLLY_SESSION_DIR")]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "POLLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "POLLY_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    Logout,
    /// Revalidate the stored session with the server.
    Whoami,
    Refresh,
    Polls(PollsCommand),
}

#[derive(Args, Debug)]
struct PollsCommand {
    #[command(subcommand)]
    command: PollsSubcommand,
}

#[derive(Subcommand, Debug)]
enum PollsSubcommand {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        poll_id: String,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Repeat once per option.
        #[arg(long = "option", required = true)]
        options: Vec<String>,
        #[arg(long, default_value_t = false)]
        multiple: bool,
        /// Let visitors without an account vote.
        #[arg(long, default_value_t = false)]
        anonymous: bool,
    },
    Close {
        poll_id: String,
    },
    Vote {
        poll_id: String,
        #[arg(long = "option", required = true)]
        options: Vec<String>,
    },
    Delete {
        poll_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing();

    let config = client_config(&cli)?;
    let session_dir = cli
        .session_dir
        .clone()
        .or_else(default_session_dir)
        .ok_or(CliError::NoSessionDir)?;
    tracing::debug!(
        api_root = %config.api_root(),
        session_dir = %session_dir.display(),
        "starting"
    );

    let store = SessionStore::new(FileStorage::new(session_dir));
    let auth = AuthService::from_config(&config, store)?;

    match cli.command {
        Command::Login { email, password } => {
            run_login(&auth, LoginCredentials { email, password }).await
        }
        Command::Register { email, username, password, name } => {
            run_register(&auth, RegisterCredentials { email, username, password, name }).await
        }
        Command::Logout => run_logout(&auth).await,
        Command::Whoami => run_whoami(&auth).await,
        Command::Refresh => run_refresh(&auth).await,
        Command::Polls(polls) => run_polls(&auth, polls).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// clap already folds `POLLY_ORIGIN` / `POLLY_API_URL` into the flags, so a
/// flag always wins over the environment and only timeouts are read here.
fn client_config(cli: &Cli) -> Result<ClientConfig, ConfigError> {
    let origin = cli.origin.as_deref().unwrap_or(DEFAULT_ORIGIN);
    let api_base = cli.api_url.as_deref().unwrap_or(DEFAULT_API_BASE);
    ClientConfig::new(origin, api_base, Timeouts::from_env())
}

fn default_session_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("polly"))
}

// =============================================================================
// AUTH COMMANDS
// =============================================================================

async fn run_login(auth: &AuthService, credentials: LoginCredentials) -> Result<(), CliError> {
    let outcome = auth.login(&credentials).await;
    if !outcome.success {
        let message = outcome.error.unwrap_or_else(|| "login failed".to_owned());
        return Err(CliError::AuthFailed(message));
    }
    warn_if_degraded(outcome.persistence_degraded);
    print_json(&json!({ "user": auth.current_user() }))
}

async fn run_register(
    auth: &AuthService,
    credentials: RegisterCredentials,
) -> Result<(), CliError> {
    let outcome = auth.register(&credentials).await;
    if !outcome.success {
        let message = outcome.error.unwrap_or_else(|| "registration failed".to_owned());
        return Err(CliError::AuthFailed(message));
    }
    warn_if_degraded(outcome.persistence_degraded);
    print_json(&json!({ "user": auth.current_user() }))
}

async fn run_logout(auth: &AuthService) -> Result<(), CliError> {
    let outcome = auth.logout().await;
    warn_if_degraded(outcome.persistence_degraded);
    print_json(&json!({
        "serverAcknowledged": outcome.server_acknowledged,
        "cleared": outcome.cleared,
    }))
}

async fn run_whoami(auth: &AuthService) -> Result<(), CliError> {
    if auth.stored_token_expired() {
        tracing::warn!("stored token has expired; the server will likely reject it");
    }
    let user = auth.check_auth().await;
    print_json(&json!({ "authenticated": user.is_some(), "user": user }))
}

async fn run_refresh(auth: &AuthService) -> Result<(), CliError> {
    auth.require_auth()?;
    if !auth.refresh_token().await {
        return Err(CliError::AuthFailed("session refresh failed; signed out".to_owned()));
    }
    print_json(&json!({ "user": auth.current_user() }))
}

fn warn_if_degraded(degraded: bool) {
    if degraded {
        tracing::warn!("session could not be saved; it will not survive this process");
    }
}

// =============================================================================
// POLL COMMANDS
// =============================================================================

async fn run_polls(auth: &AuthService, polls: PollsCommand) -> Result<(), CliError> {
    let api = PollsApi::new(auth.api().clone());

    match polls.command {
        PollsSubcommand::List { page, limit } => {
            let page = api.list(page, limit).await?;
            print_json(&serde_json::to_value(page)?)
        }
        PollsSubcommand::Show { poll_id } => {
            let poll = api.get(&poll_id).await?;
            print_json(&serde_json::to_value(poll)?)
        }
        PollsSubcommand::Create { title, description, options, multiple, anonymous } => {
            with_auth(auth, |_| ())?;
            let data = CreatePollData {
                title,
                description,
                options,
                ends_at: None,
                allow_multiple_choices: multiple,
                require_auth: !anonymous,
            };
            let poll = api.create(&data).await?;
            print_json(&serde_json::to_value(poll)?)
        }
        PollsSubcommand::Close { poll_id } => {
            with_auth(auth, |_| ())?;
            let update = UpdatePollData { is_active: Some(false), ..UpdatePollData::default() };
            let poll = api.update(&poll_id, &update).await?;
            print_json(&serde_json::to_value(poll)?)
        }
        PollsSubcommand::Vote { poll_id, options } => {
            let votes = api.vote(&VoteData { poll_id, option_ids: options }).await?;
            print_json(&serde_json::to_value(votes)?)
        }
        PollsSubcommand::Delete { poll_id } => {
            let user = with_auth(auth, |user| user.id.clone())?;
            tracing::debug!(%user, %poll_id, "deleting poll");
            api.delete(&poll_id).await?;
            print_json(&json!({ "deleted": poll_id }))
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
