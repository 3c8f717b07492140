//! Command implementations. Each one loads the sealed session, runs a
//! single gateway operation, writes the (possibly refreshed) session back
//! and prints the normalized reply.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use fintrack_core::auth::CredentialStore;
use fintrack_core::{
    AuthGateway, Config, CredentialAuthenticator, GatewayReply, RequestOptions, SessionStore,
    TokenState,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::session_file::SessionFile;

pub struct Cli {
    config: Config,
    authenticator: CredentialAuthenticator,
    gateway: AuthGateway,
    session_file: SessionFile,
}

impl Cli {
    pub fn new(config: Config) -> Result<Self> {
        let backend = config.backend_client()?;
        let session_file = SessionFile::new(config.cache_dir()?, config.session_secret());

        Ok(Self {
            authenticator: CredentialAuthenticator::new(backend.clone()),
            gateway: AuthGateway::new(backend),
            config,
            session_file,
        })
    }

    pub async fn login(&mut self, username: Option<String>, remember: bool) -> Result<ExitCode> {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(name) => name,
            None => prompt("Username: ")?,
        };

        let password = match CredentialStore::remembered_password(&username) {
            Some(password) if !remember => password,
            _ => rpassword::prompt_password("Password: ").context("Failed to read password")?,
        };

        let store = SessionStore::new();
        let result = self.authenticator.login_into(&store, &username, &password).await;

        if result.is_ok() {
            self.config.last_username = Some(username.clone());
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
            if remember {
                if let Err(e) = CredentialStore::remember_password(&username, &password) {
                    warn!(error = %e, "Failed to remember password");
                }
            }
            self.session_file.save(&store).await?;
            info!(username = %username, "Session stored");
        }

        let result = result.map(|session| {
            serde_json::json!({
                "user_id": session.user_id(),
                "access_token_expires": session.access.expires_at,
                "refresh_token_expires": session.refresh.expires_at,
            })
        });
        Ok(print_reply(GatewayReply::from_result(result)))
    }

    pub async fn logout(&self, forget: bool) -> Result<ExitCode> {
        let store = self.session_file.load()?;
        let username = store.snapshot().await.map(|s| s.username);

        self.authenticator.logout(&store).await;
        self.session_file.save(&store).await?;

        if forget {
            if let Some(username) = username {
                if let Err(e) = CredentialStore::forget_password(&username) {
                    warn!(error = %e, "Failed to forget password");
                }
            }
        }

        println!("Logged out");
        Ok(ExitCode::SUCCESS)
    }

    pub async fn status(&self) -> Result<ExitCode> {
        let store = self.session_file.load()?;
        let Some(session) = store.snapshot().await else {
            println!("Not logged in");
            return Ok(ExitCode::FAILURE);
        };

        let state = match session.state() {
            TokenState::Valid => format!("valid for {} more minutes", session.minutes_until_expiry()),
            TokenState::Expired => "access token expired, will refresh on next request".to_string(),
            TokenState::Refreshing => "refreshing".to_string(),
            TokenState::RefreshExpired => "session expired, please log in again".to_string(),
            TokenState::Errored => "last refresh failed, please log in again".to_string(),
        };

        println!("User:     {} ({})", session.username, session.user_id());
        println!("Backend:  {}", self.config.api_base_url());
        println!("Session:  {}", state);
        Ok(ExitCode::SUCCESS)
    }

    /// Forward one raw request and print the backend's answer.
    pub async fn proxy(&self, path: &str, options: RequestOptions) -> Result<ExitCode> {
        let store = self.session_file.load()?;
        let result = self.gateway.proxy(&store, path, options).await;
        self.session_file.save(&store).await?;
        Ok(print_reply(GatewayReply::from_result(result)))
    }

    pub async fn transactions(&self) -> Result<ExitCode> {
        let store = self.session_file.load()?;
        let result = self.gateway.list_transactions(&store).await;
        self.session_file.save(&store).await?;
        Ok(print_reply(GatewayReply::from_result(result)))
    }

    pub async fn accounts(&self) -> Result<ExitCode> {
        let store = self.session_file.load()?;
        let result = self.gateway.list_accounts(&store).await;
        self.session_file.save(&store).await?;
        Ok(print_reply(GatewayReply::from_result(result)))
    }
}

/// Parse the JSON body argument of `post`.
pub fn parse_body(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("Request body must be valid JSON")
}

fn print_reply<T: Serialize>(reply: GatewayReply<T>) -> ExitCode {
    match serde_json::to_string_pretty(&reply) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to render reply: {}", e),
    }

    if !reply.ok && reply.http_status == 401 {
        eprintln!("Run `fintrack login` to sign in again.");
    }

    if reply.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("No username given");
    }
    Ok(value)
}
