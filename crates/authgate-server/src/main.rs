//! authgate server
//!
//! HTTP API for password login, registration and JWT issuance, plus operator
//! subcommands for managing identities.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use authgate_core::Config;
use authgate_core::config::load_config;
use authgate_core::tracing_init::init_tracing;
use authgate_server::auth::{SigningKey, TokenValidator};
use authgate_server::server::{AppState, router};
use authgate_server::service::AuthService;
use authgate_server::service::models::NewAccount;
use authgate_server::storage::IdentityDatabase;

#[derive(Parser, Debug)]
#[command(name = "authgate-server")]
#[command(version, about = "authgate - credential verification and JWT issuance")]
struct Args {
    /// Path to a JSON settings file.
    #[arg(long, env = "AUTHGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides `Server.Addr`).
    #[arg(long, global = true)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file (overrides `Server.DatabasePath`).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Create an identity with an explicit role.
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: String,
        /// Comma-separated role names.
        #[arg(long, default_value = "User")]
        role: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Replace an identity's roles.
    SetRole {
        #[arg(long)]
        username: String,
        #[arg(long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(path) = args.db_path.clone() {
        config.server.database_path = Some(path);
    }
    config.server.log_json |= args.log_json;

    init_tracing(
        "authgate_server=info,tower_http=info",
        config.server.log_json,
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::AddUser {
            username,
            password,
            email,
            role,
            first_name,
            last_name,
        } => {
            let (auth, _) = build_service(&config).await?;
            let identity = auth
                .create_identity(&NewAccount {
                    username: &username,
                    password: &password,
                    email: &email,
                    role: &role,
                    first_name: &first_name,
                    last_name: &last_name,
                })
                .await
                .with_context(|| format!("Failed to create identity {username}"))?;
            info!(user_id = %identity.id, role = %identity.role, "Identity created");
            Ok(())
        }
        Command::SetRole { username, role } => {
            let (auth, _) = build_service(&config).await?;
            let identity = auth
                .set_role(&username, &role)
                .await
                .with_context(|| format!("Failed to set role for {username}"))?;
            info!(user_id = %identity.id, role = %identity.role, "Role updated");
            Ok(())
        }
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        "Starting authgate-server"
    );

    let (auth, key) = build_service(config).await?;
    let validator = Arc::new(TokenValidator::new(key, &config.jwt));
    let app = router(AppState::new(Arc::new(auth), validator));

    let listener = tokio::net::TcpListener::bind(config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    info!(addr = %config.server.addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("authgate-server stopped");
    Ok(())
}

/// Build the signing key, open the identity store and assemble the service.
async fn build_service(config: &Config) -> anyhow::Result<(AuthService, Arc<SigningKey>)> {
    let key = Arc::new(SigningKey::from_config(&config.jwt)?);

    let path = config.server.resolved_database_path()?;
    info!(path = %path.display(), "Opening identity store");
    let db = IdentityDatabase::open(&path).await?;

    let auth = AuthService::new(db, Arc::clone(&key), config)?;
    Ok((auth, key))
}
