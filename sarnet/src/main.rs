use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use base64::Engine;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sarnet::api::{create_router, AppState};
use sarnet::auth::{
    check_password_length, hash_password_async, is_valid_username, unique_username,
    username_base_from_email,
};
use sarnet::colorize::ColorizerProvider;
use sarnet::config::Config;
use sarnet::db::{Database, DatabaseBackend, LibSqlBackend, UserStore};
use sarnet::models::User;

#[derive(Parser)]
#[command(name = "sarnet")]
#[command(about = "SAR image records backend with GAN-based colorization")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Colorize a single SAR image offline and write the result as PNG
    Colorize {
        /// Input image (any format the `image` crate decodes)
        input: PathBuf,
        /// Output PNG path
        output: PathBuf,
    },
    /// Create an account that can see every user record
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Derived from the email when omitted
        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sarnet=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Colorize { input, output } => colorize_file(&config, &input, &output).await,
        Command::CreateSuperuser {
            email,
            password,
            username,
        } => create_superuser(&config, email, password, username).await,
    }
}

async fn open_database(config: &Config) -> anyhow::Result<Arc<dyn DatabaseBackend>> {
    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    Ok(Arc::new(LibSqlBackend::new(raw_db)))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    if config.auth.ephemeral_secret {
        tracing::warn!(
            "JWT_SECRET is not set - using a per-process secret. Tokens will not survive a restart."
        );
    }

    let db = open_database(&config).await?;

    tracing::info!(
        "Initializing colorizer: {}...",
        config.colorizer.checkpoint_path.display()
    );
    let colorizer = ColorizerProvider::new(&config.colorizer);
    if !colorizer.is_available() {
        tracing::warn!("Colorizer unavailable - /api/predict/ will answer 503");
    }

    let state = AppState::new(config.clone(), db, colorizer.clone());

    let cancel_token = CancellationToken::new();

    if config.colorizer.preload && colorizer.is_available() {
        tracing::info!("Preloading colorization model...");
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Colorizer preload cancelled");
                }
                result = colorizer.preload() => match result {
                    Ok(()) => tracing::info!("Colorization model loaded"),
                    Err(e) => tracing::error!("Colorizer preload failed: {}", e),
                },
            }
        });
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("SARNet starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/health/", addr);
    tracing::info!("  API docs:     http://{}/api/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn colorize_file(config: &Config, input: &PathBuf, output: &PathBuf) -> anyhow::Result<()> {
    let colorizer = ColorizerProvider::new(&config.colorizer);
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let encoded = colorizer.colorize(bytes).await?;
    let png = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("Colorizer returned invalid base64")?;

    tokio::fs::write(output, png)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!(output = %output.display(), "Colorized image written");
    Ok(())
}

async fn create_superuser(
    config: &Config,
    email: String,
    password: String,
    username: Option<String>,
) -> anyhow::Result<()> {
    check_password_length(&password)?;
    let db = open_database(config).await?;

    if db.get_user_by_email(&email).await?.is_some() {
        anyhow::bail!("A user with email {email} already exists");
    }

    let username = match username {
        Some(name) => {
            if !is_valid_username(&name) {
                anyhow::bail!("Invalid username: {name}");
            }
            if db.username_exists(&name).await? {
                anyhow::bail!("Username {name} is already taken");
            }
            name
        }
        None => unique_username(db.as_ref(), &username_base_from_email(&email)).await?,
    };

    let hash = hash_password_async(password).await?;
    let mut user = User::new(email, username, hash);
    user.is_superuser = true;
    user.is_verified = true;

    let user = db.create_user(&user).await?;
    tracing::info!(user_id = user.id, username = %user.username, "Superuser created");
    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
