use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use foodgram::db;
use foodgram::server::config::ServerConfig;
use foodgram::services::auth_service;
use foodgram::web::create_axum_router;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Seed ingredients and/or tags from CSV files
    Import {
        /// `name,measurement_unit` per line
        #[arg(long)]
        ingredients: Option<PathBuf>,
        /// `name,color,slug` per line
        #[arg(long)]
        tags: Option<PathBuf>,
    },
    /// Grant the admin role to an existing account
    Promote {
        #[arg(long)]
        email: String,
    },
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "foodgram.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal.");
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let server_config = Arc::new(ServerConfig::load(args.config.as_deref())?);
    init_logging(&server_config.log_dir);
    info!("Starting foodgram, version: {}", env!("CARGO_PKG_VERSION"));

    let db_pool = match db::connect(&server_config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to connect to the database.");
            return Err(e.into());
        }
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let router = create_axum_router(db_pool, server_config.clone());
            let listener = TcpListener::bind(&server_config.listen_addr).await?;
            info!(addr = %server_config.listen_addr, "HTTP server listening.");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Command::Import { ingredients, tags } => {
            if ingredients.is_none() && tags.is_none() {
                return Err("import needs --ingredients and/or --tags".into());
            }
            if let Some(path) = ingredients {
                let summary = db::import::import_ingredients(&db_pool, &path).await?;
                println!(
                    "Ingredients: {} created, {} already present",
                    summary.created, summary.existing
                );
            }
            if let Some(path) = tags {
                let summary = db::import::import_tags(&db_pool, &path).await?;
                println!(
                    "Tags: {} created, {} already present",
                    summary.created, summary.existing
                );
            }
        }
        Command::Promote { email } => {
            let user = auth_service::promote_to_admin(&db_pool, &email).await?;
            info!(user_id = user.id, "Granted admin role.");
            println!("{} is now an administrator", user.email);
        }
    }

    Ok(())
}
