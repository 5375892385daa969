use anyhow::Context;
use clap::{Parser, Subcommand};
use courier_config::load as load_config;
use courier_gateway::{create_router, GatewayState};
use courier_runtime::{shutdown_signal, telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "courier-backend")]
#[command(about = "Courier real-time chat backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::Migrate => run_migrations().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    info!("starting Courier backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = GatewayState::new(
        services.store.clone(),
        services.registry.clone(),
        &services.delivery,
        services.shutdown.clone(),
    );
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    // Streams hold their connections open, so they are ended before the
    // server waits for in-flight requests to drain.
    let streams = services.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            streams.close_streams();
        })
        .await
        .context("http server error")?;

    services.db_pool.close().await;
    info!("backend shut down");
    Ok(())
}

async fn run_migrations() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;

    let pool = courier_database::initialize_database(&config.database)
        .await
        .context("failed to apply database migrations")?;
    pool.close().await;

    info!(url = %config.database.url, "database migrations applied");
    Ok(())
}
