//! Warden HTTP Gateway binary.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warden_core::PasswordVerifier;
use warden_gateway::{assembly, create_router, Args, Command, GatewayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line args
    let args = Args::parse();
    let config = GatewayConfig::from(&args);

    if let Some(Command::EncodePassword { password, encoder }) = &args.command {
        println!("{}", encoder.build().encode(password)?);
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.default_log_filter().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        listen = %config.listen_addr,
        encoder = %config.password_encoding,
        identity_source = ?config.identity_source,
        "Starting Warden Gateway"
    );

    // Build the security pipeline
    let state = assembly::build_state(&config)?;

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Gateway listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
