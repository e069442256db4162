//! lambdastub - local stub of the Lambda Invoke API
//!
//! Serves `POST /{api_version}/functions/{name}/invocations` against a set of
//! in-process functions, answering the way the real service does so SDK
//! clients can be pointed at it.

mod builtins;
mod config;
mod router;

use clap::Parser;
use lambdastub_invoke::{InvokeService, InvokeState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lambdastub")]
#[command(about = "Local stub of the Lambda Invoke API", long_about = None)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "LAMBDASTUB_PORT")]
    port: Option<u16>,

    /// Host to bind to (overrides the config file)
    #[arg(long, env = "LAMBDASTUB_HOST")]
    host: Option<String>,

    /// Region used for bare function names
    #[arg(long, env = "AWS_DEFAULT_REGION")]
    region: Option<String>,

    /// Path to a config file
    #[arg(short, long, env = "LAMBDASTUB_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LAMBDASTUB_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("lambdastub={},tower_http=debug", args.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = config::Config::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(region) = args.region {
        config.invoke.default_region = Some(region);
    }

    let registry = builtins::registry(&config.functions)?;
    let service = InvokeService::with_config(registry, &config.invoke);

    info!("Starting lambdastub...");
    info!("  Region: {}", service.resolver().region());
    info!("  Account: {}", service.resolver().account_id());
    for name in service.registry().names() {
        info!("  Function: {}", name);
    }

    let app = router::create_router(Arc::new(InvokeState::new(service)));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
