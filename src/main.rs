/// Document Registry server
///
/// Serves uploads, alias resolution and the QR certificate redirect over HTTP.
use doc_registry::{
    config::{LoggingConfig, ServerConfig},
    context::AppContext,
    error::RegistryResult,
    jobs::JobScheduler,
    server,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> RegistryResult<()> {
    // Load configuration first; the log format is part of it
    let config = ServerConfig::from_env()?;

    init_tracing(&config.logging);

    print_banner();

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Startup maintenance, then background jobs
    let scheduler = Arc::new(JobScheduler::new(Arc::clone(&ctx)));
    if let Err(e) = scheduler.run_startup().await {
        tracing::error!("Startup maintenance failed: {}", e);
    }
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(logging.env_filter());
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_banner() {
    println!(
        r#"
    ____                 ____             _      __
   / __ \____  _____    / __ \___  ____ _(_)____/ /________  __
  / / / / __ \/ ___/   / /_/ / _ \/ __ `/ / ___/ __/ ___/ / / /
 / /_/ / /_/ / /__    / _, _/  __/ /_/ / (__  ) /_/ /  / /_/ /
/_____/\____/\___/   /_/ |_|\___/\__, /_/____/\__/_/   \__, /
                                /____/                /____/

        Signed Document Registry v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
