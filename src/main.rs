use clap::Parser;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let config = lingo::Config::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(lingo::server::serve(config));
    runtime.shutdown_timeout(Duration::from_secs(5));
    result
}
