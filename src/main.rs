use clap::Parser;
use tracing_subscriber::EnvFilter;

use tasty::cli::{resolve_database, Args};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_database(args.database.as_deref())?;
    let output = args.command.run(&config, args.format).await?;
    println!("{}", output);
    Ok(())
}
