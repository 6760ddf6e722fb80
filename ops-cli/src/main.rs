use clap::Parser;
use config_engine::load_config;
use logger_redacted::init_tracing;
use ops_cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let logging = if cli.verbose {
        config.logging.clone().with_level("debug")
    } else {
        config.logging.clone()
    };
    init_tracing(&logging)?;

    let output = run(cli, config).await?;
    println!("{}", output);
    Ok(())
}
