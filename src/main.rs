// Rancher Probe - session and node role label checker
use anyhow::Context;
use clap::Parser;
use rancher_probe::cli::{execute_command, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let succeeded = execute_command(args)
        .await
        .context("rancher-probe failed")?;
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
