//! Parkinson's detection pipeline entry point

use clap::Parser;
use parkinson_detect::cli::{cmd_info, cmd_interactive, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkinson_detect=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train {
            data,
            target,
            drop,
            test_fraction,
            scale,
            balance,
            seed,
            output,
        }) => {
            cmd_train(&data, &target, &drop, test_fraction, &scale, &balance, seed, &output)?;
        }
        Some(Commands::Predict { models, data, output }) => {
            cmd_predict(&models, &data, output.as_deref())?;
        }
        Some(Commands::Info { data }) => {
            cmd_info(&data)?;
        }
        None => {
            cmd_interactive()?;
        }
    }

    Ok(())
}
