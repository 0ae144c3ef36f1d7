//! honyaku - a machine-translation pipeline for Japanese light novels.
//!
//! Entry point: argument parsing, tracing setup, work-dir resolution,
//! command dispatch. Exit codes: 0 all chapters completed, 1 partial,
//! 2 invalid input.

use clap::Parser;
use eyre::Result;

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};
use config::Config;

pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_INVALID: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else if cli.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let work_dir = config::resolve_work_dir(cli.work_dir);
    let config = Config::load(&work_dir)?;

    let exit_code = match cli.command {
        Commands::Translate {
            volume_id,
            chapters,
            force,
            language,
            model,
            enable_continuity,
            enable_gap_analysis,
            enable_multimodal,
            no_cache,
        } => {
            commands::translate::run(commands::translate::TranslateArgs {
                work_dir,
                config,
                volume_id,
                chapters,
                force,
                language,
                model,
                enable_continuity,
                enable_gap_analysis,
                enable_multimodal,
                no_cache,
            })
            .await?
        }
        Commands::Bible { command } => commands::bible::run(&work_dir, command).await?,
        Commands::Patterns { command } => {
            commands::patterns::run(&work_dir, &config, command).await?
        }
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
