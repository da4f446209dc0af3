mod cli;
mod commands;
pub mod core;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::commands::CommandOutput;
use crate::core::downloader::Downloader;
use crate::core::error::{M3Error, M3Result};
use crate::core::http::build_http_client;
use crate::core::metadata::ModrinthClient;
use crate::core::project::find_project_root;

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Initialize structured logging; stdout is reserved for command output.
    let filter = if cli.verbose {
        EnvFilter::new("info,m3_lib=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,m3_lib=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(output) => {
            print!("{}", output.text);
            if output.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("{}", commands::describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> M3Result<CommandOutput> {
    let cwd = std::env::current_dir().map_err(|e| M3Error::io(PathBuf::from("."), e))?;
    let start = match cli.project {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };
    let root = find_project_root(&start)?;

    match cli.command {
        Command::Add { id, file } => {
            let client = build_http_client()?;
            let downloader = Downloader::with_client(client.clone());
            let source = ModrinthClient::new(client);
            commands::add_asset(
                &root,
                &source,
                &downloader,
                downloader.concurrency(),
                &id,
                file.as_deref(),
            )
            .await
        }
        Command::Remove { identifier } => commands::remove_asset(&root, &identifier),
        Command::Apply { remove } => {
            let downloader = Downloader::new()?;
            commands::apply_lockfile(&root, &downloader, downloader.concurrency(), remove).await
        }
        Command::Prune => commands::prune_assets(&root),
        Command::Freeze => commands::freeze_assets(&root),
        Command::Diff => commands::diff_assets(&root),
        Command::List { asset_type } => commands::list_assets(&root, asset_type.as_deref()),
    }
}
