use std::{error::Error, time::Duration};

use clap::Parser;
use log::warn;
use repofetch::{
    cli::{
        args::{CliArgs, Command},
        command_handlers::{do_install, do_resolve},
    },
    config::RepofetchConfig,
    Cancellation, Repofetch,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli_args = CliArgs::parse();
    let config = RepofetchConfig::load()?;

    let mut builder = Repofetch::builder().config(config);
    if let Some(timeout) = cli_args.timeout {
        builder = builder.timeout(Duration::from_secs(timeout));
    }
    if let Some(retries) = cli_args.retries {
        builder = builder.retries(retries);
    }
    if cli_args.no_staging {
        builder = builder.staging(false);
    }
    if cli_args.lock {
        builder = builder.lock(true);
    }
    let repofetch = builder.try_build()?;

    let cancel = Cancellation::new();
    let mut worker = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || -> Result<(), Box<dyn Error + Send + Sync>> {
            match cli_args.cmd {
                Command::Install {
                    url,
                    destination,
                    revision,
                } => {
                    do_install(&repofetch, &url, destination.as_deref(), &revision, &cancel)?;
                }
                Command::Resolve { url, specifier } => {
                    let commit_hash = do_resolve(&repofetch, &url, &specifier, &cancel)?;
                    if !commit_hash.is_empty() {
                        println!("{commit_hash}");
                    }
                }
            }
            Ok(())
        })
    };

    tokio::select! {
        result = &mut worker => result?,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling");
            cancel.cancel();
            worker.await?
        }
    }
}
