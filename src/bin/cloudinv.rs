// src/bin/cloudinv.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cloudinv::{
    cli::{
        Cli,
        dispatcher::{self, AppContext},
    },
    core::config_loader,
    error::CloudError,
    system::invoker::Invoker,
};
use colored::*;

/// Sets up logging, loads the settings, dispatches the command and turns any
/// error into a message and exit code 1.
fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::new();
    logger.filter_level(cli.log_level());
    if std::env::var_os("RUST_LOG").is_some() {
        logger.parse_env("RUST_LOG");
    }
    logger.init();

    if let Err(e) = run_cli(cli) {
        // --- Centralized Error Handling ---
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }

        if let Some(cloud_err) = e.downcast_ref::<CloudError>() {
            let hints = cloud_err.remediation();
            if !hints.is_empty() {
                let mut lines = hints.iter();
                if let Some(first) = lines.next() {
                    eprintln!("{}", first.red().bold());
                }
                for line in lines {
                    eprintln!("{}", line);
                }
                std::process::exit(1);
            }
        }

        log::debug!("{:?}", e);
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    if cli.args.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let settings = config_loader::load_settings()?;
    let ctx = AppContext::new(Invoker::system(), settings);
    dispatcher::dispatch(cli.args, &ctx)
}
