//! vpcforge - plan VPC subnets and write per-region Terraform trees

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vpcforge_cli::cli::Cli;
use vpcforge_cli::output::json::{error_code, format_error};

/// Logs go to stderr; stdout carries command output only.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(console::Term::stderr().is_term())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("command failed: {e:?}");
            match format_error(&format!("{e:#}"), error_code(&e)) {
                Ok(obj) if json => println!("{obj}"),
                _ => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
