//! `airlookup` - CLI for resolving aircraft metadata
//!
//! This binary provides the command-line interface for online lookups and for
//! reading and updating the aircraft table.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use airlookup::cli::{output_format, Cli, Command, ConfigCommand, VaultArgs};
use airlookup::output::{self, OutputFormat};
use airlookup::{init_logging, Config, Router};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let (outcome, format) = match cli.command {
        Command::Config(config_cmd) => {
            handle_config(cli.config, config_cmd)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Online(cmd) => {
            let router = Router::from_config(load_config(cli.config)?)?;
            (router.online(&cmd.icao24).await?, output_format(cmd.json))
        }
        Command::Table(cmd) => {
            let mut config = load_config(cli.config)?;
            apply_vault_args(&mut config, &cmd.vault)?;
            let router = Router::from_config(config)?;
            (router.table(&cmd.to_request()).await?, output_format(cmd.json))
        }
        Command::Sync(cmd) => {
            let mut config = load_config(cli.config)?;
            apply_vault_args(&mut config, &cmd.vault)?;
            let router = Router::from_config(config)?;
            let outcome = router
                .sync(&cmd.csv)
                .await
                .with_context(|| format!("syncing {}", cmd.csv.display()))?;
            (outcome, output_format(cmd.json))
        }
    };

    print!("{}", output::render(&outcome, format)?);

    Ok(ExitCode::from(outcome.exit_code()))
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(path).context("loading configuration")
}

fn apply_vault_args(config: &mut Config, args: &VaultArgs) -> anyhow::Result<()> {
    config.apply_vault_overrides(args.vault.clone(), args.secret.clone());
    config.validate().context("applying --vault/--secret")?;
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = load_config(config_path)?;
            if output_format(json) == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Online]");
                println!("  URL template:       {}", config.online.url_template);
                println!("  Timeout (secs):     {}", config.online.timeout_secs);
                println!();
                println!("[Vault]");
                println!("  URL:                {}", config.vault.url);
                println!("  Secret name:        {}", config.vault.secret_name);
                println!();
                println!("[Table]");
                println!("  Name:               {}", config.table.name);
                println!("  Partition key:      {}", config.table.partition_key);
                println!(
                    "  Connection string:  {}",
                    if config.table.connection_string.is_some() {
                        "(set, vault bypassed)"
                    } else {
                        "(from vault)"
                    }
                );
                println!("  Create if missing:  {}", config.table.create_if_missing);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
