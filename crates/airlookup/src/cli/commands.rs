//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::output::OutputFormat;
use crate::record::RecordPatch;
use crate::router::{TableRequest, WriteMode};

/// Online lookup arguments.
#[derive(Debug, Args)]
pub struct OnlineCommand {
    /// ICAO24 hex code (e.g., A4A3F2)
    pub icao24: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Vault location overrides shared by table commands.
#[derive(Debug, Clone, Default, Args)]
pub struct VaultArgs {
    /// Key vault URL holding the table connection string
    #[arg(long, value_name = "URL")]
    pub vault: Option<String>,

    /// Name of the secret holding the table connection string
    #[arg(long, value_name = "NAME")]
    pub secret: Option<String>,
}

/// Table lookup and upsert arguments.
#[derive(Debug, Args)]
pub struct TableCommand {
    /// ICAO24 hex code (e.g., A4A3F2)
    pub icao24: String,

    /// Registration to store
    #[arg(long)]
    pub registration: Option<String>,

    /// ICAO aircraft type to store
    #[arg(long = "type", value_name = "TYPE")]
    pub icao_type: Option<String>,

    /// ICAO operator to store
    #[arg(long)]
    pub operator: Option<String>,

    /// Overwrite the stored row instead of merging into it
    #[arg(long)]
    pub replace: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    #[command(flatten)]
    pub vault: VaultArgs,
}

impl TableCommand {
    /// Build the routed request from the arguments.
    #[must_use]
    pub fn to_request(&self) -> TableRequest {
        TableRequest {
            icao24: self.icao24.clone(),
            patch: RecordPatch::new(
                self.registration.as_deref(),
                self.icao_type.as_deref(),
                self.operator.as_deref(),
            ),
            mode: if self.replace {
                WriteMode::Replace
            } else {
                WriteMode::Merge
            },
        }
    }
}

/// Bulk import arguments.
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Aircraft database CSV file
    pub csv: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    #[command(flatten)]
    pub vault: VaultArgs,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Pick the output format from a `--json` flag.
#[must_use]
pub fn output_format(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_command() -> TableCommand {
        TableCommand {
            icao24: "a4a3f2".to_string(),
            registration: None,
            icao_type: None,
            operator: None,
            replace: false,
            json: false,
            vault: VaultArgs::default(),
        }
    }

    #[test]
    fn test_read_request_has_empty_patch() {
        let request = table_command().to_request();
        assert!(request.patch.is_empty());
        assert_eq!(request.mode, WriteMode::Merge);
        assert_eq!(request.icao24, "a4a3f2");
    }

    #[test]
    fn test_write_request() {
        let mut cmd = table_command();
        cmd.operator = Some("XYZ".to_string());
        cmd.registration = Some(String::new());
        cmd.replace = true;

        let request = cmd.to_request();
        assert_eq!(request.patch, RecordPatch::new(None, None, Some("XYZ")));
        assert_eq!(request.mode, WriteMode::Replace);
    }

    #[test]
    fn test_output_format() {
        assert_eq!(output_format(true), OutputFormat::Json);
        assert_eq!(output_format(false), OutputFormat::Plain);
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        assert!(format!("{cmd:?}").contains("Show"));
    }
}
