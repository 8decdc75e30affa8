// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use jeeboot_common::DEFAULT_GROUP;

use crate::commands;
use crate::transport::{Transport, DEFAULT_BAUD};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "jeeboot", version)]
#[command(about = "Boot server for remote nodes running the JeeBoot loader")]
pub struct Cli {
    /// Configuration file with the swid/hwid details
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log level, takes precedence over -v; RUST_LOG overrides
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Values accepted by `--log-level`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter string understood by `env_logger`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Serve boot requests arriving on an RF12demo bridge
    Serve {
        /// Serial port with the attached bridge (e.g., /dev/ttyUSB0)
        #[arg(short, long)]
        port: String,

        /// Serial baud rate
        #[arg(long, default_value_t = DEFAULT_BAUD)]
        baud: u32,

        /// Frequency band in MHz (433, 868 or 915)
        #[arg(long, default_value = "868")]
        band: u16,

        /// Net group the nodes being served are on
        #[arg(short, long, default_value_t = DEFAULT_GROUP)]
        group: u8,
    },

    /// Show the firmware images named in the configuration
    Images,

    /// Show the configured hardware ID bindings
    Nodes,

    /// List available serial ports
    Ports,
}

impl Cli {
    /// Default log filter: `--log-level` if given, else implied by the `-v` count.
    pub fn log_filter(&self) -> &'static str {
        if let Some(level) = self.log_level {
            return level.as_filter();
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            port,
            baud,
            band,
            group,
        } => {
            // configuration errors should surface before the port is touched
            let assets = commands::load_assets(&cli.config)?;
            let mut transport = Transport::new(&port, baud)?;
            commands::serve(&mut transport, &assets, band, group)
        }
        Commands::Images => commands::images(&commands::load_assets(&cli.config)?),
        Commands::Nodes => commands::nodes(&commands::load_assets(&cli.config)?),
        Commands::Ports => commands::ports(),
    }
}
