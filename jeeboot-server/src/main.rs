// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot server for nodes running the JeeBoot loader, via an RF12demo bridge.
//!
//! Usage:
//!   jeeboot --config config.json serve --port /dev/ttyUSB0 --group 212
//!   jeeboot --config config.json images
//!   jeeboot --config config.json nodes
//!   jeeboot --log-level debug images

mod cli;
mod commands;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .format_timestamp_millis()
        .init();

    cli::run(args)
}
