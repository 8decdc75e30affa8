// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for the boot server.

use std::path::Path;

use anyhow::{Context, Result};

use jeeboot_common::{Assets, Dispatcher};

use crate::transport::{self, Transport};

/// Number of read timeouts to wait for the bridge banner.
const BANNER_ATTEMPTS: u32 = 5;

/// Load configuration and firmware, failing with the config path in context.
pub fn load_assets(config: &Path) -> Result<Assets> {
    let assets = Assets::load(config)
        .with_context(|| format!("Failed to load configuration {}", config.display()))?;
    log::info!(
        "loaded {} firmware images, {} hardware IDs",
        assets.store.len(),
        assets.registry.len()
    );
    Ok(assets)
}

/// Serve boot requests until the serial port fails.
pub fn serve(transport: &mut Transport, assets: &Assets, band: u16, group: u8) -> Result<()> {
    let dispatcher = Dispatcher::new(&assets.store, &assets.registry, group);

    transport.wait_for_banner(BANNER_ATTEMPTS)?;
    transport.send_line(&transport::init_command(band, group))?;
    log::info!(
        "serving group {} @ {} MHz on {}",
        group,
        band,
        transport.port_name()
    );

    loop {
        let Some(line) = transport.read_line()? else {
            continue;
        };

        let frame = match transport::parse_line(&line) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                if !line.is_empty() {
                    log::debug!("bridge: {}", line);
                }
                continue;
            }
            Err(e) => {
                log::warn!("{:#}", e);
                continue;
            }
        };

        log::debug!("request {:?}", frame);
        if let Some((_, reply)) = dispatcher.handle_frame(&frame) {
            transport.send_frame(&reply)?;
        }
    }
}

/// Print the firmware table.
pub fn images(assets: &Assets) -> Result<()> {
    println!("{:>6}  {:>7}  {:>6}  {:>6}  FILE", "SWID", "BYTES", "CHUNKS", "CRC");
    for image in assets.store.iter() {
        println!(
            "{:>6}  {:>7}  {:>6}  0x{:04x}  {}",
            image.software_id(),
            image.len(),
            image.chunk_count(),
            image.checksum(),
            image.name()
        );
    }
    Ok(())
}

/// Print the hardware ID bindings.
pub fn nodes(assets: &Assets) -> Result<()> {
    println!(
        "{:<32}  {:>5}  {:>5}  {:>4}  {:>6}  IMAGE",
        "HWID", "BOARD", "GROUP", "NODE", "SWID"
    );
    for binding in assets.registry.iter() {
        let image = if assets.store.get(binding.software_id).is_some() {
            "ok"
        } else {
            "missing"
        };
        println!(
            "{:<32}  {:>5}  {:>5}  {:>4}  {:>6}  {}",
            binding.hardware_id.to_string(),
            binding.board,
            binding.group,
            binding.node,
            binding.software_id,
            image
        );
    }
    Ok(())
}

/// List serial ports.
pub fn ports() -> Result<()> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{}", port.port_name);
    }
    Ok(())
}
