// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport to an RF12demo radio bridge.
//!
//! The bridge prints every received packet as a text line `OK <hdr> <b1> ...`
//! in decimal, and sends a packet when given `<b1>,<b2>,...,<hdr>s`.

use anyhow::{bail, Context, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

/// Default timeout for serial reads in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// RF12demo runs at this speed.
pub const DEFAULT_BAUD: u32 = 57600;

/// Node ID the bridge itself listens as.
const BRIDGE_NODE_ID: u8 = 31;

/// "Send to this node" flag of the RF12 header.
const HDR_DST: u8 = 0x40;

const NODE_MASK: u8 = 0x1F;

/// Longest line we keep; anything longer is noise.
const MAX_LINE_LEN: usize = 512;

/// Command putting the bridge on `band` (MHz) and `group`, in quiet collect mode.
pub fn init_command(band_mhz: u16, group: u8) -> String {
    format!(
        "{}b {}g {}i 1c 1q v",
        band_mhz / 100,
        group,
        BRIDGE_NODE_ID
    )
}

/// Decode an `OK` line into a frame (header byte first).
///
/// Returns `Ok(None)` for lines that are not packet reports.
pub fn parse_line(line: &str) -> Result<Option<Vec<u8>>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("OK") {
        return Ok(None);
    }
    let frame = tokens
        .map(|t| {
            t.parse::<u8>()
                .with_context(|| format!("bad byte {:?} in {:?}", t, line))
        })
        .collect::<Result<Vec<u8>>>()?;
    if frame.is_empty() {
        return Ok(None);
    }
    Ok(Some(frame))
}

/// Format a reply frame as an RF12demo send command.
pub fn format_send(frame: &[u8]) -> String {
    let Some((header, body)) = frame.split_first() else {
        return String::new();
    };
    let mut cmd = String::with_capacity(body.len() * 4 + 4);
    for b in body {
        cmd.push_str(&b.to_string());
        cmd.push(',');
    }
    cmd.push_str(&(HDR_DST | (header & NODE_MASK)).to_string());
    cmd.push('s');
    cmd
}

/// Serial connection to the radio bridge.
pub struct Transport {
    port: Box<dyn SerialPort>,
    rx_buf: Vec<u8>,
}

impl Transport {
    /// Open the serial port at the given baud rate.
    pub fn new(port_name: &str, baud: u32) -> Result<Self> {
        Self::with_timeout(port_name, baud, DEFAULT_TIMEOUT_MS)
    }

    /// Open the serial port with a custom read timeout.
    pub fn with_timeout(port_name: &str, baud: u32, timeout_ms: u64) -> Result<Self> {
        let port = serialport::new(port_name, baud)
            .timeout(Duration::from_millis(timeout_ms))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self {
            port,
            rx_buf: Vec::with_capacity(MAX_LINE_LEN),
        })
    }

    /// Get the port name.
    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "?".to_string())
    }

    /// Write one command line to the bridge.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        log::debug!("> {}", line);
        self.port
            .write_all(line.as_bytes())
            .and_then(|_| self.port.write_all(b"\n"))
            .context("Failed to write to serial port")?;
        self.port.flush()?;
        Ok(())
    }

    /// Send a reply frame over the radio.
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        let cmd = format_send(frame);
        self.send_line(&cmd)
    }

    /// Read one text line.
    ///
    /// Returns `Ok(None)` when the read timed out before a full line arrived;
    /// a partial line is kept for the next call.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(1) => match byte[0] {
                    b'\n' => {
                        let line = String::from_utf8_lossy(&self.rx_buf).trim().to_string();
                        self.rx_buf.clear();
                        return Ok(Some(line));
                    }
                    b => {
                        if self.rx_buf.len() >= MAX_LINE_LEN {
                            log::warn!("discarding overlong serial line");
                            self.rx_buf.clear();
                        }
                        self.rx_buf.push(b);
                    }
                },
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => bail!("Serial read error: {}", e),
            }
        }
    }

    /// Wait for the bridge to print something after the port was opened.
    ///
    /// Opening the port resets most bridges; commands sent before the banner
    /// are lost.
    pub fn wait_for_banner(&mut self, attempts: u32) -> Result<()> {
        for _ in 0..attempts {
            if let Some(line) = self.read_line()? {
                log::info!("bridge: {}", line);
                return Ok(());
            }
        }
        log::warn!("no banner from {}, sending init anyway", self.port_name());
        Ok(())
    }
}
