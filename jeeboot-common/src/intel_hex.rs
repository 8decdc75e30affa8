// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Intel-HEX to flat binary conversion.
//!
//! Only data records are used and their address fields are ignored: the
//! image is assumed to be contiguous and to start at address 0. This limits
//! correct operation to images under 64 KiB without gaps, which covers every
//! loader target.

use crate::error::{Error, Result};

/// Download chunk size; images are padded to a multiple of this.
pub const BLOCK_SIZE: usize = 64;

/// Fill byte used for padding (erased flash).
pub const PAD_BYTE: u8 = 0xFF;

const RECORD_DATA: u8 = 0x00;

/// Decode the lines of an Intel-HEX file into a flat byte image.
///
/// Lines not starting with `:` are skipped. Data records are appended in
/// file order; all other record types contribute nothing.
pub fn decode_lines<I, S>(lines: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut image = Vec::new();

    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.as_ref().trim();
        let Some(record) = line.strip_prefix(':') else {
            continue;
        };

        let bytes = hex::decode(record)
            .map_err(|e| Error::Decode(format!("line {}: {}", idx + 1, e)))?;

        if bytes.len() < 4 {
            return Err(Error::Decode(format!(
                "line {}: record too short ({} bytes)",
                idx + 1,
                bytes.len()
            )));
        }

        let count = bytes[0] as usize;
        if bytes.len() < 4 + count {
            return Err(Error::Decode(format!(
                "line {}: record declares {} data bytes but carries {}",
                idx + 1,
                count,
                bytes.len() - 4
            )));
        }

        if bytes[3] == RECORD_DATA {
            image.extend_from_slice(&bytes[4..4 + count]);
        }
    }

    Ok(image)
}

/// Decode a whole Intel-HEX text.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    decode_lines(text.lines())
}

/// Pad `data` with 0xFF up to the next multiple of `block_size`.
///
/// A `block_size` of 0 means no alignment: `data` comes back unchanged.
pub fn pad(mut data: Vec<u8>, block_size: usize) -> Vec<u8> {
    let rem = data.len().checked_rem(block_size).unwrap_or(0);
    if rem != 0 {
        data.resize(data.len() + block_size - rem, PAD_BYTE);
    }
    data
}
