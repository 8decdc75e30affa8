// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Nibble-table CRC-16, as computed by the loader on the node.
//!
//! The node checks a downloaded image with a 16-entry table to save flash,
//! so the server uses the exact same formulation. The result equals
//! CRC-16/MODBUS (poly 0xA001 reflected, init 0xFFFF, no final XOR).

/// Initial register value.
pub const CRC16_INIT: u16 = 0xFFFF;

const CRC16_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
    0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
];

/// Feed one byte into the CRC register, low nibble first.
#[inline]
pub fn update(crc: u16, byte: u8) -> u16 {
    let crc = (crc >> 4) ^ CRC16_TABLE[(crc & 0x0F) as usize] ^ CRC16_TABLE[(byte & 0x0F) as usize];
    (crc >> 4) ^ CRC16_TABLE[(crc & 0x0F) as usize] ^ CRC16_TABLE[(byte >> 4) as usize]
}

/// CRC-16 over a whole buffer.
pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(CRC16_INIT, |crc, &b| update(crc, b))
}
