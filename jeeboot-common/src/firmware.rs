// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware images served to nodes, keyed by software ID.
//!
//! Images are decoded, padded and checksummed in one step before they become
//! visible, and the store is never modified after it has been built. It can
//! be shared between threads (e.g. behind an `Arc`) without locking.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::crc16;
use crate::error::{Error, Result};
use crate::intel_hex::{self, BLOCK_SIZE};

/// Size of the unit used for `swSize` in upgrade replies.
pub const SIZE_UNIT: usize = 16;

/// Largest image whose size in 16-byte units still fits the 16-bit field.
pub const MAX_IMAGE_SIZE: usize = u16::MAX as usize * SIZE_UNIT;

/// A decoded firmware image, padded to a multiple of [`BLOCK_SIZE`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirmwareImage {
    software_id: u16,
    name: String,
    data: Vec<u8>,
    checksum: u16,
}

impl FirmwareImage {
    /// Build an image from raw binary contents.
    ///
    /// The data is padded with 0xFF first; the checksum covers the padding.
    pub fn from_binary(software_id: u16, name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let name = name.into();
        if software_id == 0 {
            return Err(Error::Decode(format!("{}: software ID 0 is reserved", name)));
        }

        let data = intel_hex::pad(data, BLOCK_SIZE);
        if data.len() > MAX_IMAGE_SIZE {
            return Err(Error::Decode(format!(
                "{}: image of {} bytes does not fit the upgrade size field",
                name,
                data.len()
            )));
        }

        let checksum = crc16::checksum(&data);
        Ok(Self {
            software_id,
            name,
            data,
            checksum,
        })
    }

    /// Build an image from the text of an Intel-HEX file.
    pub fn from_hex(software_id: u16, name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let raw = intel_hex::decode(text).map_err(|e| match e {
            Error::Decode(msg) => Error::Decode(format!("{}: {}", name, msg)),
            other => other,
        })?;
        let raw_len = raw.len();
        let image = Self::from_binary(software_id, name, raw)?;

        log::info!(
            "firmware {} = {}: {} -> {} bytes, crc 0x{:04x}",
            image.software_id,
            image.name,
            raw_len,
            image.data.len(),
            image.checksum
        );
        Ok(image)
    }

    /// Read and decode an Intel-HEX file from disk.
    pub fn read_hex_file(software_id: u16, path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Asset {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_hex(software_id, path.display().to_string(), &text)
    }

    pub fn software_id(&self) -> u16 {
        self.software_id
    }

    /// Source file name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// CRC-16 over the padded image.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Image size in 16-byte units, as announced in upgrade replies.
    pub fn size_units(&self) -> u16 {
        // Bounded by MAX_IMAGE_SIZE at construction.
        (self.data.len() / SIZE_UNIT) as u16
    }

    /// Number of download chunks.
    pub fn chunk_count(&self) -> usize {
        self.data.len() / BLOCK_SIZE
    }

    /// The 64-byte chunk at `index`, or `None` past the end of the image.
    pub fn chunk(&self, index: usize) -> Option<&[u8; BLOCK_SIZE]> {
        let offset = index.checked_mul(BLOCK_SIZE)?;
        let end = offset.checked_add(BLOCK_SIZE)?;
        self.data.get(offset..end)?.try_into().ok()
    }
}

/// Read-only set of firmware images.
#[derive(Clone, Debug, Default)]
pub struct FirmwareStore {
    images: BTreeMap<u16, FirmwareImage>,
}

impl FirmwareStore {
    /// Load every `(software ID, Intel-HEX path)` pair from disk.
    ///
    /// Fails on the first unreadable or undecodable file.
    pub fn load<I, P>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u16, P)>,
        P: Into<PathBuf>,
    {
        let images = files
            .into_iter()
            .map(|(software_id, path)| FirmwareImage::read_hex_file(software_id, &path.into()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_images(images)
    }

    /// Build a store from already decoded images.
    pub fn from_images(images: impl IntoIterator<Item = FirmwareImage>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for image in images {
            let id = image.software_id;
            if let Some(previous) = map.insert(id, image) {
                return Err(Error::Decode(format!(
                    "software ID {} defined twice ({})",
                    id, previous.name
                )));
            }
        }
        Ok(Self { images: map })
    }

    pub fn get(&self, software_id: u16) -> Option<&FirmwareImage> {
        self.images.get(&software_id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Images in ascending software ID order.
    pub fn iter(&self) -> impl Iterator<Item = &FirmwareImage> {
        self.images.values()
    }
}
