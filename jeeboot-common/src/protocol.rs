// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Wire format of the JeeBoot loader protocol.
//!
//! Every frame is one control header byte followed by a fixed-size body.
//! Bodies carry no type tag or length field: the request type is implied by
//! the body length alone. All integers are little-endian, arrays have no
//! length prefix and there is no padding between fields.

use core::fmt;
use core::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

// --- Header byte ---

/// Top three bits of every reply header.
pub const REPLY_HEADER_TAG: u8 = 0xE0;

/// Node ID bits of a header byte.
pub const NODE_MASK: u8 = 0x1F;

/// Pairing replies go here, the node has no ID of its own yet.
pub const BOOTSTRAP_NODE_ID: u8 = 1;

// --- Sizes ---

/// Download payload per chunk.
pub const CHUNK_SIZE: usize = 64;

/// Largest body on the wire (a full download reply).
pub const MAX_BODY_SIZE: usize = DownloadReply::SIZE;

/// Largest frame on the wire, header included.
pub const MAX_FRAME_SIZE: usize = 1 + MAX_BODY_SIZE;

/// An encoded frame, header byte first.
pub type Frame = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// An encoded message body, without header.
pub type Body = heapless::Vec<u8, MAX_BODY_SIZE>;

/// Extract the node ID from a header byte.
pub fn node_id(header: u8) -> u8 {
    header & NODE_MASK
}

/// Reply header addressing `node_id`.
pub fn reply_header(node_id: u8) -> u8 {
    REPLY_HEADER_TAG | (node_id & NODE_MASK)
}

/// Split a frame into its control header byte and body.
pub fn decode_header(frame: &[u8]) -> Result<(u8, &[u8])> {
    frame.split_first().map(|(h, b)| (*h, b)).ok_or(Error::EmptyFrame)
}

/// Join a header byte and a body into one frame.
pub fn encode_frame(header: u8, payload: &[u8]) -> Result<Frame> {
    let mut frame = Frame::new();
    let too_long = || Error::Format {
        expected: MAX_BODY_SIZE,
        actual: payload.len(),
    };
    frame.push(header).map_err(|_| too_long())?;
    frame.extend_from_slice(payload).map_err(|_| too_long())?;
    Ok(frame)
}

/// Prepend a reply header for `node_id` to `payload`.
pub fn encode_reply(node_id: u8, payload: &[u8]) -> Result<Frame> {
    encode_frame(reply_header(node_id), payload)
}

// --- Hardware ID ---

/// 16-byte hardware identifier; all zeroes means "not paired yet".
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HardwareId(pub [u8; 16]);

impl HardwareId {
    pub const UNSET: Self = Self([0; 16]);

    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for HardwareId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HardwareId({})", self)
    }
}

impl FromStr for HardwareId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut id = [0u8; 16];
        hex::decode_to_slice(s, &mut id)
            .map_err(|e| Error::Decode(format!("hardware ID {:?}: {}", s, e)))?;
        Ok(Self(id))
    }
}

// --- Message layouts ---

/// Fixed-size little-endian body layout.
pub trait WireFormat: Sized {
    /// Exact body size in bytes.
    const SIZE: usize;

    /// Write the body into `out`, which is exactly `SIZE` bytes long.
    fn write(&self, out: &mut [u8]);

    /// Read the body from `buf`, which is exactly `SIZE` bytes long.
    fn read(buf: &[u8]) -> Self;

    /// Decode a body, checking its length first.
    fn decode(body: &[u8]) -> Result<Self> {
        if body.len() != Self::SIZE {
            return Err(Error::Format {
                expected: Self::SIZE,
                actual: body.len(),
            });
        }
        Ok(Self::read(body))
    }

    /// Encode into a standalone body buffer.
    ///
    /// Fails for layouts larger than [`MAX_BODY_SIZE`].
    fn encode(&self) -> Result<Body> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let out = buf.get_mut(..Self::SIZE).ok_or(Error::Format {
            expected: MAX_BODY_SIZE,
            actual: Self::SIZE,
        })?;
        self.write(out);
        Body::from_slice(out).map_err(|_| Error::Format {
            expected: MAX_BODY_SIZE,
            actual: Self::SIZE,
        })
    }
}

fn read_id(buf: &[u8]) -> [u8; 16] {
    let mut id = [0u8; 16];
    id.copy_from_slice(&buf[..16]);
    id
}

/// Sent by a node looking for its network identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairingRequest {
    /// Variant of the remote node, 1..250 freely available.
    pub variant: u8,
    /// Board type of the remote node.
    pub board: u8,
    /// Current group, 0 if unpaired.
    pub group: u8,
    /// Current node ID, 0 if unpaired.
    pub node: u8,
    /// CRC over the node's current shared key.
    pub check: u16,
    pub hardware_id: HardwareId,
}

impl WireFormat for PairingRequest {
    const SIZE: usize = 22;

    fn write(&self, out: &mut [u8]) {
        out[0] = self.variant;
        out[1] = self.board;
        out[2] = self.group;
        out[3] = self.node;
        LittleEndian::write_u16(&mut out[4..6], self.check);
        out[6..22].copy_from_slice(&self.hardware_id.0);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            variant: buf[0],
            board: buf[1],
            group: buf[2],
            node: buf[3],
            check: LittleEndian::read_u16(&buf[4..6]),
            hardware_id: HardwareId(read_id(&buf[6..22])),
        }
    }
}

/// Hands a fresh hardware ID to a node that has none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairingAssign {
    pub variant: u8,
    pub board: u8,
    pub hardware_id: HardwareId,
}

impl WireFormat for PairingAssign {
    const SIZE: usize = 18;

    fn write(&self, out: &mut [u8]) {
        out[0] = self.variant;
        out[1] = self.board;
        out[2..18].copy_from_slice(&self.hardware_id.0);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            variant: buf[0],
            board: buf[1],
            hardware_id: HardwareId(read_id(&buf[2..18])),
        }
    }
}

/// Tells a known node its assigned group and node ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairingReply {
    pub variant: u8,
    pub board: u8,
    pub group: u8,
    pub node: u8,
    /// Shared key, all zeroes when unused.
    pub shared_key: [u8; 16],
}

impl WireFormat for PairingReply {
    const SIZE: usize = 20;

    fn write(&self, out: &mut [u8]) {
        out[0] = self.variant;
        out[1] = self.board;
        out[2] = self.group;
        out[3] = self.node;
        out[4..20].copy_from_slice(&self.shared_key);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            variant: buf[0],
            board: buf[1],
            group: buf[2],
            node: buf[3],
            shared_key: read_id(&buf[4..20]),
        }
    }
}

/// Upgrade negotiation; requests and replies share this layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub variant: u8,
    pub board: u8,
    /// Software ID, 0 if unknown.
    pub software_id: u16,
    /// Download size in 16-byte units.
    pub size_units: u16,
    /// CRC-16 over the entire download.
    pub checksum: u16,
}

pub type UpgradeReply = UpgradeRequest;

impl WireFormat for UpgradeRequest {
    const SIZE: usize = 8;

    fn write(&self, out: &mut [u8]) {
        out[0] = self.variant;
        out[1] = self.board;
        LittleEndian::write_u16(&mut out[2..4], self.software_id);
        LittleEndian::write_u16(&mut out[4..6], self.size_units);
        LittleEndian::write_u16(&mut out[6..8], self.checksum);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            variant: buf[0],
            board: buf[1],
            software_id: LittleEndian::read_u16(&buf[2..4]),
            size_units: LittleEndian::read_u16(&buf[4..6]),
            checksum: LittleEndian::read_u16(&buf[6..8]),
        }
    }
}

/// Asks for one chunk of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    pub software_id: u16,
    /// Chunk index, in units of [`CHUNK_SIZE`].
    pub index: u16,
}

impl WireFormat for DownloadRequest {
    const SIZE: usize = 4;

    fn write(&self, out: &mut [u8]) {
        LittleEndian::write_u16(&mut out[0..2], self.software_id);
        LittleEndian::write_u16(&mut out[2..4], self.index);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            software_id: LittleEndian::read_u16(&buf[0..2]),
            index: LittleEndian::read_u16(&buf[2..4]),
        }
    }
}

/// One whitened chunk of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadReply {
    /// Software ID xor chunk index.
    pub software_id_xor: u16,
    pub data: [u8; CHUNK_SIZE],
}

impl WireFormat for DownloadReply {
    const SIZE: usize = 2 + CHUNK_SIZE;

    fn write(&self, out: &mut [u8]) {
        LittleEndian::write_u16(&mut out[0..2], self.software_id_xor);
        out[2..Self::SIZE].copy_from_slice(&self.data);
    }

    fn read(buf: &[u8]) -> Self {
        let mut data = [0u8; CHUNK_SIZE];
        data.copy_from_slice(&buf[2..Self::SIZE]);
        Self {
            software_id_xor: LittleEndian::read_u16(&buf[0..2]),
            data,
        }
    }
}

/// Download reply without data, signalling the end of the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadEnd {
    pub software_id_xor: u16,
}

impl WireFormat for DownloadEnd {
    const SIZE: usize = 2;

    fn write(&self, out: &mut [u8]) {
        LittleEndian::write_u16(&mut out[0..2], self.software_id_xor);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            software_id_xor: LittleEndian::read_u16(&buf[0..2]),
        }
    }
}

// --- Requests and replies ---

/// A classified inbound request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    Pairing(PairingRequest),
    Upgrade(UpgradeRequest),
    Download(DownloadRequest),
}

impl Request {
    /// Classify a frame by body length and decode it.
    ///
    /// Returns the header byte alongside the request.
    pub fn parse(frame: &[u8]) -> Result<(u8, Self)> {
        let (header, body) = decode_header(frame)?;
        let request = match body.len() {
            PairingRequest::SIZE => Self::Pairing(PairingRequest::decode(body)?),
            UpgradeRequest::SIZE => Self::Upgrade(UpgradeRequest::decode(body)?),
            DownloadRequest::SIZE => Self::Download(DownloadRequest::decode(body)?),
            other => return Err(Error::UnknownLength(other)),
        };
        Ok((header, request))
    }

    /// Encode with a given header byte, as a node would send it.
    pub fn to_frame(&self, header: u8) -> Result<Frame> {
        let body = match self {
            Self::Pairing(r) => r.encode()?,
            Self::Upgrade(r) => r.encode()?,
            Self::Download(r) => r.encode()?,
        };
        encode_frame(header, &body)
    }
}

/// A reply produced by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    PairingAssign(PairingAssign),
    PairingReply(PairingReply),
    Upgrade(UpgradeReply),
    Download(DownloadReply),
    DownloadEnd(DownloadEnd),
}

impl Reply {
    /// Body bytes, without header.
    pub fn body(&self) -> Result<Body> {
        match self {
            Self::PairingAssign(r) => r.encode(),
            Self::PairingReply(r) => r.encode(),
            Self::Upgrade(r) => r.encode(),
            Self::Download(r) => r.encode(),
            Self::DownloadEnd(r) => r.encode(),
        }
    }

    /// Full frame addressed to `node_id`.
    pub fn to_frame(&self, node_id: u8) -> Result<Frame> {
        encode_reply(node_id, &self.body()?)
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PairingAssign(_) => "pairing-assign",
            Self::PairingReply(_) => "pairing",
            Self::Upgrade(_) => "upgrade",
            Self::Download(_) => "download",
            Self::DownloadEnd(_) => "download-end",
        }
    }
}
