// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Request dispatcher: turns one inbound frame into at most one reply.
//!
//! A node walks through three phases, each a self-contained request/reply
//! exchange:
//! - Pairing: obtain a hardware ID, then a group and node ID for it
//! - Upgrade: learn which software it should run, with size and CRC
//! - Download: fetch the image chunk by chunk
//!
//! The dispatcher keeps no state between calls. It only reads the firmware
//! store and the binding registry, both immutable after loading. Missing
//! bindings or images are normal: the node gets no reply and retries later.

use core::fmt;

use crate::error::Result;
use crate::firmware::FirmwareStore;
use crate::fresh_id::{IdGenerator, RandomIds};
use crate::protocol::{
    node_id, DownloadEnd, DownloadReply, DownloadRequest, Frame, HardwareId, PairingAssign,
    PairingReply, PairingRequest, Reply, Request, UpgradeReply, UpgradeRequest,
    BOOTSTRAP_NODE_ID, CHUNK_SIZE,
};
use crate::registry::Registry;

/// Multiplier of the per-chunk whitening pattern.
pub const WHITENING_FACTOR: u8 = 211;

/// Net group served when none is configured.
pub const DEFAULT_GROUP: u8 = 212;

/// Why a well-formed request got no reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupMiss {
    /// No binding for this hardware ID.
    UnknownHardwareId(HardwareId),
    /// Bound to a different board type than the node reports.
    BoardMismatch { bound: u8, requested: u8 },
    /// Binding exists but group or node ID is still 0.
    Unassigned(HardwareId),
    /// No binding has this address.
    NoSoftware { group: u8, node: u8 },
    /// The software ID has no loaded image.
    NoImage(u16),
}

impl fmt::Display for LookupMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownHardwareId(id) => write!(f, "no entry for hardware ID {}", id),
            Self::BoardMismatch { bound, requested } => {
                write!(f, "bound to board {}, node reports board {}", bound, requested)
            }
            Self::Unassigned(id) => write!(f, "hardware ID {} has no group/node yet", id),
            Self::NoSoftware { group, node } => {
                write!(f, "no software for group {} node {}", group, node)
            }
            Self::NoImage(swid) => write!(f, "no image for software ID {}", swid),
        }
    }
}

/// Result of handling one well-formed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Reply { node_id: u8, reply: Reply },
    NoReply(LookupMiss),
}

/// Stateless protocol engine over a read-only store and registry.
pub struct Dispatcher<'a, G = RandomIds> {
    store: &'a FirmwareStore,
    registry: &'a Registry,
    group: u8,
    ids: G,
}

impl<'a> Dispatcher<'a, RandomIds> {
    /// Create a dispatcher serving nodes of `group`.
    pub fn new(store: &'a FirmwareStore, registry: &'a Registry, group: u8) -> Self {
        Self {
            store,
            registry,
            group,
            ids: RandomIds,
        }
    }
}

impl<'a, G: IdGenerator> Dispatcher<'a, G> {
    /// Replace the source of fresh hardware IDs.
    pub fn with_id_generator<H: IdGenerator>(self, ids: H) -> Dispatcher<'a, H> {
        Dispatcher {
            store: self.store,
            registry: self.registry,
            group: self.group,
            ids,
        }
    }

    /// Operating group used to address upgrade requests.
    pub fn group(&self) -> u8 {
        self.group
    }

    /// Decode a frame and decide on a reply.
    ///
    /// Errors only for frames that cannot be decoded (empty, unknown body
    /// length); lookup misses are reported as [`Outcome::NoReply`].
    pub fn respond(&self, frame: &[u8]) -> Result<Outcome> {
        let (header, request) = Request::parse(frame)?;
        Ok(match request {
            Request::Pairing(req) => self.pairing(header, &req),
            Request::Upgrade(req) => self.upgrade(header, &req),
            Request::Download(req) => self.download(header, &req),
        })
    }

    /// Handle one frame; `None` means nothing is sent back.
    ///
    /// Malformed frames and lookup misses are logged and dropped.
    pub fn handle(&self, frame: &[u8]) -> Option<(u8, Reply)> {
        match self.respond(frame) {
            Ok(Outcome::Reply { node_id, reply }) => Some((node_id, reply)),
            Ok(Outcome::NoReply(miss)) => {
                log::info!("no reply: {}", miss);
                None
            }
            Err(e) => {
                log::warn!("dropping request {:?}: {}", frame, e);
                None
            }
        }
    }

    /// Like [`handle`](Self::handle), but returns the encoded reply frame.
    pub fn handle_frame(&self, frame: &[u8]) -> Option<(u8, Frame)> {
        let (node, reply) = self.handle(frame)?;
        match reply.to_frame(node) {
            Ok(encoded) => {
                log::debug!("reply to node {}: {:02x?}", node, &encoded[..]);
                Some((node, encoded))
            }
            Err(e) => {
                log::warn!("cannot encode {} reply: {}", reply.kind(), e);
                None
            }
        }
    }

    fn pairing(&self, header: u8, req: &PairingRequest) -> Outcome {
        if req.hardware_id.is_unset() {
            let hardware_id = self.ids.new_id();
            log::info!(
                "assigning fresh hardware ID {} for board {} hdr {:08b}",
                hardware_id,
                req.board,
                header
            );
            return Outcome::Reply {
                node_id: BOOTSTRAP_NODE_ID,
                reply: Reply::PairingAssign(PairingAssign {
                    variant: req.variant,
                    board: req.board,
                    hardware_id,
                }),
            };
        }

        let Some(binding) = self.registry.lookup_hardware_id(&req.hardware_id) else {
            return Outcome::NoReply(LookupMiss::UnknownHardwareId(req.hardware_id));
        };
        if binding.board != req.board {
            return Outcome::NoReply(LookupMiss::BoardMismatch {
                bound: binding.board,
                requested: req.board,
            });
        }
        if !binding.is_assigned() {
            return Outcome::NoReply(LookupMiss::Unassigned(req.hardware_id));
        }

        log::info!(
            "pair {} board {} -> group {} node {} hdr {:08b}",
            req.hardware_id,
            binding.board,
            binding.group,
            binding.node,
            header
        );
        Outcome::Reply {
            node_id: BOOTSTRAP_NODE_ID,
            reply: Reply::PairingReply(PairingReply {
                variant: req.variant,
                board: binding.board,
                group: binding.group,
                node: binding.node,
                shared_key: [0; 16],
            }),
        }
    }

    fn upgrade(&self, header: u8, req: &UpgradeRequest) -> Outcome {
        let node = node_id(header);
        let Some(software_id) = self.registry.lookup_software_id(self.group, node) else {
            return Outcome::NoReply(LookupMiss::NoSoftware {
                group: self.group,
                node,
            });
        };
        let Some(image) = self.store.get(software_id) else {
            return Outcome::NoReply(LookupMiss::NoImage(software_id));
        };

        let reply = UpgradeReply {
            software_id,
            size_units: image.size_units(),
            checksum: image.checksum(),
            ..*req
        };
        log::info!(
            "upgrade node {}: swid {} -> {}, {} units, crc 0x{:04x}",
            node,
            req.software_id,
            software_id,
            reply.size_units,
            reply.checksum
        );
        Outcome::Reply {
            node_id: node,
            reply: Reply::Upgrade(reply),
        }
    }

    fn download(&self, header: u8, req: &DownloadRequest) -> Outcome {
        let node = node_id(header);
        let Some(image) = self.store.get(req.software_id) else {
            return Outcome::NoReply(LookupMiss::NoImage(req.software_id));
        };

        let software_id_xor = req.software_id ^ req.index;
        let reply = match image.chunk(req.index as usize) {
            Some(chunk) => {
                log::debug!(
                    "download node {}: swid {} chunk {}/{}",
                    node,
                    req.software_id,
                    req.index,
                    image.chunk_count()
                );
                Reply::Download(DownloadReply {
                    software_id_xor,
                    data: whiten(chunk),
                })
            }
            None => {
                log::info!(
                    "download node {}: swid {} index {} past end ({} bytes)",
                    node,
                    req.software_id,
                    req.index,
                    image.len()
                );
                Reply::DownloadEnd(DownloadEnd { software_id_xor })
            }
        };
        Outcome::Reply {
            node_id: node,
            reply,
        }
    }
}

/// XOR a chunk with `211 * i mod 256`, keyed by the byte's position in the chunk.
///
/// Applying it twice gives back the original data.
pub fn whiten(chunk: &[u8; CHUNK_SIZE]) -> [u8; CHUNK_SIZE] {
    let mut out = [0u8; CHUNK_SIZE];
    for (i, (o, b)) in out.iter_mut().zip(chunk).enumerate() {
        *o = b ^ WHITENING_FACTOR.wrapping_mul(i as u8);
    }
    out
}
