// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Protocol engine for the JeeBoot boot server.
//!
//! Nodes running the JeeBoot loader pair, negotiate an upgrade and download
//! firmware in 64-byte chunks over a low-bandwidth radio link. This crate
//! holds everything between a decoded request frame and an encoded reply:
//! - `protocol`: fixed-layout wire format, classified by body length
//! - `dispatch`: the stateless request handler
//! - `firmware` / `intel_hex` / `crc16`: the image store and its loader
//! - `registry` / `config`: hardware ID bindings and their configuration
//!
//! Transport and process setup live in the `jeeboot-server` binary.

pub mod config;
pub mod crc16;
pub mod dispatch;
pub mod error;
pub mod firmware;
pub mod fresh_id;
pub mod intel_hex;
pub mod protocol;
pub mod registry;

// Re-export commonly used types
pub use config::{Assets, Config};
pub use dispatch::{Dispatcher, LookupMiss, Outcome, DEFAULT_GROUP};
pub use error::{Error, Result};
pub use firmware::{FirmwareImage, FirmwareStore};
pub use protocol::{Frame, HardwareId, Reply, Request};
pub use registry::{Binding, Registry};
