// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hardware IDs for nodes that do not have one yet.

use rand::RngCore;

use crate::protocol::HardwareId;

/// Source of freshly assigned hardware IDs.
///
/// Uniqueness against the registry is not checked; random 128-bit IDs make
/// collisions negligible.
pub trait IdGenerator {
    fn new_id(&self) -> HardwareId;
}

/// Random IDs from the thread-local RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn new_id(&self) -> HardwareId {
        let mut rng = rand::thread_rng();
        loop {
            let mut id = [0u8; 16];
            rng.fill_bytes(&mut id);
            let id = HardwareId(id);
            // all-zero would read as "unpaired" on the node
            if !id.is_unset() {
                return id;
            }
        }
    }
}

impl<F: Fn() -> HardwareId> IdGenerator for F {
    fn new_id(&self) -> HardwareId {
        self()
    }
}
