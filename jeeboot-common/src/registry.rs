// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hardware ID bindings: which network address and software a node gets.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::protocol::HardwareId;

/// Network identity and software assigned to one physical node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub hardware_id: HardwareId,
    pub board: u8,
    /// 0 = not assigned yet.
    pub group: u8,
    /// 0 = not assigned yet.
    pub node: u8,
    pub software_id: u16,
}

impl Binding {
    /// True once both group and node ID have been assigned.
    pub fn is_assigned(&self) -> bool {
        self.group != 0 && self.node != 0
    }
}

/// Read-only binding table, built once from configuration.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    bindings: BTreeMap<HardwareId, Binding>,
}

impl Registry {
    /// Build the registry, rejecting ambiguous configurations.
    ///
    /// Errors on a repeated hardware ID, on the reserved all-zero ID, and on
    /// two assigned bindings sharing the same `(group, node)` pair.
    pub fn from_bindings(bindings: impl IntoIterator<Item = Binding>) -> Result<Self> {
        let mut map: BTreeMap<HardwareId, Binding> = BTreeMap::new();
        let mut addresses: BTreeMap<(u8, u8), HardwareId> = BTreeMap::new();

        for binding in bindings {
            if binding.hardware_id.is_unset() {
                return Err(Error::Decode(
                    "the all-zero hardware ID is reserved for unpaired nodes".into(),
                ));
            }
            if binding.is_assigned() {
                if let Some(other) = addresses.insert((binding.group, binding.node), binding.hardware_id)
                {
                    return Err(Error::Decode(format!(
                        "group {} node {} is bound to both {} and {}",
                        binding.group, binding.node, other, binding.hardware_id
                    )));
                }
            }
            if map.insert(binding.hardware_id, binding).is_some() {
                return Err(Error::Decode(format!(
                    "hardware ID {} bound twice",
                    binding.hardware_id
                )));
            }
        }

        log::info!(
            "registry: {} bindings, {} with an assigned address",
            map.len(),
            addresses.len()
        );
        Ok(Self { bindings: map })
    }

    pub fn lookup_hardware_id(&self, hardware_id: &HardwareId) -> Option<&Binding> {
        self.bindings.get(hardware_id)
    }

    /// Software ID for the node at `(group, node)`.
    pub fn lookup_software_id(&self, group: u8, node: u8) -> Option<u16> {
        self.bindings
            .values()
            .find(|b| b.is_assigned() && b.group == group && b.node == node)
            .map(|b| b.software_id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings ordered by hardware ID.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }
}
