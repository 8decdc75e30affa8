// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Server configuration and the load phase.
//!
//! ```json
//! {
//!   "swids": { "1001": "firmware/blink.hex" },
//!   "hwids": {
//!     "06300301c48461aeedb09351061900f5": { "board": 2, "group": 212, "node": 17, "swid": 1001 }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::firmware::FirmwareStore;
use crate::protocol::HardwareId;
use crate::registry::{Binding, Registry};

/// Assignment for one hardware ID.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct HwIdEntry {
    pub board: u8,
    #[serde(default)]
    pub group: u8,
    #[serde(default)]
    pub node: u8,
    pub swid: u16,
}

/// Parsed configuration document.
///
/// A key repeated inside `swids` or `hwids` is an error, not a silent
/// overwrite. Unknown fields are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Software ID (decimal string) -> Intel-HEX file.
    #[serde(default, deserialize_with = "unique_keys")]
    pub swids: BTreeMap<String, PathBuf>,
    /// Hardware ID (32 hex digits) -> assignment.
    #[serde(default, deserialize_with = "unique_keys")]
    pub hwids: BTreeMap<String, HwIdEntry>,
}

/// Deserialize a JSON object into a map, failing on the first repeated key.
fn unique_keys<'de, D, V>(
    deserializer: D,
) -> core::result::Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueKeys<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeys<V> {
        type Value = BTreeMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object with unique keys")
        }

        fn visit_map<A: MapAccess<'de>>(
            self,
            mut access: A,
        ) -> core::result::Result<Self::Value, A::Error> {
            let mut map = BTreeMap::new();
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                if map.contains_key(&key) {
                    return Err(de::Error::custom(format_args!("duplicate key {:?}", key)));
                }
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueKeys(PhantomData))
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Convert an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Read a configuration file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Asset {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Firmware files keyed by software ID, relative paths joined to `base_dir`.
    pub fn firmware_files(&self, base_dir: &Path) -> Result<Vec<(u16, PathBuf)>> {
        self.swids
            .iter()
            .map(|(key, file)| {
                let software_id = parse_software_id(key)?;
                Ok((software_id, base_dir.join(file)))
            })
            .collect()
    }

    /// Decode every configured firmware image.
    pub fn load_firmware(&self, base_dir: &Path) -> Result<FirmwareStore> {
        FirmwareStore::load(self.firmware_files(base_dir)?)
    }

    /// Hardware bindings as configured.
    pub fn bindings(&self) -> Result<Vec<Binding>> {
        self.hwids
            .iter()
            .map(|(key, entry)| {
                Ok(Binding {
                    hardware_id: key.parse::<HardwareId>()?,
                    board: entry.board,
                    group: entry.group,
                    node: entry.node,
                    software_id: entry.swid,
                })
            })
            .collect()
    }

    pub fn registry(&self) -> Result<Registry> {
        Registry::from_bindings(self.bindings()?)
    }
}

fn parse_software_id(key: &str) -> Result<u16> {
    match key.trim().parse::<u16>() {
        Ok(0) => Err(Error::Decode("software ID 0 is reserved".into())),
        Ok(id) => Ok(id),
        Err(e) => Err(Error::Decode(format!("software ID {:?}: {}", key, e))),
    }
}

/// Everything the dispatcher needs, loaded once at startup.
#[derive(Debug)]
pub struct Assets {
    pub store: FirmwareStore,
    pub registry: Registry,
}

impl Assets {
    /// Build store and registry from a configuration.
    ///
    /// Firmware paths are resolved against `base_dir`.
    pub fn from_config(config: &Config, base_dir: &Path) -> Result<Self> {
        let registry = config.registry()?;
        let store = config.load_firmware(base_dir)?;

        for binding in registry.iter() {
            if store.get(binding.software_id).is_none() {
                log::warn!(
                    "hardware ID {} wants software ID {}, which has no image",
                    binding.hardware_id,
                    binding.software_id
                );
            }
        }
        Ok(Self { store, registry })
    }

    /// Read a configuration file and load everything it names.
    ///
    /// Relative firmware paths are taken relative to the file's directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = Config::read(config_path)?;
        let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_config(&config, base_dir)
    }
}
