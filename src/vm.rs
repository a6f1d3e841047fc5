use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub fn gib_to_mib(gib: u32) -> u64 {
    u64::from(gib) * 1024
}

pub fn gib_to_bytes(gib: u32) -> u64 {
    u64::from(gib) * 1024 * 1024 * 1024
}

/// Everything the hypervisor needs to define a new machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSpec {
    pub name: String,
    pub cpu_count: u32,
    pub memory_gb: u32,
    pub disk_gb: u32,
    pub datastore: String,
    pub network: String,
    pub guest_os: String,
    pub folder: Option<String>,
}

impl VmSpec {
    pub fn memory_mib(&self) -> u64 {
        gib_to_mib(self.memory_gb)
    }

    pub fn disk_bytes(&self) -> u64 {
        gib_to_bytes(self.disk_gb)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRef {
    pub id: String,
    pub name: String,
}

impl Display for VmRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BootDevice {
    Cdrom,
    Disk,
    Ethernet,
    Floppy,
}

impl Display for BootDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BootDevice::Cdrom => write!(f, "cdrom"),
            BootDevice::Disk => write!(f, "disk"),
            BootDevice::Ethernet => write!(f, "ethernet"),
            BootDevice::Floppy => write!(f, "floppy"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatastorePathError {
    #[error("datastore path {input:?} must start with '[datastore]'")]
    MissingDatastore { input: String },

    #[error("datastore path {input:?} has an empty datastore name")]
    EmptyDatastore { input: String },

    #[error("datastore path {input:?} has no file after the datastore name")]
    EmptyPath { input: String },
}

/// A file on a datastore, written as `[datastore1] dir/image.iso`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastorePath {
    pub datastore: String,
    pub path: String,
}

impl FromStr for DatastorePath {
    type Err = DatastorePathError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let missing = || DatastorePathError::MissingDatastore {
            input: input.to_string(),
        };

        let rest = input.trim().strip_prefix('[').ok_or_else(missing)?;
        let (datastore, path) = rest.split_once(']').ok_or_else(missing)?;

        let datastore = datastore.trim();
        if datastore.is_empty() {
            return Err(DatastorePathError::EmptyDatastore {
                input: input.to_string(),
            });
        }

        let path = path.trim();
        if path.is_empty() {
            return Err(DatastorePathError::EmptyPath {
                input: input.to_string(),
            });
        }

        Ok(DatastorePath {
            datastore: datastore.to_string(),
            path: path.to_string(),
        })
    }
}

impl Display for DatastorePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.datastore, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datastore_path_parses_bracket_notation() {
        let iso: DatastorePath = "[datastore1] OpsRampGateway.iso"
            .parse()
            .expect("iso path should parse");

        assert_eq!(iso.datastore, "datastore1");
        assert_eq!(iso.path, "OpsRampGateway.iso");
        assert_eq!(iso.to_string(), "[datastore1] OpsRampGateway.iso");
    }

    #[test]
    fn datastore_path_keeps_nested_directories() {
        let iso: DatastorePath = "[nfs-isos]   images/linux/install.iso"
            .parse()
            .expect("nested iso path should parse");

        assert_eq!(iso.datastore, "nfs-isos");
        assert_eq!(iso.path, "images/linux/install.iso");
    }

    #[test]
    fn datastore_path_rejects_malformed_input() {
        assert!(matches!(
            "OpsRampGateway.iso".parse::<DatastorePath>(),
            Err(DatastorePathError::MissingDatastore { .. })
        ));
        assert!(matches!(
            "[datastore1 OpsRampGateway.iso".parse::<DatastorePath>(),
            Err(DatastorePathError::MissingDatastore { .. })
        ));
        assert!(matches!(
            "[ ] OpsRampGateway.iso".parse::<DatastorePath>(),
            Err(DatastorePathError::EmptyDatastore { .. })
        ));
        assert!(matches!(
            "[datastore1]".parse::<DatastorePath>(),
            Err(DatastorePathError::EmptyPath { .. })
        ));
    }

    #[test]
    fn sizes_convert_from_gibibytes() {
        assert_eq!(gib_to_mib(4), 4096);
        assert_eq!(gib_to_bytes(40), 42_949_672_960);
    }
}
