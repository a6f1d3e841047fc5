use serde::{Deserialize, Serialize};

use crate::vm::BootDevice;

#[derive(Debug, Deserialize)]
pub struct HostSummary {
    pub host: String,
    pub name: String,
    #[serde(default)]
    pub connection_state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DatastoreSummary {
    pub datastore: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NetworkSummary {
    pub network: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct FolderSummary {
    pub folder: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DiskSummary {
    pub disk: String,
}

#[derive(Debug, Deserialize)]
pub struct VmSummary {
    pub vm: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub messages: Vec<LocalizableMessage>,
}

#[derive(Debug, Deserialize)]
pub struct LocalizableMessage {
    #[serde(default)]
    pub default_message: String,
}

#[derive(Debug, Serialize)]
pub struct CreateVm {
    pub name: String,
    #[serde(rename = "guest_OS")]
    pub guest_os: String,
    pub placement: Placement,
    pub cpu: Cpu,
    pub memory: Memory,
    pub disks: Vec<Disk>,
    pub nics: Vec<Nic>,
}

#[derive(Debug, Serialize)]
pub struct Placement {
    pub host: String,
    pub datastore: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Cpu {
    pub count: u32,
}

#[derive(Debug, Serialize)]
pub struct Memory {
    #[serde(rename = "size_MiB")]
    pub size_mib: u64,
}

#[derive(Debug, Serialize)]
pub struct Disk {
    pub new_vmdk: NewVmdk,
}

#[derive(Debug, Serialize)]
pub struct NewVmdk {
    pub capacity: u64,
}

#[derive(Debug, Serialize)]
pub struct Nic {
    pub start_connected: bool,
    pub backing: NicBacking,
}

#[derive(Debug, Serialize)]
pub struct NicBacking {
    #[serde(rename = "type")]
    pub kind: String,
    pub network: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCdrom {
    pub start_connected: bool,
    pub backing: CdromBacking,
}

#[derive(Debug, Serialize)]
pub struct CdromBacking {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub iso_file: String,
}

#[derive(Debug, Serialize)]
pub struct SetBootDevices {
    pub devices: Vec<BootDeviceEntry>,
}

#[derive(Debug, Serialize)]
pub struct BootDeviceEntry {
    #[serde(rename = "type")]
    pub kind: BootDevice,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<String>,
}
