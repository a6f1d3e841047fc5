//! [`Hypervisor`] backed by the vSphere Automation REST API (`/api/...`).

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::hypervisor::{ApiError, Credentials, Hypervisor};
use crate::vm::{BootDevice, DatastorePath, HostRef, VmRef, VmSpec};

mod models;

use models::{
    BootDeviceEntry, CdromBacking, CreateCdrom, CreateVm, Cpu, DatastoreSummary, Disk,
    DiskSummary, ErrorBody, FolderSummary, HostSummary, Memory, NetworkSummary, NewVmdk, Nic,
    NicBacking, Placement, SetBootDevices, VmSummary,
};

pub const SESSION_HEADER: &str = "vmware-api-session-id";

pub struct VsphereClient {
    base: String,
    http: Client,
    user: String,
    token: Option<String>,
}

/// `https://<host>` unless the host already carries a scheme.
pub fn endpoint_url(host: &str) -> String {
    if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

impl VsphereClient {
    pub fn new(host: &str, insecure: bool) -> Result<Self, ApiError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()?;

        Ok(Self {
            base: endpoint_url(host),
            http,
            user: String::new(),
            token: None,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::NotConnected)?;
        debug!(%method, path, "vsphere request");

        Ok(self
            .http
            .request(method, format!("{}{}", self.base, path))
            .header(SESSION_HEADER, token))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().unwrap_or_default();
        let error_type = body.error_type.unwrap_or_else(|| "ERROR".to_string());
        let message = body
            .messages
            .into_iter()
            .map(|m| m.default_message)
            .collect::<Vec<_>>()
            .join("; ");

        if status == StatusCode::UNAUTHORIZED || error_type == "UNAUTHENTICATED" {
            return Err(ApiError::Unauthenticated {
                user: self.user.clone(),
            });
        }

        Err(ApiError::Status {
            status: status.as_u16(),
            error_type,
            message,
        })
    }

    fn list<T: DeserializeOwned>(&self, path: &str, name: &str) -> Result<Vec<T>, ApiError> {
        let request = self.request(Method::GET, path)?.query(&[("names", name)]);
        Ok(self.send(request)?.json()?)
    }

    fn find_datastore(&self, name: &str) -> Result<String, ApiError> {
        self.list::<DatastoreSummary>("/api/vcenter/datastore", name)?
            .into_iter()
            .find(|d| d.name == name)
            .map(|d| d.datastore)
            .ok_or_else(|| ApiError::NotFound {
                kind: "datastore",
                name: name.to_string(),
            })
    }

    fn find_network(&self, name: &str) -> Result<NetworkSummary, ApiError> {
        self.list::<NetworkSummary>("/api/vcenter/network", name)?
            .into_iter()
            .find(|n| n.name == name)
            .ok_or_else(|| ApiError::NotFound {
                kind: "network",
                name: name.to_string(),
            })
    }

    fn find_folder(&self, name: &str) -> Result<String, ApiError> {
        let request = self
            .request(Method::GET, "/api/vcenter/folder")?
            .query(&[("names", name), ("type", "VIRTUAL_MACHINE")]);

        self.send(request)?
            .json::<Vec<FolderSummary>>()?
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.folder)
            .ok_or_else(|| ApiError::NotFound {
                kind: "folder",
                name: name.to_string(),
            })
    }
}

impl Hypervisor for VsphereClient {
    fn connect(&mut self, credentials: &Credentials) -> Result<(), ApiError> {
        self.user = credentials.user.clone();
        debug!(endpoint = %self.base, "opening vsphere session");

        let request = self
            .http
            .post(format!("{}/api/session", self.base))
            .basic_auth(&credentials.user, Some(&credentials.password));

        let token: String = self.send(request)?.json()?;
        if token.is_empty() {
            return Err(ApiError::InvalidResponse {
                reason: "empty session token".to_string(),
            });
        }

        self.token = Some(token);
        Ok(())
    }

    fn find_host(&mut self, name: &str) -> Result<HostRef, ApiError> {
        let host = self
            .list::<HostSummary>("/api/vcenter/host", name)?
            .into_iter()
            .find(|h| h.name == name)
            .ok_or_else(|| ApiError::NotFound {
                kind: "host",
                name: name.to_string(),
            })?;

        debug!(host = %host.host, state = ?host.connection_state, "found host");

        Ok(HostRef {
            id: host.host,
            name: host.name,
        })
    }

    fn create_vm(&mut self, host: &HostRef, spec: &VmSpec) -> Result<VmRef, ApiError> {
        let existing = self.list::<VmSummary>("/api/vcenter/vm", &spec.name)?;
        if let Some(vm) = existing.into_iter().find(|vm| vm.name == spec.name) {
            debug!(vm = %vm.vm, "vm name already taken");
            return Err(ApiError::AlreadyExists {
                kind: "vm",
                name: spec.name.clone(),
            });
        }

        let datastore = self.find_datastore(&spec.datastore)?;
        let network = self.find_network(&spec.network)?;
        let folder = spec
            .folder
            .as_deref()
            .map(|name| self.find_folder(name))
            .transpose()?;

        let body = CreateVm {
            name: spec.name.clone(),
            guest_os: spec.guest_os.clone(),
            placement: Placement {
                host: host.id.clone(),
                datastore,
                folder,
            },
            cpu: Cpu {
                count: spec.cpu_count,
            },
            memory: Memory {
                size_mib: spec.memory_mib(),
            },
            disks: vec![Disk {
                new_vmdk: NewVmdk {
                    capacity: spec.disk_bytes(),
                },
            }],
            nics: vec![Nic {
                start_connected: true,
                backing: NicBacking {
                    kind: network.kind,
                    network: network.network,
                },
            }],
        };

        let request = self.request(Method::POST, "/api/vcenter/vm")?.json(&body);
        let id: String = match self.send(request) {
            Ok(response) => response.json()?,
            Err(ApiError::Status { error_type, .. }) if error_type == "ALREADY_EXISTS" => {
                return Err(ApiError::AlreadyExists {
                    kind: "vm",
                    name: spec.name.clone(),
                })
            }
            Err(err) => return Err(err),
        };

        Ok(VmRef {
            id,
            name: spec.name.clone(),
        })
    }

    fn attach_iso(
        &mut self,
        vm: &VmRef,
        iso: &DatastorePath,
        start_connected: bool,
    ) -> Result<(), ApiError> {
        let body = CreateCdrom {
            start_connected,
            backing: CdromBacking {
                kind: "ISO_FILE",
                iso_file: iso.to_string(),
            },
        };

        let path = format!("/api/vcenter/vm/{}/hardware/cdrom", vm.id);
        let cdrom: String = self.send(self.request(Method::POST, &path)?.json(&body))?.json()?;
        debug!(vm = %vm.id, cdrom, "cdrom attached");

        Ok(())
    }

    /// The device list replaces the whole boot order, so the VM's disks are
    /// kept as the fallback after `device`.
    fn set_boot_device(&mut self, vm: &VmRef, device: BootDevice) -> Result<(), ApiError> {
        let path = format!("/api/vcenter/vm/{}/hardware/disk", vm.id);
        let disks: Vec<String> = self
            .send(self.request(Method::GET, &path)?)?
            .json::<Vec<DiskSummary>>()?
            .into_iter()
            .map(|d| d.disk)
            .collect();

        let entry = |kind: BootDevice| BootDeviceEntry {
            kind,
            disks: if kind == BootDevice::Disk {
                disks.clone()
            } else {
                Vec::new()
            },
        };

        let mut devices = vec![entry(device)];
        if device != BootDevice::Disk && !disks.is_empty() {
            devices.push(entry(BootDevice::Disk));
        }
        debug!(vm = %vm.id, ?disks, "boot order {device} then disk");

        let body = SetBootDevices { devices };

        let path = format!("/api/vcenter/vm/{}/hardware/boot/device", vm.id);
        self.send(self.request(Method::PUT, &path)?.json(&body))?;
        Ok(())
    }

    fn power_on(&mut self, vm: &VmRef) -> Result<(), ApiError> {
        let path = format!("/api/vcenter/vm/{}/power", vm.id);
        let request = self
            .request(Method::POST, &path)?
            .query(&[("action", "start")]);

        self.send(request)?;
        Ok(())
    }

    fn disconnect(&mut self, _interactive: bool) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, "/api/session")?;
        self.token = None;
        self.send(request)?;
        Ok(())
    }
}
