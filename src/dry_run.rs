use tracing::info;

use crate::hypervisor::{ApiError, Credentials, Hypervisor};
use crate::vm::{BootDevice, DatastorePath, HostRef, VmRef, VmSpec};

/// Logs every call instead of talking to a host.
///
/// Lookups and creates hand back placeholder ids so the rest of a run can be
/// previewed end to end.
#[derive(Debug, Default)]
pub struct DryRun {
    pub steps: Vec<String>,
}

impl DryRun {
    pub fn new() -> Self {
        Self::default()
    }

    fn step(&mut self, line: String) {
        info!(target: "vmprovision::dry_run", "would {line}");
        self.steps.push(line);
    }
}

impl Hypervisor for DryRun {
    fn connect(&mut self, credentials: &Credentials) -> Result<(), ApiError> {
        self.step(format!(
            "connect to {} as {}",
            credentials.host, credentials.user
        ));
        Ok(())
    }

    fn find_host(&mut self, name: &str) -> Result<HostRef, ApiError> {
        self.step(format!("look up host {name}"));
        Ok(HostRef {
            id: format!("<host:{name}>"),
            name: name.to_string(),
        })
    }

    fn create_vm(&mut self, host: &HostRef, spec: &VmSpec) -> Result<VmRef, ApiError> {
        self.step(format!(
            "create vm {} on {} with {} cpus, {} GB memory, {} GB disk on {}, network {:?}",
            spec.name,
            host.name,
            spec.cpu_count,
            spec.memory_gb,
            spec.disk_gb,
            spec.datastore,
            spec.network,
        ));
        Ok(VmRef {
            id: format!("<vm:{}>", spec.name),
            name: spec.name.clone(),
        })
    }

    fn attach_iso(
        &mut self,
        vm: &VmRef,
        iso: &DatastorePath,
        start_connected: bool,
    ) -> Result<(), ApiError> {
        self.step(format!(
            "attach {iso} to {} (start connected: {start_connected})",
            vm.name
        ));
        Ok(())
    }

    fn set_boot_device(&mut self, vm: &VmRef, device: BootDevice) -> Result<(), ApiError> {
        self.step(format!("boot {} from {device}", vm.name));
        Ok(())
    }

    fn power_on(&mut self, vm: &VmRef) -> Result<(), ApiError> {
        self.step(format!("power on {}", vm.name));
        Ok(())
    }

    fn disconnect(&mut self, interactive: bool) -> Result<(), ApiError> {
        self.step(format!("disconnect (confirm: {interactive})"));
        Ok(())
    }
}
