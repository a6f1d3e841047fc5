use std::fmt::{self, Display, Formatter};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::Resolved;
use crate::hypervisor::{ApiError, Hypervisor};
use crate::session::Session;
use crate::vm::{BootDevice, VmRef};

/// The steps of a provisioning run, in the order they are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Lookup,
    Create,
    Attach,
    Boot,
    PowerOn,
    Disconnect,
}

impl Stage {
    pub fn exit_code(&self) -> u8 {
        match self {
            Stage::Connect => 10,
            Stage::Lookup => 11,
            Stage::Create => 12,
            Stage::Attach => 13,
            Stage::Boot => 14,
            Stage::PowerOn => 15,
            Stage::Disconnect => 16,
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Connect => write!(f, "connect"),
            Stage::Lookup => write!(f, "host lookup"),
            Stage::Create => write!(f, "create vm"),
            Stage::Attach => write!(f, "attach media"),
            Stage::Boot => write!(f, "set boot device"),
            Stage::PowerOn => write!(f, "power on"),
            Stage::Disconnect => write!(f, "disconnect"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed")]
pub struct ProvisionError {
    pub stage: Stage,
    #[source]
    pub source: ApiError,
}

trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, ProvisionError>;
}

impl<T> StageContext<T> for Result<T, ApiError> {
    fn stage(self, stage: Stage) -> Result<T, ProvisionError> {
        self.map_err(|source| ProvisionError { stage, source })
    }
}

/// Create, configure and power on a single VM.
///
/// Stops at the first failing step. Once connected the session is always
/// closed, but a VM created before a later failure is left in place.
pub fn provision<H: Hypervisor>(api: &mut H, run: &Resolved) -> Result<VmRef, ProvisionError> {
    let mut session = Session::open(api, &run.credentials).stage(Stage::Connect)?;

    let host = session
        .find_host(&run.host_name)
        .stage(Stage::Lookup)?;
    info!(host = %host.name, id = %host.id, "resolved host");

    let vm = session.create_vm(&host, &run.vm).stage(Stage::Create)?;
    info!(
        vm = %vm,
        cpus = run.vm.cpu_count,
        memory_gb = run.vm.memory_gb,
        disk_gb = run.vm.disk_gb,
        datastore = %run.vm.datastore,
        network = %run.vm.network,
        "created vm"
    );

    configure_and_start(&mut session, &vm, run).inspect_err(|err| {
        warn!(vm = %vm, stage = %err.stage, "vm was created but not started, remove it manually if needed");
    })?;

    session.close().stage(Stage::Disconnect)?;

    Ok(vm)
}

fn configure_and_start<H: Hypervisor>(
    session: &mut Session<'_, H>,
    vm: &VmRef,
    run: &Resolved,
) -> Result<(), ProvisionError> {
    session.attach_iso(vm, &run.iso, true).stage(Stage::Attach)?;
    info!(vm = %vm, iso = %run.iso, "attached installation media");

    session
        .set_boot_device(vm, BootDevice::Cdrom)
        .stage(Stage::Boot)?;
    info!(vm = %vm, device = %BootDevice::Cdrom, "set boot device");

    session.power_on(vm).stage(Stage::PowerOn)?;
    info!(vm = %vm, "power on requested");

    Ok(())
}
