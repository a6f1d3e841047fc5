use std::fmt;

use thiserror::Error;

use crate::vm::{BootDevice, DatastorePath, HostRef, VmRef, VmSpec};

#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not connected to a management endpoint")]
    NotConnected,

    #[error("credentials were rejected for user {user:?}")]
    Unauthenticated { user: String },

    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("request failed with {status}: {error_type}: {message}")]
    Status {
        status: u16,
        error_type: String,
        message: String,
    },

    #[error("unexpected response: {reason}")]
    InvalidResponse { reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// The management operations a provisioning run needs from a hypervisor.
///
/// Calls are blocking and are issued strictly in order by
/// [`crate::provision::provision`]; implementations don't need to be
/// thread safe.
pub trait Hypervisor {
    fn connect(&mut self, credentials: &Credentials) -> Result<(), ApiError>;

    fn find_host(&mut self, name: &str) -> Result<HostRef, ApiError>;

    fn create_vm(&mut self, host: &HostRef, spec: &VmSpec) -> Result<VmRef, ApiError>;

    fn attach_iso(
        &mut self,
        vm: &VmRef,
        iso: &DatastorePath,
        start_connected: bool,
    ) -> Result<(), ApiError>;

    fn set_boot_device(&mut self, vm: &VmRef, device: BootDevice) -> Result<(), ApiError>;

    fn power_on(&mut self, vm: &VmRef) -> Result<(), ApiError>;

    /// Close the session. `interactive` asks the endpoint to confirm first,
    /// backends without a prompt ignore it.
    fn disconnect(&mut self, interactive: bool) -> Result<(), ApiError>;
}
