pub mod config;
pub mod dry_run;
pub mod hypervisor;
pub mod provision;
pub mod session;
pub mod vm;
pub mod vsphere;
