use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use tracing::info;
use vmprovision::{
    config::ProvisionConfig,
    dry_run::DryRun,
    provision::{provision, ProvisionError, Stage},
    vsphere::VsphereClient,
};

#[derive(Parser, Debug, Default)]
#[command(
    name = "vmprovision",
    version,
    about = "Create a virtual machine on a hypervisor host and boot it from an installation ISO",
    disable_help_subcommand = true
)]
pub struct ProvisionCmd {
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        global = true,
        help = "Write verbose messages to stderr for debugging.",
        display_order = 999
    )]
    pub verbose: u8,

    #[arg(short, long, env = "VMPROVISION_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "VMPROVISION_HOST", help = "Management endpoint, host name or URL")]
    pub host: Option<String>,

    #[arg(
        long,
        env = "VMPROVISION_VM_HOST",
        help = "Inventory name of the host to place the VM on, defaults to the endpoint's host name"
    )]
    pub vm_host: Option<String>,

    #[arg(long, env = "VMPROVISION_USER")]
    pub user: Option<String>,

    #[arg(long, env = "VMPROVISION_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "VMPROVISION_VM_NAME")]
    pub vm_name: Option<String>,

    #[arg(long, env = "VMPROVISION_DATASTORE")]
    pub datastore: Option<String>,

    #[arg(long, env = "VMPROVISION_NETWORK")]
    pub network: Option<String>,

    #[arg(
        long,
        env = "VMPROVISION_ISO_PATH",
        value_name = "[DATASTORE] PATH",
        help = "Installation image, e.g. \"[datastore1] images/install.iso\""
    )]
    pub iso_path: Option<String>,

    #[arg(long, env = "VMPROVISION_CPU_COUNT")]
    pub cpu_count: Option<u32>,

    #[arg(long = "memory-gb", env = "VMPROVISION_MEMORY_GB")]
    pub memory_gb: Option<u32>,

    #[arg(long = "disk-gb", env = "VMPROVISION_DISK_GB")]
    pub disk_gb: Option<u32>,

    #[arg(long, env = "VMPROVISION_GUEST_OS", help = "Guest OS identifier, e.g. OTHER_LINUX_64")]
    pub guest_os: Option<String>,

    #[arg(long, env = "VMPROVISION_FOLDER", help = "VM folder to place the VM in")]
    pub folder: Option<String>,

    #[arg(
        long,
        env = "VMPROVISION_INSECURE",
        num_args = 0..=1,
        default_missing_value = "true",
        help = "Accept invalid TLS certificates"
    )]
    pub insecure: Option<bool>,

    #[arg(long, help = "Log the calls that would be made without contacting the host")]
    pub dry_run: bool,
}

impl ProvisionCmd {
    fn overrides(&self) -> ProvisionConfig {
        ProvisionConfig {
            host: self.host.clone(),
            vm_host: self.vm_host.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            vm_name: self.vm_name.clone(),
            datastore: self.datastore.clone(),
            network: self.network.clone(),
            iso_path: self.iso_path.clone(),
            cpu_count: self.cpu_count,
            memory_gb: self.memory_gb,
            disk_gb: self.disk_gb,
            guest_os: self.guest_os.clone(),
            folder: self.folder.clone(),
            insecure: self.insecure,
        }
    }

    pub fn load_config(&self) -> eyre::Result<ProvisionConfig> {
        let file = match &self.config {
            Some(path) => ProvisionConfig::from_path(path)?,
            None => ProvisionConfig::default(),
        };
        Ok(file.merge(self.overrides()))
    }

    pub fn run(&self) -> eyre::Result<()> {
        let config = self.load_config()?;
        let run = config.resolve().wrap_err("invalid configuration")?;

        if self.dry_run {
            let mut api = DryRun::new();
            provision(&mut api, &run)?;
            return Ok(());
        }

        let mut client = VsphereClient::new(&run.credentials.host, run.insecure).map_err(
            |source| ProvisionError {
                stage: Stage::Connect,
                source,
            },
        )?;

        let vm = provision(&mut client, &run)?;
        info!(vm = %vm, "provisioned");
        println!("{} powered on", vm.name);

        Ok(())
    }
}
