use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hypervisor::Credentials;
use crate::vm::{DatastorePath, DatastorePathError, VmSpec};

pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_VM_NAME: &str = "TestVM";
pub const DEFAULT_DATASTORE: &str = "datastore1";
pub const DEFAULT_NETWORK: &str = "VM Network";
pub const DEFAULT_ISO_PATH: &str = "[datastore1] OpsRampGateway.iso";
pub const DEFAULT_GUEST_OS: &str = "OTHER_GUEST_64";
pub const DEFAULT_CPU_COUNT: u32 = 2;
pub const DEFAULT_MEMORY_GB: u32 = 4;
pub const DEFAULT_DISK_GB: u32 = 40;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config yaml")]
    Parse(#[source] serde_yaml_ng::Error),

    #[error("missing required option `{option}`")]
    Missing { option: &'static str },

    #[error("option `{option}` must be greater than zero")]
    Zero { option: &'static str },

    #[error("option `iso_path` is invalid")]
    IsoPath(#[from] DatastorePathError),
}

/// Recognized provisioning options.
///
/// Every field is optional so a config file, environment variables and
/// command line flags can each supply a subset. Accessors fall back to the
/// built-in defaults; `host` and `password` have none.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProvisionConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub vm_host: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub vm_name: Option<String>,
    #[serde(default)]
    pub datastore: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub iso_path: Option<String>,
    #[serde(default)]
    pub cpu_count: Option<u32>,
    #[serde(default, rename = "memoryGB")]
    pub memory_gb: Option<u32>,
    #[serde(default, rename = "diskGB")]
    pub disk_gb: Option<u32>,
    #[serde(default)]
    pub guest_os: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub insecure: Option<bool>,
}

impl fmt::Debug for ProvisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionConfig")
            .field("host", &self.host)
            .field("vm_host", &self.vm_host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("vm_name", &self.vm_name)
            .field("datastore", &self.datastore)
            .field("network", &self.network)
            .field("iso_path", &self.iso_path)
            .field("cpu_count", &self.cpu_count)
            .field("memory_gb", &self.memory_gb)
            .field("disk_gb", &self.disk_gb)
            .field("guest_os", &self.guest_os)
            .field("folder", &self.folder)
            .field("insecure", &self.insecure)
            .finish()
    }
}

impl ProvisionConfig {
    pub fn from_str(input: &str) -> Result<Self, ConfigError> {
        // An empty document parses to null, treat it as "no options".
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(input).map_err(ConfigError::Parse)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&input)
    }

    /// Layer `other` on top of `self`: every option set in `other` wins.
    pub fn merge(self, other: ProvisionConfig) -> ProvisionConfig {
        ProvisionConfig {
            host: other.host.or(self.host),
            vm_host: other.vm_host.or(self.vm_host),
            user: other.user.or(self.user),
            password: other.password.or(self.password),
            vm_name: other.vm_name.or(self.vm_name),
            datastore: other.datastore.or(self.datastore),
            network: other.network.or(self.network),
            iso_path: other.iso_path.or(self.iso_path),
            cpu_count: other.cpu_count.or(self.cpu_count),
            memory_gb: other.memory_gb.or(self.memory_gb),
            disk_gb: other.disk_gb.or(self.disk_gb),
            guest_os: other.guest_os.or(self.guest_os),
            folder: other.folder.or(self.folder),
            insecure: other.insecure.or(self.insecure),
        }
    }

    /// Inventory name of the host the VM is placed on. Defaults to the
    /// endpoint's host name, which only holds when talking to the host itself.
    pub fn vm_host(&self) -> String {
        match self.vm_host.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => inventory_name(self.host.as_deref().unwrap_or_default()),
        }
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_USER)
    }

    pub fn vm_name(&self) -> &str {
        self.vm_name.as_deref().unwrap_or(DEFAULT_VM_NAME)
    }

    pub fn datastore(&self) -> &str {
        self.datastore.as_deref().unwrap_or(DEFAULT_DATASTORE)
    }

    pub fn network(&self) -> &str {
        self.network.as_deref().unwrap_or(DEFAULT_NETWORK)
    }

    pub fn iso_path(&self) -> &str {
        self.iso_path.as_deref().unwrap_or(DEFAULT_ISO_PATH)
    }

    pub fn cpu_count(&self) -> u32 {
        self.cpu_count.unwrap_or(DEFAULT_CPU_COUNT)
    }

    pub fn memory_gb(&self) -> u32 {
        self.memory_gb.unwrap_or(DEFAULT_MEMORY_GB)
    }

    pub fn disk_gb(&self) -> u32 {
        self.disk_gb.unwrap_or(DEFAULT_DISK_GB)
    }

    pub fn guest_os(&self) -> &str {
        self.guest_os.as_deref().unwrap_or(DEFAULT_GUEST_OS)
    }

    pub fn insecure(&self) -> bool {
        self.insecure.unwrap_or(false)
    }

    /// Check every option and produce the values a run works with.
    pub fn resolve(&self) -> Result<Resolved, ConfigError> {
        let host = required("host", self.host.as_deref())?;
        let password = required("password", self.password.as_deref())?;

        for (option, value) in [
            ("cpuCount", self.cpu_count()),
            ("memoryGB", self.memory_gb()),
            ("diskGB", self.disk_gb()),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { option });
            }
        }

        let iso: DatastorePath = self.iso_path().parse()?;

        Ok(Resolved {
            host_name: self.vm_host(),
            credentials: Credentials {
                host: host.to_string(),
                user: self.user().to_string(),
                password: password.to_string(),
            },
            vm: VmSpec {
                name: self.vm_name().to_string(),
                cpu_count: self.cpu_count(),
                memory_gb: self.memory_gb(),
                disk_gb: self.disk_gb(),
                datastore: self.datastore().to_string(),
                network: self.network().to_string(),
                guest_os: self.guest_os().to_string(),
                folder: self.folder.clone(),
            },
            iso,
            insecure: self.insecure(),
        })
    }
}

fn required<'a>(option: &'static str, value: Option<&'a str>) -> Result<&'a str, ConfigError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { option }),
    }
}

/// The name a host is registered under, given either a bare host name or a
/// full endpoint URL such as `https://esxi01.lab:8443/`.
pub fn inventory_name(host: &str) -> String {
    let rest = host.split_once("://").map_or(host, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);

    match authority.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            name.to_string()
        }
        _ => authority.to_string(),
    }
}

/// Validated inputs of a provisioning run.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub host_name: String,
    pub credentials: Credentials,
    pub vm: VmSpec,
    pub iso: DatastorePath,
    pub insecure: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal() -> ProvisionConfig {
        ProvisionConfig {
            host: Some("labhost".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_applies_built_in_defaults() {
        let resolved = minimal().resolve().expect("minimal config should resolve");

        assert_eq!(resolved.credentials.host, "labhost");
        assert_eq!(resolved.host_name, "labhost");
        assert_eq!(resolved.credentials.user, "root");
        assert_eq!(resolved.vm.name, "TestVM");
        assert_eq!(resolved.vm.cpu_count, 2);
        assert_eq!(resolved.vm.memory_gb, 4);
        assert_eq!(resolved.vm.disk_gb, 40);
        assert_eq!(resolved.vm.datastore, "datastore1");
        assert_eq!(resolved.vm.network, "VM Network");
        assert_eq!(resolved.iso.to_string(), "[datastore1] OpsRampGateway.iso");
        assert!(!resolved.insecure);
    }

    #[test]
    fn inventory_name_strips_scheme_port_and_path() {
        assert_eq!(inventory_name("labhost"), "labhost");
        assert_eq!(inventory_name("https://esxi01.lab"), "esxi01.lab");
        assert_eq!(inventory_name("https://esxi01.lab:8443/sdk"), "esxi01.lab");
        assert_eq!(inventory_name("http://127.0.0.1:4040"), "127.0.0.1");
    }

    #[test]
    fn vm_host_can_differ_from_the_endpoint() {
        let cfg = ProvisionConfig {
            host: Some("https://vcsa.lab".to_string()),
            vm_host: Some("esxi01.lab".to_string()),
            ..minimal()
        };

        let resolved = cfg.resolve().expect("config should resolve");
        assert_eq!(resolved.credentials.host, "https://vcsa.lab");
        assert_eq!(resolved.host_name, "esxi01.lab");

        let cfg = ProvisionConfig {
            host: Some("https://esxi01.lab:443".to_string()),
            ..minimal()
        };
        assert_eq!(cfg.resolve().expect("config should resolve").host_name, "esxi01.lab");
    }

    #[test]
    fn resolve_requires_host_and_password() {
        let err = ProvisionConfig::default()
            .resolve()
            .expect_err("host should be required");
        assert!(matches!(err, ConfigError::Missing { option: "host" }));

        let cfg = ProvisionConfig {
            host: Some("labhost".to_string()),
            password: Some(String::new()),
            ..Default::default()
        };
        let err = cfg.resolve().expect_err("empty password should be rejected");
        assert!(matches!(err, ConfigError::Missing { option: "password" }));
    }

    #[test]
    fn resolve_rejects_zero_sizes_and_bad_iso_paths() {
        let cfg = ProvisionConfig {
            disk_gb: Some(0),
            ..minimal()
        };
        assert!(matches!(
            cfg.resolve(),
            Err(ConfigError::Zero { option: "diskGB" })
        ));

        let cfg = ProvisionConfig {
            iso_path: Some("OpsRampGateway.iso".to_string()),
            ..minimal()
        };
        assert!(matches!(cfg.resolve(), Err(ConfigError::IsoPath(_))));
    }

    #[test]
    fn merge_prefers_the_overriding_layer() {
        let file = ProvisionConfig {
            vm_name: Some("from-file".to_string()),
            cpu_count: Some(8),
            network: Some("Lab Network".to_string()),
            ..minimal()
        };
        let flags = ProvisionConfig {
            vm_name: Some("from-flags".to_string()),
            ..Default::default()
        };

        let merged = file.merge(flags);
        assert_eq!(merged.vm_name(), "from-flags");
        assert_eq!(merged.cpu_count(), 8);
        assert_eq!(merged.network(), "Lab Network");
        assert_eq!(merged.host.as_deref(), Some("labhost"));
    }

    #[test]
    fn from_path_reads_recognized_options() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be creatable");
        writeln!(
            file,
            "host: esxi01.lab\nvmHost: esxi01\nuser: admin\nvmName: Gateway\nisoPath: \"[isos] gw.iso\"\ncpuCount: 4\nmemoryGB: 8\ndiskGB: 80\ninsecure: true"
        )
        .expect("config should be writable");

        let cfg = ProvisionConfig::from_path(file.path()).expect("config should load");
        assert_eq!(cfg.host.as_deref(), Some("esxi01.lab"));
        assert_eq!(cfg.vm_host(), "esxi01");
        assert_eq!(cfg.user(), "admin");
        assert_eq!(cfg.vm_name(), "Gateway");
        assert_eq!(cfg.iso_path(), "[isos] gw.iso");
        assert_eq!(cfg.cpu_count(), 4);
        assert_eq!(cfg.memory_gb(), 8);
        assert_eq!(cfg.disk_gb(), 80);
        assert!(cfg.insecure());
    }

    #[test]
    fn from_str_rejects_unknown_options() {
        let err = ProvisionConfig::from_str("host: labhost\nnumCpu: 2\n")
            .expect_err("unknown keys should be rejected");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn from_str_accepts_an_empty_document() {
        let cfg = ProvisionConfig::from_str("\n").expect("empty config should parse");
        assert_eq!(cfg, ProvisionConfig::default());
    }

    #[test]
    fn from_path_reports_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir should be creatable");
        let err = ProvisionConfig::from_path(dir.path().join("missing.yaml"))
            .expect_err("missing file should fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn debug_output_redacts_password() {
        let out = format!("{:?}", minimal());
        assert!(out.contains("<redacted>"));
        assert!(!out.contains("secret"));
    }
}
