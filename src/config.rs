//! Host layout and tool locations used by the provisioner.
//!
//! Every path the provisioner touches comes from [`Settings`], which is
//! passed in explicitly. The defaults match a stock Fedora/RHEL layout; a
//! YAML file can override any subset of them:
//!
//! ```yaml
//! paths:
//!   share_dir: /usr/share/ipa
//! tools:
//!   ldapmodify: /usr/bin/ldapmodify
//! service:
//!   name: dirsrv
//! ```

use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::DsInstanceError;

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Read-only data shipped by the package: schema LDIFs and templates.
    /// The rendered test-users LDIF is also written here.
    pub share_dir: Utf8PathBuf,
    /// Parent of the per-instance `slapd-<server id>` directories.
    pub config_root: Utf8PathBuf,
    /// Preferred (64-bit) directory-server installation root.
    pub server_root_64: Utf8PathBuf,
    /// Fallback (32-bit) directory-server installation root.
    pub server_root_32: Utf8PathBuf,
    /// Where staging files handed to setup tools are created.
    /// `None` means the system temporary directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<Utf8PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            share_dir: Utf8PathBuf::from("/usr/share/ipa"),
            config_root: Utf8PathBuf::from("/etc/dirsrv"),
            server_root_64: Utf8PathBuf::from("/usr/lib64/dirsrv"),
            server_root_32: Utf8PathBuf::from("/usr/lib/dirsrv"),
            staging_dir: None,
        }
    }
}

/// External programs invoked during provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub getent: String,
    pub useradd: String,
    pub service: String,
    /// Preferred instance-setup tool; used when it exists on disk.
    pub setup_ds: Utf8PathBuf,
    /// Legacy instance-setup tool used when `setup_ds` is absent.
    pub ds_newinst: Utf8PathBuf,
    pub setup_ssl: String,
    pub ldapmodify: String,
    pub ldappasswd: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            getent: "getent".to_string(),
            useradd: "/usr/sbin/useradd".to_string(),
            service: "/sbin/service".to_string(),
            setup_ds: Utf8PathBuf::from("/usr/sbin/setup-ds.pl"),
            ds_newinst: Utf8PathBuf::from("/usr/bin/ds_newinst.pl"),
            setup_ssl: "/usr/sbin/ipa-server-setupssl".to_string(),
            ldapmodify: "/usr/bin/ldapmodify".to_string(),
            ldappasswd: "/usr/lib/mozldap/ldappasswd".to_string(),
        }
    }
}

/// Service-manager target for start/stop/restart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name passed to the service-control command. This is the same
    /// for every instance on the host.
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "dirsrv".to_string(),
        }
    }
}

fn default_schemas() -> Vec<String> {
    vec!["60kerberos.ldif".to_string(), "60samba.ldif".to_string()]
}

/// Complete provisioner settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    pub service: ServiceConfig,
    /// Schema files copied from `share_dir` into the instance schema directory.
    pub schemas: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            tools: ToolsConfig::default(),
            service: ServiceConfig::default(),
            schemas: default_schemas(),
        }
    }
}

impl Settings {
    /// Checks that paths are absolute and names are usable.
    pub fn validate(&self) -> Result<(), DsInstanceError> {
        let paths = [
            ("paths.share_dir", Some(&self.paths.share_dir)),
            ("paths.config_root", Some(&self.paths.config_root)),
            ("paths.server_root_64", Some(&self.paths.server_root_64)),
            ("paths.server_root_32", Some(&self.paths.server_root_32)),
            ("paths.staging_dir", self.paths.staging_dir.as_ref()),
            ("tools.setup_ds", Some(&self.tools.setup_ds)),
            ("tools.ds_newinst", Some(&self.tools.ds_newinst)),
        ];
        for (name, path) in paths {
            if let Some(path) = path
                && !path.is_absolute()
            {
                return Err(DsInstanceError::Config(format!(
                    "{} must be an absolute path: {}",
                    name, path
                )));
            }
        }

        let tools = [
            ("tools.getent", &self.tools.getent),
            ("tools.useradd", &self.tools.useradd),
            ("tools.service", &self.tools.service),
            ("tools.setup_ssl", &self.tools.setup_ssl),
            ("tools.ldapmodify", &self.tools.ldapmodify),
            ("tools.ldappasswd", &self.tools.ldappasswd),
        ];
        for (name, tool) in tools {
            if tool.trim().is_empty() {
                return Err(DsInstanceError::Config(format!("{} must not be empty", name)));
            }
        }

        if self.service.name.trim().is_empty() {
            return Err(DsInstanceError::Config("service.name must not be empty".to_string()));
        }

        for schema in &self.schemas {
            if schema.is_empty() || schema.contains('/') || schema == "." || schema == ".." {
                return Err(DsInstanceError::Config(format!(
                    "schema entry must be a plain file name: {:?}",
                    schema
                )));
            }
        }

        Ok(())
    }

    /// Directory used for staging files; falls back to the system temp dir.
    pub fn staging_dir(&self) -> Utf8PathBuf {
        match &self.paths.staging_dir {
            Some(dir) => dir.clone(),
            None => Utf8PathBuf::from_path_buf(std::env::temp_dir())
                .unwrap_or_else(|_| Utf8PathBuf::from("/tmp")),
        }
    }
}

/// Loads settings from a YAML file and validates them.
pub fn load_settings(path: &Utf8Path) -> Result<Settings, DsInstanceError> {
    let file = File::open(path).map_err(|e| DsInstanceError::io(path.as_str(), e))?;
    let reader = BufReader::new(file);
    let settings: Settings = serde_yaml::from_reader(reader)
        .map_err(|e| DsInstanceError::Config(format!("failed to parse {}: {}", path, e)))?;
    settings.validate()?;
    Ok(settings)
}

/// Loads settings from `path` when given, otherwise returns the defaults.
pub fn load_settings_or_default(path: Option<&Utf8Path>) -> Result<Settings, DsInstanceError> {
    match path {
        Some(path) => load_settings(path),
        None => Ok(Settings::default()),
    }
}
