//! The instance configuration record and the pure helpers that derive it.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::Settings;
use crate::error::DsInstanceError;
use crate::template::SubstitutionMap;

/// Bind DN of the directory administrator.
pub const DIRECTORY_MANAGER_DN: &str = "cn=Directory Manager";

/// Unique identifier of one directory-server instance.
///
/// Only ever used as an opaque, path-safe string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerId(String);

impl ServerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServerId {
    type Err = DsInstanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path_safe = s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if s.is_empty() || s == "." || s == ".." || !path_safe {
            return Err(DsInstanceError::Validation(format!(
                "server id must be a non-empty path-safe token: {:?}",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }
}

/// Generates a fresh server id from a time-ordered UUID.
pub fn generate_server_id() -> ServerId {
    ServerId(uuid::Uuid::now_v7().to_string())
}

/// A value that must not appear in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(********)")
    }
}

/// Converts a realm name to an LDAP suffix: `EXAMPLE.COM` becomes
/// `dc=example,dc=com`.
pub fn realm_to_suffix(realm_name: &str) -> String {
    realm_name
        .split('.')
        .map(|label| format!("dc={}", label.to_lowercase()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Picks the directory-server installation root.
///
/// Returns `primary` if it is an existing directory and `fallback`
/// otherwise. The fallback is returned without checking it, so the result
/// may not exist.
pub fn find_server_root(primary: &Utf8Path, fallback: &Utf8Path) -> Utf8PathBuf {
    if primary.is_dir() {
        primary.to_path_buf()
    } else {
        fallback.to_path_buf()
    }
}

/// Everything known about the instance being provisioned.
///
/// Built once; the substitution map is derived in the constructor, so it
/// always agrees with the fields.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    server_id: ServerId,
    realm_name: String,
    suffix: String,
    host_name: String,
    dm_password: Secret,
    service_user: String,
    substitutions: SubstitutionMap,
}

impl InstanceConfig {
    /// Creates the record for a new instance with a freshly generated server id.
    pub fn new(
        settings: &Settings,
        service_user: &str,
        realm_name: &str,
        host_name: &str,
        dm_password: Secret,
    ) -> Result<Self, DsInstanceError> {
        Self::existing(
            settings,
            generate_server_id(),
            service_user,
            realm_name,
            host_name,
            dm_password,
        )
    }

    /// Creates the record for an instance whose server id is already known.
    pub fn existing(
        settings: &Settings,
        server_id: ServerId,
        service_user: &str,
        realm_name: &str,
        host_name: &str,
        dm_password: Secret,
    ) -> Result<Self, DsInstanceError> {
        validate_inputs(service_user, realm_name, host_name, &dm_password)?;

        let realm_name = realm_name.to_uppercase();
        let suffix = realm_to_suffix(&realm_name);
        let server_root =
            find_server_root(&settings.paths.server_root_64, &settings.paths.server_root_32);

        let mut substitutions = SubstitutionMap::new();
        substitutions.insert("FQHN", host_name);
        substitutions.insert("SERVERID", server_id.as_str());
        substitutions.insert_secret("PASSWORD", dm_password.expose());
        substitutions.insert("SUFFIX", suffix.as_str());
        substitutions.insert("REALM", realm_name.as_str());
        substitutions.insert("USER", service_user);
        substitutions.insert("SERVER_ROOT", server_root.as_str());

        Ok(Self {
            server_id,
            realm_name,
            suffix,
            host_name: host_name.to_string(),
            dm_password,
            service_user: service_user.to_string(),
            substitutions,
        })
    }

    pub fn server_id(&self) -> &ServerId {
        &self.server_id
    }

    pub fn realm_name(&self) -> &str {
        &self.realm_name
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn dm_password(&self) -> &Secret {
        &self.dm_password
    }

    pub fn service_user(&self) -> &str {
        &self.service_user
    }

    pub fn substitutions(&self) -> &SubstitutionMap {
        &self.substitutions
    }

    /// `<config_root>/slapd-<server id>/`
    pub fn config_dir(&self, config_root: &Utf8Path) -> Utf8PathBuf {
        config_root.join(format!("slapd-{}/", self.server_id))
    }

    /// `<config dir>/schema/`
    pub fn schema_dir(&self, config_root: &Utf8Path) -> Utf8PathBuf {
        self.config_dir(config_root).join("schema/")
    }
}

fn validate_inputs(
    service_user: &str,
    realm_name: &str,
    host_name: &str,
    dm_password: &Secret,
) -> Result<(), DsInstanceError> {
    if service_user.trim().is_empty() {
        return Err(DsInstanceError::Validation("service user must not be empty".to_string()));
    }
    if realm_name.split('.').any(|label| label.trim().is_empty()) {
        return Err(DsInstanceError::Validation(format!(
            "realm name must be dot-separated non-empty labels: {:?}",
            realm_name
        )));
    }
    if host_name.trim().is_empty() {
        return Err(DsInstanceError::Validation("host name must not be empty".to_string()));
    }
    if dm_password.expose().is_empty() {
        return Err(DsInstanceError::Validation(
            "directory manager password must not be empty".to_string(),
        ));
    }
    if dm_password.expose().contains(['\n', '\r']) {
        return Err(DsInstanceError::Validation(
            "directory manager password must be a single line".to_string(),
        ));
    }
    Ok(())
}
