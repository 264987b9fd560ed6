use std::fs;

use anyhow::Result;
use camino::Utf8PathBuf;
use dsinstance::DsInstanceError;
use dsinstance::config::{Settings, load_settings, load_settings_or_default};
use tempfile::tempdir;

fn write_settings(yaml: &str) -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempdir().expect("failed to create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("ds.yaml")).expect("utf-8 path");
    fs::write(&path, yaml).expect("failed to write settings");
    (dir, path)
}

#[test]
fn test_partial_settings_keep_defaults() -> Result<()> {
    // editorconfig-checker-disable
    let (_dir, path) = write_settings(
        r#"---
paths:
  share_dir: /opt/ipa/share
tools:
  ldapmodify: /opt/openldap/bin/ldapmodify
"#,
    );
    // editorconfig-checker-enable

    let settings = load_settings(&path)?;
    let defaults = Settings::default();

    assert_eq!(settings.paths.share_dir, "/opt/ipa/share");
    assert_eq!(settings.paths.config_root, defaults.paths.config_root);
    assert_eq!(settings.tools.ldapmodify, "/opt/openldap/bin/ldapmodify");
    assert_eq!(settings.tools.ldappasswd, defaults.tools.ldappasswd);
    assert_eq!(settings.service, defaults.service);
    assert_eq!(settings.schemas, defaults.schemas);

    Ok(())
}

#[test]
fn test_full_settings() -> Result<()> {
    // editorconfig-checker-disable
    let (_dir, path) = write_settings(
        r#"---
paths:
  share_dir: /usr/share/ipa
  config_root: /srv/dirsrv
  server_root_64: /usr/lib64/dirsrv
  server_root_32: /usr/lib/dirsrv
  staging_dir: /var/tmp
tools:
  getent: /usr/bin/getent
  useradd: /usr/sbin/useradd
  service: /usr/sbin/service
  setup_ds: /usr/sbin/setup-ds.pl
  ds_newinst: /usr/bin/ds_newinst.pl
  setup_ssl: /usr/sbin/ipa-server-setupssl
  ldapmodify: /usr/bin/ldapmodify
  ldappasswd: /usr/bin/ldappasswd
service:
  name: dirsrv.target
schemas:
- 60kerberos.ldif
"#,
    );
    // editorconfig-checker-enable

    let settings = load_settings(&path)?;
    assert_eq!(settings.paths.config_root, "/srv/dirsrv");
    assert_eq!(settings.staging_dir(), "/var/tmp");
    assert_eq!(settings.tools.getent, "/usr/bin/getent");
    assert_eq!(settings.service.name, "dirsrv.target");
    assert_eq!(settings.schemas, vec!["60kerberos.ldif"]);

    Ok(())
}

#[test]
fn test_empty_file_is_all_defaults() -> Result<()> {
    let (_dir, path) = write_settings("{}\n");
    assert_eq!(load_settings(&path)?, Settings::default());
    Ok(())
}

#[test]
fn test_unknown_field_rejected() {
    let (_dir, path) = write_settings("paths:\n  share: /usr/share/ipa\n");
    let err = load_settings(&path).expect_err("unknown field should be rejected");
    assert!(matches!(err, DsInstanceError::Config(_)), "got: {:?}", err);
    assert!(err.to_string().contains("share"), "got: {}", err);
}

#[test]
fn test_relative_path_rejected() {
    let (_dir, path) = write_settings("paths:\n  config_root: etc/dirsrv\n");
    let err = load_settings(&path).expect_err("relative path should be rejected");
    assert!(err.to_string().contains("must be an absolute path"), "got: {}", err);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_settings(camino::Utf8Path::new("/nonexistent/ds.yaml"))
        .expect_err("missing file should fail");
    match err {
        DsInstanceError::Io { source, .. } => {
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
        }
        other => panic!("expected Io error, got: {:?}", other),
    }
}

#[test]
fn test_no_path_means_defaults() -> Result<()> {
    assert_eq!(load_settings_or_default(None)?, Settings::default());
    Ok(())
}
