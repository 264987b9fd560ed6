#![allow(dead_code)]

use std::ffi::OsString;
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use dsinstance::config::Settings;
use dsinstance::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use tempfile::TempDir;

pub type CommandCalls = Arc<Mutex<Vec<(String, Vec<OsString>)>>>;

pub const CERTMAP_TEMPLATE: &str = "\
certmap default         default
default:DNComps
default:FilterComps     uid
# $REALM
";

pub const BOOTSTRAP_TEMPLATE: &str = "\
dn: $SUFFIX
changetype: modify
add: objectClass
objectClass: pilotObject

dn: cn=accounts,$SUFFIX
changetype: add
objectClass: top
objectClass: nsContainer
cn: accounts
";

pub const TEST_USERS_TEMPLATE: &str = "\
dn: uid=test,cn=users,cn=accounts,$SUFFIX
objectClass: top
objectClass: person
uid: test
cn: Test User
";

/// Temporary host layout: share dir with templates, empty config root,
/// staging dir, and tool paths that do not exist yet.
pub struct TestHost {
    _dir: TempDir,
    pub root: Utf8PathBuf,
    pub settings: Settings,
}

impl TestHost {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .expect("temp dir path should be valid UTF-8");

        let share = root.join("usr/share/ipa");
        fs::create_dir_all(&share).expect("failed to create share dir");
        fs::write(share.join("certmap.conf.template"), CERTMAP_TEMPLATE).unwrap();
        fs::write(share.join("bootstrap-template.ldif"), BOOTSTRAP_TEMPLATE).unwrap();
        fs::write(share.join("test-users-template.ldif"), TEST_USERS_TEMPLATE).unwrap();
        fs::write(share.join("60kerberos.ldif"), "dn: cn=schema\n# kerberos\n").unwrap();
        fs::write(share.join("60samba.ldif"), "dn: cn=schema\n# samba\n").unwrap();

        fs::create_dir_all(root.join("etc/dirsrv")).expect("failed to create config root");
        fs::create_dir_all(root.join("staging")).expect("failed to create staging dir");

        let mut settings = Settings::default();
        settings.paths.share_dir = share;
        settings.paths.config_root = root.join("etc/dirsrv");
        settings.paths.server_root_64 = root.join("usr/lib64/dirsrv");
        settings.paths.server_root_32 = root.join("usr/lib/dirsrv");
        settings.paths.staging_dir = Some(root.join("staging"));
        settings.tools.setup_ds = root.join("usr/sbin/setup-ds.pl");
        settings.tools.ds_newinst = root.join("usr/bin/ds_newinst.pl");

        Self {
            _dir: dir,
            root,
            settings,
        }
    }

    pub fn share_dir(&self) -> &Utf8Path {
        &self.settings.paths.share_dir
    }

    pub fn staging_entries(&self) -> usize {
        fs::read_dir(self.root.join("staging"))
            .expect("staging dir should exist")
            .count()
    }

    /// Makes the preferred setup tool "installed".
    pub fn install_setup_ds(&self) {
        let path = &self.settings.tools.setup_ds;
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\n").unwrap();
    }
}

/// Executor that pretends to be the host: records calls, answers `getent`,
/// creates the instance config directory when the setup tool runs, and
/// captures staged files while they still exist.
pub struct FakeHostExecutor {
    pub calls: CommandCalls,
    pub staged: Arc<Mutex<Vec<String>>>,
    config_root: Utf8PathBuf,
    existing_users: Vec<String>,
    fail_command: Option<String>,
}

impl FakeHostExecutor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            staged: Arc::new(Mutex::new(Vec::new())),
            config_root: settings.paths.config_root.clone(),
            existing_users: Vec::new(),
            fail_command: None,
        }
    }

    pub fn with_existing_user(mut self, user: &str) -> Self {
        self.existing_users.push(user.to_string());
        self
    }

    /// Every invocation of `command` exits with status 1.
    pub fn failing_on(mut self, command: &str) -> Self {
        self.fail_command = Some(command.to_string());
        self
    }

    fn capture_staged(&self, spec: &CommandSpec) -> Option<String> {
        let path = spec.args.last()?;
        let content = fs::read_to_string(path).ok()?;
        self.staged.lock().unwrap().push(content.clone());
        Some(content)
    }
}

fn exit(code: i32) -> ExecutionResult {
    ExecutionResult {
        status: Some(ExitStatus::from_raw(code << 8)),
        stderr_tail: Vec::new(),
    }
}

impl CommandExecutor for FakeHostExecutor {
    fn execute(&self, spec: &CommandSpec) -> anyhow::Result<ExecutionResult> {
        self.calls
            .lock()
            .unwrap()
            .push((spec.command.clone(), spec.args.clone()));

        if self.fail_command.as_deref() == Some(spec.command.as_str()) {
            return Ok(ExecutionResult {
                status: Some(ExitStatus::from_raw(1 << 8)),
                stderr_tail: vec!["simulated failure".to_string()],
            });
        }

        if spec.command == "getent" {
            let user = spec.args.get(1).map(|u| u.to_string_lossy().into_owned());
            let known = user.is_some_and(|u| self.existing_users.contains(&u));
            return Ok(exit(if known { 0 } else { 2 }));
        }

        if spec.command.ends_with("setup-ds.pl") || spec.command.ends_with("ds_newinst.pl") {
            let inf = self.capture_staged(spec).expect("setup descriptor should be staged");
            let server_id = inf
                .lines()
                .find_map(|l| l.strip_prefix("ServerIdentifier="))
                .map(str::trim)
                .expect("setup descriptor should name the server");
            let schema_dir = self.config_root.join(format!("slapd-{}", server_id)).join("schema");
            fs::create_dir_all(schema_dir).expect("failed to create instance dir");
        }

        if spec.command.ends_with("ldapmodify") {
            self.capture_staged(spec).expect("ldif should be staged");
        }

        Ok(exit(0))
    }
}

pub fn call_names(calls: &CommandCalls) -> Vec<String> {
    calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
}

pub fn args_of(calls: &CommandCalls, command: &str) -> Vec<String> {
    calls
        .lock()
        .unwrap()
        .iter()
        .find(|(c, _)| c == command)
        .map(|(_, args)| args.iter().map(|a| a.to_string_lossy().into_owned()).collect())
        .unwrap_or_else(|| panic!("{} was not invoked", command))
}
