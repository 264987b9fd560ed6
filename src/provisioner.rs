//! Directory-server instance provisioning.
//!
//! [`DsInstance::create_instance`] runs a fixed sequence of [`Step`]s. Each
//! step either shells out through the [`CommandExecutor`] or renders a
//! template to disk. The first failing step aborts the sequence; steps that
//! already completed are not undone, so a failed run can leave a partially
//! configured instance behind for the caller to clean up.

use std::fs;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::DsInstanceError;
use crate::executor::{CommandExecutor, CommandSpec, run_checked};
use crate::instance::{DIRECTORY_MANAGER_DN, InstanceConfig, Secret};
use crate::service::{ServiceAction, ServiceControl};
use crate::template;

/// Setup descriptor consumed by `setup-ds.pl` / `ds_newinst.pl`.
pub const INF_TEMPLATE: &str = "
[General]
FullMachineName=   $FQHN
SuiteSpotUserID=   $USER
ServerRoot=    $SERVER_ROOT
[slapd]
ServerPort=   389
ServerIdentifier=   $SERVERID
Suffix=   $SUFFIX
RootDN=   cn=Directory Manager
RootDNPwd= $PASSWORD
";

const CERTMAP_TEMPLATE: &str = "certmap.conf.template";
const BOOTSTRAP_TEMPLATE: &str = "bootstrap-template.ldif";
const TEST_USERS_TEMPLATE: &str = "test-users-template.ldif";
const TEST_USERS_OUTPUT: &str = "test-users.ldif";

/// The provisioning steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumCount)]
pub enum Step {
    #[strum(to_string = "create service user")]
    CreateUser,
    #[strum(to_string = "create instance")]
    CreateInstance,
    #[strum(to_string = "install default schemas")]
    AddDefaultSchemas,
    #[strum(to_string = "enable ssl")]
    EnableSsl,
    #[strum(to_string = "write certmap.conf")]
    CertmapConf,
    #[strum(to_string = "restart directory service")]
    Restart,
    #[strum(to_string = "add default layout")]
    AddDefaultLayout,
    #[strum(to_string = "create test users ldif")]
    CreateTestUsers,
}

/// Provisions and controls one directory-server instance.
pub struct DsInstance {
    settings: Settings,
    executor: Arc<dyn CommandExecutor>,
    dry_run: bool,
    instance: Option<InstanceConfig>,
}

impl DsInstance {
    pub fn new(settings: Settings, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            settings,
            executor,
            dry_run: false,
            instance: None,
        }
    }

    /// In dry-run mode files are rendered but not written to their final
    /// location. Commands still go through the executor, which decides for
    /// itself whether to run them.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Attaches an already provisioned instance, for lifecycle and password
    /// operations after creation.
    #[must_use]
    pub fn with_instance(mut self, instance: InstanceConfig) -> Self {
        self.instance = Some(instance);
        self
    }

    /// The current instance record, if one was created or attached.
    pub fn instance(&self) -> Option<&InstanceConfig> {
        self.instance.as_ref()
    }

    fn require_instance(&self) -> Result<&InstanceConfig, DsInstanceError> {
        self.instance.as_ref().ok_or_else(|| {
            DsInstanceError::Precondition("server id not set: no instance has been created".into())
        })
    }

    /// `/etc/dirsrv/slapd-<server id>/` for the current instance.
    pub fn config_dir(&self) -> Result<Utf8PathBuf, DsInstanceError> {
        Ok(self
            .require_instance()?
            .config_dir(&self.settings.paths.config_root))
    }

    /// `<config dir>/schema/` for the current instance.
    pub fn schema_dir(&self) -> Result<Utf8PathBuf, DsInstanceError> {
        Ok(self
            .require_instance()?
            .schema_dir(&self.settings.paths.config_root))
    }

    /// Creates, configures and starts a new instance.
    ///
    /// The instance record replaces any previously attached one before the
    /// first step runs, so [`instance`](Self::instance) reports the new
    /// server id even when a later step fails.
    pub fn create_instance(
        &mut self,
        service_user: &str,
        realm_name: &str,
        host_name: &str,
        dm_password: Secret,
    ) -> Result<()> {
        let config =
            InstanceConfig::new(&self.settings, service_user, realm_name, host_name, dm_password)
                .context("invalid instance parameters")?;
        info!(
            "creating directory server instance {} for realm {} (suffix {})",
            config.server_id(),
            config.realm_name(),
            config.suffix()
        );
        self.instance = Some(config);

        for (index, step) in Step::iter().enumerate() {
            info!("step {}/{}: {}", index + 1, Step::COUNT, step);
            self.run_step(step)
                .with_context(|| format!("failed to {}", step))?;
        }

        info!("directory server instance created");
        Ok(())
    }

    fn run_step(&self, step: Step) -> Result<()> {
        match step {
            Step::CreateUser => self.create_ds_user(),
            Step::CreateInstance => self.create_ds_instance(),
            Step::AddDefaultSchemas => self.add_default_schemas(),
            Step::EnableSsl => self.enable_ssl(),
            Step::CertmapConf => self.certmap_conf(),
            Step::Restart => self.restart(),
            Step::AddDefaultLayout => self.add_default_layout(),
            Step::CreateTestUsers => self.create_test_users(),
        }
    }

    pub fn start(&self) -> Result<()> {
        ServiceControl::new(&self.settings).run(ServiceAction::Start, self.executor.as_ref())
    }

    pub fn stop(&self) -> Result<()> {
        ServiceControl::new(&self.settings).run(ServiceAction::Stop, self.executor.as_ref())
    }

    pub fn restart(&self) -> Result<()> {
        ServiceControl::new(&self.settings).run(ServiceAction::Restart, self.executor.as_ref())
    }

    /// Sets the password of `uid=admin,cn=sysaccounts,cn=etc,<suffix>` over
    /// a TLS connection, binding as the directory manager.
    pub fn change_admin_password(&self, new_password: &Secret) -> Result<()> {
        let config = self.require_instance()?;
        if new_password.expose().is_empty() {
            return Err(DsInstanceError::Validation("new password must not be empty".into()).into());
        }
        info!("changing admin password");

        let cert_db = self.config_dir()?.join("cert8.db");
        let target = format!("uid=admin,cn=sysaccounts,cn=etc,{}", config.suffix());
        let spec = CommandSpec::new(
            self.settings.tools.ldappasswd.as_str(),
            [
                "-D",
                DIRECTORY_MANAGER_DN,
                "-w",
                config.dm_password().expose(),
                "-P",
                cert_db.as_str(),
                "-ZZZ",
                "-s",
                new_password.expose(),
                target.as_str(),
            ],
        )
        .with_secret(config.dm_password().expose())
        .with_secret(new_password.expose());

        run_checked(self.executor.as_ref(), &spec).context("failed to change admin password")?;
        debug!("ldappasswd done");
        Ok(())
    }

    fn create_ds_user(&self) -> Result<()> {
        let user = self.require_instance()?.service_user();
        let tools = &self.settings.tools;

        let lookup = CommandSpec::new(tools.getent.as_str(), ["passwd", user]);
        let result = self.executor.execute(&lookup)?;
        match result.code() {
            Some(0) => {
                debug!("ds user {} exists", user);
                return Ok(());
            }
            // getent exits 2 when the key is not found; no status means dry run
            Some(2) | None => {}
            // any other status is a failed lookup, never a missing user
            Some(_) => {
                result.check(&lookup)?;
            }
        }

        debug!("adding ds user {}", user);
        let spec = CommandSpec::new(
            tools.useradd.as_str(),
            [
                "-c",
                "DS System User",
                "-d",
                "/var/lib/dirsrv",
                "-M",
                "-r",
                "-s",
                "/sbin/nologin",
                user,
            ],
        );
        run_checked(self.executor.as_ref(), &spec)?;
        debug!("done adding user");
        Ok(())
    }

    fn create_ds_instance(&self) -> Result<()> {
        let config = self.require_instance()?;
        let inf = template::render("setup descriptor", INF_TEMPLATE, config.substitutions())?;
        let staged = self.stage(".inf", &inf)?;
        let inf_path = staged.path().as_os_str().to_owned();
        debug!("staged setup descriptor at {}", staged.path().display());

        let tools = &self.settings.tools;
        let mut spec = if tools.setup_ds.exists() {
            debug!("calling {}", tools.setup_ds);
            CommandSpec::new(tools.setup_ds.as_str(), ["--silent", "--logfile", "-", "-f"])
        } else {
            debug!("{} not found, calling {}", tools.setup_ds, tools.ds_newinst);
            CommandSpec::new(tools.ds_newinst.as_str(), Vec::<&str>::new())
        };
        spec.args.push(inf_path);

        run_checked(self.executor.as_ref(), &spec)?;
        drop(staged);
        debug!("completed creating ds instance");

        self.restart()
    }

    fn add_default_schemas(&self) -> Result<()> {
        let schema_dir = self.schema_dir()?;
        let share_dir = &self.settings.paths.share_dir;

        for name in &self.settings.schemas {
            let source = share_dir.join(name);
            let target = schema_dir.join(name);
            if self.dry_run {
                info!("dry run: copy {} to {}", source, target);
                continue;
            }
            debug!("copying schema {} to {}", source, target);
            fs::copy(&source, &target).map_err(|e| {
                DsInstanceError::io(format!("failed to copy {} to {}", source, target), e)
            })?;
        }
        Ok(())
    }

    fn enable_ssl(&self) -> Result<()> {
        let config = self.require_instance()?;
        let config_dir = self.config_dir()?;
        let password = config.dm_password().expose();

        debug!("configuring ssl for ds instance");
        let spec = CommandSpec::new(
            self.settings.tools.setup_ssl.as_str(),
            [password, config_dir.as_str(), config.host_name()],
        )
        .with_secret(password);
        run_checked(self.executor.as_ref(), &spec)?;
        debug!("done configuring ssl for ds instance");
        Ok(())
    }

    fn certmap_conf(&self) -> Result<()> {
        let config = self.require_instance()?;
        let source = self.settings.paths.share_dir.join(CERTMAP_TEMPLATE);
        let rendered = template::render_file(&source, config.substitutions())?;
        let target = self.config_dir()?.join("certmap.conf");
        self.write_output(&target, &rendered)
    }

    fn add_default_layout(&self) -> Result<()> {
        let config = self.require_instance()?;
        let source = self.settings.paths.share_dir.join(BOOTSTRAP_TEMPLATE);
        let ldif = template::render_file(&source, config.substitutions())?;
        let staged = self.stage(".ldif", &ldif)?;

        let password = config.dm_password().expose();
        let mut spec = CommandSpec::new(
            self.settings.tools.ldapmodify.as_str(),
            ["-xv", "-D", DIRECTORY_MANAGER_DN, "-w", password, "-f"],
        )
        .with_secret(password);
        spec.args.push(staged.path().as_os_str().to_owned());

        debug!("adding default ds layout");
        run_checked(self.executor.as_ref(), &spec)?;
        debug!("done adding default ds layout");
        Ok(())
    }

    fn create_test_users(&self) -> Result<()> {
        let config = self.require_instance()?;
        let share_dir = &self.settings.paths.share_dir;
        let rendered =
            template::render_file(&share_dir.join(TEST_USERS_TEMPLATE), config.substitutions())?;
        self.write_output(&share_dir.join(TEST_USERS_OUTPUT), &rendered)
    }

    fn write_output(&self, target: &Utf8Path, contents: &str) -> Result<()> {
        if self.dry_run {
            info!("dry run: write {} ({} bytes)", target, contents.len());
            return Ok(());
        }
        fs::write(target, contents)
            .map_err(|e| DsInstanceError::io(format!("failed to write {}", target), e))?;
        debug!("wrote {}", target);
        Ok(())
    }

    /// Writes `contents` to a private temporary file that is removed when
    /// the returned handle is dropped.
    fn stage(&self, suffix: &str, contents: &str) -> Result<NamedTempFile> {
        let dir = self.settings.staging_dir();
        let mut file = tempfile::Builder::new()
            .prefix("dsinstance-")
            .suffix(suffix)
            .tempfile_in(&dir)
            .map_err(|e| DsInstanceError::io(format!("failed to create staging file in {}", dir), e))?;
        let path = file.path().display().to_string();
        file.write_all(contents.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| DsInstanceError::io(format!("failed to write {}", path), e))?;
        Ok(file)
    }
}
