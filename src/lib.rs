pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod instance;
pub mod provisioner;
pub mod service;
pub mod template;

pub use error::DsInstanceError;

use std::fs;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::CommandFactory;
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::executor::CommandExecutor;
use crate::instance::{InstanceConfig, Secret, ServerId};
use crate::provisioner::DsInstance;
use crate::service::ServiceAction;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Reads a password file, dropping the trailing line break.
pub fn read_secret(path: &Utf8Path) -> Result<Secret, DsInstanceError> {
    let content = fs::read_to_string(path)
        .map_err(|e| DsInstanceError::io(format!("failed to read password file {}", path), e))?;
    let value = content.trim_end_matches(['\r', '\n']);
    if value.is_empty() {
        return Err(DsInstanceError::Validation(format!("password file is empty: {}", path)));
    }
    Ok(Secret::new(value))
}

fn load_settings(opts: &cli::CommonArgs) -> Result<config::Settings> {
    let path = opts.config.as_deref();
    config::load_settings_or_default(path).with_context(|| match path {
        Some(path) => format!("failed to load settings from {}", path),
        None => "invalid default settings".to_string(),
    })
}

pub fn run_create(opts: &cli::CreateArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let settings = load_settings(&opts.common)?;
    let dm_password = read_secret(&opts.dm_password_file)?;

    let mut ds = DsInstance::new(settings, executor).with_dry_run(opts.dry_run);
    let result = ds.create_instance(&opts.user, &opts.realm, &opts.hostname, dm_password);

    if let Some(instance) = ds.instance() {
        info!("server id: {}", instance.server_id());
    }
    result
}

pub fn run_service(
    action: ServiceAction,
    opts: &cli::CommonArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<()> {
    let settings = load_settings(opts)?;
    let ds = DsInstance::new(settings, executor);
    match action {
        ServiceAction::Start => ds.start(),
        ServiceAction::Stop => ds.stop(),
        ServiceAction::Restart => ds.restart(),
    }
}

pub fn run_change_admin_password(
    opts: &cli::ChangeAdminPasswordArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<()> {
    let settings = load_settings(&opts.common)?;
    let server_id: ServerId = opts.server_id.parse()?;
    let dm_password = read_secret(&opts.dm_password_file)?;
    let new_password = read_secret(&opts.new_password_file)?;

    let instance = InstanceConfig::existing(
        &settings,
        server_id,
        &opts.user,
        &opts.realm,
        &opts.hostname,
        dm_password,
    )?;
    DsInstance::new(settings, executor)
        .with_instance(instance)
        .change_admin_password(&new_password)
}

pub fn run_validate(opts: &cli::CommonArgs) -> Result<()> {
    let settings = load_settings(opts)?;
    info!("validation successful:\n{:#?}", settings);
    Ok(())
}

pub fn write_completions(shell: clap_complete::Shell, out: &mut dyn Write) {
    let mut cmd = cli::Cli::command();
    clap_complete::generate(shell, &mut cmd, env!("CARGO_PKG_NAME"), out);
}
