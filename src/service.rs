//! Directory-service lifecycle through the host service manager.

use anyhow::{Context, Result};
use strum::Display;
use tracing::info;

use crate::config::Settings;
use crate::executor::{CommandExecutor, CommandSpec, run_checked};

/// Verb passed to the service-control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

/// Runs `<service command> <service name> <action>`.
///
/// The service name is shared by every instance on the host; controlling
/// one instance controls all of them.
pub struct ServiceControl<'a> {
    command: &'a str,
    name: &'a str,
}

impl<'a> ServiceControl<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            command: &settings.tools.service,
            name: &settings.service.name,
        }
    }

    /// Builds the command for `action` without running it.
    pub fn command_spec(&self, action: ServiceAction) -> CommandSpec {
        CommandSpec::new(self.command, [self.name.to_string(), action.to_string()])
    }

    pub fn run(&self, action: ServiceAction, executor: &dyn CommandExecutor) -> Result<()> {
        info!("{} directory service {}", action, self.name);
        run_checked(executor, &self.command_spec(action))
            .with_context(|| format!("failed to {} service {}", action, self.name))?;
        Ok(())
    }
}
