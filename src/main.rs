use std::io;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use dsinstance::cli::{self, Commands};
use dsinstance::executor::{CommandExecutor, RealCommandExecutor};
use dsinstance::service::ServiceAction;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    if let Some(level) = args.command.log_level() {
        dsinstance::init_logging(level)?;
    }

    let dry_run = matches!(&args.command, Commands::Create(opts) if opts.dry_run);
    let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor { dry_run });

    let result = match &args.command {
        Commands::Create(opts) => dsinstance::run_create(opts, executor),
        Commands::Start(opts) => dsinstance::run_service(ServiceAction::Start, opts, executor),
        Commands::Stop(opts) => dsinstance::run_service(ServiceAction::Stop, opts, executor),
        Commands::Restart(opts) => dsinstance::run_service(ServiceAction::Restart, opts, executor),
        Commands::ChangeAdminPassword(opts) => {
            dsinstance::run_change_admin_password(opts, executor)
        }
        Commands::Validate(opts) => dsinstance::run_validate(opts),
        Commands::Completions(opts) => {
            dsinstance::write_completions(opts.shell, &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}
