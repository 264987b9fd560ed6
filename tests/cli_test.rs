use anyhow::Result;
use clap::Parser;
use dsinstance::cli::{Cli, Commands, LogLevel};

#[test]
fn test_parse_create_command() -> Result<()> {
    let args = Cli::parse_from([
        "dsinstance",
        "create",
        "--realm",
        "EXAMPLE.COM",
        "--hostname",
        "ipa.example.com",
        "--dm-password-file",
        "/root/dm.pw",
    ]);

    match args.command {
        Commands::Create(opts) => {
            assert_eq!(opts.realm, "EXAMPLE.COM");
            assert_eq!(opts.hostname, "ipa.example.com");
            assert_eq!(opts.dm_password_file, "/root/dm.pw");
            assert_eq!(opts.user, "dirsrv");
            assert!(!opts.dry_run);
            assert!(opts.common.config.is_none());
            assert_eq!(opts.common.log_level, LogLevel::Info);
        }
        _ => panic!("Expected Create command"),
    }

    Ok(())
}

#[test]
fn test_parse_create_command_with_flags() -> Result<()> {
    let args = Cli::parse_from([
        "dsinstance",
        "create",
        "-r",
        "EXAMPLE.COM",
        "--hostname",
        "ipa.example.com",
        "--dm-password-file",
        "/root/dm.pw",
        "-u",
        "ds",
        "-c",
        "/etc/ipa/ds.yaml",
        "-l",
        "debug",
        "--dry-run",
    ]);

    match args.command {
        Commands::Create(opts) => {
            assert_eq!(opts.user, "ds");
            assert!(opts.dry_run);
            assert_eq!(opts.common.config.as_deref().map(|p| p.as_str()), Some("/etc/ipa/ds.yaml"));
            assert_eq!(opts.common.log_level, LogLevel::Debug);
        }
        _ => panic!("Expected Create command"),
    }

    Ok(())
}

#[test]
fn test_create_requires_realm() {
    let result = Cli::try_parse_from([
        "dsinstance",
        "create",
        "--hostname",
        "ipa.example.com",
        "--dm-password-file",
        "/root/dm.pw",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_parse_lifecycle_commands() {
    for verb in ["start", "stop", "restart"] {
        let args = Cli::parse_from(["dsinstance", verb, "--log-level", "warn"]);
        let opts = match args.command {
            Commands::Start(opts) | Commands::Stop(opts) | Commands::Restart(opts) => opts,
            _ => panic!("Expected lifecycle command for {}", verb),
        };
        assert_eq!(opts.log_level, LogLevel::Warn);
    }
}

#[test]
fn test_parse_change_admin_password_command() {
    let args = Cli::parse_from([
        "dsinstance",
        "change-admin-password",
        "--server-id",
        "abc123",
        "--realm",
        "EXAMPLE.COM",
        "--hostname",
        "ipa.example.com",
        "--dm-password-file",
        "/root/dm.pw",
        "--new-password-file",
        "/root/admin.pw",
    ]);

    match args.command {
        Commands::ChangeAdminPassword(opts) => {
            assert_eq!(opts.server_id, "abc123");
            assert_eq!(opts.new_password_file, "/root/admin.pw");
        }
        _ => panic!("Expected ChangeAdminPassword command"),
    }
}

#[test]
fn test_parse_validate_command() {
    let args = Cli::parse_from(["dsinstance", "validate", "--config", "ds.yaml"]);

    match &args.command {
        Commands::Validate(opts) => {
            assert_eq!(opts.config.as_deref().map(|p| p.as_str()), Some("ds.yaml"));
        }
        _ => panic!("Expected Validate command"),
    }
    assert_eq!(args.command.log_level(), Some(LogLevel::Info));
}
