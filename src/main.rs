//! permission-engine - evaluate permission checks from the shell
//!
//! Builds a policy the same way an embedding host would at startup (config
//! file first, then CLI flags layered on top), applies any `--deny` rules, and
//! then answers checks:
//!
//! ```text
//! permission-engine --experimental-permission \
//!     --allow-fs-read /tmp --allow-fs-write ./out.log \
//!     --deny fs.read=/tmp/secret \
//!     check fs.read /tmp/x /tmp/secret/key /home/user
//! ```
//!
//! Exits with status 1 when any check is denied.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use permission_engine::logging::{self, LogFormat};
use permission_engine::{PermissionConfig, PermissionDispatcher, PermissionError, PermissionScope};

/// Evaluate permission checks against a startup policy
#[derive(Parser, Debug)]
#[command(name = "permission-engine")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON policy file; CLI flags are layered on top of it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enforce permissions (otherwise every check is granted)
    #[arg(long)]
    experimental_permission: bool,

    /// Filesystem allow-spec, e.g. `read,write:/tmp`
    #[arg(long, value_name = "SPEC")]
    allow_fs: Vec<String>,

    /// Path the process may read
    #[arg(long, value_name = "PATH")]
    allow_fs_read: Vec<String>,

    /// Path the process may write
    #[arg(long, value_name = "PATH")]
    allow_fs_write: Vec<String>,

    /// Keep child process spawning available
    #[arg(long)]
    allow_child_process: bool,

    /// Keep worker threads available
    #[arg(long)]
    allow_worker: bool,

    /// Runtime denial applied after startup, e.g. `fs.write=/etc,/var` or `child`
    #[arg(long, value_name = "LABEL[=RESOURCE,...]", value_parser = parse_deny)]
    deny: Vec<DenyRule>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a scope, optionally against one or more resources
    Check {
        /// Scope label (`fs`, `fs.read`, `fs.write`, `child`, `worker`)
        scope: PermissionScope,

        /// Resources to check; none means a scope-level check
        resources: Vec<String>,
    },

    /// Print the effective policy
    Show,
}

/// A `--deny` flag value
#[derive(Debug, Clone)]
struct DenyRule {
    scope: PermissionScope,
    params: Vec<String>,
}

fn parse_deny(value: &str) -> Result<DenyRule, PermissionError> {
    let (label, resources) = match value.split_once('=') {
        Some((label, resources)) => (label, resources),
        None => (value, ""),
    };
    let scope: PermissionScope = label.parse()?;
    let params = resources
        .split(',')
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    Ok(DenyRule { scope, params })
}

impl Args {
    fn cli_config(&self) -> PermissionConfig {
        PermissionConfig {
            enabled: self.experimental_permission,
            allow_fs: self.allow_fs.clone(),
            allow_fs_read: self.allow_fs_read.clone(),
            allow_fs_write: self.allow_fs_write.clone(),
            allow_child_process: self.allow_child_process,
            allow_worker: self.allow_worker,
        }
    }
}

fn load_config(args: &Args) -> Result<PermissionConfig> {
    let base = match &args.config {
        Some(path) => PermissionConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PermissionConfig::new(),
    };
    let config = base.merge(args.cli_config());
    config.validate()?;
    Ok(config)
}

fn print_check(permissions: &PermissionDispatcher, scope: PermissionScope, resource: &str) -> bool {
    let granted = permissions.is_granted(scope, resource);
    let verdict = if granted {
        "granted".green()
    } else {
        "denied".red()
    };
    if resource.is_empty() {
        println!("{} {}", scope.to_string().bold(), verdict);
    } else {
        println!("{} {} {}", scope.to_string().bold(), resource, verdict);
    }
    granted
}

fn show(permissions: &PermissionDispatcher) {
    let state = if permissions.is_enabled() {
        "enabled".green()
    } else {
        "disabled (everything granted)".yellow()
    };
    println!("{} {}", "permissions".bold(), state);

    for scope in [PermissionScope::FileSystemIn, PermissionScope::FileSystemOut] {
        let granted = permissions.filesystem().granted_paths(scope);
        let denied = permissions.filesystem().denied_paths(scope);
        println!(
            "{} {}",
            scope.to_string().bold(),
            if permissions.is_granted(scope, "") {
                "open".green()
            } else {
                "closed".red()
            }
        );
        for path in granted {
            println!("  + {}", path);
        }
        for path in denied {
            println!("  - {}", path.dimmed());
        }
    }

    for scope in [PermissionScope::ChildProcess, PermissionScope::WorkerThreads] {
        print_check(permissions, scope, "");
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    let _guard = logging::init_logging_with(format)?;

    let config = load_config(&args)?;
    tracing::debug!("Effective permission config: {:?}", config);

    let permissions = config.build();
    for rule in &args.deny {
        if !permissions.deny(rule.scope, &rule.params) {
            tracing::warn!("Deny for {} was not handled", rule.scope);
        }
    }

    match &args.command {
        Command::Check { scope, resources } => {
            let mut all_granted = true;
            if resources.is_empty() {
                all_granted = print_check(&permissions, *scope, "");
            } else {
                for resource in resources {
                    all_granted &= print_check(&permissions, *scope, resource);
                }
            }
            Ok(if all_granted {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Show => {
            show(&permissions);
            Ok(ExitCode::SUCCESS)
        }
    }
}
