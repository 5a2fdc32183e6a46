use anyhow::Result;
use clap::{ArgGroup, Parser};
use solo_common::ProcessName;
use solo_process::{OsDriver, ProcessDriver, Verification};
use solo_registry::Registry;
use solo_supervisor::{
    supervise_foreground, KillOutcome, StartOptions, StartOutcome, StatusOutcome, Supervisor,
    WaitOutcome,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

/// Single-instance process supervision: at most one tracked process runs
/// under a logical name; starting a replacement kills the prior instance
/// after verifying it is truly the same process.
#[derive(Parser, Debug)]
#[command(name = "solo", version, about, long_about = None)]
#[command(group(
    ArgGroup::new("operation")
        .args(["kill", "kill_all", "status", "wait", "clean", "list", "logs"])
        .multiple(false)
))]
struct Args {
    /// Logical name of the tracked process
    #[arg(short, long)]
    name: Option<String>,

    /// Registry directory (default: .solo in the current directory)
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Kill the tracked process
    #[arg(long)]
    kill: bool,

    /// Kill every tracked process
    #[arg(long = "kill-all")]
    kill_all: bool,

    /// Report whether the tracked process is running
    #[arg(long)]
    status: bool,

    /// Wait until the tracked process exits
    #[arg(long)]
    wait: bool,

    /// Remove records of dead or stale processes
    #[arg(long)]
    clean: bool,

    /// List every tracked process
    #[arg(long)]
    list: bool,

    /// Print the tracked process's log
    #[arg(long)]
    logs: bool,

    /// On start: if a verified instance already runs, keep it (no restart)
    #[arg(long)]
    ensure: bool,

    /// On start: run detached with output captured to the log file
    #[arg(long)]
    daemon: bool,

    /// Grace period in milliseconds before force-killing
    #[arg(long, value_name = "MS", default_value_t = 5000,
          value_parser = clap::value_parser!(u64).range(1..))]
    grace: u64,

    /// Timeout in milliseconds for --wait (absent: wait indefinitely)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Number of log lines to print with --logs
    #[arg(long, value_name = "N", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..))]
    lines: u64,

    /// With --logs: keep following the log while the process runs
    #[arg(long)]
    follow: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Command to start (everything after the options)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    initialize_logging(args.debug);

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            1
        }
    };
    std::process::exit(code);
}

fn initialize_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<i32> {
    let registry = match &args.dir {
        Some(dir) => Registry::new(dir),
        None => Registry::in_current_dir(),
    };
    let supervisor = Supervisor::with_os_driver(registry);
    let grace = Duration::from_millis(args.grace);

    if args.kill_all {
        return op_kill_all(&supervisor, grace).await;
    }
    if args.clean {
        return op_clean(&supervisor).await;
    }
    if args.list {
        return op_list(&supervisor).await;
    }

    // Everything else is name-scoped.
    let name = required_name(&args)?;

    if args.kill {
        op_kill(&supervisor, &name, grace).await
    } else if args.status {
        op_status(&supervisor, &name).await
    } else if args.wait {
        op_wait(&supervisor, &name, args.timeout).await
    } else if args.logs {
        op_logs(&supervisor, &name, args.lines as usize, args.follow).await
    } else {
        op_start(&supervisor, &name, &args, grace).await
    }
}

fn required_name(args: &Args) -> Result<ProcessName> {
    let raw = args
        .name
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("this operation requires --name"))?;
    Ok(ProcessName::new(raw)?)
}

async fn op_start(
    supervisor: &Supervisor<OsDriver>,
    name: &ProcessName,
    args: &Args,
    grace: Duration,
) -> Result<i32> {
    if args.command.is_empty() {
        anyhow::bail!("start requires a command, e.g.: solo --name {} --daemon -- my-server", name);
    }

    let opts = StartOptions {
        command: args.command.clone(),
        ensure_only: args.ensure,
        daemon: args.daemon,
        grace,
    };

    match supervisor.start(name, opts).await? {
        StartOutcome::AlreadyRunning { pid } => {
            println!("{}: already running (pid {})", name, pid);
            Ok(0)
        }
        StartOutcome::Started { pid, child: None } => {
            println!("{}: started (pid {})", name, pid);
            Ok(0)
        }
        StartOutcome::Started {
            child: Some(child), ..
        } => {
            // Foreground: stay attached and mirror the child's exit code.
            let code = supervise_foreground(supervisor, name, child).await?;
            Ok(code)
        }
    }
}

async fn op_kill(
    supervisor: &Supervisor<OsDriver>,
    name: &ProcessName,
    grace: Duration,
) -> Result<i32> {
    match supervisor.kill(name, grace).await? {
        KillOutcome::NothingToKill => {
            println!("{}: nothing to kill", name);
            Ok(0)
        }
        KillOutcome::RemovedDead { pid } => {
            println!("{}: was not running (pid {}), record removed", name, pid);
            Ok(0)
        }
        KillOutcome::RemovedStale { pid } => {
            println!(
                "{}: pid {} belongs to a different process, record removed",
                name, pid
            );
            Ok(0)
        }
        KillOutcome::Killed { pid } => {
            println!("{}: killed (pid {})", name, pid);
            Ok(0)
        }
        KillOutcome::Failed { pid } => {
            eprintln!("{}: failed to kill pid {}", name, pid);
            Ok(1)
        }
    }
}

async fn op_kill_all(supervisor: &Supervisor<OsDriver>, grace: Duration) -> Result<i32> {
    let report = supervisor.kill_all(grace).await?;
    if report.outcomes.is_empty() {
        println!("nothing tracked");
        return Ok(0);
    }
    for (name, outcome) in &report.outcomes {
        match outcome {
            KillOutcome::Killed { pid } => println!("{}: killed (pid {})", name, pid),
            KillOutcome::RemovedDead { pid } => {
                println!("{}: was not running (pid {}), record removed", name, pid)
            }
            KillOutcome::RemovedStale { pid } => println!(
                "{}: pid {} belongs to a different process, record removed",
                name, pid
            ),
            KillOutcome::Failed { pid } => eprintln!("{}: failed to kill pid {}", name, pid),
            KillOutcome::NothingToKill => {}
        }
    }
    Ok(if report.all_clean() { 0 } else { 1 })
}

async fn op_status(supervisor: &Supervisor<OsDriver>, name: &ProcessName) -> Result<i32> {
    match supervisor.status(name).await {
        StatusOutcome::Running { pid } => {
            println!("{}: running (pid {})", name, pid);
            Ok(0)
        }
        StatusOutcome::NotTracked => {
            println!("{}: not running", name);
            Ok(1)
        }
        StatusOutcome::Stopped { pid } => {
            println!("{}: not running (last pid {})", name, pid);
            Ok(1)
        }
        StatusOutcome::StalePid { pid } => {
            println!(
                "{}: not running (pid {} now belongs to a different process)",
                name, pid
            );
            Ok(1)
        }
    }
}

async fn op_wait(
    supervisor: &Supervisor<OsDriver>,
    name: &ProcessName,
    timeout_ms: Option<u64>,
) -> Result<i32> {
    let timeout = timeout_ms.map(Duration::from_millis);
    match supervisor.wait_for_exit(name, timeout).await? {
        WaitOutcome::Exited => {
            println!("{}: exited", name);
            Ok(0)
        }
        WaitOutcome::TimedOut => {
            eprintln!("{}: still running after timeout", name);
            Ok(1)
        }
    }
}

async fn op_clean(supervisor: &Supervisor<OsDriver>) -> Result<i32> {
    let report = supervisor.clean().await?;
    for name in &report.removed {
        println!("{}: removed", name);
    }
    println!("removed {}, kept {}", report.removed.len(), report.kept);
    Ok(0)
}

async fn op_list(supervisor: &Supervisor<OsDriver>) -> Result<i32> {
    let entries = supervisor.list().await?;
    if entries.is_empty() {
        println!("nothing tracked");
        return Ok(0);
    }
    for entry in entries {
        let state = match entry.verification {
            Verification::Verified => "running",
            Verification::Dead => "stopped",
            Verification::Stale => "stale (pid reused)",
        };
        println!(
            "{:<24} {:>8}  {}",
            entry.record.name, entry.record.pid, state
        );
    }
    Ok(0)
}

async fn op_logs(
    supervisor: &Supervisor<OsDriver>,
    name: &ProcessName,
    lines: usize,
    follow: bool,
) -> Result<i32> {
    let log_path = supervisor.registry().log_path(name);

    for line in solo_logfile::tail_lines(&log_path, lines).await? {
        println!("{}", line);
    }
    if !follow {
        return Ok(0);
    }

    // Follow until the tracked process is gone or no longer tracked.
    let Some(record) = supervisor.registry().read(name).await else {
        return Ok(0);
    };
    let driver = *supervisor.driver();
    let pid_path = supervisor.registry().pid_path(name);
    solo_logfile::follow(
        &log_path,
        |line| println!("{}", line),
        move || pid_path.exists() && driver.is_alive(record.pid),
    )
    .await?;
    Ok(0)
}
