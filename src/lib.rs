// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod event;
pub mod exec;
pub mod logging;
pub mod output;
pub mod types;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, EngineArgs, ExecArgs, ScriptArgs};
use crate::config::{ConfigFile, load_or_default};
use crate::exec::{Invocation, Runner, RunnerOptions, event_channel, run_captured};
use crate::output::print_event;
use crate::types::OutputFormat;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - invocation building for the chosen subcommand
/// - the runner and the event printer
/// - Ctrl-C handling (cancels the running child)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref()).context("loading configuration")?;

    match &args.command {
        Command::Exec(exec) => {
            let invocation = exec_invocation(exec)?;
            let runner = Runner::new(runner_options(&cfg, exec.timeout));
            stream_run(&runner, invocation, args.format, args.dry_run).await
        }
        Command::Engine(engine) => {
            let invocation = engine_invocation(&cfg, engine)?;
            let runner = Runner::new(runner_options(&cfg, engine.timeout));
            stream_run(&runner, invocation, args.format, args.dry_run).await
        }
        Command::Script(script) => {
            let invocation = script_invocation(&cfg, script);
            let runner = Runner::new(runner_options(&cfg, script.timeout));
            captured_run(&runner, invocation, args.format, args.dry_run).await
        }
    }
}

fn runner_options(cfg: &ConfigFile, timeout: Option<std::time::Duration>) -> RunnerOptions {
    let mut options = cfg.runner.clone();
    if timeout.is_some() {
        options.timeout = timeout;
    }
    options
}

fn exec_invocation(args: &ExecArgs) -> Result<Invocation> {
    let Some((program, rest)) = args.command.split_first() else {
        bail!("exec needs a program to run");
    };
    let mut invocation = Invocation::new(program).args(rest);
    if let Some(dir) = &args.workdir {
        invocation = invocation.working_dir(dir);
    }
    Ok(invocation)
}

fn engine_invocation(cfg: &ConfigFile, args: &EngineArgs) -> Result<Invocation> {
    let executable = args
        .executable
        .clone()
        .or_else(|| cfg.engine.executable.clone())
        .context("no engine executable: pass --executable or set [engine].executable")?;
    let config_dir = args
        .engine_config
        .clone()
        .or_else(|| cfg.engine.config_dir.clone())
        .context("no engine config directory: pass --engine-config or set [engine].config_dir")?;

    let mut invocation = Invocation::engine(&executable, &config_dir, &args.config_name)?;
    if let Some(dir) = args.workdir.as_ref().or(cfg.engine.working_dir.as_ref()) {
        invocation = invocation.working_dir(dir);
    }
    Ok(invocation)
}

fn script_invocation(cfg: &ConfigFile, args: &ScriptArgs) -> Invocation {
    let interpreter = args
        .interpreter
        .clone()
        .unwrap_or_else(|| cfg.script.interpreter.clone());
    Invocation::script(interpreter, &args.script, &args.params)
}

/// Stream a run's events to the terminal until its terminal event.
async fn stream_run(
    runner: &Runner,
    invocation: Invocation,
    format: OutputFormat,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        print_dry_run(&invocation, runner.options());
        return Ok(());
    }

    info!(invocation = %invocation, "starting run");
    let (sink, stream) = event_channel();
    let mut handle = runner.start(invocation, sink)?;

    // Ctrl-C kills the child; the run still ends with a terminal event.
    if let Some(cancel) = handle.cancel_handle() {
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; cancelling run");
            cancel.cancel();
        });
    }

    let report = handle
        .follow(stream, |event| print_event(format, event))
        .await
        .context("writing run output")?;
    debug!(?report, "run report");
    report.into_result()?;
    Ok(())
}

/// Run to completion and print the collected stdout.
async fn captured_run(
    runner: &Runner,
    invocation: Invocation,
    format: OutputFormat,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        print_dry_run(&invocation, runner.options());
        return Ok(());
    }

    info!(invocation = %invocation, "running script");
    let captured = run_captured(runner, invocation).await?;

    match format {
        OutputFormat::Plain => print!("{}", captured.stdout),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "outcome": captured.report.outcome,
                "stdout": captured.stdout,
                "stderr": captured.stderr,
            });
            println!("{json}");
        }
    }
    Ok(())
}

/// Simple dry-run output: print what would be launched and how.
fn print_dry_run(invocation: &Invocation, options: &RunnerOptions) {
    println!("procrelay dry-run");
    println!("  program: {}", invocation.program().display());
    for arg in invocation.get_args() {
        println!("  arg: {}", arg.to_string_lossy());
    }
    match invocation.get_working_dir() {
        Some(dir) => println!("  working_dir: {}", dir.display()),
        None => println!("  working_dir: (inherited)"),
    }
    match options.timeout {
        Some(timeout) => println!("  timeout: {timeout:?}"),
        None => println!("  timeout: none"),
    }
    println!("  drain_grace: {:?}", options.drain_grace);
    println!("  platform policy: {}", crate::exec::default_policy().name());

    debug!("dry-run complete (no process started)");
}
