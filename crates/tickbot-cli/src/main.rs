//! `tickbot-cli` – tickbot Command Line Interface
//!
//! Runs the robot control core against a simulated robot:
//!
//! 1. Loads `~/.tickbot/config.toml` (or `--config`), falling back to
//!    defaults, with `TICKBOT_*` environment overrides applied.
//! 2. `run` builds simulated motors, drivetrain and cameras, then ticks the
//!    robot at the configured loop period through autonomous and/or teleop.
//! 3. Intercepts **Ctrl-C** to disable the robot and exit cleanly.
//! 4. `config` prints the effective configuration, or writes it with
//!    `--write`.

mod config;
mod run;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tickbot_runtime::AutoPath;
use tickbot_types::TeleopInput;
use tracing::warn;

use run::{Plan, RunOptions, RunReport};

/// Parse an autonomous routine name ("path1", "path2", "path3").
fn parse_path(s: &str) -> Result<AutoPath, String> {
    s.parse().map_err(|e: tickbot_types::RobotError| e.to_string())
}

/// Robot control core, simulated
#[derive(Parser, Debug)]
#[command(name = "tickbot")]
#[command(about = "Tick-driven robot control core running against a simulated robot")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.tickbot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the simulated robot
    Run {
        /// Modes to run through
        #[arg(long, value_enum, default_value_t = Plan::Both)]
        mode: Plan,

        /// Autonomous routine, overriding the configured one
        #[arg(long, value_parser = parse_path)]
        path: Option<AutoPath>,

        /// Length of the run in seconds
        #[arg(long, default_value_t = 15.0)]
        seconds: f64,

        /// Left stick X held during teleop
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        drive_x: f64,

        /// Left stick Y held during teleop (negative is forward)
        #[arg(long, default_value_t = -0.5, allow_negative_numbers = true)]
        drive_y: f64,

        /// Right stick X held during teleop
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        turn: f64,

        /// Tick as fast as possible instead of holding the loop period
        #[arg(long)]
        fast: bool,

        /// Write the final diagnostics table as JSON
        #[arg(long)]
        dump_log: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Save it to the config file
        #[arg(long)]
        write: bool,
    },
}

fn main() {
    let args = Args::parse();

    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); TICKBOT_LOG_FORMAT=json switches to
    // JSON lines; OTEL_EXPORTER_OTLP_ENDPOINT enables span export.
    let tracer = tickbot_runtime::init_tracing("tickbot");

    let cfg = match config::load_or_default(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            drop(tracer);
            std::process::exit(2);
        }
    };

    let code = match args.command {
        Command::Config { write } => show_config(&cfg, args.config.as_deref(), write),
        Command::Run {
            mode,
            path,
            seconds,
            drive_x,
            drive_y,
            turn,
            fast,
            dump_log,
        } => {
            let opts = RunOptions {
                plan: mode,
                path,
                seconds,
                input: TeleopInput::new(drive_x, drive_y, turn, 0.0),
                realtime: !fast,
            };
            run_robot(&cfg, &opts, dump_log)
        }
    };
    // Flush spans before exit skips destructors.
    drop(tracer);
    std::process::exit(code);
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommands
// ─────────────────────────────────────────────────────────────────────────────

fn show_config(cfg: &config::Config, path: Option<&std::path::Path>, write: bool) -> i32 {
    if write {
        return match config::save(cfg, path) {
            Ok(written) => {
                println!(
                    "  {} Config saved to {}",
                    "✓".green().bold(),
                    written.display().to_string().bold()
                );
                0
            }
            Err(e) => {
                eprintln!("{}: {}", "Error saving config".red(), e);
                1
            }
        };
    }
    match config::to_toml(cfg) {
        Ok(raw) => {
            print!("{raw}");
            0
        }
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            1
        }
    }
}

fn run_robot(cfg: &config::Config, opts: &RunOptions, dump_log: Option<PathBuf>) -> i32 {
    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – disabling robot …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run can only end on its own");
    }

    let mut robot = match run::build_sim_robot(cfg) {
        Ok(robot) => robot,
        Err(e) => {
            eprintln!("{}: {}", "Boot failed".red(), e);
            return 1;
        }
    };

    println!(
        "  {} {:?} for {:.1} s at {} ms/tick",
        "Running".bold().cyan(),
        opts.plan,
        opts.seconds,
        cfg.robot.loop_period_ms
    );
    let report = run::run(&mut robot, opts, &shutdown);
    print_summary(&report);

    if let Some(path) = dump_log {
        let written = robot
            .recorder()
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("  Diagnostics written to {}", path.display().to_string().bold()),
            Err(e) => {
                eprintln!("{}: {}", "Failed to write diagnostics".red(), e);
                return 1;
            }
        }
    }
    if report.halted > 0 { 1 } else { 0 }
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary
// ─────────────────────────────────────────────────────────────────────────────

fn print_summary(report: &RunReport) {
    println!();
    if report.interrupted {
        println!("  {} after {} ticks", "Interrupted".yellow().bold(), report.ticks);
    } else {
        println!("  {} {} ticks", "Completed".green().bold(), report.ticks);
    }
    if report.overruns > 0 {
        println!("  Loop overruns: {}", report.overruns.to_string().yellow());
    }
    match report.auto_path {
        Some(path) if report.auto_finished => {
            println!("  Autonomous {}: {}", path.to_string().bold(), "finished".green());
        }
        Some(path) => {
            println!("  Autonomous {}: {}", path.to_string().bold(), "incomplete".yellow());
        }
        None => {}
    }
    println!(
        "  Vision: {} accepted, {} rejected",
        report.vision_accepted.to_string().green(),
        report.vision_rejected.to_string().dimmed()
    );
    println!(
        "  Pose estimate ({:.2}, {:.2}, {:.1}°), truth ({:.2}, {:.2}), error {:.3} m",
        report.estimate.x,
        report.estimate.y,
        report.estimate.rotation_rad.to_degrees(),
        report.truth.x,
        report.truth.y,
        report.estimate_error()
    );
    if report.halted > 0 {
        println!("  {} {} unit(s) halted", "✗".red().bold(), report.halted);
    }
    println!();
}
