//! Main bot executable entry point.
//!
//! # Architecture
//!
//! The executable runs one behaviour, or a script of behaviours, on the
//! simulated robot:
//!
//!     - Initialise the session and logging
//!     - Load parameters, falling back to the defaults if there is no file
//!     - Build the simulated robot and the cycle runner
//!     - Start the duration timer, if any, which raises the stop signal
//!     - Run the behaviour(s)
//!     - Save the run summary to the session directory
//!
//! # Usage
//!
//!     bot_exec [--params <file>] [--max-cycles N] [--duration-s S]
//!              [--script <file>] [behaviour ...]
//!
//! With no behaviour and no script `wall-stand-off 20 5` is run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use bot_lib::{
    behaviour::{self, BehaviourCmd, BehaviourOutcome},
    ctrl::{CycleRunner, StopSignal},
    hw::sim::{Pose, SimBot},
    params::BotParams,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    script_interpreter::ScriptInterpreter,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Parameter file loaded from the params directory if `--params` isn't given.
const DEFAULT_PARAMS_FILE: &str = "bot_exec.toml";

/// Name of the summary file saved in the session directory.
const RUN_SUMMARY_FILE: &str = "run_summary.json";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "bot_exec", about = "Drive the two wheeled bot")]
struct Opts {
    /// Parameter file to load instead of `params/bot_exec.toml`.
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Maximum number of cycles for each control loop.
    #[structopt(long)]
    max_cycles: Option<u64>,

    /// Stop any control loop after this many seconds.
    #[structopt(long)]
    duration_s: Option<f64>,

    /// Behaviour script to run instead of a single behaviour.
    #[structopt(long, parse(from_os_str))]
    script: Option<PathBuf>,

    #[structopt(subcommand)]
    behaviour: Option<BehaviourCmd>,
}

/// Summary of the run, saved at exit.
#[derive(Debug, Serialize)]
struct RunSummary {
    timestamp: String,
    outcomes: Vec<BehaviourOutcome>,
    num_drive_cmds: usize,
    final_pose: Pose,
    sim_time_s: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    let opts = Opts::from_args();

    // Initialise session
    let session = Session::new(
        "bot_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("BaseBot Executable\n");
    info!("Running on: {}", host::get_host_info());
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let params: BotParams = match opts.params {
        Some(ref path) => util::params::load_from_path(path)
            .wrap_err_with(|| format!("Could not load params from {:?}", path))?,
        None => match util::params::load(DEFAULT_PARAMS_FILE) {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not load {} ({}), using defaults", DEFAULT_PARAMS_FILE, e);
                BotParams::default()
            }
        },
    };

    params.validate().wrap_err("Invalid parameters")?;

    info!("Exec parameters loaded");
    debug!("{:#?}", params);

    // ---- INITIALISE HARDWARE AND RUNNER ----

    let mut sim_params = params.sim.clone();

    // Without a limit a control loop only ends when the process is killed, so
    // pace it in real time.
    if opts.max_cycles.is_none() && opts.duration_s.is_none() && !sim_params.realtime {
        warn!("No cycle or duration limit given, running the simulation in real time");
        sim_params.realtime = true;
    }

    let mut bot = SimBot::new(params.geometry, sim_params);

    let stop = StopSignal::new();
    let mut runner = CycleRunner::new(stop.clone())
        .with_max_cycles(opts.max_cycles);

    if let Some(duration_s) = opts.duration_s {
        if !duration_s.is_finite() || duration_s < 0.0 {
            return Err(eyre!("Expected a positive duration, found {}", duration_s));
        }

        info!("Control loops will be stopped after {} s", duration_s);

        thread::spawn(move || {
            thread::sleep(Duration::from_secs_f64(duration_s));
            stop.stop();
        });
    }

    // ---- RUN ----

    let outcomes = match opts.script {
        Some(ref path) => {
            let mut si = ScriptInterpreter::new(path)
                .wrap_err("Failed to load script")?;

            info!(
                "Loaded script {:?} contains {} commands\n",
                si.script_path(),
                si.get_num_cmds()
            );

            behaviour::run_script(&mut si, &mut bot, &params, &mut runner)
                .wrap_err("Script failed")?
        }
        None => {
            let cmd = opts.behaviour.clone().unwrap_or_default();

            vec![
                behaviour::run(&cmd, &mut bot, &params, &mut runner)
                    .wrap_err_with(|| format!("Behaviour {} failed", cmd.name()))?
            ]
        }
    };

    // ---- SHUTDOWN ----

    let summary = RunSummary {
        timestamp: Utc::now().to_rfc3339(),
        outcomes,
        num_drive_cmds: bot.num_cmds(),
        final_pose: bot.pose(),
        sim_time_s: bot.sim_time_s(),
    };

    info!(
        "Run complete: {} drive commands over {:.02} s of simulated time",
        summary.num_drive_cmds,
        summary.sim_time_s
    );

    session.save(RUN_SUMMARY_FILE, summary);
    session.exit();

    Ok(())
}
