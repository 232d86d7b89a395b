//! Main waypoint updater executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Load the base path, if one is configured
//!     - Start the input client and the final waypoints server
//!     - Main loop, at the update frequency:
//!         - Snapshot the latest inputs
//!         - Locate the vehicle on the track
//!         - Build the lookahead lane and its speed profile
//!         - Publish the lane
//!
//! # Modules
//!
//! All modules (e.g. `wp_updater`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use structopt::StructOpt;

// Internal
use comms_if::net::NetParams;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};
use wpu_lib::{
    data_store::{DataStore, TrackUpdate},
    final_wps_server::FinalWpsServer,
    input_client::InputClient,
    path_loader,
    sched::Scheduler,
    wp_updater::{Params, WpUpdater},
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Waypoint updater executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "wpu_exec")]
struct Opts {
    /// Waypoint updater parameter file, relative to `$WPU_SW_ROOT/params`
    #[structopt(long, default_value = "wpu.toml")]
    params: String,

    /// Network parameter file, relative to `$WPU_SW_ROOT/params`
    #[structopt(long, default_value = "net.toml")]
    net_params: String,

    /// Load the base path from this CSV file instead of the one named in the parameters
    #[structopt(long, parse(from_os_str))]
    base_path: Option<PathBuf>,

    /// Only log at debug level and above
    #[structopt(long)]
    no_trace: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("wpu_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let min_level = if opts.no_trace {
        LevelFilter::Debug
    } else {
        LevelFilter::Trace
    };
    logger_init(min_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Waypoint Updater Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: Params = util::params::load(&opts.params)
        .wrap_err_with(|| format!("Could not load {}", opts.params))?;
    let net_params: NetParams = util::params::load(&opts.net_params)
        .wrap_err_with(|| format!("Could not load {}", opts.net_params))?;

    info!("Parameters loaded: {:#?}", params);
    info!("Network parameters: {:#?}", net_params);

    // ---- INITIALISE DATASTORE ----

    let ds = Arc::new(DataStore::with_saver(session.saver()));

    // Load the base path from file if there is one, the command line taking precedence
    let base_path = match (opts.base_path, params.base_path_csv.as_ref()) {
        (Some(p), _) => Some(p),
        (None, Some(p)) => Some(
            host::get_wpu_sw_root()
                .wrap_err("The software root environment variable (WPU_SW_ROOT) is not set")?
                .join(p),
        ),
        (None, None) => None,
    };

    match base_path {
        Some(path) => {
            info!("Loading base path from {:?}", path);
            let waypoints = path_loader::load_csv(&path, params.base_path_speed_ms)
                .wrap_err_with(|| format!("Failed to load the base path from {:?}", path))?;

            match ds
                .set_base_waypoints(waypoints, "world")
                .wrap_err("Failed to build the track")?
            {
                TrackUpdate::Built(_) => (),
                TrackUpdate::Unchanged => warn!("Track was already built"),
            }
        }
        None => info!("No base path file, waiting for the base waypoints on the input socket"),
    }

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut sched = Scheduler::new(params.update_frequency_hz)
        .wrap_err("Failed to initialise the scheduler")?;

    let mut wpu = WpUpdater::default();
    wpu.init(params, &session)
        .wrap_err("Failed to initialise WpUpdater")?;
    info!("WpUpdater init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let input_client = InputClient::new(&zmq_ctx, &net_params, ds.clone())
        .wrap_err("Failed to initialise the InputClient")?;
    info!("InputClient initialised");

    let mut final_wps_server = FinalWpsServer::new(&zmq_ctx, &net_params)
        .wrap_err("Failed to initialise the FinalWpsServer")?;
    info!("FinalWpsServer initialised");

    info!("Network initialisation complete");

    // ---- SHUTDOWN SIGNAL ----

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::Relaxed);
        })
        .map_err(|e| eyre!("Could not set the shutdown signal handler: {}", e))?;
    }

    // ---- MAIN LOOP ----

    let stats = sched.run(&ds, &mut wpu, &mut final_wps_server, &running);

    // ---- SHUTDOWN ----

    info!(
        "{} cycles executed, {} lanes published, {} cycles skipped, {} publish errors, \
         {} overruns",
        stats.num_cycles,
        stats.num_published,
        stats.num_skipped,
        stats.num_publish_errors,
        stats.num_overruns
    );
    session.save("cycle_stats.json", stats);

    drop(input_client);
    drop(final_wps_server);

    session.exit();

    info!("End of execution");

    Ok(())
}
