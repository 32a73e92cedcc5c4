//! Main motion control executable entry point.
//!
//! # Architecture
//!
//! The executable drives the motion control core from a script of timed
//! event messages, against simulated equipment:
//!
//!     - Initialise the session, logging and parameters
//!     - Build the equipment and the motion controller, then enable it
//!     - Script feeder thread:
//!         - Release each scripted message once its time has come
//!         - Cancel any running heading alignment on stop and bumper events
//!     - Control thread:
//!         - Dispatch each released message to the motion controller
//!         - Archive the controller status
//!     - Close the controller at the end of the script or on shutdown
//!
//! Usage: `moco_exec [--log-level <level>] <script>`, with `MOCO_SW_ROOT`
//! pointing at the software root holding `params/` and `sessions/`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, error, info, warn};
use structopt::StructOpt;

// Internal
use comms_if::evt::{EventGroup, Message};
use moco_lib::{
    head_ctrl::{self, CancelToken},
    motion_ctrl::{self, MotionCtrl},
    sim::{self, SimEquipment},
    steer_ctrl,
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingMessages, ScriptError, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Period at which the feeder checks the script for due messages.
const FEED_PERIOD: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options
#[derive(Debug, StructOpt)]
#[structopt(
    name = "moco_exec", 
    about = "Runs the motion control core from a script of event messages"
)]
struct Opt {
    /// Path to the event script
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Minimum log level, must be at least as verbose as info
    #[structopt(short, long, default_value = "debug")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new(
        "moco_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    logger_init(opt.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Motion Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let steer_params: steer_ctrl::Params = util::params::load("steer_ctrl.toml")
        .wrap_err("Could not load steering control params")?;
    let head_params: head_ctrl::Params = util::params::load("head_ctrl.toml")
        .wrap_err("Could not load heading control params")?;
    let motion_params: motion_ctrl::Params = util::params::load("motion_ctrl.toml")
        .wrap_err("Could not load motion control params")?;
    let sim_params: sim::Params = util::params::load("sim.toml")
        .wrap_err("Could not load simulated equipment params")?;

    info!("Exec parameters loaded");

    // ---- LOAD SCRIPT ----

    info!("Loading script from {:?}", opt.script);

    let script = ScriptInterpreter::new(&opt.script)
        .wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasting {:.2} s with {} messages\n",
        script.get_duration(),
        script.get_num_msgs()
    );

    // ---- INITIALISE MODULES ----

    let sim_eqpt = SimEquipment::new(&sim_params);

    let mut motion_ctrl = MotionCtrl::new(
        motion_params,
        steer_params,
        head_params,
        sim_eqpt.equipment()
    ).wrap_err("Failed to initialise motion control")?;

    motion_ctrl.init_archive(&session)
        .wrap_err("Failed to initialise the motion control archive")?;

    motion_ctrl.enable()
        .wrap_err("Failed to enable motion control")?;

    info!("Initialisation complete\n");

    // ---- START SCRIPT FEEDER ----

    let (tx, rx) = mpsc::channel();
    let feeder_run = Arc::new(AtomicBool::new(true));
    let feeder_run_clone = feeder_run.clone();
    let cancel = motion_ctrl.cancel_token();

    let feeder = thread::Builder::new()
        .name("script-feeder".into())
        .spawn(move || feed_script(script, tx, cancel, feeder_run_clone))
        .wrap_err("Failed to start the script feeder")?;

    // ---- CONTROL LOOP ----

    // Ends once the feeder has dropped its sender at the end of the script
    for msg in rx.iter() {
        if let Err(e) = motion_ctrl.dispatch(&msg) {
            error!("Error handling {:?}: {}", msg.event, e);
        }

        if let Err(e) = motion_ctrl.write() {
            warn!("Could not archive motion control status: {}", e);
        }

        if motion_ctrl.is_closed() {
            info!("Motion control closed, ending execution");
            break;
        }
    }

    // ---- SHUTDOWN ----

    feeder_run.store(false, Ordering::Relaxed);
    drop(rx);

    match feeder.join() {
        Ok(r) => r.wrap_err("Script feeder failed")?,
        Err(_) => return Err(eyre!("The script feeder panicked"))
    }

    if !motion_ctrl.is_closed() {
        motion_ctrl.close()
            .wrap_err("Failed to close motion control")?;
    }

    info!("End of execution");

    Ok(())
}

/// Body of the script feeder thread.
///
/// Sends each message once its time has come. Stop and bumper messages also
/// cancel a running heading alignment, since the control thread is blocked
/// until the alignment ends.
fn feed_script(
    mut script: ScriptInterpreter,
    tx: Sender<Message>,
    cancel: CancelToken,
    run: Arc<AtomicBool>
) -> Result<(), ScriptError> {
    while run.load(Ordering::Relaxed) {
        match script.get_pending()? {
            PendingMessages::Some(msgs) => {
                for msg in msgs {
                    match msg.event.group() {
                        EventGroup::Stop | EventGroup::Bumper => cancel.cancel(),
                        _ => ()
                    }

                    // Receiver gone, the control loop has ended
                    if tx.send(msg).is_err() {
                        return Ok(());
                    }
                }
            },
            PendingMessages::None => (),
            PendingMessages::EndOfScript => {
                info!("End of script reached");
                break;
            }
        }

        thread::sleep(FEED_PERIOD);
    }

    Ok(())
}
