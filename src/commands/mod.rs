use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use fieldrunner::{
    ActionTally, AuthMode, Collaborators, Credentials, CycleConfig, GatewayConnector,
    InventoryLedger, Location, RunLimits, SleepPacer, StateRecorder, StraightLineWalker,
    Supervisor, load_tally, reset_tally, save_tally,
    state::{self, Status},
};

mod config;

use config::{ConfigCommand, run_config};

const PID_FILE: &str = ".fieldrunner/runtime.pid";
const LOG_FILE: &str = ".fieldrunner/runtime.log";

#[derive(Parser)]
#[command(
    name = "fieldrunner",
    version,
    about = "Field bot: catches, farms checkpoints, and tidies the inventory on a loop",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize local state and write a default config
    Init,
    /// Log in and run cycles until stopped
    Start {
        /// Starting latitude (defaults to the configured home)
        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,
        /// Starting longitude (defaults to the configured home)
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,
        /// Walking speed in km/h
        #[arg(long)]
        speed: Option<f64>,
        /// Stop after this many cycles (omit for continuous)
        #[arg(short = 'c', long)]
        cycles: Option<u64>,
        /// Give up after this many session attempts (omit to retry forever)
        #[arg(long)]
        sessions: Option<u32>,
        /// Password (ptc) or refresh token (google); also reads FIELDRUNNER_SECRET
        #[arg(long)]
        secret: Option<String>,
        /// Run in the foreground (default is background)
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        foreground: bool,
        /// Internal flag for background child process (do not use directly)
        #[arg(long, hide = true, default_value_t = false)]
        background_child: bool,
    },
    /// Show runtime status
    Status,
    /// Mark the runtime as stopped
    Stop,
    /// Inspect or edit the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// `start` overrides layered over the config file.
#[derive(Clone, Debug, Default)]
struct StartArgs {
    lat: Option<f64>,
    lng: Option<f64>,
    speed: Option<f64>,
    cycles: Option<u64>,
    sessions: Option<u32>,
    secret: Option<String>,
}

impl StartArgs {
    fn apply(&self, cfg: &mut CycleConfig) {
        if let (Some(lat), Some(lng)) = (self.lat, self.lng) {
            cfg.home = Location::new(lat, lng);
        }
        if let Some(speed) = self.speed {
            cfg.walking_speed_kmh = speed;
        }
    }

    fn limits(&self) -> RunLimits {
        RunLimits {
            sessions: self.sessions,
            cycles: self.cycles,
        }
    }
}

pub fn run() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli.command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn dispatch(command: Command) -> Result<(), String> {
    match command {
        Command::Init => run_init(),
        Command::Start {
            lat,
            lng,
            speed,
            cycles,
            sessions,
            secret,
            foreground,
            background_child,
        } => run_start(
            StartArgs {
                lat,
                lng,
                speed,
                cycles,
                sessions,
                secret,
            },
            foreground,
            background_child,
        ),
        Command::Status => run_status(),
        Command::Stop => run_stop(),
        Command::Config { command } => run_config(command),
    }
}

fn run_init() -> Result<(), String> {
    state::init_state().map_err(|e| e.to_string())?;
    let cfg = fieldrunner::config::load().map_err(|e| e.to_string())?;
    fieldrunner::config::save(&cfg).map_err(|e| e.to_string())?;
    reset_tally().map_err(|e| e.to_string())?;
    println!(
        "Initialized state at {}",
        state::state_file_path().display()
    );
    println!("Config at {}", fieldrunner::config::config_file_path().display());
    if cfg.username.is_empty() {
        println!("Next: `fieldrunner config account --username <name>`");
    }
    Ok(())
}

fn run_status() -> Result<(), String> {
    match state::load_state().map_err(|e| e.to_string())? {
        None => {
            println!("Status: not initialized. Run `fieldrunner init`.");
        }
        Some(state) => {
            println!(
                "Status: {:?} | sessions={} | cycles={} | updated={} | message={}",
                state.status,
                state.sessions_started,
                state.cycles_completed,
                state.updated_at.as_deref().unwrap_or("-"),
                state.message.unwrap_or_else(|| "-".into())
            );
            print_tally()?;
        }
    }
    Ok(())
}

fn run_stop() -> Result<(), String> {
    if state::load_state().map_err(|e| e.to_string())?.is_none() {
        return Err("Not initialized. Run `fieldrunner init` first.".into());
    }
    let halt = halt_background(Path::new(PID_FILE));
    let written = state::set_status(Status::Stopped, Some("stopped by user".into()))
        .map_err(|e| e.to_string())?;
    println!(
        "Stopped: {}. Wrote {} (status={:?} sessions={} cycles={} updated={}).",
        halt,
        state::state_file_path().display(),
        written.status,
        written.sessions_started,
        written.cycles_completed,
        written.updated_at.as_deref().unwrap_or("-")
    );
    print_tally()
}

fn run_start(args: StartArgs, foreground: bool, background_child: bool) -> Result<(), String> {
    let background = !foreground;
    if background && !background_child {
        return launch_background_start(&args);
    }

    let mut cfg = fieldrunner::config::load().map_err(|e| e.to_string())?;
    args.apply(&mut cfg);
    cfg.validate()?;
    let secret = fieldrunner::config::resolve_secret(args.secret.clone()).ok_or_else(|| {
        format!(
            "no secret found; pass --secret, set {}, or write .fieldrunner/.secret",
            fieldrunner::config::SECRET_ENV
        )
    })?;

    init_tracing();

    let prior = match state::load_state().map_err(|e| e.to_string())? {
        Some(s) => Some(s),
        None => {
            let initialized = state::init_state().map_err(|e| e.to_string())?;
            println!(
                "State not found; initialized new state at {} (status={:?})",
                state::state_file_path().display(),
                initialized.status
            );
            Some(initialized)
        }
    };
    reset_tally().map_err(|e| format!("reset tally: {}", e))?;

    let credentials = Credentials {
        auth: cfg.auth,
        username: cfg.username.clone(),
        secret,
    };
    if cfg.auth == AuthMode::Google {
        tracing::info!(target: "session", "using google refresh token");
    }

    let mut connector = GatewayConnector::from_config(&cfg);
    let inventory = InventoryLedger;
    let mut navigator = StraightLineWalker::new(&cfg.pacing, None);
    let mut pacer = SleepPacer::new();
    let mut tally = ActionTally::default();
    let mut recorder = StateRecorder::new(prior);

    let result = {
        let mut crew = Collaborators {
            connector: &mut connector,
            inventory: &inventory,
            navigator: &mut navigator,
            pacer: &mut pacer,
            tally: &mut tally,
            observer: &mut recorder,
        };
        Supervisor::new(&cfg, credentials)
            .with_limits(args.limits())
            .run(&mut crew)
    };

    if let Err(err) = save_tally(&tally) {
        eprintln!("warning: failed to save action tally: {}", err);
    }
    let message = match &result {
        Ok(summary) => format!(
            "finished after {} cycle(s), {} restart(s)",
            summary.cycles, summary.restarts
        ),
        Err(err) => format!("stopped on error: {}", err),
    };
    state::set_status(Status::Stopped, Some(message.clone())).map_err(|e| e.to_string())?;
    println!("{}", message);
    println!("{} paced={}s", tally.summary(), pacer.total_slept().as_secs());

    result.map(|_| ()).map_err(|e| e.to_string())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_tally() -> Result<(), String> {
    let tally = load_tally().map_err(|e| e.to_string())?;
    if tally == ActionTally::default() {
        println!("No actions recorded.");
        return Ok(());
    }
    println!("Actions: {}", tally.summary());
    Ok(())
}

fn launch_background_start(args: &StartArgs) -> Result<(), String> {
    let exe = env::current_exe().map_err(|e| format!("current_exe: {}", e))?;
    let mut argv = render_start_args(args);
    argv.push("--background-child".into());

    let log_path = PathBuf::from(LOG_FILE);
    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let log = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("failed to open log file {}: {}", log_path.display(), e))?;

    let mut command = std::process::Command::new(exe);
    command
        .args(&argv)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::from(log));
    // Keep the secret off the child's command line.
    if let Some(secret) = &args.secret {
        command.env(fieldrunner::config::SECRET_ENV, secret);
    }
    let child = command
        .spawn()
        .map_err(|e| format!("failed to spawn background process: {}", e))?;

    let pid_path = PathBuf::from(PID_FILE);
    fs::write(&pid_path, format!("{}", child.id()))
        .map_err(|e| format!("failed to write pid file {}: {}", pid_path.display(), e))?;

    println!(
        "Started background bot (pid={}). Logs in {}. Stop with `fieldrunner stop`.",
        child.id(),
        log_path.display()
    );
    Ok(())
}

fn render_start_args(args: &StartArgs) -> Vec<String> {
    let mut argv = vec!["start".to_string()];
    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        argv.push("--lat".into());
        argv.push(lat.to_string());
        argv.push("--lng".into());
        argv.push(lng.to_string());
    }
    if let Some(speed) = args.speed {
        argv.push("--speed".into());
        argv.push(speed.to_string());
    }
    if let Some(cycles) = args.cycles {
        argv.push("--cycles".into());
        argv.push(cycles.to_string());
    }
    if let Some(sessions) = args.sessions {
        argv.push("--sessions".into());
        argv.push(sessions.to_string());
    }
    argv
}

/// What `stop` found behind the pid file left by a background start.
#[derive(Debug, PartialEq, Eq)]
enum BackgroundHalt {
    NoPidFile,
    Signalled(u32),
    /// `kill` refused; the pid file is kept so a retry can find it.
    Refused(u32),
    Unreadable(String),
}

impl fmt::Display for BackgroundHalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackgroundHalt::NoPidFile => write!(f, "no background bot recorded"),
            BackgroundHalt::Signalled(pid) => write!(f, "signalled background bot pid={}", pid),
            BackgroundHalt::Refused(pid) => write!(
                f,
                "could not signal pid={}; delete {} once it has exited",
                pid, PID_FILE
            ),
            BackgroundHalt::Unreadable(reason) => write!(f, "ignored pid file: {}", reason),
        }
    }
}

fn read_pid(path: &Path) -> Result<Option<u32>, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(format!("read {}: {}", path.display(), err)),
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| format!("{} holds {:?}, not a pid", path.display(), raw.trim()))
}

fn halt_background(pid_path: &Path) -> BackgroundHalt {
    let pid = match read_pid(pid_path) {
        Ok(Some(pid)) => pid,
        Ok(None) => return BackgroundHalt::NoPidFile,
        Err(reason) => return BackgroundHalt::Unreadable(reason),
    };
    let delivered = std::process::Command::new("kill")
        .arg(pid.to_string())
        .status()
        .is_ok_and(|status| status.success());
    if !delivered {
        return BackgroundHalt::Refused(pid);
    }
    if let Err(err) = fs::remove_file(pid_path) {
        eprintln!("warning: could not remove {}: {}", pid_path.display(), err);
    }
    BackgroundHalt::Signalled(pid)
}
