use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::modules::cycle::CycleOutcome;
use crate::modules::error::BotError;
use crate::modules::stats::{ActionTally, save_tally};
use crate::modules::supervisor::RunObserver;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Status {
    Initialized,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeState {
    pub status: Status,
    #[serde(default)]
    pub sessions_started: u32,
    #[serde(default)]
    pub cycles_completed: u64,
    pub message: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            status: Status::Initialized,
            sessions_started: 0,
            cycles_completed: 0,
            message: None,
            updated_at: None,
        }
    }
}

impl RuntimeState {
    fn touch(&mut self) {
        self.updated_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    }
}

fn state_dir() -> PathBuf {
    PathBuf::from(".fieldrunner")
}

fn state_path() -> PathBuf {
    state_dir().join("state.json")
}

pub fn state_file_path() -> PathBuf {
    state_path()
}

pub fn init_state() -> io::Result<RuntimeState> {
    let mut state = RuntimeState::default();
    state.touch();
    save_state(&state)?;
    Ok(state)
}

pub fn load_state() -> io::Result<Option<RuntimeState>> {
    let path = state_path();
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Ok(None);
    }

    let state: RuntimeState = serde_json::from_slice(&bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "failed to parse state file {}; delete it or run `fieldrunner init` to reset: {}",
                state_path().display(),
                e
            ),
        )
    })?;
    Ok(Some(state))
}

pub fn save_state(state: &RuntimeState) -> io::Result<()> {
    let dir = state_dir();
    fs::create_dir_all(&dir)?;
    let json = serde_json::to_vec_pretty(state)?;
    fs::write(state_path(), json)?;
    Ok(())
}

pub fn set_status(status: Status, message: Option<String>) -> io::Result<RuntimeState> {
    let mut state = load_state()?.unwrap_or_default();
    state.status = status;
    state.message = message;
    state.touch();
    save_state(&state)?;
    Ok(state)
}

/// Mirrors run progress into `state.json` and `tally.json`.
///
/// Write failures are logged and never interrupt the run.
#[derive(Debug)]
pub struct StateRecorder {
    state: RuntimeState,
}

impl StateRecorder {
    pub fn new(prior: Option<RuntimeState>) -> Self {
        let mut state = prior.unwrap_or_default();
        state.status = Status::Running;
        state.sessions_started = 0;
        state.cycles_completed = 0;
        Self { state }
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    fn persist(&mut self, message: String) {
        self.state.message = Some(message);
        self.state.touch();
        if let Err(err) = save_state(&self.state) {
            warn!(target: "session", error = %err, "failed to save runtime state");
        }
    }
}

impl RunObserver for StateRecorder {
    fn session_started(&mut self, attempt: u32) {
        self.state.sessions_started = attempt;
        self.persist(format!("session {attempt} logging in"));
    }

    fn cycle_finished(&mut self, cycles: u64, outcome: CycleOutcome, tally: &ActionTally) {
        self.state.cycles_completed = cycles;
        let message = match outcome {
            CycleOutcome::Completed => format!("cycle {cycles} completed"),
            CycleOutcome::Faulted => format!("cycle {cycles} ended early"),
        };
        self.persist(message);
        if let Err(err) = save_tally(tally) {
            warn!(target: "session", error = %err, "failed to save action tally");
        }
    }

    fn session_lost(&mut self, error: &BotError) {
        self.persist(format!("session lost: {error}"));
    }
}
