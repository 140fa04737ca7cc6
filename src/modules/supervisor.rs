//! Session lifecycle: log in, run cycles, rebuild the session on transient faults.

use tracing::{error, info, warn};

use crate::modules::config::CycleConfig;
use crate::modules::context::Context;
use crate::modules::cycle::{CycleOutcome, run_cycle};
use crate::modules::error::{BotError, BotResult};
use crate::modules::inventory::Inventory;
use crate::modules::movement::Navigator;
use crate::modules::pacing::{Pace, Pacer};
use crate::modules::session::{Credentials, Remote, Session};
use crate::modules::stats::ActionTally;
use crate::modules::types::Location;

/// Opens a fresh remote handle for each session attempt.
pub trait Connector {
    fn connect(&mut self) -> BotResult<Box<dyn Remote>>;
}

impl<F> Connector for F
where
    F: FnMut() -> BotResult<Box<dyn Remote>>,
{
    fn connect(&mut self) -> BotResult<Box<dyn Remote>> {
        self()
    }
}

/// Hooks for persisting progress. Every method defaults to a no-op.
pub trait RunObserver {
    fn session_started(&mut self, _attempt: u32) {}
    fn cycle_finished(&mut self, _cycles: u64, _outcome: CycleOutcome, _tally: &ActionTally) {}
    fn session_lost(&mut self, _error: &BotError) {}
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Optional stopping points. Unset means run until killed or a fatal error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunLimits {
    pub sessions: Option<u32>,
    pub cycles: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sessions: u32,
    pub restarts: u32,
    pub cycles: u64,
}

/// Everything the supervisor borrows for the length of a run.
pub struct Collaborators<'a> {
    pub connector: &'a mut dyn Connector,
    pub inventory: &'a dyn Inventory,
    pub navigator: &'a mut dyn Navigator,
    pub pacer: &'a mut dyn Pacer,
    pub tally: &'a mut ActionTally,
    pub observer: &'a mut dyn RunObserver,
}

pub struct Supervisor<'a> {
    config: &'a CycleConfig,
    credentials: Credentials,
    limits: RunLimits,
}

impl<'a> Supervisor<'a> {
    pub fn new(config: &'a CycleConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            limits: RunLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Run session attempts until the cycle budget is spent or a fatal error.
    ///
    /// Transient errors from login or from inside a cycle start a new attempt
    /// after an exponential backoff. The backoff resets once an attempt gets
    /// through a cycle. Anything else is returned as fatal.
    pub fn run(&self, crew: &mut Collaborators<'_>) -> BotResult<RunSummary> {
        let mut summary = RunSummary::default();
        let mut consecutive_failures = 0u32;
        let mut position = self.config.home;

        loop {
            summary.sessions += 1;
            crew.observer.session_started(summary.sessions);
            info!(
                target: "session",
                attempt = summary.sessions,
                auth = ?self.config.auth,
                at = %position,
                "logging in"
            );

            let cycles_before = summary.cycles;
            let result = self.attempt(crew, &mut position, &mut summary);
            if summary.cycles > cycles_before {
                consecutive_failures = 0;
            }

            let err = match result {
                Ok(()) => return Ok(summary),
                Err(err) if err.is_transient() => err,
                Err(err) => {
                    error!(target: "session", error = %err, "fatal error; stopping");
                    return Err(err);
                }
            };

            crew.observer.session_lost(&err);
            if self
                .limits
                .sessions
                .is_some_and(|max| summary.sessions >= max)
            {
                warn!(target: "session", error = %err, "session lost; no attempts left");
                return Err(err);
            }

            summary.restarts += 1;
            consecutive_failures = consecutive_failures.saturating_add(1);
            let wait = self.config.pacing.session_backoff(consecutive_failures);
            warn!(
                target: "session",
                error = %err,
                retry_in_s = wait.as_secs(),
                "session lost; restarting"
            );
            crew.pacer.pause(Pace::SessionRetry(wait), wait);
        }
    }

    /// One session: connect, log in, then cycle until the budget runs out.
    fn attempt(
        &self,
        crew: &mut Collaborators<'_>,
        position: &mut Location,
        summary: &mut RunSummary,
    ) -> BotResult<()> {
        let remote = crew.connector.connect()?;
        let mut session = Session::new(remote, self.config.auth, *position);
        session.open(&self.credentials)?;
        info!(
            target: "session",
            endpoint = session.endpoint.as_deref().unwrap_or("-"),
            "logged in"
        );

        let mut ctx = Context {
            session: &mut session,
            inventory: crew.inventory,
            navigator: &mut *crew.navigator,
            pacer: &mut *crew.pacer,
            config: self.config,
            tally: &mut *crew.tally,
        };

        let result = loop {
            if self.limits.cycles.is_some_and(|max| summary.cycles >= max) {
                break Ok(());
            }
            match run_cycle(&mut ctx) {
                Ok(outcome) => {
                    summary.cycles += 1;
                    crew.observer
                        .cycle_finished(summary.cycles, outcome, ctx.tally);
                }
                Err(err) => break Err(err),
            }
        };
        *position = ctx.session.position;
        result
    }
}
