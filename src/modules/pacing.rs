//! Fixed pacing between remote calls.
//!
//! The delays double as the only rate limiting against the remote service,
//! so every wait in the core goes through a [`Pacer`] with a named [`Pace`].
//! Defaults match the cadence the bot has always used.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Named pause points in the decision pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pace {
    AfterThrow,
    AfterCaptureAid,
    AfterEvolve,
    AfterTransfer,
    AfterRecycle,
    CheckpointSettle,
    ApproachNear,
    ApproachFar,
    EncounterPassEnd,
    StatusDisplay,
    CycleEnd,
    WalkStep,
    /// Wait before the next session attempt; carries the backoff already computed.
    SessionRetry(Duration),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSchedule {
    pub after_throw_ms: u64,
    pub after_capture_aid_ms: u64,
    pub after_evolve_ms: u64,
    pub after_transfer_ms: u64,
    pub after_recycle_ms: u64,
    pub checkpoint_settle_ms: u64,
    pub approach_near_ms: u64,
    pub approach_far_ms: u64,
    /// Sightings farther than this are approached with the long wait.
    pub far_threshold_m: f64,
    pub encounter_pass_end_ms: u64,
    pub status_display_ms: u64,
    pub cycle_end_ms: u64,
    pub session_retry_ms: u64,
    pub session_retry_max_ms: u64,
    /// Simulated travel advances in steps of this length.
    pub walk_step_ms: u64,
    /// Travel time between encounter passes while walking.
    pub walk_scan_every_ms: u64,
}

impl Default for PacingSchedule {
    fn default() -> Self {
        Self {
            after_throw_ms: 2_000,
            after_capture_aid_ms: 3_000,
            after_evolve_ms: 3_000,
            after_transfer_ms: 500,
            after_recycle_ms: 500,
            checkpoint_settle_ms: 1_000,
            approach_near_ms: 500,
            approach_far_ms: 15_000,
            far_threshold_m: 100.0,
            encounter_pass_end_ms: 15_000,
            status_display_ms: 5_000,
            cycle_end_ms: 10_000,
            session_retry_ms: 10_000,
            session_retry_max_ms: 300_000,
            walk_step_ms: 2_000,
            walk_scan_every_ms: 30_000,
        }
    }
}

impl PacingSchedule {
    pub fn duration(&self, pace: Pace) -> Duration {
        let ms = match pace {
            Pace::AfterThrow => self.after_throw_ms,
            Pace::AfterCaptureAid => self.after_capture_aid_ms,
            Pace::AfterEvolve => self.after_evolve_ms,
            Pace::AfterTransfer => self.after_transfer_ms,
            Pace::AfterRecycle => self.after_recycle_ms,
            Pace::CheckpointSettle => self.checkpoint_settle_ms,
            Pace::ApproachNear => self.approach_near_ms,
            Pace::ApproachFar => self.approach_far_ms,
            Pace::EncounterPassEnd => self.encounter_pass_end_ms,
            Pace::StatusDisplay => self.status_display_ms,
            Pace::CycleEnd => self.cycle_end_ms,
            Pace::WalkStep => self.walk_step_ms,
            Pace::SessionRetry(wait) => return wait,
        };
        Duration::from_millis(ms)
    }

    /// Pause before engaging a sighting `distance_m` away.
    pub fn approach(&self, distance_m: f64) -> Pace {
        if distance_m > self.far_threshold_m {
            Pace::ApproachFar
        } else {
            Pace::ApproachNear
        }
    }

    /// Delay before session attempt number `consecutive_failures + 1`.
    pub fn session_backoff(&self, consecutive_failures: u32) -> Duration {
        let cap = self.session_retry_max_ms.max(1);
        let base = self.session_retry_ms.clamp(1, cap);
        let shift = consecutive_failures.saturating_sub(1).min(20);
        let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(multiplier).min(cap))
    }
}

pub trait Pacer {
    fn pause(&mut self, pace: Pace, wait: Duration);
}

/// Blocks the calling thread for each pause.
#[derive(Debug, Default)]
pub struct SleepPacer {
    slept: Duration,
}

impl SleepPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_slept(&self) -> Duration {
        self.slept
    }
}

impl Pacer for SleepPacer {
    fn pause(&mut self, _pace: Pace, wait: Duration) {
        if wait > Duration::ZERO {
            std::thread::sleep(wait);
            self.slept += wait;
        }
    }
}
