use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::modules::error::BotResult;
use crate::modules::pacing::{Pace, Pacer, PacingSchedule};
use crate::modules::session::Session;
use crate::modules::types::Location;

const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Close enough to interact with a checkpoint.
pub const ARRIVAL_RADIUS_M: f64 = 30.0;
/// Per-step speed variation so the track does not look machine-made.
const SPEED_JITTER: f64 = 0.1;

/// Great-circle distance in meters.
pub fn distance_meters(a: Location, b: Location) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

fn interpolate(from: Location, to: Location, fraction: f64) -> Location {
    let t = fraction.clamp(0.0, 1.0);
    Location::new(
        from.lat + (to.lat - from.lat) * t,
        from.lng + (to.lng - from.lng) * t,
    )
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TravelProgress {
    EnRoute { remaining_m: f64, scan_due: bool },
    Arrived,
}

/// Simulated travel, polled one step at a time by the caller.
pub trait Navigator {
    fn begin(&mut self, target: Location, speed_kmh: f64);
    /// Advance one step, updating `session.position`.
    fn advance(&mut self, session: &mut Session, pacer: &mut dyn Pacer) -> BotResult<TravelProgress>;
}

#[derive(Clone, Copy, Debug)]
struct Leg {
    target: Location,
    speed_mps: f64,
    since_scan: Duration,
}

/// Walks straight at the requested speed, reporting each step to the server.
#[derive(Debug)]
pub struct StraightLineWalker {
    step: Duration,
    scan_every: Duration,
    rng: StdRng,
    leg: Option<Leg>,
}

impl StraightLineWalker {
    pub fn new(schedule: &PacingSchedule, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            step: schedule.duration(Pace::WalkStep),
            scan_every: Duration::from_millis(schedule.walk_scan_every_ms),
            rng,
            leg: None,
        }
    }
}

impl Navigator for StraightLineWalker {
    fn begin(&mut self, target: Location, speed_kmh: f64) {
        self.leg = Some(Leg {
            target,
            speed_mps: speed_kmh.max(0.1) / 3.6,
            since_scan: Duration::ZERO,
        });
    }

    fn advance(&mut self, session: &mut Session, pacer: &mut dyn Pacer) -> BotResult<TravelProgress> {
        let Some(leg) = self.leg.as_mut() else {
            return Ok(TravelProgress::Arrived);
        };

        let remaining = distance_meters(session.position, leg.target);
        if remaining <= ARRIVAL_RADIUS_M {
            self.leg = None;
            return Ok(TravelProgress::Arrived);
        }

        pacer.pause(Pace::WalkStep, self.step);
        let speed = leg.speed_mps * self.rng.gen_range(1.0 - SPEED_JITTER..=1.0 + SPEED_JITTER);
        let stride = speed * self.step.as_secs_f64();
        let next = if stride >= remaining {
            leg.target
        } else {
            interpolate(session.position, leg.target, stride / remaining)
        };
        session.relocate(next)?;

        leg.since_scan += self.step;
        let scan_due = leg.since_scan >= self.scan_every;
        if scan_due {
            leg.since_scan = Duration::ZERO;
        }

        let remaining_m = distance_meters(next, leg.target);
        if remaining_m <= ARRIVAL_RADIUS_M {
            self.leg = None;
            return Ok(TravelProgress::Arrived);
        }
        Ok(TravelProgress::EnRoute {
            remaining_m,
            scan_due,
        })
    }
}
